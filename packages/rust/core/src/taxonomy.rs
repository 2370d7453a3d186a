//! Keyword classifier assigning category and mechanic tags from rulebook text.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use boardshelf_shared::{CatalogEntry, Result, Taxonomy};

use crate::collaborators::Classifier;

/// A tag and the pattern that earns it.
struct Rule {
    tag: &'static str,
    pattern: Regex,
}

fn rules(table: &[(&'static str, &str)]) -> Vec<Rule> {
    table
        .iter()
        .map(|&(tag, pattern)| Rule {
            tag,
            pattern: Regex::new(&format!(r"(?i)\b(?:{pattern})")).expect("valid regex"),
        })
        .collect()
}

static CATEGORIES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("card-game", r"deck|draw (?:a|two|\d) cards?|hand of cards"),
        ("dice", r"dice|die roll|roll (?:a|the|two) d(?:ie|ice)"),
        ("economic", r"money|coins?|income|market|trade"),
        ("fantasy", r"dragon|wizard|magic|spell|dungeon"),
        ("science-fiction", r"spaceship|planet|galaxy|alien"),
        ("war", r"army|armies|battle|combat|attack"),
        ("exploration", r"explor|discover|uncharted"),
        ("party", r"teams? of|guess|charades|bluff"),
        ("animals", r"animals?|birds?|creatures?"),
    ])
});

static MECHANICS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("worker-placement", r"worker placement|place (?:a|one|your) workers?"),
        ("deck-building", r"deck.?building|add (?:it|the card) to your discard"),
        ("drafting", r"draft|pick one and pass"),
        ("tile-placement", r"place (?:a|the|one) tiles?|tile placement"),
        ("area-control", r"area control|majority in|control (?:of )?(?:a|the) regions?"),
        ("set-collection", r"set collection|collect sets?|sets of"),
        ("hand-management", r"hand limit|discard down to"),
        ("engine-building", r"engine|whenever you|each time you"),
        ("cooperative", r"cooperative|all players (?:win|lose) together"),
        ("trading", r"trade with|trading|negotiat"),
        ("route-building", r"routes?|connect (?:two|cities|the)"),
        ("dice-rolling", r"roll (?:the )?dice|roll (?:a|the) die"),
    ])
});

/// Regex keyword classifier over a fixed vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Tags matched in `text`, in vocabulary order.
    pub fn classify_text(text: &str) -> Taxonomy {
        let matching = |rules: &[Rule]| -> Vec<String> {
            rules
                .iter()
                .filter(|rule| rule.pattern.is_match(text))
                .map(|rule| rule.tag.to_string())
                .collect()
        };

        Taxonomy {
            categories: matching(CATEGORIES.as_slice()),
            mechanics: matching(MECHANICS.as_slice()),
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, entry: &CatalogEntry, rulebook_text: &str) -> Result<Taxonomy> {
        let taxonomy = Self::classify_text(rulebook_text);
        tracing::debug!(
            entity_id = %entry.id,
            categories = taxonomy.categories.len(),
            mechanics = taxonomy.mechanics.len(),
            "classified"
        );
        Ok(taxonomy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_a_route_building_card_game() {
        let text = "Draw two cards from the deck. Claim routes to connect cities. \
                    Trade with other players at the market.";
        let taxonomy = KeywordClassifier::classify_text(text);
        assert!(taxonomy.categories.contains(&"card-game".to_string()));
        assert!(taxonomy.categories.contains(&"economic".to_string()));
        assert!(taxonomy.mechanics.contains(&"route-building".to_string()));
        assert!(taxonomy.mechanics.contains(&"trading".to_string()));
        assert!(!taxonomy.mechanics.contains(&"cooperative".to_string()));
    }

    #[test]
    fn worker_placement_and_engine() {
        let text = "Place a worker on an action space. Whenever you play a bird, gain food.";
        let taxonomy = KeywordClassifier::classify_text(text);
        assert_eq!(
            taxonomy.mechanics,
            vec!["worker-placement".to_string(), "engine-building".to_string()]
        );
        assert_eq!(taxonomy.categories, vec!["animals".to_string()]);
    }

    #[test]
    fn no_matches_yield_empty_taxonomy() {
        let taxonomy = KeywordClassifier::classify_text("Lorem ipsum.");
        assert!(taxonomy.is_empty());
    }
}
