//! Step derivation: the ordered stages an entry still needs for a run mode.
//!
//! This table is the single place that maps (state, mode) to work. The
//! orchestrator runs exactly the stages returned here, in order.

use boardshelf_shared::{CatalogEntry, PipelineState, RunMode, StageName};

/// Stages leading from an unparsed entry to generated content.
const RULEBOOK_TRAIL: [StageName; 4] = [
    StageName::SetRulebookReady,
    StageName::Parse,
    StageName::AssignTaxonomy,
    StageName::Generate,
];

/// Stages still required for `entry` under `mode`.
pub fn required_stages(entry: &CatalogEntry, mode: RunMode) -> Vec<StageName> {
    derive(
        entry.state,
        entry.has_rulebook(),
        entry.has_enrichment_signal(),
        mode,
    )
}

/// Stage list over the raw inputs.
pub fn derive(
    state: PipelineState,
    has_rulebook: bool,
    has_enrichment_signal: bool,
    mode: RunMode,
) -> Vec<StageName> {
    use PipelineState as S;
    use StageName as N;

    match mode {
        RunMode::Full | RunMode::FromCurrent => match state {
            S::Imported | S::Enriched | S::RulebookMissing => {
                let mut stages = Vec::new();
                if state == S::Imported && has_enrichment_signal {
                    stages.push(N::Enrich);
                }
                if has_rulebook {
                    stages.extend(RULEBOOK_TRAIL);
                }
                stages
            }
            S::RulebookReady | S::Parsing => vec![N::Parse, N::AssignTaxonomy, N::Generate],
            S::Parsed => vec![N::AssignTaxonomy, N::Generate],
            S::TaxonomyAssigned | S::Generating => vec![N::Generate],
            S::Generated | S::ReviewPending | S::Published => Vec::new(),
        },
        RunMode::ParseOnly => match state {
            S::Imported | S::Enriched | S::RulebookMissing => {
                if has_rulebook {
                    vec![N::SetRulebookReady, N::Parse]
                } else {
                    vec![N::Parse]
                }
            }
            S::RulebookReady | S::Parsing => vec![N::Parse],
            _ => Vec::new(),
        },
        RunMode::GenerateOnly => match state {
            S::Parsed => vec![N::AssignTaxonomy, N::Generate],
            S::TaxonomyAssigned | S::Generating => vec![N::Generate],
            _ => Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use PipelineState as S;
    use StageName as N;

    const FULL: [N; 4] = [N::SetRulebookReady, N::Parse, N::AssignTaxonomy, N::Generate];

    #[test]
    fn full_and_from_current_table() {
        for mode in [RunMode::Full, RunMode::FromCurrent] {
            assert_eq!(derive(S::Imported, true, false, mode), FULL.to_vec());
            assert_eq!(
                derive(S::Imported, true, true, mode),
                [vec![N::Enrich], FULL.to_vec()].concat()
            );
            assert_eq!(derive(S::Imported, false, true, mode), vec![N::Enrich]);
            assert!(derive(S::Imported, false, false, mode).is_empty());

            for state in [S::Enriched, S::RulebookMissing] {
                assert_eq!(derive(state, true, true, mode), FULL.to_vec());
                assert!(derive(state, false, true, mode).is_empty());
            }

            for rulebook in [true, false] {
                assert_eq!(
                    derive(S::RulebookReady, rulebook, false, mode),
                    vec![N::Parse, N::AssignTaxonomy, N::Generate]
                );
                assert_eq!(
                    derive(S::Parsing, rulebook, false, mode),
                    vec![N::Parse, N::AssignTaxonomy, N::Generate]
                );
                assert_eq!(
                    derive(S::Parsed, rulebook, false, mode),
                    vec![N::AssignTaxonomy, N::Generate]
                );
                assert_eq!(
                    derive(S::TaxonomyAssigned, rulebook, false, mode),
                    vec![N::Generate]
                );
                assert_eq!(derive(S::Generating, rulebook, false, mode), vec![N::Generate]);
            }
        }
    }

    #[test]
    fn parse_only_table() {
        let mode = RunMode::ParseOnly;
        for state in [S::Imported, S::Enriched, S::RulebookMissing] {
            assert_eq!(
                derive(state, true, true, mode),
                vec![N::SetRulebookReady, N::Parse]
            );
        }
        assert_eq!(derive(S::RulebookReady, true, false, mode), vec![N::Parse]);
        assert_eq!(derive(S::Parsing, true, false, mode), vec![N::Parse]);
        for state in [S::Parsed, S::TaxonomyAssigned, S::Generating, S::Generated] {
            assert!(derive(state, true, false, mode).is_empty(), "{state}");
        }
    }

    #[test]
    fn generate_only_table() {
        let mode = RunMode::GenerateOnly;
        for state in [
            S::Imported,
            S::Enriched,
            S::RulebookMissing,
            S::RulebookReady,
            S::Parsing,
        ] {
            assert!(derive(state, true, true, mode).is_empty(), "{state}");
        }
        assert_eq!(
            derive(S::Parsed, true, false, mode),
            vec![N::AssignTaxonomy, N::Generate]
        );
        assert_eq!(derive(S::TaxonomyAssigned, false, false, mode), vec![N::Generate]);
        assert_eq!(derive(S::Generating, false, false, mode), vec![N::Generate]);
    }

    #[test]
    fn finished_states_need_nothing() {
        for mode in RunMode::ALL {
            for state in [S::Generated, S::ReviewPending, S::Published] {
                assert!(derive(state, true, true, mode).is_empty());
            }
        }
    }

    #[test]
    fn stage_targets_move_forward() {
        // Every derived stage lands at or beyond the state it starts from.
        for mode in RunMode::ALL {
            for state in PipelineState::ALL {
                let mut current = state;
                for stage in derive(state, true, true, mode) {
                    let next = stage.target_state();
                    assert!(current.can_transition_to(next), "{current} -> {next}");
                    current = next;
                }
            }
        }
    }
}
