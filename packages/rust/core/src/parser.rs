//! Default rulebook parser backed by `boardshelf-rulebook`.

use async_trait::async_trait;

use boardshelf_rulebook::{FetchOptions, ParsedRulebook};
use boardshelf_shared::{CatalogEntry, Result, RulebookConfig};

use crate::collaborators::RulebookParser;

/// Fetches rulebooks over HTTP and converts them to structured text.
#[derive(Debug, Clone, Default)]
pub struct HttpRulebookParser {
    options: FetchOptions,
}

impl HttpRulebookParser {
    pub fn new(config: &RulebookConfig) -> Self {
        Self {
            options: FetchOptions::from(config),
        }
    }
}

#[async_trait]
impl RulebookParser for HttpRulebookParser {
    async fn parse(&self, entry: &CatalogEntry, rulebook_url: &str) -> Result<ParsedRulebook> {
        tracing::debug!(entity_id = %entry.id, url = rulebook_url, "fetching rulebook");
        boardshelf_rulebook::fetch_rulebook(rulebook_url, &self.options).await
    }
}
