//! Family context cache: a derived summary of a family's base entry.
//!
//! Expansions are generated against this snapshot so their content stays
//! consistent with the base game. The snapshot is built only from the
//! family's designated base entry, and only once that entry has generated
//! content.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use boardshelf_shared::{
    BoardshelfError, CatalogEntry, FamilyContext, FamilyId, GameId, GeneratedContent, Result,
};
use boardshelf_storage::Storage;

/// Longest summary kept per content part, in characters.
const SUMMARY_CHARS: usize = 600;

/// Most key terms carried in a context.
const MAX_KEY_TERMS: usize = 20;

/// Fields looked up, in order, when summarising a structured content part.
const SUMMARY_FIELDS: [&str; 4] = ["summary", "overview", "description", "text"];

/// Build a context snapshot from a base entry's generated content.
pub fn build_context(base: &CatalogEntry) -> Result<FamilyContext> {
    if base.content.is_empty() {
        return Err(BoardshelfError::validation(format!(
            "base entry {} has no generated content",
            base.id
        )));
    }

    let mut key_terms = content_key_terms(&base.content);
    if let Some(text) = &base.rulebook_text {
        for term in boardshelf_rulebook::extract_key_terms(text, MAX_KEY_TERMS) {
            if !key_terms.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
                key_terms.push(term);
            }
        }
    }
    key_terms.truncate(MAX_KEY_TERMS);

    Ok(FamilyContext {
        base_game_id: base.id.clone(),
        base_game_name: base.name.clone(),
        year_published: base.year_published,
        rules_summary: base.content.rules.as_ref().and_then(summarise),
        setup_summary: base.content.setup.as_ref().and_then(summarise),
        key_terms,
        content_hash: content_hash(&base.content)?,
        built_at: Utc::now(),
    })
}

/// Rebuild and persist the context for `family_id` from `base_id`.
#[instrument(skip_all, fields(family_id = %family_id, base_id = %base_id))]
pub async fn rebuild_family_context(
    storage: &Storage,
    family_id: &FamilyId,
    base_id: &GameId,
) -> Result<FamilyContext> {
    let family = storage
        .get_family(family_id)
        .await?
        .ok_or_else(|| BoardshelfError::not_found("family", family_id.as_str()))?;

    if !family.is_base(base_id) {
        return Err(BoardshelfError::validation(format!(
            "{base_id} is not the base entry of family {family_id}"
        )));
    }

    let base = storage
        .get_game(base_id)
        .await?
        .ok_or_else(|| BoardshelfError::not_found("game", base_id.as_str()))?;

    let context = build_context(&base)?;
    storage.set_family_context(family_id, &context).await?;

    info!(
        key_terms = context.key_terms.len(),
        hash = %context.content_hash,
        "family context rebuilt"
    );
    Ok(context)
}

/// Hex SHA-256 over the serialized content parts.
pub fn content_hash(content: &GeneratedContent) -> Result<String> {
    let bytes = serde_json::to_vec(content)
        .map_err(|e| BoardshelfError::validation(format!("unhashable content: {e}")))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// A short text summary of one content part.
fn summarise(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => SUMMARY_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => return None,
        other => other.to_string(),
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(truncate_chars(text, SUMMARY_CHARS))
}

/// Terms the generator itself flagged (a `key_terms` array on any part).
fn content_key_terms(content: &GeneratedContent) -> Vec<String> {
    [&content.rules, &content.setup, &content.reference]
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("key_terms").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
