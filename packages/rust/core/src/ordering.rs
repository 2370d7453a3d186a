//! Processing order for family batches.

use std::collections::HashSet;

use boardshelf_shared::{CatalogEntry, GameId};

/// Sort key for entries without a publication year, placing them last.
const NO_YEAR: i32 = 9999;

/// An entry scheduled in a family batch.
#[derive(Debug, Clone)]
pub struct FamilyMember {
    pub entry: CatalogEntry,
    pub is_expansion: bool,
}

/// Order family entries: base entries before expansions, each group by
/// ascending publication year with unyeared entries last. Ties keep their
/// input order.
pub fn order_family(entries: Vec<CatalogEntry>, expansions: &HashSet<GameId>) -> Vec<FamilyMember> {
    let mut members: Vec<FamilyMember> = entries
        .into_iter()
        .map(|entry| FamilyMember {
            is_expansion: expansions.contains(&entry.id),
            entry,
        })
        .collect();

    members.sort_by_key(|m| (m.is_expansion, m.entry.year_published.unwrap_or(NO_YEAR)));
    members
}
