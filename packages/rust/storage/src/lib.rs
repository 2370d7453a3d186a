//! Turso Embedded / libSQL storage layer.
//!
//! The [`Storage`] struct wraps a libSQL database holding catalog entries,
//! families, the expansion relation table, the generation cache and the
//! batch run audit trail. It is the pipeline's only view of persistence:
//! row-level reads and writes, no pipeline logic.

mod migrations;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use boardshelf_shared::{
    BoardshelfError, CatalogEntry, ComplexityMetrics, Family, FamilyContext, FamilyId, GameId,
    GeneratedContent, PipelineState, RelationKind, Result, Taxonomy,
};

const GAME_COLUMNS: &str = "id, name, slug, year_published, state, rulebook_url, bgg_id, family_id,
     rulebook_text, complexity_json, taxonomy_json, rules_content, setup_content,
     reference_content, last_error, last_processed_at, created_at, updated_at";

const FAMILY_COLUMNS: &str = "id, name, slug, base_game_id, context_cache, context_built_at,
     processing_lock, lock_acquired_at, created_at, updated_at";

/// Fields required to insert a catalog entry.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub id: GameId,
    pub name: String,
    pub slug: String,
    pub year_published: Option<i32>,
    pub state: PipelineState,
    pub rulebook_url: Option<String>,
    pub bgg_id: Option<i64>,
    pub family_id: Option<FamilyId>,
}

impl NewGame {
    /// A freshly imported entry with a slug derived from its name.
    pub fn imported(name: &str) -> Self {
        Self {
            id: GameId::new(),
            name: name.to_string(),
            slug: boardshelf_shared::slugify(name),
            year_published: None,
            state: PipelineState::Imported,
            rulebook_url: None,
            bgg_id: None,
            family_id: None,
        }
    }
}

/// Fields required to insert a family.
#[derive(Debug, Clone)]
pub struct NewFamily {
    pub id: FamilyId,
    pub name: String,
    pub slug: String,
    pub base_game_id: Option<GameId>,
}

impl NewFamily {
    pub fn named(name: &str) -> Self {
        Self {
            id: FamilyId::new(),
            name: name.to_string(),
            slug: boardshelf_shared::slugify(name),
            base_game_id: None,
        }
    }
}

/// Primary storage handle wrapping a libSQL database.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct Storage {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BoardshelfError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| BoardshelfError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| BoardshelfError::Storage(e.to_string()))?;

        let storage = Self {
            db: Arc::new(db),
            conn,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        BoardshelfError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Family operations
    // -----------------------------------------------------------------------

    /// Insert a new family record.
    pub async fn insert_family(&self, family: &NewFamily) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO families (id, name, slug, base_game_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    family.id.as_str(),
                    family.name.as_str(),
                    family.slug.as_str(),
                    family.base_game_id.as_ref().map(|id| id.as_str()),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Get a family by ID.
    pub async fn get_family(&self, id: &FamilyId) -> Result<Option<Family>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {FAMILY_COLUMNS} FROM families WHERE id = ?1"),
                params![id.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_family(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// List all families ordered by name.
    pub async fn list_families(&self) -> Result<Vec<Family>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {FAMILY_COLUMNS} FROM families ORDER BY name"),
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_family(&row)?);
        }
        Ok(results)
    }

    /// Designate the canonical base entry of a family.
    pub async fn set_family_base(&self, family_id: &FamilyId, game_id: &GameId) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE families SET base_game_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![game_id.as_str(), now.as_str(), family_id.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Persist a freshly built family context snapshot.
    pub async fn set_family_context(
        &self,
        family_id: &FamilyId,
        context: &FamilyContext,
    ) -> Result<()> {
        let json = to_json(context)?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE families SET context_cache = ?1, context_built_at = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![
                    json,
                    context.built_at.to_rfc3339(),
                    now.as_str(),
                    family_id.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;

        if changed == 0 {
            return Err(BoardshelfError::not_found("family", family_id.as_str()));
        }
        Ok(())
    }

    /// Claim the processing lock for a family. Returns `false` when another
    /// token already holds it (or the family does not exist).
    pub async fn try_lock_family(&self, family_id: &FamilyId, token: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE families SET processing_lock = ?1, lock_acquired_at = ?2
                 WHERE id = ?3 AND processing_lock IS NULL",
                params![token, now.as_str(), family_id.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(changed == 1)
    }

    /// Clear the processing lock for a family. With `token`, only that
    /// holder's lock is cleared. Returns whether a lock was released.
    pub async fn unlock_family(&self, family_id: &FamilyId, token: Option<&str>) -> Result<bool> {
        let changed = match token {
            Some(token) => self
                .conn
                .execute(
                    "UPDATE families SET processing_lock = NULL, lock_acquired_at = NULL
                     WHERE id = ?1 AND processing_lock = ?2",
                    params![family_id.as_str(), token],
                )
                .await
                .map_err(storage_err)?,
            None => self
                .conn
                .execute(
                    "UPDATE families SET processing_lock = NULL, lock_acquired_at = NULL
                     WHERE id = ?1 AND processing_lock IS NOT NULL",
                    params![family_id.as_str()],
                )
                .await
                .map_err(storage_err)?,
        };
        Ok(changed == 1)
    }

    // -----------------------------------------------------------------------
    // Game operations
    // -----------------------------------------------------------------------

    /// Insert a new catalog entry.
    pub async fn insert_game(&self, game: &NewGame) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO games (id, name, slug, year_published, state, rulebook_url, bgg_id,
                                    family_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    game.id.as_str(),
                    game.name.as_str(),
                    game.slug.as_str(),
                    game.year_published.map(i64::from),
                    game.state.as_str(),
                    game.rulebook_url.as_deref(),
                    game.bgg_id,
                    game.family_id.as_ref().map(|id| id.as_str()),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Get a catalog entry by ID.
    pub async fn get_game(&self, id: &GameId) -> Result<Option<CatalogEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
                params![id.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_entry(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// List catalog entries ordered by name.
    pub async fn list_games(&self, limit: u32) -> Result<Vec<CatalogEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {GAME_COLUMNS} FROM games ORDER BY name LIMIT ?1"),
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_entry(&row)?);
        }
        Ok(results)
    }

    /// List all entries belonging to a family, ordered by name.
    pub async fn list_games_by_family(&self, family_id: &FamilyId) -> Result<Vec<CatalogEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE family_id = ?1 ORDER BY name"),
                params![family_id.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_entry(&row)?);
        }
        Ok(results)
    }

    /// Delete a catalog entry together with its relations. Returns whether
    /// the entry existed.
    pub async fn delete_game(&self, id: &GameId) -> Result<bool> {
        self.conn
            .execute(
                "DELETE FROM game_relations WHERE game_id = ?1 OR related_game_id = ?1",
                params![id.as_str()],
            )
            .await
            .map_err(storage_err)?;
        self.conn
            .execute(
                "UPDATE families SET base_game_id = NULL WHERE base_game_id = ?1",
                params![id.as_str()],
            )
            .await
            .map_err(storage_err)?;
        let changed = self
            .conn
            .execute("DELETE FROM games WHERE id = ?1", params![id.as_str()])
            .await
            .map_err(storage_err)?;
        Ok(changed == 1)
    }

    /// Record a successful stage: new state, error cleared, attempt stamped.
    pub async fn record_stage_success(&self, id: &GameId, state: PipelineState) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET state = ?1, last_error = NULL, last_processed_at = ?2, updated_at = ?2
             WHERE id = ?3",
            params![state.as_str(), now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    /// Record a failed stage: state set to `state` (the state the stage
    /// started from), error recorded, attempt stamped.
    pub async fn record_stage_failure(
        &self,
        id: &GameId,
        state: PipelineState,
        error: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET state = ?1, last_error = ?2, last_processed_at = ?3, updated_at = ?3
             WHERE id = ?4",
            params![state.as_str(), error, now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    /// Persist the in-flight state of a long-running stage.
    pub async fn mark_in_flight(&self, id: &GameId, state: PipelineState) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET state = ?1, updated_at = ?2 WHERE id = ?3",
            params![state.as_str(), now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    /// Attach structured rulebook text and complexity metrics.
    pub async fn set_rulebook_analysis(
        &self,
        id: &GameId,
        text: &str,
        complexity: &ComplexityMetrics,
    ) -> Result<()> {
        let complexity_json = to_json(complexity)?;
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET rulebook_text = ?1, complexity_json = ?2, updated_at = ?3
             WHERE id = ?4",
            params![text, complexity_json, now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    /// Attach taxonomy assignments.
    pub async fn set_taxonomy(&self, id: &GameId, taxonomy: &Taxonomy) -> Result<()> {
        let json = to_json(taxonomy)?;
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET taxonomy_json = ?1, updated_at = ?2 WHERE id = ?3",
            params![json, now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    /// Store generated content. Parts that are `None` keep their stored value.
    pub async fn set_generated_content(
        &self,
        id: &GameId,
        content: &GeneratedContent,
    ) -> Result<()> {
        let rules = content.rules.as_ref().map(to_json).transpose()?;
        let setup = content.setup.as_ref().map(to_json).transpose()?;
        let reference = content.reference.as_ref().map(to_json).transpose()?;
        let now = Utc::now().to_rfc3339();
        self.update_game(
            "UPDATE games SET rules_content = COALESCE(?1, rules_content),
                              setup_content = COALESCE(?2, setup_content),
                              reference_content = COALESCE(?3, reference_content),
                              updated_at = ?4
             WHERE id = ?5",
            params![rules, setup, reference, now.as_str(), id.as_str()],
            id,
        )
        .await
    }

    async fn update_game(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        id: &GameId,
    ) -> Result<()> {
        let changed = self
            .conn
            .execute(sql, params)
            .await
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(BoardshelfError::not_found("game", id.as_str()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Relation operations
    // -----------------------------------------------------------------------

    /// Link `game_id` to `related_game_id` (e.g. "expansion of").
    pub async fn add_relation(
        &self,
        game_id: &GameId,
        related_game_id: &GameId,
        kind: RelationKind,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO game_relations (game_id, related_game_id, kind)
                 VALUES (?1, ?2, ?3)",
                params![game_id.as_str(), related_game_id.as_str(), kind.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Relations originating from a game. Returns `Vec<(related_game_id, kind)>`.
    pub async fn relations_for(&self, game_id: &GameId) -> Result<Vec<(GameId, RelationKind)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT related_game_id, kind FROM game_relations WHERE game_id = ?1 ORDER BY id",
                params![game_id.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let related: String = row.get(0).map_err(storage_err)?;
            let kind: String = row.get(1).map_err(storage_err)?;
            results.push((GameId(related), kind.parse()?));
        }
        Ok(results)
    }

    /// Whether the entry is an expansion of another entry.
    pub async fn is_expansion(&self, game_id: &GameId) -> Result<bool> {
        let relations = self.relations_for(game_id).await?;
        Ok(relations.iter().any(|(_, kind)| kind.marks_expansion()))
    }

    /// IDs of all entries in a family that are expansions of another entry.
    pub async fn expansion_ids_in_family(&self, family_id: &FamilyId) -> Result<HashSet<GameId>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT r.game_id
                 FROM game_relations r
                 JOIN games g ON g.id = r.game_id
                 WHERE g.family_id = ?1 AND r.kind IN ('expansion_of', 'standalone_expansion_of')",
                params![family_id.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = HashSet::new();
        while let Ok(Some(row)) = rows.next().await {
            let id: String = row.get(0).map_err(storage_err)?;
            results.insert(GameId(id));
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Generation cache operations
    // -----------------------------------------------------------------------

    /// Get a cached generator response.
    pub async fn get_generation_cache(
        &self,
        idempotency_key: &str,
        model_id: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT result_json FROM generation_cache
                 WHERE idempotency_key = ?1 AND model_id = ?2",
                params![idempotency_key, model_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => {
                let result: String = row.get(0).map_err(storage_err)?;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Store a generator response in the cache (upserts).
    pub async fn set_generation_cache(
        &self,
        idempotency_key: &str,
        model_id: &str,
        result_json: &str,
    ) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO generation_cache (id, idempotency_key, model_id, result_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(idempotency_key, model_id) DO UPDATE SET
                   result_json = excluded.result_json,
                   created_at = excluded.created_at",
                params![id.as_str(), idempotency_key, model_id, result_json, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pipeline run audit
    // -----------------------------------------------------------------------

    /// Record the start of a batch run. Returns the generated run ID.
    pub async fn insert_pipeline_run(
        &self,
        mode: &str,
        run_mode: &str,
        target_id: &str,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO pipeline_runs (id, mode, run_mode, target_id, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.as_str(), mode, run_mode, target_id, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a batch run finished with its summary statistics.
    pub async fn finish_pipeline_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE pipeline_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Runs recorded for a target. Returns `Vec<(run_id, finished, stats_json)>`.
    pub async fn list_pipeline_runs(
        &self,
        target_id: &str,
    ) -> Result<Vec<(String, bool, Option<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, finished_at, stats_json FROM pipeline_runs
                 WHERE target_id = ?1 ORDER BY started_at",
                params![target_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let id: String = row.get(0).map_err(storage_err)?;
            let finished = row.get::<String>(1).is_ok();
            let stats: Option<String> = row.get::<String>(2).ok();
            results.push((id, finished, stats));
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn storage_err(e: libsql::Error) -> BoardshelfError {
    BoardshelfError::Storage(e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| BoardshelfError::Storage(format!("failed to encode column: {e}")))
}

fn json_column<T: DeserializeOwned>(row: &libsql::Row, idx: i32) -> Result<Option<T>> {
    match row.get::<String>(idx).ok() {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| BoardshelfError::Storage(format!("invalid JSON in column {idx}: {e}"))),
        None => Ok(None),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BoardshelfError::Storage(format!("invalid date: {e}")))
}

fn timestamp_column(row: &libsql::Row, idx: i32) -> Result<DateTime<Utc>> {
    let raw: String = row.get(idx).map_err(storage_err)?;
    parse_timestamp(&raw)
}

fn optional_timestamp(row: &libsql::Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    row.get::<String>(idx)
        .ok()
        .map(|raw| parse_timestamp(&raw))
        .transpose()
}

/// Convert a database row to a [`CatalogEntry`].
fn row_to_entry(row: &libsql::Row) -> Result<CatalogEntry> {
    let state: String = row.get(4).map_err(storage_err)?;
    Ok(CatalogEntry {
        id: GameId(row.get::<String>(0).map_err(storage_err)?),
        name: row.get::<String>(1).map_err(storage_err)?,
        slug: row.get::<String>(2).map_err(storage_err)?,
        year_published: row.get::<i64>(3).ok().map(|y| y as i32),
        state: state.parse()?,
        rulebook_url: row.get::<String>(5).ok(),
        bgg_id: row.get::<i64>(6).ok(),
        family_id: row.get::<String>(7).ok().map(FamilyId),
        rulebook_text: row.get::<String>(8).ok(),
        complexity: json_column(row, 9)?,
        taxonomy: json_column(row, 10)?,
        content: GeneratedContent {
            rules: json_column(row, 11)?,
            setup: json_column(row, 12)?,
            reference: json_column(row, 13)?,
        },
        last_error: row.get::<String>(14).ok(),
        last_processed_at: optional_timestamp(row, 15)?,
        created_at: timestamp_column(row, 16)?,
        updated_at: timestamp_column(row, 17)?,
    })
}

/// Convert a database row to a [`Family`].
fn row_to_family(row: &libsql::Row) -> Result<Family> {
    Ok(Family {
        id: FamilyId(row.get::<String>(0).map_err(storage_err)?),
        name: row.get::<String>(1).map_err(storage_err)?,
        slug: row.get::<String>(2).map_err(storage_err)?,
        base_game_id: row.get::<String>(3).ok().map(GameId),
        context: json_column(row, 4)?,
        processing_lock: row.get::<String>(6).ok(),
        lock_acquired_at: optional_timestamp(row, 7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}
