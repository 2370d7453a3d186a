//! SQL migration definitions for the boardshelf database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: families, games, game_relations, generation_cache, pipeline_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Families: a base game plus its expansions/reprints
CREATE TABLE IF NOT EXISTS families (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    slug             TEXT NOT NULL UNIQUE,
    base_game_id     TEXT,
    context_cache    TEXT,
    context_built_at TEXT,
    processing_lock  TEXT,
    lock_acquired_at TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- Catalog entries tracked through the content pipeline
CREATE TABLE IF NOT EXISTS games (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    slug              TEXT NOT NULL UNIQUE,
    year_published    INTEGER,
    state             TEXT NOT NULL DEFAULT 'imported',
    rulebook_url      TEXT,
    bgg_id            INTEGER,
    family_id         TEXT REFERENCES families(id) ON DELETE SET NULL,
    rulebook_text     TEXT,
    complexity_json   TEXT,
    taxonomy_json     TEXT,
    rules_content     TEXT,
    setup_content     TEXT,
    reference_content TEXT,
    last_error        TEXT,
    last_processed_at TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_family_id ON games(family_id);
CREATE INDEX IF NOT EXISTS idx_games_state ON games(state);

-- Links between entries (expansion_of, standalone_expansion_of, reimplementation_of)
CREATE TABLE IF NOT EXISTS game_relations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id         TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    related_game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    kind            TEXT NOT NULL,
    UNIQUE(game_id, related_game_id, kind)
);

CREATE INDEX IF NOT EXISTS idx_game_relations_game ON game_relations(game_id);

-- Content generator responses keyed by idempotency key
CREATE TABLE IF NOT EXISTS generation_cache (
    id              TEXT PRIMARY KEY,
    idempotency_key TEXT NOT NULL,
    model_id        TEXT NOT NULL,
    result_json     TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE(idempotency_key, model_id)
);

-- Batch run audit trail
CREATE TABLE IF NOT EXISTS pipeline_runs (
    id          TEXT PRIMARY KEY,
    mode        TEXT NOT NULL,
    run_mode    TEXT NOT NULL,
    target_id   TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

CREATE INDEX IF NOT EXISTS idx_pipeline_runs_target ON pipeline_runs(target_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
