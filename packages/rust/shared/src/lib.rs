//! Shared types, error model, and configuration for boardshelf.
//!
//! This crate is the foundation depended on by all other boardshelf crates.
//! It provides:
//! - [`BoardshelfError`], the unified error type
//! - Domain types ([`CatalogEntry`], [`Family`], [`PipelineState`], [`RunMode`], [`StageName`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, GeneratorConfig, PipelineConfig, QualityTier, RulebookConfig,
    config_dir, config_file_path, database_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{BoardshelfError, Result};
pub use types::{
    CatalogEntry, ComplexityMetrics, Family, FamilyContext, FamilyId, GameId, GeneratedContent,
    PipelineState, RelationKind, RunMode, StageName, Taxonomy, slugify,
};
