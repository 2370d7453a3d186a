//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tokio::sync::mpsc;
use tracing::info;

use boardshelf_core::{
    BridgeGenerator, Collaborators, HttpRulebookParser, KeywordClassifier, Orchestrator,
    ProgressSink, RunOptions, RunRequest, lock, rebuild_family_context,
};
use boardshelf_shared::{
    AppConfig, BoardshelfError, FamilyId, GameId, RunMode, database_path, init_config,
    load_config, validate_api_key,
};
use boardshelf_storage::Storage;

use crate::output::{self, OutputFormat};

/// Largest page printed by `games list` without `--family`.
const DEFAULT_LIST_LIMIT: u32 = 50;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// boardshelf: board game rulebooks in, structured rules content out.
#[derive(Parser)]
#[command(
    name = "boardshelf",
    version,
    about = "Drive board game catalog entries through the rulebook-to-content pipeline.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides `[database] path`).
    #[arg(long, global = true, env = "BOARDSHELF_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the content pipeline.
    Run {
        #[command(subcommand)]
        target: RunTarget,
    },

    /// Inspect catalog entries.
    Games {
        #[command(subcommand)]
        action: GamesAction,
    },

    /// Inspect and maintain families.
    Family {
        #[command(subcommand)]
        action: FamilyAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by both run targets.
#[derive(clap::Args)]
pub(crate) struct RunArgs {
    /// Run mode: full, from-current, parse-only or generate-only.
    #[arg(long, value_parser = parse_run_mode)]
    pub mode: Option<RunMode>,

    /// Run entries blocked on a missing rulebook as far as they can go.
    #[arg(long)]
    pub no_skip_blocked: bool,

    /// Stop the batch at the first failing entry.
    #[arg(long)]
    pub stop_on_error: bool,

    /// Output: progress (spinner), events (JSON lines) or json (final report).
    #[arg(long, default_value = "progress")]
    pub output: OutputFormat,
}

/// `run` subcommands.
#[derive(Subcommand)]
pub(crate) enum RunTarget {
    /// Run one catalog entry.
    Single {
        /// Entry ID.
        entity_id: String,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Run every entry of a family, base entries first.
    Family {
        /// Family ID.
        family_id: String,
        #[command(flatten)]
        args: RunArgs,
    },
}

/// `games` subcommands.
#[derive(Subcommand)]
pub(crate) enum GamesAction {
    /// List catalog entries.
    List {
        /// Only entries of this family.
        #[arg(long)]
        family: Option<String>,

        /// Maximum entries to list.
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    /// Show one entry as JSON.
    Show {
        /// Entry ID.
        id: String,
    },
}

/// `family` subcommands.
#[derive(Subcommand)]
pub(crate) enum FamilyAction {
    /// Show a family, its members and its cached context.
    Show {
        /// Family ID.
        id: String,
    },
    /// Clear a processing lock left behind by a crashed run.
    Unlock {
        /// Family ID.
        id: String,
    },
    /// Rebuild the family context from its base entry.
    RebuildContext {
        /// Family ID.
        id: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_run_mode(s: &str) -> std::result::Result<RunMode, String> {
    s.parse().map_err(|e: BoardshelfError| e.to_string())
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so that
/// `--output events|json` keeps stdout machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "boardshelf=info",
        1 => "boardshelf=debug",
        _ => "boardshelf=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Run { target } => cmd_run(target, db).await,
        Command::Games { action } => match action {
            GamesAction::List { family, limit } => cmd_games_list(db, family, limit).await,
            GamesAction::Show { id } => cmd_games_show(db, &id).await,
        },
        Command::Family { action } => match action {
            FamilyAction::Show { id } => cmd_family_show(db, &id).await,
            FamilyAction::Unlock { id } => cmd_family_unlock(db, &id).await,
            FamilyAction::RebuildContext { id } => cmd_family_rebuild(db, &id).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the database named by `--db`, falling back to the config.
async fn open_storage(config: &AppConfig, db: Option<PathBuf>) -> Result<Storage> {
    let path = match db {
        Some(path) => path,
        None => database_path(config)?,
    };
    info!(path = %path.display(), "opening database");
    Ok(Storage::open(&path).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(target: RunTarget, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;

    let (request, args) = match target {
        RunTarget::Single { entity_id, args } => {
            let options = run_options(&config, &args);
            (RunRequest::single(entity_id.as_str(), options), args)
        }
        RunTarget::Family { family_id, args } => {
            let options = run_options(&config, &args);
            (RunRequest::family(family_id.as_str(), options), args)
        }
    };
    request.validate()?;

    // Parsing alone never reaches the generator.
    if request.options().run_mode != RunMode::ParseOnly {
        validate_api_key(&config)?;
    }

    let storage = open_storage(&config, db).await?;
    let collaborators = Collaborators {
        parser: Arc::new(HttpRulebookParser::new(&config.rulebook)),
        classifier: Arc::new(KeywordClassifier),
        generator: Arc::new(BridgeGenerator::new(config.generator.clone())),
    };
    let orchestrator = Orchestrator::new(&storage, collaborators, config.generator.quality_tier);

    let (tx, rx) = mpsc::channel(64);
    let renderer = tokio::spawn(output::render(rx, args.output));
    let report = orchestrator.run(&request, ProgressSink::new(tx)).await?;
    renderer.await??;

    if matches!(args.output, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match report.error {
        Some(error) => Err(eyre!("run failed: {error}")),
        None if report.summary.errors > 0 => Err(eyre!(
            "{} of {} entries failed",
            report.summary.errors,
            report.summary.total_games
        )),
        None => Ok(()),
    }
}

/// CLI flags override the `[pipeline]` defaults.
fn run_options(config: &AppConfig, args: &RunArgs) -> RunOptions {
    RunOptions {
        skip_blocked: config.pipeline.skip_blocked && !args.no_skip_blocked,
        stop_on_error: config.pipeline.stop_on_error || args.stop_on_error,
        run_mode: args.mode.unwrap_or(config.pipeline.default_mode),
    }
}

async fn cmd_games_list(db: Option<PathBuf>, family: Option<String>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let games = match family {
        Some(family_id) => {
            storage
                .list_games_by_family(&FamilyId::from(family_id))
                .await?
        }
        None => storage.list_games(limit).await?,
    };

    if games.is_empty() {
        println!("No games found.");
        return Ok(());
    }
    for game in &games {
        let year = game
            .year_published
            .map_or_else(|| "----".to_string(), |y| y.to_string());
        println!("{}  {:<18}  {year}  {}", game.id, game.state, game.name);
    }
    Ok(())
}

async fn cmd_games_show(db: Option<PathBuf>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let game = storage
        .get_game(&GameId::from(id))
        .await?
        .ok_or_else(|| BoardshelfError::not_found("game", id))?;
    println!("{}", serde_json::to_string_pretty(&game)?);
    Ok(())
}

async fn cmd_family_show(db: Option<PathBuf>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let family_id = FamilyId::from(id);

    let family = storage
        .get_family(&family_id)
        .await?
        .ok_or_else(|| BoardshelfError::not_found("family", id))?;
    let members = storage.list_games_by_family(&family_id).await?;
    let expansions = storage.expansion_ids_in_family(&family_id).await?;

    println!("{} ({})", family.name, family.id);
    if let Some(token) = &family.processing_lock {
        println!("  locked by run {token}");
    }
    for game in &members {
        let role = if family.is_base(&game.id) {
            "base"
        } else if expansions.contains(&game.id) {
            "expansion"
        } else {
            "member"
        };
        println!("  {:<9}  {:<18}  {}  {}", role, game.state, game.id, game.name);
    }
    match &family.context {
        Some(context) => println!(
            "\nContext:\n{}",
            serde_json::to_string_pretty(context)?
        ),
        None => println!("\nNo cached context."),
    }
    Ok(())
}

async fn cmd_family_unlock(db: Option<PathBuf>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    if lock::force_release(&storage, &FamilyId::from(id)).await? {
        println!("Released processing lock on family {id}.");
    } else {
        println!("Family {id} was not locked.");
    }
    Ok(())
}

async fn cmd_family_rebuild(db: Option<PathBuf>, id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let family_id = FamilyId::from(id);

    let family = storage
        .get_family(&family_id)
        .await?
        .ok_or_else(|| BoardshelfError::not_found("family", id))?;
    let base_id = family
        .base_game_id
        .ok_or_else(|| eyre!("family {id} has no designated base entry"))?;

    let context = rebuild_family_context(&storage, &family_id, &base_id).await?;
    println!(
        "Rebuilt context for {} from {} ({} key terms).",
        family.name,
        context.base_game_name,
        context.key_terms.len()
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_a_family_run() {
        let cli = Cli::try_parse_from([
            "boardshelf",
            "run",
            "family",
            "fam-1",
            "--mode",
            "parse-only",
            "--stop-on-error",
            "--output",
            "events",
        ])
        .unwrap();

        let Command::Run {
            target: RunTarget::Family { family_id, args },
        } = cli.command
        else {
            panic!("expected run family");
        };
        assert_eq!(family_id, "fam-1");
        assert_eq!(args.mode, Some(RunMode::ParseOnly));
        assert!(args.stop_on_error);
        assert!(matches!(args.output, OutputFormat::Events));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Cli::try_parse_from(["boardshelf", "run", "single", "g1", "--mode", "turbo"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_pipeline_defaults() {
        let mut config = AppConfig::default();
        config.pipeline.default_mode = RunMode::Full;

        let cli = Cli::try_parse_from(["boardshelf", "run", "single", "g1", "--no-skip-blocked"])
            .unwrap();
        let Command::Run {
            target: RunTarget::Single { args, .. },
        } = cli.command
        else {
            panic!("expected run single");
        };

        let options = run_options(&config, &args);
        assert!(!options.skip_blocked);
        assert!(!options.stop_on_error);
        assert_eq!(options.run_mode, RunMode::Full);
    }
}
