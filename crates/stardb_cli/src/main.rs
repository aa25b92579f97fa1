//! Command-line entry point for the StarDB services store.
//!
//! Subcommands:
//! - `schema`: register the `services` validator.
//! - `seed`: register the validator and load the seed records.
//! - `insert <json>`: validate and insert one candidate document.
//! - `list`: print every stored record as JSON lines.

use clap::{Parser, Subcommand};
use log::error;
use stardb_core::db::open_db;
use stardb_core::{
    init_logging, seed_services, RecordStore, SqliteServiceRepository, StoreConfig,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "stardb", version, about = "Validated record store for StarDB services")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file; overrides `database_path` from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level; overrides `log_level` from the config.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory; overrides `log_dir` from the config.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register the `services` schema.
    Schema,
    /// Register the schema and load seed records into an empty collection.
    Seed,
    /// Validate and insert one JSON document.
    Insert { document: String },
    /// Print stored records as JSON lines.
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let mut conn = open_db(&config.database_path)?;
    let repo = SqliteServiceRepository::try_new(&mut conn)?;
    let mut store = RecordStore::new(repo);

    match cli.command {
        Command::Schema => {
            let status = store.ensure_schema()?;
            println!("schema {status:?}");
        }
        Command::Seed => {
            let outcome = seed_services(&mut store)?;
            println!(
                "schema {:?}, inserted {} record(s)",
                outcome.schema,
                outcome.inserted.len()
            );
        }
        Command::Insert { document } => {
            let candidate: serde_json::Value = serde_json::from_str(&document)?;
            let id = store.insert(&candidate)?;
            println!("{id}");
        }
        Command::List => {
            for stored in store.list()? {
                println!("{}", serde_json::to_string(&stored)?);
            }
        }
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<StoreConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config.normalize()?;
    Ok(config)
}
