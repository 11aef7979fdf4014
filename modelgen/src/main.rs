//! CLI entry point for modelgen

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modelgen::config::{CodegenConfig, GenerateMode};

#[derive(Parser)]
#[command(name = "modelgen")]
#[command(about = "Generate Rust entities, query DTOs and rdbi DAOs from MySQL schemas")]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML format); MODELGEN_* env vars are applied on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQL file with CREATE TABLE statements (switches to statement mode)
    #[arg(short, long)]
    sql: Option<PathBuf>,

    /// Output root directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tables to generate (comma-separated, overrides config)
    #[arg(short, long, value_delimiter = ',')]
    tables: Vec<String>,

    /// Dry run - render everything without writing files
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate everything (entities, DTOs, DAOs, helpers)
    Generate,
    /// Generate only entities
    Entity,
    /// Generate only DTOs
    Dto,
    /// Generate only DAOs (with the entities they depend on)
    Dao,
    /// Generate only helper modules
    Helpers,
    /// Print the extracted schemas as JSON
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (before logging, so we can use config.log_level)
    let mut config = CodegenConfig::load(cli.config.as_deref())?;

    // Priority: RUST_LOG env var > config.log_level > default (debug for dev, info for release)
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let log_level = config.log_level.as_deref().unwrap_or(default_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Apply CLI overrides
    if let Some(sql) = cli.sql {
        config.mode = GenerateMode::Statement;
        config.sql_file = sql;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if !cli.tables.is_empty() {
        config.all_tables = false;
        config.table_names = cli.tables;
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    match &cli.command {
        Some(Commands::Entity) => only(&mut config, true, false, false, false),
        Some(Commands::Dto) => only(&mut config, false, true, false, false),
        Some(Commands::Dao) => only(&mut config, true, false, true, false),
        Some(Commands::Helpers) => only(&mut config, false, false, false, true),
        Some(Commands::Inspect) => return inspect_schemas(&config),
        Some(Commands::Generate) | None => {}
    }

    info!("Generating code in {} mode", config.mode);
    modelgen::generate(&config)?;

    info!("Code generation completed successfully");
    Ok(())
}

fn only(config: &mut CodegenConfig, entity: bool, dto: bool, dao: bool, helpers: bool) {
    config.generate_entity = entity;
    config.generate_dto = dto;
    config.generate_dao = dao;
    config.generate_helpers = helpers;
}

fn inspect_schemas(config: &CodegenConfig) -> Result<()> {
    config.validate()?;
    let schemas = modelgen::load_schemas(config)?;
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}
