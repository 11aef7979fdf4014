//! modelgen: generate Rust entities, query DTOs and rdbi DAOs from MySQL schemas
//!
//! Schemas come from one of two sources:
//!
//! - a live MySQL database, introspected through `information_schema`
//! - a SQL script of `CREATE TABLE` statements, parsed with `sqlparser-rs`
//!
//! Both produce the same [`schema::Schema`] model, which is rendered through
//! minijinja templates into:
//!
//! - entity structs with `#[derive(Serialize, Deserialize, rdbi::FromRow, rdbi::ToParams)]`
//! - query/patch DTOs with optional fields
//! - async DAOs with index-aware lookups, paging, upsert and selective updates
//! - shared helper modules (pagination, sorting, JSON)
//!
//! # Usage in build.rs
//!
//! ```rust,ignore
//! fn main() {
//!     modelgen::CodegenBuilder::statement_mode("schema.sql")
//!         .all_tables()
//!         .output_path("src/generated")
//!         .generate()
//!         .expect("Failed to generate models");
//!
//!     println!("cargo:rerun-if-changed=schema.sql");
//! }
//! ```
//!
//! Mount the generated directories in your crate root:
//!
//! ```rust,ignore
//! mod generated {
//!     pub mod entity;
//!     pub mod dto;
//!     pub mod dao;
//!     pub mod helper;
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! modelgen --sql schema.sql --output ./src/generated generate
//! modelgen --config modelgen.toml inspect
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use codegen::{ArtifactKind, Generator};
use config::{DatabaseConfig, GenerateMode};
use parser::{DatabaseParser, SchemaParser, StatementParser};
use schema::{Schema, TableFilter};

pub use config::CodegenConfig;
pub use error::{CodegenError, Result};

/// Main entry point: extract schemas, then write every enabled artifact
pub fn generate(config: &CodegenConfig) -> Result<()> {
    config.validate()?;

    let schemas = load_schemas(config)?;
    let written = write_artifacts(config, &schemas)?;

    info!("Code generation complete ({} files)", written.len());
    Ok(())
}

/// Extract the schemas selected by `config` from its configured source
pub fn load_schemas(config: &CodegenConfig) -> Result<Vec<Schema>> {
    let filter = TableFilter::new(config.all_tables, config.table_names.clone());

    let schemas = match config.mode {
        GenerateMode::Statement => {
            info!("Parsing SQL file: {}", config.sql_file.display());
            let parser = StatementParser::from_file(&config.sql_file)?.with_filter(filter);
            let schemas = parser.parse_statements()?;
            info!("Found {} tables", schemas.len());
            parser.filter_tables(schemas)
        }
        GenerateMode::Database => introspect(&config.database, filter)?,
    };

    debug!(
        "After filtering: {} tables (all_tables={}, table_names={:?})",
        schemas.len(),
        config.all_tables,
        config.table_names
    );
    Ok(schemas)
}

/// Run the catalog introspection on a current-thread runtime
fn introspect(database: &DatabaseConfig, filter: TableFilter) -> Result<Vec<Schema>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CodegenError::Connection(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        let mut parser = DatabaseParser::connect(database).await?.with_filter(filter);
        let parsed = parser.parse().await;
        let schemas = parsed.map(|schemas| {
            info!("Found {} tables", schemas.len());
            parser.filter_tables(schemas)
        });

        if let Err(e) = parser.into_source().disconnect().await {
            warn!("Failed to close catalog connection: {}", e);
        }
        schemas
    })
}

/// Render every enabled artifact kind for `schemas`, then a `mod.rs` per
/// output directory. Returns the paths written (or, on a dry run, that
/// would have been written).
pub fn write_artifacts(config: &CodegenConfig, schemas: &[Schema]) -> Result<Vec<PathBuf>> {
    if schemas.is_empty() {
        warn!("No tables selected, only helpers and module indexes will be written");
    }

    let generator = Generator::new(config);
    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    let kinds = [
        (config.generate_entity, ArtifactKind::Entity),
        (config.generate_dto, ArtifactKind::TransferObject),
        (config.generate_dao, ArtifactKind::DataAccessObject),
    ];

    for (enabled, kind) in kinds {
        if !enabled {
            continue;
        }
        let dir = generator.artifact_dir(kind);
        info!("Generating {} files in {}", kind, dir.display());

        let files = if config.models_all_in_one_file {
            vec![generator.generate_all(kind, schemas, &config.models_file_name)?]
        } else {
            generator.generate_one_by_one(kind, schemas)?
        };
        by_dir.entry(dir).or_default().extend(files);
    }

    if config.generate_helpers {
        let dir = config.package_dir(&config.packages.helper);
        info!("Generating helpers in {}", dir.display());
        let files = generator.generate_helpers()?;
        by_dir.entry(dir).or_default().extend(files);
    }

    let mut written = Vec::new();
    for (dir, files) in by_dir {
        written.push(generator.generate_module_index(&dir, &files)?);
        written.extend(files);
    }

    Ok(written)
}

/// Builder pattern for easy configuration in build.rs
pub struct CodegenBuilder {
    config: CodegenConfig,
}

impl CodegenBuilder {
    /// Read schemas from a SQL script of `CREATE TABLE` statements
    pub fn statement_mode(sql_file: impl AsRef<Path>) -> Self {
        Self {
            config: CodegenConfig::default_with_sql_file(sql_file.as_ref().to_path_buf()),
        }
    }

    /// Read schemas from a live MySQL database
    pub fn database_mode(database: DatabaseConfig) -> Self {
        Self {
            config: CodegenConfig {
                mode: GenerateMode::Database,
                database,
                ..Default::default()
            },
        }
    }

    /// Generate only the named tables
    pub fn tables(mut self, tables: &[&str]) -> Self {
        self.config.all_tables = false;
        self.config.table_names = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Generate every table found
    pub fn all_tables(mut self) -> Self {
        self.config.all_tables = true;
        self
    }

    /// Set the root directory of the generated files
    pub fn output_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_path = dir.as_ref().to_path_buf();
        self
    }

    /// Set the Rust module path the output root is mounted at
    pub fn module_root(mut self, module_root: &str) -> Self {
        self.config.module_root = module_root.to_string();
        self
    }

    /// Write every table of an artifact kind into one file
    pub fn models_all_in_one_file(mut self, file_name: &str) -> Self {
        self.config.models_all_in_one_file = true;
        self.config.models_file_name = file_name.to_string();
        self
    }

    /// Use templates from a directory, falling back to the built-in ones
    pub fn template_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.template_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Generate only entities
    pub fn entities_only(mut self) -> Self {
        self.config.generate_dto = false;
        self.config.generate_dao = false;
        self.config.generate_helpers = false;
        self
    }

    /// Skip the helper modules
    pub fn without_helpers(mut self) -> Self {
        self.config.generate_helpers = false;
        self
    }

    /// Enable dry run mode (render without writing files)
    pub fn dry_run(mut self) -> Self {
        self.config.dry_run = true;
        self
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Generate the code
    pub fn generate(self) -> Result<()> {
        generate(&self.config)
    }
}
