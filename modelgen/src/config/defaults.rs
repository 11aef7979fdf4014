//! Default configuration values - single source of truth

/// Default generation mode
pub const MODE: &str = "statement";

/// Default database host
pub const DB_HOST: &str = "127.0.0.1";

/// Default database port
pub const DB_PORT: u16 = 3306;

/// Default connection URL template, placeholders are filled from the database section
pub const URL_TEMPLATE: &str = "mysql://{username}:{password}@{host}:{port}/{database}";

/// Whether to generate code for every table by default
pub const ALL_TABLES: bool = false;

/// Default output root directory
pub const OUTPUT_PATH: &str = "./src/generated";

/// Default Rust module path of the output root
pub const MODULE_ROOT: &str = "crate::generated";

/// Default sub-path for entity structs
pub const ENTITY_PACKAGE: &str = "entity";

/// Default sub-path for query DTOs
pub const DTO_PACKAGE: &str = "dto";

/// Default sub-path for DAOs
pub const DAO_PACKAGE: &str = "dao";

/// Default sub-path for helper code
pub const HELPER_PACKAGE: &str = "helper";

/// Whether to write all models into one file by default
pub const MODELS_ALL_IN_ONE_FILE: bool = false;

/// Default file name when all models share one file
pub const MODELS_FILE_NAME: &str = "models.rs";

/// Whether to generate entity files by default
pub const GENERATE_ENTITY: bool = true;

/// Whether to generate DTO files by default
pub const GENERATE_DTO: bool = true;

/// Whether to generate DAO files by default
pub const GENERATE_DAO: bool = true;

/// Whether to generate helper files by default
pub const GENERATE_HELPERS: bool = true;

/// Whether to run in dry-run mode by default
pub const DRY_RUN: bool = false;
