//! Error types for modelgen

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for modelgen operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Errors that can occur while extracting schemas or generating code
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Catalog query `{query}` failed for table `{table}`: {source}")]
    CatalogQuery {
        table: String,
        query: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("SQL syntax error in statement #{index} `{statement}`: {message}")]
    SqlSyntax {
        index: usize,
        statement: String,
        message: String,
    },

    #[error("Statement #{index} is not a CREATE TABLE statement: `{statement}`")]
    UnsupportedStatement { index: usize, statement: String },

    #[error("Template `{name}` failed: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CodegenError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn template(name: impl Into<String>, source: minijinja::Error) -> Self {
        CodegenError::Template {
            name: name.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for CodegenError {
    fn from(err: config::ConfigError) -> Self {
        CodegenError::ConfigError(err.to_string())
    }
}
