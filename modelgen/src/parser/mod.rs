//! Schema extraction from a live MySQL catalog or from `CREATE TABLE` scripts
//!
//! Both parsers produce the same [`Schema`] shape: columns in declaration
//! order, indexes with their column order preserved, and key flags derived
//! from index membership.

mod database;
mod statement;

pub use database::*;
pub use statement::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::{Schema, TableFilter};

/// A source of table schemas
#[async_trait]
pub trait SchemaParser: Send {
    /// Extract every table visible to this parser.
    ///
    /// Either all schemas are returned or an error is; a partially built
    /// schema is never surfaced.
    async fn parse(&mut self) -> Result<Vec<Schema>>;

    /// The table selection policy configured for this parser
    fn table_filter(&self) -> &TableFilter;

    /// Apply the configured table selection
    fn filter_tables(&self, schemas: Vec<Schema>) -> Vec<Schema> {
        self.table_filter().apply(schemas)
    }
}

/// Normalize a column default: a single-quoted literal is unquoted, so `''`
/// becomes the empty string. An absent default never reaches this function.
pub(crate) fn normalize_default(text: &str) -> Option<String> {
    match text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => Some(inner.replace("''", "'")),
        None => Some(text.to_string()),
    }
}
