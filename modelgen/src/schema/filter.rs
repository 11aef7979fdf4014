//! Table selection applied to the output of either parser

use tracing::warn;

use super::Schema;

/// Allow-list or include-all table policy
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include_all: bool,
    names: Vec<String>,
}

impl TableFilter {
    pub fn new(include_all: bool, names: Vec<String>) -> Self {
        Self { include_all, names }
    }

    /// Keep every table
    pub fn all() -> Self {
        Self::new(true, Vec::new())
    }

    /// Keep only the named tables
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(false, names.into_iter().map(Into::into).collect())
    }

    /// Select the schemas to generate code for, preserving their relative order
    pub fn apply(&self, schemas: Vec<Schema>) -> Vec<Schema> {
        if self.include_all {
            return schemas;
        }

        for name in &self.names {
            if !schemas.iter().any(|s| &s.name == name) {
                warn!("Table `{}` was requested but not found", name);
            }
        }

        schemas
            .into_iter()
            .filter(|s| self.names.contains(&s.name))
            .collect()
    }
}
