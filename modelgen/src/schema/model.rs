//! Canonical table model shared by both schema parsers

use serde::{Deserialize, Serialize};

/// Reserved index name of the primary key
pub const PRIMARY: &str = "PRIMARY";

/// One table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Table name
    pub name: String,

    /// Table comment, empty when absent
    pub comment: String,

    /// Columns in declaration order
    pub columns: Vec<Column>,

    /// Primary key (if any), always named [`PRIMARY`]
    pub primary_key: Option<Index>,

    /// Unique indexes other than the primary key
    pub unique_indexes: Vec<Index>,

    /// Non-unique secondary indexes
    pub indexes: Vec<Index>,
}

/// One table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Type as declared, e.g. `bigint(20) unsigned`
    pub raw_type: String,

    pub nullable: bool,

    /// `None` when the column has no default; `Some("")` for an empty-string default.
    /// Function defaults such as `CURRENT_TIMESTAMP` are stored by name.
    pub default: Option<String>,

    pub auto_increment: bool,

    /// Collation name, empty when not declared
    pub collation: String,

    /// Column comment, empty when absent
    pub comment: String,

    /// Member of any index (derived)
    pub is_indexed: bool,

    /// Member of the primary key or a unique index (derived)
    pub is_unique: bool,

    /// Member of the primary key (derived)
    pub is_primary_key: bool,
}

/// A named, ordered group of column names forming a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Primary key over the given columns
    pub fn primary(columns: Vec<String>) -> Self {
        Self::new(PRIMARY, columns)
    }

    /// Check if this index spans more than one column
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

impl Column {
    /// A nullable column with no default, comment, or key flags
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            nullable: true,
            default: None,
            auto_increment: false,
            collation: String::new(),
            comment: String::new(),
            is_indexed: false,
            is_unique: false,
            is_primary_key: false,
        }
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            columns: Vec::new(),
            primary_key: None,
            unique_indexes: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    /// Columns of an index, in index order
    pub fn index_columns(&self, index: &Index) -> Vec<&Column> {
        index
            .columns
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Every index on the table: primary key, then unique, then secondary
    pub fn all_indexes(&self) -> impl Iterator<Item = &Index> {
        self.primary_key
            .iter()
            .chain(self.unique_indexes.iter())
            .chain(self.indexes.iter())
    }

    /// Recompute the derived key flags of every column from index membership.
    ///
    /// Parsers call this once all indexes of the table are known. A primary
    /// key member is also unique and indexed; a unique member is also indexed.
    pub fn backfill_key_flags(&mut self) {
        for column in &mut self.columns {
            column.is_primary_key = false;
            column.is_unique = false;
            column.is_indexed = false;
        }

        let primary: Vec<String> = self
            .primary_key
            .iter()
            .flat_map(|pk| pk.columns.iter().cloned())
            .collect();
        let unique: Vec<String> = self
            .unique_indexes
            .iter()
            .flat_map(|idx| idx.columns.iter().cloned())
            .collect();
        let indexed: Vec<String> = self
            .indexes
            .iter()
            .flat_map(|idx| idx.columns.iter().cloned())
            .collect();

        for column in &mut self.columns {
            if primary.contains(&column.name) {
                column.is_primary_key = true;
                column.is_unique = true;
                column.is_indexed = true;
            }
            if unique.contains(&column.name) {
                column.is_unique = true;
                column.is_indexed = true;
            }
            if indexed.contains(&column.name) {
                column.is_indexed = true;
            }
        }
    }

    /// Index column names that are not declared columns of this table
    pub fn undeclared_index_columns(&self) -> Vec<&str> {
        self.all_indexes()
            .flat_map(|idx| idx.columns.iter())
            .filter(|name| self.column(name).is_none())
            .map(String::as_str)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
