//! Per-table facts the DAO templates iterate over: which key lookups to
//! generate and the SQL fragments they share

use serde::Serialize;

use super::naming::{key_method_suffix, to_variant_name};
use crate::schema::{Column, Index, Schema};

/// Where a key lookup comes from, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Primary,
    Unique,
    Index,
}

/// One `find_by_*` lookup over an ordered column list
#[derive(Debug, Clone, Serialize)]
pub struct KeyLookup {
    pub kind: KeyKind,
    pub unique: bool,
    /// Key columns in index order
    pub columns: Vec<Column>,
    /// Method name suffix, e.g. `user_id_and_device_type`
    pub suffix: String,
    /// `WHERE` condition with one placeholder per key column
    pub where_sql: String,
    /// Columns a full update through this key overwrites
    pub set_columns: Vec<Column>,
    /// `SET` assignments for `set_columns`
    pub set_sql: String,
}

/// One `ORDER BY` column of the generated `SortBy` enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    /// Enum variant, unique within the table
    pub variant: String,
    pub column: String,
}

/// Everything the DAO template needs about one table beyond the schema itself
#[derive(Debug, Clone, Serialize)]
pub struct TablePlan {
    pub select_sql: String,
    /// Columns written by an insert (auto-increment columns excluded)
    pub insert_columns: Vec<Column>,
    pub insert_sql: String,
    /// Columns an upsert overwrites on a key collision
    pub upsert_columns: Vec<Column>,
    /// `ON DUPLICATE KEY UPDATE` assignments, empty when upsert makes no sense
    pub upsert_sql: String,
    pub lookups: Vec<KeyLookup>,
    /// Columns that head a single-column key, for `IN (...)` lookups
    pub list_columns: Vec<Column>,
    /// Columns a selective update may change
    pub patch_columns: Vec<Column>,
    pub sort_keys: Vec<SortKey>,
}

impl TablePlan {
    pub fn new(schema: &Schema) -> Self {
        let insert_columns: Vec<Column> = schema
            .columns
            .iter()
            .filter(|c| !c.auto_increment)
            .cloned()
            .collect();

        let insert_sql = format!(
            "INSERT INTO `{}` ({}) VALUES ({})",
            schema.name,
            quoted_list(&insert_columns),
            vec!["?"; insert_columns.len()].join(", ")
        );

        let has_unique_key = schema.primary_key.is_some() || !schema.unique_indexes.is_empty();
        let upsert_columns: Vec<Column> = if has_unique_key {
            insert_columns
                .iter()
                .filter(|c| !c.is_primary_key)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let upsert_sql = upsert_columns
            .iter()
            .map(|c| format!("`{name}` = VALUES(`{name}`)", name = c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let lookups = collect_lookups(schema);

        let mut list_columns: Vec<Column> = Vec::new();
        for index in schema.all_indexes() {
            if let [only] = index.columns.as_slice() {
                if let Some(column) = schema.column(only) {
                    if !list_columns.iter().any(|c| c.name == column.name) {
                        list_columns.push(column.clone());
                    }
                }
            }
        }

        let patch_columns = schema
            .columns
            .iter()
            .filter(|c| !c.auto_increment && !c.is_primary_key)
            .cloned()
            .collect();

        Self {
            select_sql: format!(
                "SELECT {} FROM `{}`",
                quoted_list(&schema.columns),
                schema.name
            ),
            insert_columns,
            insert_sql,
            upsert_columns,
            upsert_sql,
            lookups,
            list_columns,
            patch_columns,
            sort_keys: sort_keys(schema),
        }
    }
}

/// One variant per column; colliding names get a numeric suffix
fn sort_keys(schema: &Schema) -> Vec<SortKey> {
    let mut keys: Vec<SortKey> = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        let base = to_variant_name(&column.name);
        let mut variant = base.clone();
        let mut n = 2;
        while keys.iter().any(|k| k.variant == variant) {
            variant = format!("{}{}", base, n);
            n += 1;
        }
        keys.push(SortKey {
            variant,
            column: column.name.clone(),
        });
    }
    keys
}

/// Lookups keyed by column list. When the same columns form several keys the
/// highest-priority one wins (primary, then unique, then secondary).
fn collect_lookups(schema: &Schema) -> Vec<KeyLookup> {
    let mut lookups: Vec<KeyLookup> = Vec::new();

    let keyed = schema
        .primary_key
        .iter()
        .map(|idx| (KeyKind::Primary, idx))
        .chain(schema.unique_indexes.iter().map(|idx| (KeyKind::Unique, idx)))
        .chain(schema.indexes.iter().map(|idx| (KeyKind::Index, idx)));

    for (kind, index) in keyed {
        if index.columns.is_empty()
            || lookups
                .iter()
                .any(|l| l.columns.iter().map(|c| &c.name).eq(index.columns.iter()))
        {
            continue;
        }
        lookups.push(key_lookup(schema, kind, index));
    }

    lookups
}

fn key_lookup(schema: &Schema, kind: KeyKind, index: &Index) -> KeyLookup {
    let columns: Vec<Column> = schema.index_columns(index).into_iter().cloned().collect();

    let where_sql = columns
        .iter()
        .map(|c| {
            // null-safe comparison so a NULL key part still matches
            if c.nullable {
                format!("`{}` <=> ?", c.name)
            } else {
                format!("`{}` = ?", c.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    let set_columns: Vec<Column> = schema
        .columns
        .iter()
        .filter(|c| !c.auto_increment && !c.is_primary_key && !index.columns.contains(&c.name))
        .cloned()
        .collect();

    let set_sql = set_columns
        .iter()
        .map(|c| format!("`{}` = ?", c.name))
        .collect::<Vec<_>>()
        .join(", ");

    KeyLookup {
        kind,
        unique: kind != KeyKind::Index,
        suffix: key_method_suffix(&index.columns),
        columns,
        where_sql,
        set_columns,
        set_sql,
    }
}

fn quoted_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("`{}`", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}
