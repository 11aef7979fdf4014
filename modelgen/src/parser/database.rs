//! Schema extraction from a live MySQL catalog

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts};
use tracing::{debug, info, warn};

use super::{normalize_default, SchemaParser};
use crate::config::DatabaseConfig;
use crate::error::{CodegenError, Result};
use crate::schema::{Column, Index, Schema, TableFilter, PRIMARY};

/// Error raised by a catalog source
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// A row of the table catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: String,
    pub comment: String,
}

/// A row of the column catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub name: String,
    /// Full column type, e.g. `bigint(20) unsigned`
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Extra attributes, `auto_increment` among them
    pub extra: String,
    pub collation: Option<String>,
    pub comment: String,
}

/// A row of the index catalog: one column of one index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub index_name: String,
    /// `None` for functional key parts
    pub column_name: Option<String>,
    /// 1-based position of the column in the index
    pub seq_in_index: u32,
    pub non_unique: bool,
}

/// Read-only access to a database catalog.
///
/// Rows come back in a deterministic order: tables by name, columns by
/// ordinal position, index rows by index name then sequence.
#[async_trait]
pub trait CatalogSource: Send {
    async fn tables(&mut self) -> std::result::Result<Vec<TableRow>, SourceError>;

    async fn columns(&mut self, table: &str) -> std::result::Result<Vec<ColumnRow>, SourceError>;

    async fn index_entries(
        &mut self,
        table: &str,
    ) -> std::result::Result<Vec<IndexRow>, SourceError>;
}

const TABLES_SQL: &str = "SELECT TABLE_NAME, TABLE_COMMENT \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA, \
     COLLATION_NAME, COLUMN_COMMENT \
     FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const INDEXES_SQL: &str = "SELECT INDEX_NAME, COLUMN_NAME, SEQ_IN_INDEX, NON_UNIQUE \
     FROM information_schema.STATISTICS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
     ORDER BY INDEX_NAME, SEQ_IN_INDEX";

type RawColumnRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
);

/// MySQL catalog over a single connection, queried through `information_schema`
pub struct MySqlCatalog {
    conn: Conn,
    database: String,
}

impl MySqlCatalog {
    /// Open one connection to the server
    pub async fn connect(url: &str, database: impl Into<String>) -> Result<Self> {
        let opts = Opts::from_url(url).map_err(|e| CodegenError::Connection(e.to_string()))?;
        let conn = Conn::new(opts)
            .await
            .map_err(|e| CodegenError::Connection(e.to_string()))?;
        Ok(Self {
            conn,
            database: database.into(),
        })
    }

    /// Close the connection
    pub async fn disconnect(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| CodegenError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for MySqlCatalog {
    async fn tables(&mut self) -> std::result::Result<Vec<TableRow>, SourceError> {
        let rows: Vec<(String, Option<String>)> = self
            .conn
            .exec(TABLES_SQL, (self.database.clone(),))
            .await?;
        Ok(rows
            .into_iter()
            .map(|(name, comment)| TableRow {
                name,
                comment: comment.unwrap_or_default(),
            })
            .collect())
    }

    async fn columns(&mut self, table: &str) -> std::result::Result<Vec<ColumnRow>, SourceError> {
        let rows: Vec<RawColumnRow> = self
            .conn
            .exec(COLUMNS_SQL, (self.database.clone(), table.to_string()))
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(name, column_type, is_nullable, default, extra, collation, comment)| ColumnRow {
                    name,
                    column_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default,
                    extra,
                    collation,
                    comment,
                },
            )
            .collect())
    }

    async fn index_entries(
        &mut self,
        table: &str,
    ) -> std::result::Result<Vec<IndexRow>, SourceError> {
        let rows: Vec<(String, Option<String>, u32, i64)> = self
            .conn
            .exec(INDEXES_SQL, (self.database.clone(), table.to_string()))
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(index_name, column_name, seq_in_index, non_unique)| IndexRow {
                    index_name,
                    column_name,
                    seq_in_index,
                    non_unique: non_unique != 0,
                },
            )
            .collect())
    }
}

/// Builds schemas from a database catalog
pub struct DatabaseParser<C> {
    source: C,
    filter: TableFilter,
}

impl DatabaseParser<MySqlCatalog> {
    /// Connect to the configured MySQL database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            "Connecting to {}:{}/{}",
            config.host, config.port, config.database_name
        );
        let catalog = MySqlCatalog::connect(&config.url(), &config.database_name).await?;
        Ok(Self::new(catalog))
    }
}

impl<C: CatalogSource> DatabaseParser<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            filter: TableFilter::all(),
        }
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Give back the catalog source, e.g. to disconnect it
    pub fn into_source(self) -> C {
        self.source
    }

    async fn parse_table(&mut self, table: TableRow) -> Result<Schema> {
        let column_rows =
            self.source
                .columns(&table.name)
                .await
                .map_err(|source| CodegenError::CatalogQuery {
                    table: table.name.clone(),
                    query: "columns",
                    source,
                })?;
        let index_rows = self
            .source
            .index_entries(&table.name)
            .await
            .map_err(|source| CodegenError::CatalogQuery {
                table: table.name.clone(),
                query: "indexes",
                source,
            })?;

        let mut schema = Schema::new(table.name);
        schema.comment = table.comment;
        schema.columns = column_rows.into_iter().map(build_column).collect();
        assign_indexes(&mut schema, index_rows);
        schema.backfill_key_flags();

        debug!(
            "Introspected table {} ({} columns, {} unique, {} secondary)",
            schema.name,
            schema.columns.len(),
            schema.unique_indexes.len(),
            schema.indexes.len()
        );
        Ok(schema)
    }
}

#[async_trait]
impl<C: CatalogSource> SchemaParser for DatabaseParser<C> {
    async fn parse(&mut self) -> Result<Vec<Schema>> {
        let tables = self
            .source
            .tables()
            .await
            .map_err(|source| CodegenError::CatalogQuery {
                table: "*".into(),
                query: "tables",
                source,
            })?;
        info!("Found {} tables in catalog", tables.len());

        let mut schemas = Vec::with_capacity(tables.len());
        for table in tables {
            schemas.push(self.parse_table(table).await?);
        }
        Ok(schemas)
    }

    fn table_filter(&self) -> &TableFilter {
        &self.filter
    }
}

fn build_column(row: ColumnRow) -> Column {
    let mut column = Column::new(row.name, row.column_type);
    column.nullable = row.nullable;
    column.default = row.default.as_deref().and_then(normalize_default);
    column.auto_increment = row.extra.to_lowercase().contains("auto_increment");
    column.collation = row.collation.unwrap_or_default();
    column.comment = row.comment;
    column
}

/// Group index rows by index name (first-seen order), order each group by
/// sequence and classify it as primary, unique or secondary
fn assign_indexes(schema: &mut Schema, rows: Vec<IndexRow>) {
    let mut groups: Vec<(String, bool, Vec<(u32, String)>)> = Vec::new();

    for row in rows {
        let Some(column) = row.column_name else {
            warn!(
                "Skipping functional key part of index {} on {}",
                row.index_name, schema.name
            );
            continue;
        };
        if schema.column(&column).is_none() {
            warn!(
                "Index {} on {} references unknown column {}",
                row.index_name, schema.name, column
            );
            continue;
        }

        match groups.iter().position(|(name, _, _)| *name == row.index_name) {
            Some(pos) => {
                let (_, unique, members) = &mut groups[pos];
                *unique |= !row.non_unique;
                members.push((row.seq_in_index, column));
            }
            None => groups.push((
                row.index_name,
                !row.non_unique,
                vec![(row.seq_in_index, column)],
            )),
        }
    }

    for (name, unique, mut members) in groups {
        members.sort_by_key(|(seq, _)| *seq);
        let index = Index::new(name, members.into_iter().map(|(_, c)| c).collect());

        if index.name == PRIMARY {
            schema.primary_key = Some(index);
        } else if unique {
            schema.unique_indexes.push(index);
        } else {
            schema.indexes.push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned catalog rows, optionally failing one query
    #[derive(Default)]
    struct StubCatalog {
        tables: Vec<TableRow>,
        columns: Vec<(String, Vec<ColumnRow>)>,
        indexes: Vec<(String, Vec<IndexRow>)>,
        fail_columns_of: Option<String>,
    }

    #[async_trait]
    impl CatalogSource for StubCatalog {
        async fn tables(&mut self) -> std::result::Result<Vec<TableRow>, SourceError> {
            Ok(self.tables.clone())
        }

        async fn columns(
            &mut self,
            table: &str,
        ) -> std::result::Result<Vec<ColumnRow>, SourceError> {
            if self.fail_columns_of.as_deref() == Some(table) {
                return Err("Lost connection to MySQL server during query".into());
            }
            Ok(self
                .columns
                .iter()
                .find(|(t, _)| t == table)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default())
        }

        async fn index_entries(
            &mut self,
            table: &str,
        ) -> std::result::Result<Vec<IndexRow>, SourceError> {
            Ok(self
                .indexes
                .iter()
                .find(|(t, _)| t == table)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default())
        }
    }

    fn column(name: &str, column_type: &str, nullable: bool) -> ColumnRow {
        ColumnRow {
            name: name.into(),
            column_type: column_type.into(),
            nullable,
            default: None,
            extra: String::new(),
            collation: None,
            comment: String::new(),
        }
    }

    fn index_row(index: &str, column: &str, seq: u32, non_unique: bool) -> IndexRow {
        IndexRow {
            index_name: index.into(),
            column_name: Some(column.into()),
            seq_in_index: seq,
            non_unique,
        }
    }

    fn session_catalog() -> StubCatalog {
        let mut id = column("id", "bigint unsigned", false);
        id.extra = "auto_increment".into();
        let mut name = column("name", "varchar(255)", false);
        name.default = Some(String::new());
        name.collation = Some("utf8mb4_bin".into());
        let mut created = column("created_at", "datetime", false);
        created.default = Some("CURRENT_TIMESTAMP".into());
        created.extra = "DEFAULT_GENERATED".into();

        StubCatalog {
            tables: vec![TableRow {
                name: "t_session".into(),
                comment: "sessions".into(),
            }],
            columns: vec![(
                "t_session".into(),
                vec![
                    id,
                    column("session_id", "varchar(64)", false),
                    column("version", "int", false),
                    name,
                    created,
                    column("note", "text", true),
                ],
            )],
            indexes: vec![(
                "t_session".into(),
                vec![
                    index_row("PRIMARY", "id", 1, false),
                    // sequence out of order on purpose
                    index_row("uk_session_version", "version", 2, false),
                    index_row("uk_session_version", "session_id", 1, false),
                    index_row("idx_name_created", "created_at", 2, true),
                    index_row("idx_name_created", "name", 1, true),
                    IndexRow {
                        index_name: "idx_expr".into(),
                        column_name: None,
                        seq_in_index: 1,
                        non_unique: true,
                    },
                ],
            )],
            fail_columns_of: None,
        }
    }

    #[test]
    fn test_catalog_null_string_default_is_kept() {
        // the catalog reports a missing default as SQL NULL, never as the text `NULL`
        let mut marker = column("marker", "varchar(8)", true);
        marker.default = Some("NULL".into());
        assert_eq!(build_column(marker).default.as_deref(), Some("NULL"));
        assert_eq!(build_column(column("note", "text", true)).default, None);
    }

    #[tokio::test]
    async fn test_parse_builds_columns_in_catalog_order() {
        let mut parser = DatabaseParser::new(session_catalog());
        let schemas = parser.parse().await.unwrap();
        assert_eq!(schemas.len(), 1);

        let table = &schemas[0];
        assert_eq!(table.name, "t_session");
        assert_eq!(table.comment, "sessions");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "session_id", "version", "name", "created_at", "note"]
        );

        let id = table.column("id").unwrap();
        assert!(id.auto_increment);
        assert!(!id.nullable);

        let name = table.column("name").unwrap();
        assert_eq!(name.default.as_deref(), Some(""));
        assert_eq!(name.collation, "utf8mb4_bin");

        let created = table.column("created_at").unwrap();
        assert_eq!(created.default.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert!(!created.auto_increment);

        assert_eq!(table.column("note").unwrap().default, None);
    }

    #[tokio::test]
    async fn test_parse_groups_and_orders_indexes() {
        let mut parser = DatabaseParser::new(session_catalog());
        let table = parser.parse().await.unwrap().remove(0);

        assert_eq!(table.primary_key, Some(Index::primary(vec!["id".into()])));
        assert_eq!(
            table.unique_indexes,
            vec![Index::new(
                "uk_session_version",
                vec!["session_id".into(), "version".into()]
            )]
        );
        assert_eq!(
            table.indexes,
            vec![Index::new(
                "idx_name_created",
                vec!["name".into(), "created_at".into()]
            )]
        );
    }

    #[tokio::test]
    async fn test_parse_backfills_classifiers() {
        let mut parser = DatabaseParser::new(session_catalog());
        let table = parser.parse().await.unwrap().remove(0);

        for column in &table.columns {
            if column.is_primary_key {
                assert!(column.is_unique && column.is_indexed);
            }
            if column.is_unique {
                assert!(column.is_indexed);
            }
        }
        assert!(table.column("id").unwrap().is_primary_key);
        assert!(table.column("session_id").unwrap().is_unique);
        assert!(table.column("created_at").unwrap().is_indexed);
        assert!(!table.column("created_at").unwrap().is_unique);
        assert!(!table.column("note").unwrap().is_indexed);
    }

    #[tokio::test]
    async fn test_any_unique_row_makes_index_unique() {
        let mut catalog = session_catalog();
        catalog.indexes[0].1 = vec![
            index_row("uk_mixed", "session_id", 1, true),
            index_row("uk_mixed", "version", 2, false),
        ];
        let mut parser = DatabaseParser::new(catalog);
        let table = parser.parse().await.unwrap().remove(0);
        assert_eq!(table.unique_indexes.len(), 1);
        assert!(table.indexes.is_empty());
        assert!(table.primary_key.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_aborts_with_table_name() {
        let mut catalog = session_catalog();
        catalog.tables.push(TableRow {
            name: "t_broken".into(),
            comment: String::new(),
        });
        catalog.fail_columns_of = Some("t_broken".into());

        let mut parser = DatabaseParser::new(catalog);
        match parser.parse().await {
            Err(CodegenError::CatalogQuery { table, query, .. }) => {
                assert_eq!(table, "t_broken");
                assert_eq!(query, "columns");
            }
            other => panic!("expected catalog query error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_tables() {
        let mut catalog = session_catalog();
        catalog.tables.push(TableRow {
            name: "t_other".into(),
            comment: String::new(),
        });
        let mut parser =
            DatabaseParser::new(catalog).with_filter(TableFilter::named(["t_session"]));
        let schemas = parser.parse().await.unwrap();
        assert_eq!(schemas.len(), 2);
        let schemas = parser.filter_tables(schemas);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "t_session");
    }

    #[tokio::test]
    async fn test_matches_statement_parser() {
        let sql = r#"
            CREATE TABLE t_session (
                id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
                session_id VARCHAR(64) NOT NULL,
                version INT NOT NULL,
                name VARCHAR(255) COLLATE utf8mb4_bin NOT NULL DEFAULT '',
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                note TEXT,
                PRIMARY KEY (id),
                UNIQUE KEY uk_session_version (session_id, version),
                KEY idx_name_created (name, created_at)
            ) COMMENT 'sessions'
        "#;
        let from_ddl = crate::parser::parse_sql(sql).unwrap().remove(0);
        let from_catalog = DatabaseParser::new(session_catalog())
            .parse()
            .await
            .unwrap()
            .remove(0);

        assert_eq!(from_ddl.name, from_catalog.name);
        assert_eq!(from_ddl.comment, from_catalog.comment);
        assert_eq!(from_ddl.primary_key, from_catalog.primary_key);
        assert_eq!(from_ddl.unique_indexes, from_catalog.unique_indexes);
        assert_eq!(from_ddl.indexes, from_catalog.indexes);
        for (a, b) in from_ddl.columns.iter().zip(&from_catalog.columns) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.nullable, b.nullable, "{}", a.name);
            assert_eq!(a.auto_increment, b.auto_increment, "{}", a.name);
            assert_eq!(a.is_primary_key, b.is_primary_key, "{}", a.name);
            assert_eq!(a.is_unique, b.is_unique, "{}", a.name);
            assert_eq!(a.is_indexed, b.is_indexed, "{}", a.name);
        }
        assert_eq!(from_ddl.columns.len(), from_catalog.columns.len());
    }
}
