//! Schema extraction from `CREATE TABLE` scripts using sqlparser-rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlparser::ast::{
    ColumnDef, ColumnOption, CommentDef, CreateTable, CreateTableOptions, Expr, Ident,
    IndexColumn, IndexConstraint, ObjectName, PrimaryKeyConstraint, SqlOption, Statement,
    TableConstraint, UniqueConstraint, Value,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::{normalize_default, SchemaParser};
use crate::error::{CodegenError, Result};
use crate::schema::{Column, Index, Schema, TableFilter};

/// Builds schemas from semicolon-separated `CREATE TABLE` statements
#[derive(Debug, Clone)]
pub struct StatementParser {
    sql: String,
    filter: TableFilter,
}

impl StatementParser {
    /// Parse statements from an in-memory script
    pub fn from_sql(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            filter: TableFilter::all(),
        }
    }

    /// Parse statements from a script on disk (`~` expands to the home directory)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let sql = std::fs::read_to_string(&path).map_err(|e| CodegenError::io(&path, e))?;
        Ok(Self::from_sql(sql))
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Parse every statement, failing on the first bad one
    pub fn parse_statements(&self) -> Result<Vec<Schema>> {
        parse_sql(&self.sql)
    }
}

#[async_trait]
impl SchemaParser for StatementParser {
    async fn parse(&mut self) -> Result<Vec<Schema>> {
        self.parse_statements()
    }

    fn table_filter(&self) -> &TableFilter {
        &self.filter
    }
}

/// Parse a SQL script into schemas, one per `CREATE TABLE` statement
pub fn parse_sql(sql: &str) -> Result<Vec<Schema>> {
    let dialect = MySqlDialect {};
    let mut schemas = Vec::new();

    for (position, text) in split_statements(sql).into_iter().enumerate() {
        let index = position + 1;
        let statements =
            Parser::parse_sql(&dialect, &text).map_err(|e| CodegenError::SqlSyntax {
                index,
                statement: text.clone(),
                message: e.to_string(),
            })?;

        for statement in statements {
            match statement {
                Statement::CreateTable(create) => {
                    let schema = build_schema(&create)?;
                    debug!(
                        "Parsed table {} ({} columns)",
                        schema.name,
                        schema.columns.len()
                    );
                    schemas.push(schema);
                }
                _ => {
                    return Err(CodegenError::UnsupportedStatement {
                        index,
                        statement: text,
                    })
                }
            }
        }
    }

    Ok(schemas)
}

/// Split a script on `;`, ignoring separators inside quotes and comments.
/// Blank statements are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                current.push(c);
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == '\\' && c != '`' {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                    } else if inner == c {
                        // a doubled quote is an escaped quote
                        if chars.peek() == Some(&c) {
                            if let Some(doubled) = chars.next() {
                                current.push(doubled);
                            }
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                skip_line(&mut chars);
                current.push('\n');
            }
            '#' => {
                skip_line(&mut chars);
                current.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                current.push(' ');
            }
            ';' => {
                push_statement(&mut statements, &mut current);
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        statements.push(text.to_string());
    }
    current.clear();
}

/// Build the schema of one CREATE TABLE statement
fn build_schema(create: &CreateTable) -> Result<Schema> {
    let mut schema = Schema::new(extract_object_name(&create.name));
    schema.comment = table_comment(create);

    let mut primary_key = None;
    let mut unique_indexes = Vec::new();
    let mut indexes = Vec::new();

    for col_def in &create.columns {
        let (column, inline_primary, inline_unique) = extract_column(col_def);

        if inline_primary {
            primary_key = Some(Index::primary(vec![column.name.clone()]));
        }
        // MySQL names an inline unique index after its column
        if inline_unique {
            unique_indexes.push(Index::new(column.name.clone(), vec![column.name.clone()]));
        }

        schema.columns.push(column);
    }

    for constraint in &create.constraints {
        match constraint {
            TableConstraint::PrimaryKey(PrimaryKeyConstraint { columns, .. }) => {
                primary_key = Some(Index::primary(index_column_names(columns)));
            }
            TableConstraint::Unique(UniqueConstraint {
                columns,
                name,
                index_name,
                ..
            }) => {
                let columns = index_column_names(columns);
                let name = index_name
                    .as_ref()
                    .or(name.as_ref())
                    .map(extract_ident)
                    .unwrap_or_else(|| synthesize_index_name("uk_", &columns));
                unique_indexes.push(Index::new(name, columns));
            }
            TableConstraint::Index(IndexConstraint { columns, name, .. }) => {
                let columns = index_column_names(columns);
                let name = name
                    .as_ref()
                    .map(extract_ident)
                    .unwrap_or_else(|| synthesize_index_name("idx_", &columns));
                indexes.push(Index::new(name, columns));
            }
            _ => {}
        }
    }

    // Primary key columns can never hold NULL
    if let Some(pk) = &primary_key {
        for column in schema.columns.iter_mut() {
            if pk.columns.contains(&column.name) {
                column.nullable = false;
            }
        }
    }

    schema.primary_key = primary_key;
    schema.unique_indexes = unique_indexes;
    schema.indexes = indexes;

    let undeclared = schema.undeclared_index_columns();
    if let Some(name) = undeclared.first() {
        return Err(CodegenError::ValidationError(format!(
            "Index on table `{}` references undeclared column `{}`",
            schema.name, name
        )));
    }

    schema.backfill_key_flags();
    Ok(schema)
}

/// Extract a column and whether it declares an inline PRIMARY KEY / UNIQUE
fn extract_column(col_def: &ColumnDef) -> (Column, bool, bool) {
    let mut column = Column::new(extract_ident(&col_def.name), col_def.data_type.to_string());

    let mut inline_primary = false;
    let mut inline_unique = false;

    for option in &col_def.options {
        match &option.option {
            ColumnOption::NotNull => {
                column.nullable = false;
            }
            ColumnOption::Null => {
                column.nullable = true;
            }
            ColumnOption::Default(expr) => {
                column.default = default_value(expr);
            }
            ColumnOption::PrimaryKey(_) => {
                inline_primary = true;
                column.nullable = false;
            }
            ColumnOption::Unique(_) => {
                inline_unique = true;
            }
            ColumnOption::Comment(c) => {
                column.comment = c.clone();
            }
            ColumnOption::Collation(name) => {
                column.collation = extract_object_name(name);
            }
            ColumnOption::DialectSpecific(tokens) => {
                let token_str = tokens
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_uppercase();
                if token_str.contains("AUTO_INCREMENT") {
                    column.auto_increment = true;
                }
            }
            _ => {}
        }
    }

    (column, inline_primary, inline_unique)
}

/// Default value as stored in the model: `DEFAULT NULL` as no default,
/// function calls by name, literals through [`normalize_default`]
fn default_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Value(v) if v.value == Value::Null => None,
        Expr::Function(func) => Some(func.name.to_string()),
        other => normalize_default(&other.to_string()),
    }
}

/// Table-level `COMMENT [=] '...'`, empty when absent
fn table_comment(create: &CreateTable) -> String {
    let options: &[SqlOption] = match &create.table_options {
        CreateTableOptions::Plain(options)
        | CreateTableOptions::With(options)
        | CreateTableOptions::Options(options)
        | CreateTableOptions::TableProperties(options) => options,
        CreateTableOptions::None => &[],
    };

    options
        .iter()
        .find_map(|option| match option {
            SqlOption::Comment(comment) => Some(comment_text(comment)),
            _ => None,
        })
        .or_else(|| create.comment.as_ref().map(comment_text))
        .unwrap_or_default()
}

fn comment_text(comment: &CommentDef) -> String {
    match comment {
        CommentDef::WithEq(text) | CommentDef::WithoutEq(text) => text.clone(),
    }
}

/// `uk_` / `idx_` followed by the column names in declared order
fn synthesize_index_name(prefix: &str, columns: &[String]) -> String {
    format!("{}{}", prefix, columns.join("_"))
}

/// Last part of a possibly qualified name, unquoted
fn extract_object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .and_then(|part| part.as_ident())
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

fn extract_ident(ident: &Ident) -> String {
    ident.value.clone()
}

fn index_column_names(columns: &[IndexColumn]) -> Vec<String> {
    columns.iter().map(extract_ident_from_index_column).collect()
}

fn extract_ident_from_index_column(ic: &IndexColumn) -> String {
    match &ic.column.expr {
        Expr::Identifier(ident) => ident.value.clone(),
        other => format!("{}", other),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
