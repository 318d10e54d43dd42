use crate::{AsValue, Error, ErrorContext, Result, RowLabeled};
use indexmap::IndexMap;

/// One row per (table, column, constraint) of the schema bound to `$1`.
pub const TABLE_DESCRIPTION_QUERY: &str = r#"SELECT
    t.table_catalog::text AS table_catalog,
    t.table_schema::text AS table_schema,
    t.table_name::text AS table_name,
    t.table_type::text AS table_type,
    t.is_insertable_into::text AS is_insertable_into,
    c.column_name::text AS column_name,
    c.ordinal_position::int AS ordinal_position,
    c.column_default::text AS column_default,
    c.is_nullable::text AS is_nullable,
    c.data_type::text AS data_type,
    c.character_maximum_length::int AS character_maximum_length,
    c.character_octet_length::int AS character_octet_length,
    c.numeric_precision::int AS numeric_precision,
    c.numeric_precision_radix::int AS numeric_precision_radix,
    c.numeric_scale::int AS numeric_scale,
    c.datetime_precision::int AS datetime_precision,
    c.is_updatable::text AS is_updatable,
    tc.constraint_type::text AS constraint_type,
    tc.constraint_name::text AS constraint_name
FROM information_schema.tables t
JOIN information_schema.columns c
    ON t.table_catalog = c.table_catalog
    AND t.table_schema = c.table_schema
    AND t.table_name = c.table_name
LEFT JOIN information_schema.key_column_usage kcu
    ON c.table_catalog = kcu.table_catalog
    AND c.table_schema = kcu.table_schema
    AND c.table_name = kcu.table_name
    AND c.column_name = kcu.column_name
LEFT JOIN information_schema.table_constraints tc
    ON kcu.constraint_catalog = tc.constraint_catalog
    AND kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
WHERE t.table_schema::text = $1
ORDER BY t.table_catalog, t.table_schema, t.table_name, c.ordinal_position, tc.constraint_name"#;

pub const SEARCH_PATH_QUERY: &str = "SHOW search_path";

pub const AVAILABLE_SCHEMAS_QUERY: &str =
    "SELECT schema_name::text AS schema_name FROM information_schema.schemata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    BaseTable,
    View,
    Other,
}

impl TableKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "BASE TABLE" => TableKind::BaseTable,
            "VIEW" => TableKind::View,
            _ => TableKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub ordinal_position: i32,
    pub default: Option<String>,
    pub nullable: bool,
    pub data_type: String,
    pub character_maximum_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub updatable: bool,
    /// Constraint types the column takes part in (`PRIMARY KEY`, `FOREIGN KEY`, `UNIQUE`).
    pub constraints: Vec<String>,
    pub constraint_names: Vec<String>,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal_position: 0,
            default: None,
            nullable: true,
            data_type: data_type.into(),
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
            updatable: true,
            constraints: Vec::new(),
            constraint_names: Vec::new(),
        }
    }
    pub fn primary_key(mut self) -> Self {
        self.nullable = false;
        self.constraints.push("PRIMARY KEY".into());
        self
    }
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
    pub fn is_primary_key(&self) -> bool {
        self.constraints.iter().any(|v| v == "PRIMARY KEY")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub insertable: bool,
    pub columns: IndexMap<String, ColumnDescription>,
    pub primary_keys: Vec<String>,
}

impl TableDescription {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            catalog: String::new(),
            schema: schema.into(),
            name: name.into(),
            kind,
            insertable: kind == TableKind::BaseTable,
            columns: IndexMap::new(),
            primary_keys: Vec::new(),
        }
    }
    /// Appends a column, keeping the primary key list in sync.
    pub fn column(mut self, mut column: ColumnDescription) -> Self {
        column.ordinal_position = self.columns.len() as i32 + 1;
        if column.is_primary_key() && !self.primary_keys.contains(&column.name) {
            self.primary_keys.push(column.name.clone());
        }
        self.columns.insert(column.name.clone(), column);
        self
    }
    pub fn is_view(&self) -> bool {
        self.kind == TableKind::View
    }
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
    /// The primary key, when it is made of exactly one column.
    pub fn primary_key(&self) -> Option<&str> {
        match self.primary_keys.as_slice() {
            [key] => Some(key),
            _ => None,
        }
    }
}

fn text(row: &RowLabeled, column: &str) -> Result<Option<String>> {
    match row.get_column(column) {
        Some(value) => Option::<String>::try_from_value(value.clone())
            .with_context(|| format!("While reading `{}` from the catalog", column)),
        None => Ok(None),
    }
}

fn required(row: &RowLabeled, column: &str) -> Result<String> {
    text(row, column)?.ok_or_else(|| Error::msg(format!("Catalog column `{}` is null", column)))
}

fn integer(row: &RowLabeled, column: &str) -> Result<Option<i32>> {
    match row.get_column(column) {
        Some(value) => Option::<i32>::try_from_value(value.clone())
            .with_context(|| format!("While reading `{}` from the catalog", column)),
        None => Ok(None),
    }
}

/// Groups the rows of [`TABLE_DESCRIPTION_QUERY`] by table.
pub fn describe_tables(
    rows: impl IntoIterator<Item = RowLabeled>,
) -> Result<IndexMap<String, TableDescription>> {
    let mut tables = IndexMap::<String, TableDescription>::new();
    for row in rows {
        let table_name = required(&row, "table_name")?;
        if !tables.contains_key(&table_name) {
            let mut table = TableDescription::new(
                required(&row, "table_schema")?,
                table_name.clone(),
                TableKind::parse(&required(&row, "table_type")?),
            );
            table.catalog = text(&row, "table_catalog")?.unwrap_or_default();
            table.insertable = text(&row, "is_insertable_into")?.as_deref() == Some("YES");
            tables.insert(table_name.clone(), table);
        }
        let Some(table) = tables.get_mut(&table_name) else {
            continue;
        };
        let column_name = required(&row, "column_name")?;
        if !table.columns.contains_key(&column_name) {
            let mut column =
                ColumnDescription::new(column_name.clone(), required(&row, "data_type")?);
            column.ordinal_position = integer(&row, "ordinal_position")?.unwrap_or_default();
            column.default = text(&row, "column_default")?;
            column.nullable = text(&row, "is_nullable")?.as_deref() != Some("NO");
            column.character_maximum_length = integer(&row, "character_maximum_length")?;
            column.numeric_precision = integer(&row, "numeric_precision")?;
            column.numeric_scale = integer(&row, "numeric_scale")?;
            column.updatable = text(&row, "is_updatable")?.as_deref() != Some("NO");
            table.columns.insert(column_name.clone(), column);
        }
        let Some(column) = table.columns.get_mut(&column_name) else {
            continue;
        };
        if let Some(constraint) = text(&row, "constraint_type")? {
            if constraint == "PRIMARY KEY" && !table.primary_keys.contains(&column_name) {
                table.primary_keys.push(column_name.clone());
            }
            if !column.constraints.contains(&constraint) {
                column.constraints.push(constraint);
            }
        }
        if let Some(name) = text(&row, "constraint_name")? {
            column.constraint_names.push(name);
        }
    }
    Ok(tables)
}

/// First entry of a `SHOW search_path` result that is also an existing schema.
pub fn resolve_schema<'a>(
    search_path: &str,
    available: impl IntoIterator<Item = &'a str> + Clone,
) -> Option<String> {
    search_path
        .split(',')
        .map(|v| v.trim().trim_matches('"'))
        .filter(|v| !v.is_empty())
        .find(|v| available.clone().into_iter().any(|schema| schema == *v))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::{TableKind, describe_tables, resolve_schema};
    use crate::{RowLabeled, Value};
    use std::sync::Arc;

    fn row(
        table: &str,
        kind: &str,
        column: &str,
        position: i32,
        constraint: Option<&str>,
    ) -> RowLabeled {
        let labels: Arc<[String]> = [
            "table_catalog",
            "table_schema",
            "table_name",
            "table_type",
            "is_insertable_into",
            "column_name",
            "ordinal_position",
            "is_nullable",
            "data_type",
            "constraint_type",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        RowLabeled::new(
            labels,
            [
                Value::from("app"),
                Value::from("public"),
                Value::from(table),
                Value::from(kind),
                Value::from("YES"),
                Value::from(column),
                Value::from(position),
                Value::from("NO"),
                Value::from("integer"),
                Value::from(constraint),
            ]
            .into(),
        )
    }

    #[test]
    fn groups_rows_by_table() {
        let tables = describe_tables([
            row("account", "BASE TABLE", "id", 1, Some("PRIMARY KEY")),
            row("account", "BASE TABLE", "account_group_id", 2, Some("FOREIGN KEY")),
            row("account", "BASE TABLE", "account_group_id", 2, Some("UNIQUE")),
            row("account_view", "VIEW", "id", 1, None),
        ])
        .expect("Could not describe the tables");
        assert_eq!(tables.len(), 2);
        let account = &tables["account"];
        assert_eq!(account.kind, TableKind::BaseTable);
        assert_eq!(account.primary_key(), Some("id"));
        assert_eq!(
            account.columns["account_group_id"].constraints,
            ["FOREIGN KEY", "UNIQUE"]
        );
        assert!(!account.columns["id"].nullable);
        assert!(tables["account_view"].is_view());
        assert_eq!(tables["account_view"].primary_key(), None);
    }

    #[test]
    fn search_path() {
        let available = ["public", "app"];
        assert_eq!(
            resolve_schema("\"$user\", public", available).as_deref(),
            Some("public")
        );
        assert_eq!(resolve_schema("app,public", available).as_deref(), Some("app"));
        assert_eq!(resolve_schema("\"$user\"", available), None);
    }
}
