#![allow(dead_code)]
use tessera::{
    ColumnDescription, Database, DatabaseConfig, Enumeration, ModelOptions, Result,
    TableDescription, TableKind, indexmap::IndexMap,
};
use tessera_postgres::PostgresDriver;

pub fn id() -> ColumnDescription {
    ColumnDescription::new("id", "integer").primary_key()
}

pub fn column(name: &str) -> ColumnDescription {
    ColumnDescription::new(name, "character varying")
}

pub fn foreign_key(name: &str) -> ColumnDescription {
    ColumnDescription::new(name, "integer")
}

pub fn table(name: &str, columns: impl IntoIterator<Item = ColumnDescription>) -> TableDescription {
    columns
        .into_iter()
        .fold(TableDescription::new("public", name, TableKind::BaseTable), |table, column| {
            table.column(column)
        })
}

pub fn view(name: &str, columns: impl IntoIterator<Item = ColumnDescription>) -> TableDescription {
    TableDescription {
        kind: TableKind::View,
        insertable: false,
        ..table(name, columns)
    }
}

pub fn tables(
    tables: impl IntoIterator<Item = TableDescription>,
) -> IndexMap<String, TableDescription> {
    tables.into_iter().map(|v| (v.name.clone(), v)).collect()
}

/// The account registry, described without a server.
pub fn registry() -> IndexMap<String, TableDescription> {
    tables([
        table("account_state", [id(), column("name")]),
        table(
            "account_group",
            [
                id(),
                column("name"),
                column("created_at"),
                column("updated_at"),
                column("version"),
            ],
        ),
        table(
            "account",
            [
                id(),
                foreign_key("account_group_id"),
                foreign_key("account_state_id"),
                column("email").not_null(),
                column("first_name"),
                column("encrypted_password"),
            ],
        ),
        table(
            "account_event",
            [id(), foreign_key("account_id").not_null(), column("event")],
        ),
        table("agency", [id(), column("name")]),
        table(
            "account_x_agency",
            [
                id(),
                foreign_key("account_id"),
                foreign_key("agency_id"),
                column("created_at"),
            ],
        ),
        view(
            "active_account",
            [column("id"), column("email"), foreign_key("account_group_id")],
        ),
    ])
}

pub fn assemble(
    config: DatabaseConfig,
    descriptions: IndexMap<String, TableDescription>,
) -> Result<Database<PostgresDriver>> {
    Database::builder(PostgresDriver::new(), config).assemble(
        "public",
        descriptions,
        [Enumeration::new(
            "AccountState",
            "account_state",
            [("ACTIVE", 1), ("SUSPENDED", 2), ("CLOSED", 3)],
        )],
    )
}

pub fn registry_database() -> Database<PostgresDriver> {
    assemble(
        DatabaseConfig::default().with_model_options(
            "Account",
            ModelOptions {
                omit: vec!["encrypted_password".into()],
                ..Default::default()
            },
        ),
        registry(),
    )
    .expect("Could not assemble the registry")
}
