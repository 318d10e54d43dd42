use crate::{PostgresConnection, PostgresSqlWriter};
use tessera_core::{DatabaseConfig, Driver, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver {}

impl PostgresDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for PostgresDriver {
    type Connection = PostgresConnection;
    type SqlWriter = PostgresSqlWriter;

    const NAME: &'static str = "postgres";

    fn sql_writer(&self) -> PostgresSqlWriter {
        PostgresSqlWriter {}
    }

    async fn connect(&self, config: &DatabaseConfig) -> Result<PostgresConnection> {
        PostgresConnection::connect(&config.connection, config.statement_timeout).await
    }
}
