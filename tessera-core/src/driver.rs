use crate::{Connection, DatabaseConfig, Result, SqlWriter};
use std::future::Future;

pub trait Driver: Send + Sync + Sized + 'static {
    type Connection: Connection;
    type SqlWriter: SqlWriter + Send + Sync;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Opens a new connection, configured with the statement timeout of `config`.
    fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}
