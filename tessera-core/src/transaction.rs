use crate::{
    Driver, Error, Executor, PooledConnection, Query, Result, RowLabeled, RowsAffected,
};
use deadpool::managed::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// A transaction pinned to one pooled connection for its whole life.
///
/// It must reach `Committed` or `RolledBack` exactly once; further attempts are ignored with a
/// warning. Dropping it while open discards the connection, which makes the server abort the
/// work.
pub struct Transaction<D: Driver> {
    connection: Option<PooledConnection<D>>,
    state: TransactionState,
}

impl<D: Driver> Transaction<D> {
    pub(crate) async fn begin(mut connection: PooledConnection<D>) -> Result<Self> {
        connection.batch("BEGIN").await?;
        log::debug!("Transaction started");
        Ok(Self {
            connection: Some(connection),
            state: TransactionState::Open,
        })
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state != TransactionState::Open
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT", TransactionState::Committed).await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK", TransactionState::RolledBack).await
    }

    async fn finish(&mut self, sql: &str, state: TransactionState) -> Result<()> {
        if self.is_closed() {
            log::warn!(
                "Ignoring {} on a transaction that is already {:?}",
                sql,
                self.state
            );
            return Ok(());
        }
        let Some(mut connection) = self.connection.take() else {
            return Err(Error::msg("The transaction has no connection"));
        };
        match connection.batch(sql).await {
            Ok(()) => {
                self.state = state;
                log::debug!("Transaction {:?}", state);
                Ok(())
            }
            Err(e) => {
                // The server aborts the work once the connection is gone.
                self.state = TransactionState::RolledBack;
                drop(Object::take(connection));
                Err(e.context(format!("While running {}", sql)))
            }
        }
    }

    fn connection(&mut self) -> Result<&mut D::Connection> {
        match self.connection.as_deref_mut() {
            Some(connection) if self.state == TransactionState::Open => Ok(connection),
            _ => Err(Error::msg(format!(
                "Cannot run a statement in a transaction that is {:?}",
                self.state
            ))),
        }
    }
}

impl<D: Driver> Executor for Transaction<D> {
    async fn fetch(&mut self, query: &Query) -> Result<Vec<RowLabeled>> {
        self.connection()?.fetch(query).await
    }

    async fn execute(&mut self, query: &Query) -> Result<RowsAffected> {
        self.connection()?.execute(query).await
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        self.connection()?.batch(sql).await
    }
}

impl<D: Driver> Drop for Transaction<D> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            log::warn!("Transaction dropped while open, its connection is discarded");
            drop(Object::take(connection));
        }
    }
}

/// Where a statement runs: a connection taken from the pool for this statement only, or the
/// connection of a caller's transaction.
pub enum Handle<'t, D: Driver> {
    Pooled(PooledConnection<D>),
    Transaction(&'t mut Transaction<D>),
}

impl<D: Driver> Executor for Handle<'_, D> {
    async fn fetch(&mut self, query: &Query) -> Result<Vec<RowLabeled>> {
        match self {
            Handle::Pooled(connection) => connection.fetch(query).await,
            Handle::Transaction(transaction) => transaction.fetch(query).await,
        }
    }

    async fn execute(&mut self, query: &Query) -> Result<RowsAffected> {
        match self {
            Handle::Pooled(connection) => connection.execute(query).await,
            Handle::Transaction(transaction) => transaction.execute(query).await,
        }
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        match self {
            Handle::Pooled(connection) => connection.batch(sql).await,
            Handle::Transaction(transaction) => transaction.batch(sql).await,
        }
    }
}
