use crate::{Connection, DatabaseConfig, Driver, Error, Result};
use deadpool::managed::{self, Metrics, PoolError, RecycleError, RecycleResult};
use std::sync::Arc;

/// Creates connections on demand, up to `pool.max_size` of the configuration.
pub struct Manager<D: Driver> {
    driver: Arc<D>,
    config: Arc<DatabaseConfig>,
}

impl<D: Driver> managed::Manager for Manager<D> {
    type Type = D::Connection;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type> {
        log::debug!("Opening a new {} connection", D::NAME);
        self.driver.connect(&self.config).await
    }

    async fn recycle(
        &self,
        connection: &mut Self::Type,
        _metrics: &Metrics,
    ) -> RecycleResult<Self::Error> {
        if connection.is_closed() {
            return Err(RecycleError::Backend(Error::msg("The connection is closed")));
        }
        Ok(())
    }
}

/// A connection borrowed from the pool, returned when dropped.
pub type PooledConnection<D> = managed::Object<Manager<D>>;

pub struct Pool<D: Driver> {
    inner: managed::Pool<Manager<D>>,
}

impl<D: Driver> Pool<D> {
    /// Builds the pool, no connection is opened until the first `get`.
    pub fn new(driver: Arc<D>, config: Arc<DatabaseConfig>) -> Result<Self> {
        let max_size = config.pool.max_size.max(1);
        let inner = managed::Pool::builder(Manager { driver, config })
            .max_size(max_size)
            .runtime(deadpool::Runtime::Tokio1)
            .build()
            .map_err(|e| Error::msg(format!("Could not build the connection pool: {}", e)))?;
        Ok(Self { inner })
    }

    pub async fn get(&self) -> Result<PooledConnection<D>> {
        self.inner.get().await.map_err(|e| match e {
            PoolError::Backend(e) => e.context("While opening a pooled connection"),
            e => {
                let e = Error::msg(format!("Could not get a pooled connection: {}", e));
                log::error!("{:#}", e);
                e
            }
        })
    }

    /// Closes the pool, pending and future `get` calls fail.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
