mod associations;
mod crud;
mod end_to_end;
mod enumerations;
mod fixture;
mod locking;
mod observers;
mod records;
mod timeouts;
mod transactions;

use crate::{
    associations::{
        association_limits, many_associations, one_associations, through_associations,
    },
    crud::{crud, update_one_multiple},
    end_to_end::end_to_end,
    enumerations::enumerations,
    locking::{lock_blocks, lock_no_wait},
    observers::observers,
    records::records,
    transactions::transactions,
};
pub use fixture::{FIXTURE, config};
use log::LevelFilter;
use std::env;
use tessera::{Database, Driver, Executor};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Recreates the fixture schema with a standalone connection.
pub async fn setup<D: Driver>(driver: &D, url: &str) {
    let mut connection = driver
        .connect(&config(url))
        .await
        .expect("Could not open a connection to create the fixture");
    connection
        .batch(FIXTURE)
        .await
        .expect("Could not create the fixture schema");
}

async fn reset<D: Driver>(database: &Database<D>) {
    database
        .batch(FIXTURE, None)
        .await
        .expect("Could not reset the fixture schema");
}

pub async fn execute_tests<D: Driver + Clone>(driver: D, url: &str) {
    setup(&driver, url).await;
    let database = Database::connect(driver.clone(), config(url))
        .await
        .expect("Could not introspect the fixture schema");

    crud(&database).await;
    reset(&database).await;
    update_one_multiple(&database).await;
    reset(&database).await;
    records(&database).await;
    reset(&database).await;
    one_associations(&database).await;
    reset(&database).await;
    many_associations(&database).await;
    reset(&database).await;
    through_associations(&database).await;
    reset(&database).await;
    association_limits(driver.clone(), url).await;
    enumerations(&database).await;
    reset(&database).await;
    #[cfg(not(feature = "disable-locking"))]
    {
        lock_no_wait(&database).await;
        reset(&database).await;
        lock_blocks(&database).await;
        reset(&database).await;
    }
    transactions(&database).await;
    reset(&database).await;
    observers(driver.clone(), url).await;
    reset(&database).await;
    #[cfg(not(feature = "disable-timeouts"))]
    timeouts::timeouts(driver.clone(), url).await;
    end_to_end(&database).await;
    database.close();
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
