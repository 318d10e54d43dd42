use crate::{config, silent_logs};
use tessera::{Database, Driver, ErrorExt, Filter, values};

pub async fn timeouts<D: Driver>(driver: D, url: &str) {
    let mut config = config(url);
    config.statement_timeout = 500;
    let database = Database::connect(driver, config)
        .await
        .expect("Could not connect with a short timeout");
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");

    silent_logs! {
        let error = database
            .batch("SELECT pg_sleep(2)", None)
            .await
            .expect_err("The statement must time out");
        assert!(error.is_query_timeout());
    }

    // A timeout inside the wrapper rolls everything back
    silent_logs! {
        let error = database
            .transaction(async |transaction| {
                group
                    .create(values! { "name" => "slow" })
                    .transaction(transaction)
                    .await?;
                database.batch("SELECT pg_sleep(2)", Some(transaction)).await
            })
            .await
            .expect_err("The statement must time out");
        assert!(error.is_query_timeout());
    }
    assert_eq!(
        group
            .count(Filter::eq("name", "slow"))
            .await
            .expect("Could not count the groups"),
        0
    );

    // Fast statements are unaffected
    assert_eq!(
        group.count(()).await.expect("Could not count the groups"),
        3
    );

    database.close();
}
