use crate::silent_logs;
use indoc::indoc;
use tessera::{Database, Driver, Error, ErrorExt, Filter, TransactionState, values};

pub async fn transactions<D: Driver>(database: &Database<D>) {
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");
    let account = database.model("Account").expect("Model Account is missing");
    let count = async |name: &str| {
        group
            .count(Filter::eq("name", name))
            .await
            .expect("Could not count the groups")
    };

    // Commit on success
    let created = database
        .transaction(async |transaction| {
            let created = group
                .create(values! { "name" => "x-men" })
                .transaction(transaction)
                .await?;
            group
                .update_one(
                    created.primary_key_value().unwrap_or_default(),
                    values! { "name" => "X-Men" },
                )
                .transaction(transaction)
                .await?;
            Ok(created)
        })
        .await
        .expect("The transaction must commit");
    assert!(created.primary_key_value().is_some());
    assert_eq!(count("X-Men").await, 1);

    // Rollback on error, the error of the closure wins
    let error = database
        .transaction::<(), _>(async |transaction| {
            group
                .create(values! { "name" => "inhumans" })
                .transaction(transaction)
                .await?;
            Err(Error::msg("Changed my mind"))
        })
        .await
        .expect_err("The transaction must roll back");
    assert_eq!(error.to_string(), "Changed my mind");
    assert_eq!(count("inhumans").await, 0);

    // A failing statement rolls back what came before it
    silent_logs! {
        let error = database
            .transaction(async |transaction| {
                group
                    .create(values! { "name" => "eternals" })
                    .transaction(transaction)
                    .await?;
                account
                    .create(values! { "email" => "steve@rogers.com" })
                    .transaction(transaction)
                    .await?;
                Ok(())
            })
            .await
            .expect_err("The email is taken");
        assert!(error.is_constraint_violation());
    }
    assert_eq!(count("eternals").await, 0);

    // The closure may close the transaction itself
    let value = database
        .transaction(async |transaction| {
            group
                .create(values! { "name" => "fantastic four" })
                .transaction(transaction)
                .await?;
            transaction.commit().await?;
            Ok(4)
        })
        .await
        .expect("Committing twice is not an error");
    assert_eq!(value, 4);
    assert_eq!(count("fantastic four").await, 1);
    let error = database
        .transaction::<(), _>(async |transaction| {
            group
                .create(values! { "name" => "thunderbolts" })
                .transaction(transaction)
                .await?;
            transaction.rollback().await?;
            Err(Error::msg("Rolled back already"))
        })
        .await
        .expect_err("The closure failed");
    assert_eq!(error.to_string(), "Rolled back already");
    assert_eq!(count("thunderbolts").await, 0);

    // Manual transactions
    let mut transaction = database.begin().await.expect("Could not begin");
    assert_eq!(transaction.state(), TransactionState::Open);
    group
        .create(values! { "name" => "inhumans" })
        .transaction(&mut transaction)
        .await
        .expect("Could not create the inhumans");
    transaction.commit().await.expect("Could not commit");
    assert_eq!(transaction.state(), TransactionState::Committed);
    assert!(transaction.is_closed());
    transaction.rollback().await.expect("A closed transaction ignores rollback");
    assert_eq!(transaction.state(), TransactionState::Committed);
    assert_eq!(count("inhumans").await, 1);
    silent_logs! {
        let mut transaction = database.begin().await.expect("Could not begin");
        group
            .create(values! { "name" => "dropped" })
            .transaction(&mut transaction)
            .await
            .expect("Could not create the dropped group");
        drop(transaction);
    }
    assert_eq!(count("dropped").await, 0);

    // A failed commit leaves the transaction rolled back
    let mut transaction = database.begin().await.expect("Could not begin");
    group
        .create(values! { "name" => "deferred" })
        .transaction(&mut transaction)
        .await
        .expect("Could not create the deferred group");
    database
        .batch(
            indoc! {"
                CREATE TEMP TABLE pledge (id INTEGER UNIQUE DEFERRABLE INITIALLY DEFERRED);
                INSERT INTO pledge VALUES (1), (1);
            "},
            Some(&mut transaction),
        )
        .await
        .expect("The duplicate is only checked at commit");
    silent_logs! {
        let error = transaction
            .commit()
            .await
            .expect_err("The deferred constraint fails the commit");
        assert!(error.is_constraint_violation());
    }
    assert_eq!(transaction.state(), TransactionState::RolledBack);
    assert!(transaction.is_closed());
    assert_eq!(count("deferred").await, 0);
}
