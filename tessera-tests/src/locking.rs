use std::time::Duration;
use tessera::{Database, Driver, ErrorExt, Result, values};
use tokio::time::sleep;

pub async fn lock_no_wait<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let mut first = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    let mut second = first.clone();

    let mut holder = database.begin().await.expect("Could not begin");
    first
        .lock_no_wait(&mut holder)
        .await
        .expect("The row is free");

    // Contention fails right away
    let mut contender = database.begin().await.expect("Could not begin");
    let error = second
        .lock_no_wait(&mut contender)
        .await
        .expect_err("The row is locked");
    assert!(error.is_lock_unavailable());
    contender.rollback().await.expect("Could not roll back");

    // A key lock of another row is unaffected
    let mut tony = account
        .find_one(2)
        .await
        .expect("Could not find tony")
        .expect("Tony is missing");
    let mut other = database.begin().await.expect("Could not begin");
    tony.lock_no_wait(&mut other)
        .await
        .expect("Another row is free");
    other.commit().await.expect("Could not commit");

    first.set("first_name", "Locked");
    first
        .save(Some(&mut holder))
        .await
        .expect("Could not save while holding the lock");
    holder.commit().await.expect("Could not commit");

    // Released after the commit
    let mut contender = database.begin().await.expect("Could not begin");
    second
        .lock_no_wait(&mut contender)
        .await
        .expect("The row is free again");
    assert_eq!(second.get_as::<String>("first_name").unwrap(), "Locked");
    contender.commit().await.expect("Could not commit");
}

pub async fn lock_blocks<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let mut first = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    let mut second = first.clone();

    let mut holder = database.begin().await.expect("Could not begin");
    first.lock(&mut holder).await.expect("The row is free");

    let (updated, waited) = tokio::join!(
        async {
            sleep(Duration::from_millis(300)).await;
            account
                .update_one(1, values! { "first_name" => "Captain" })
                .transaction(&mut holder)
                .await?;
            holder.commit().await
        },
        async {
            let mut waiter = database.begin().await?;
            second.lock(&mut waiter).await?;
            let name = second.get_as::<String>("first_name")?;
            waiter.commit().await?;
            Result::Ok(name)
        }
    );
    updated.expect("Could not update while holding the lock");
    assert_eq!(waited.expect("Could not wait for the lock"), "Captain");
}
