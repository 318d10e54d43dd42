use tessera::{Database, Driver, ErrorExt, Filter, Value, values};

pub async fn records<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let mut steve = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    assert!(!steve.is_detached());
    assert!(!steve.is_dirty());

    // Reset restores the persisted values
    steve.set("first_name", "Captain");
    assert!(steve.is_dirty());
    assert_eq!(steve.get_as::<String>("firstName").unwrap(), "Captain");
    assert_eq!(steve.row()["first_name"], Value::from("Steve"));
    steve.reset();
    assert!(!steve.is_dirty());
    assert_eq!(steve.get_as::<String>("first_name").unwrap(), "Steve");

    // Unknown keys are dropped
    crate::silent_logs! {
        steve.set("nickname", "Cap");
    }
    assert!(!steve.is_dirty());

    // Save a change
    steve.set("lastName", "Grant");
    steve.save(None).await.expect("Could not save steve");
    assert!(!steve.is_dirty());
    assert_eq!(steve.row()["last_name"], Value::from("Grant"));
    assert_eq!(steve.get_as::<i32>("version").unwrap(), 2);

    // A clean save only reads the row again
    steve.save(None).await.expect("Could not save a clean steve");
    assert_eq!(steve.get_as::<i32>("version").unwrap(), 2);

    // Reload drops the pending changes and sees the others
    account
        .update_one(1, values! { "first_name" => "Steven" })
        .await
        .expect("Could not rename steve")
        .expect("Steve is missing");
    steve.set("last_name", "Rogers");
    steve.reload(None).await.expect("Could not reload steve");
    assert!(!steve.is_dirty());
    assert_eq!(steve.get_as::<String>("first_name").unwrap(), "Steven");
    assert_eq!(steve.get_as::<String>("last_name").unwrap(), "Grant");
    assert_eq!(steve.get_as::<i32>("version").unwrap(), 3);

    // A detached record is inserted by its first save
    let mut sam = account.build([("email", "sam@wilson.com"), ("firstName", "Sam")]);
    assert!(sam.is_detached());
    assert!(sam.is_dirty());
    assert!(sam.primary_key_value().is_none());
    sam.save(None).await.expect("Could not save sam");
    assert!(!sam.is_detached());
    assert!(!sam.is_dirty());
    assert!(sam.primary_key_value().is_some());
    assert_eq!(sam.get_as::<i32>("version").unwrap(), 1);
    assert!(!sam.get("created_at").expect("created_at is missing").is_null());

    // Destroy, then save fails without writing
    sam.destroy(None).await.expect("Could not destroy sam");
    assert!(sam.is_destroyed());
    sam.set("last_name", "Wilson");
    let error = sam.save(None).await.expect_err("Sam is destroyed");
    assert!(error.is_destroyed_record());
    assert_eq!(
        account
            .count(Filter::eq("email", "sam@wilson.com"))
            .await
            .expect("Could not count sam"),
        0
    );
    sam.destroy(None).await.expect("Destroying twice must succeed");

    // A record never saved is destroyed without statements
    let mut draft = account.new_record();
    draft.destroy(None).await.expect("Could not destroy the draft");
    assert!(draft.is_destroyed());

    // The row vanished under the record
    let mut tony = account
        .find_one(2)
        .await
        .expect("Could not find tony")
        .expect("Tony is missing");
    account.destroy(2).await.expect("Could not destroy tony");
    let error = tony.reload(None).await.expect_err("Tony is gone");
    assert!(error.is_record_not_found());
    tony.set("first_name", "Anthony");
    let error = tony.save(None).await.expect_err("Tony is gone");
    assert!(error.is_record_not_found());

    // Serialization omits what the model hides
    let json = steve.to_json();
    assert_eq!(json["email"], "steve@rogers.com");
    assert!(json.get("encrypted_password").is_none());
    assert!(steve.to_object().contains_key("encrypted_password"));
    assert_eq!(
        serde_json::to_value(&steve).expect("Could not serialize steve"),
        json
    );

    // Saving inside a transaction that rolls back
    let mut transaction = database.begin().await.expect("Could not begin");
    steve.set("first_name", "Rolled");
    steve
        .save(Some(&mut transaction))
        .await
        .expect("Could not save in the transaction");
    assert_eq!(steve.get_as::<String>("first_name").unwrap(), "Rolled");
    transaction.rollback().await.expect("Could not roll back");
    steve.reload(None).await.expect("Could not reload steve");
    assert_eq!(steve.get_as::<String>("first_name").unwrap(), "Steven");
}
