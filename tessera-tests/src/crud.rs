use crate::silent_logs;
use serde_json::json;
use tessera::{
    Database, Driver, ErrorExt, Filter, OrderBy, TransactionState, Value, Values, values,
};

fn emails<D: Driver>(records: &[tessera::Record<D>]) -> Vec<String> {
    records
        .iter()
        .map(|v| v.get_as::<String>("email").expect("Email must be a string"))
        .collect()
}

pub async fn crud<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    assert_eq!(account.table_name(), "account");
    assert_eq!(account.identity(), "Account");
    assert_eq!(account.primary_key(), Some("id"));
    assert!(account.has_column("encrypted_password"));
    assert!(database.model("account_group").is_some());
    assert!(database.model("Nope").is_none());
    assert_eq!(database.schema(), "public");

    // Views are modelled for reading
    let active = database
        .model("ActiveAccount")
        .expect("Model ActiveAccount is missing");
    assert!(active.associations().is_empty());
    let rows = active.find(()).await.expect("Could not read the view");
    let mut active_emails = emails(&rows);
    active_emails.sort();
    assert_eq!(
        active_emails,
        ["steve@rogers.com", "tony@stark.com", "wanda@maximoff.com"]
    );
    assert_eq!(active.count(()).await.expect("Could not count the view"), 3);

    // Find, in primary key order by default
    let accounts = account.find(()).await.expect("Could not find the accounts");
    assert_eq!(
        emails(&accounts),
        [
            "steve@rogers.com",
            "tony@stark.com",
            "peter@parker.com",
            "wanda@maximoff.com",
        ]
    );
    let accounts = account
        .find(Filter::eq("account_group_id", 100))
        .order(OrderBy::desc("email"))
        .limit(1)
        .await
        .expect("Could not find the contractors");
    assert_eq!(emails(&accounts), ["wanda@maximoff.com"]);
    let accounts = account
        .find(())
        .offset(3)
        .await
        .expect("Could not skip the accounts");
    assert_eq!(emails(&accounts), ["wanda@maximoff.com"]);
    let accounts = account
        .find(Filter::is_in("id", Vec::<i32>::new()))
        .await
        .expect("Could not find with an empty list");
    assert!(accounts.is_empty());

    // Count
    assert_eq!(account.count(()).await.expect("Could not count"), 4);
    assert_eq!(
        account
            .count(Filter::eq("account_group_id", 1))
            .await
            .expect("Could not count the avengers"),
        2
    );

    // Find one
    let tony = account
        .find_one(2)
        .await
        .expect("Could not find tony")
        .expect("Tony is missing");
    assert_eq!(tony.get_as::<String>("first_name").unwrap(), "Tony");
    assert_eq!(tony.get("firstName"), Some(&Value::from("Tony")));
    assert!(!tony.is_detached());
    assert!(!tony.is_dirty());
    assert!(
        account
            .find_one(Filter::eq("email", "nobody@nowhere.com"))
            .await
            .expect("Could not look for nobody")
            .is_none()
    );
    let error = account
        .find_one(Filter::eq("account_group_id", 1))
        .await
        .expect_err("Two avengers match");
    assert!(error.is_multiple_results());

    // Select
    let rows = account
        .select(["email"], Filter::is_in("id", [1, 2]))
        .order(OrderBy::asc("id"))
        .await
        .expect("Could not select the emails");
    assert_eq!(emails(&rows), ["steve@rogers.com", "tony@stark.com"]);
    assert_eq!(rows[0].row().len(), 1);

    // Create, camelCase keys become columns
    let bruce = account
        .create(values! {
            "accountGroupId" => 1,
            "email" => "bruce@banner.com",
            "firstName" => "Bruce",
        })
        .await
        .expect("Could not create bruce");
    assert!(!bruce.is_detached());
    assert!(!bruce.is_dirty());
    assert_eq!(bruce.primary_key_value(), Some(Value::from(5)));
    assert_eq!(bruce.get_as::<i32>("account_group_id").unwrap(), 1);
    assert_eq!(bruce.get_as::<i32>("version").unwrap(), 1);
    assert!(!bruce.get("created_at").expect("created_at is missing").is_null());

    // Add rows
    let added = account
        .add_rows([
            values! { "email" => "natasha@romanoff.com", "account_group_id" => 1 },
            values! { "email" => "clint@barton.com" },
        ])
        .await
        .expect("Could not add the rows");
    assert_eq!(emails(&added), ["natasha@romanoff.com", "clint@barton.com"]);
    assert!(added[1].get("account_group_id").is_some_and(Value::is_null));
    assert!(
        account
            .add_rows(Vec::<Values>::new())
            .await
            .expect("Adding no rows must succeed")
            .is_empty()
    );

    // Update
    let updated = account
        .update(Filter::eq("account_group_id", 1), values! { "account_state_id" => 2 })
        .await
        .expect("Could not suspend the avengers");
    assert_eq!(updated.len(), 4);
    for record in &updated {
        assert_eq!(record.get_as::<i32>("account_state_id").unwrap(), 2);
        assert!(record.get_as::<i32>("version").unwrap() > 1);
    }
    assert!(
        account
            .update((), Values::new())
            .await
            .expect_err("Nothing to update")
            .to_string()
            .contains("Nothing to update")
    );

    // Update one
    let bruce = account
        .update_one(5, values! { "last_name" => "Banner" })
        .await
        .expect("Could not update bruce")
        .expect("Bruce is missing");
    assert_eq!(bruce.get_as::<String>("last_name").unwrap(), "Banner");
    assert!(
        account
            .update_one(999, values! { "last_name" => "Nobody" })
            .await
            .expect("Updating nothing must succeed")
            .is_none()
    );

    // Constraint violations
    silent_logs! {
        let error = account
            .create(values! { "email" => "steve@rogers.com" })
            .await
            .expect_err("The email is unique");
        assert!(error.is_constraint_violation());
        let error = account
            .create(values! { "email" => "ghost@nowhere.com", "account_group_id" => 999 })
            .await
            .expect_err("The group does not exist");
        assert!(error.is_constraint_violation());
    }

    // Destroy
    let destroyed = account
        .destroy(Filter::is_in(
            "email",
            ["natasha@romanoff.com", "clint@barton.com"],
        ))
        .await
        .expect("Could not destroy");
    assert_eq!(destroyed.len(), 2);
    assert_eq!(account.count(()).await.expect("Could not count"), 5);

    // Json columns
    let event = database
        .model("AccountEvent")
        .expect("Model AccountEvent is missing")
        .find_one(1)
        .await
        .expect("Could not find the event")
        .expect("The event is missing");
    assert_eq!(
        event.get("payload"),
        Some(&Value::from(json!({ "ip": "10.0.0.1" })))
    );
}

pub async fn update_one_multiple<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let names = async || {
        account
            .find(Filter::eq("account_group_id", 100))
            .await
            .expect("Could not find the contractors")
            .iter()
            .map(|v| v.get_as::<String>("first_name").unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(names().await, ["Peter", "Wanda"]);

    silent_logs! {
        let error = account
            .update_one(
                Filter::eq("account_group_id", 100),
                values! { "first_name" => "Changed" },
            )
            .await
            .expect_err("Two contractors match");
        assert!(error.is_multiple_results());
    }
    assert_eq!(names().await, ["Peter", "Wanda"]);

    // Inside a caller transaction the rollback is up to the caller
    let mut transaction = database.begin().await.expect("Could not begin");
    silent_logs! {
        let error = account
            .update_one(
                Filter::eq("account_group_id", 100),
                values! { "first_name" => "Changed" },
            )
            .transaction(&mut transaction)
            .await
            .expect_err("Two contractors match");
        assert!(error.is_multiple_results());
    }
    assert_eq!(transaction.state(), TransactionState::Open);
    transaction.rollback().await.expect("Could not roll back");
    assert_eq!(names().await, ["Peter", "Wanda"]);
}
