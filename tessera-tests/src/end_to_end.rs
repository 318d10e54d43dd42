use tessera::{Database, Driver, Filter, values};

pub async fn end_to_end<D: Driver>(database: &Database<D>) {
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");
    let account = database.model("Account").expect("Model Account is missing");
    let avengers = group
        .find_one(1)
        .await
        .expect("Could not find the avengers")
        .expect("The avengers are missing");

    let created = account
        .create(values! {
            "email" => "x@y.com",
            "firstName" => "Xavier",
            "accountGroupId" => avengers.primary_key_value().unwrap_or_default(),
            "encryptedPassword" => "secret",
        })
        .await
        .expect("Could not create the account");

    let found = account
        .find_one(Filter::eq("email", "x@y.com"))
        .await
        .expect("Could not find the account")
        .expect("The account is missing");
    assert!(!found.is_detached());
    assert!(!found.is_dirty());
    assert_eq!(found.primary_key_value(), created.primary_key_value());
    let json = found.to_json();
    assert_eq!(json["email"], "x@y.com");
    assert_eq!(json["account_group_id"], 1);
    assert!(json.get("encrypted_password").is_none());
    assert_eq!(found.get_as::<String>("encrypted_password").unwrap(), "secret");
}
