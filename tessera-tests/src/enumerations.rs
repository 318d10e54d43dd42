use tessera::{
    AssociationOptions, AssociationValue, Database, Driver, ErrorExt, ErrorKind, Value,
};

fn permission_ids<D: Driver>(value: AssociationValue<D>) -> Vec<Value> {
    match value {
        AssociationValue::Ids(ids) => ids,
        other => panic!("Expected enumeration ids, got {:?}", other),
    }
}

pub async fn enumerations<D: Driver>(database: &Database<D>) {
    let permissions = database
        .enumeration("AccountPermission")
        .expect("Enumeration AccountPermission is missing");
    assert_eq!(permissions.len(), 3);
    assert_eq!(permissions.get("VIEW_TICKETS"), Some(&Value::from(1)));
    assert_eq!(permissions.name_of(&Value::from(3)), Some("MANAGE_ACCOUNTS"));
    let edit_tickets = permissions
        .get("EDIT_TICKETS")
        .cloned()
        .expect("EDIT_TICKETS is missing");
    let states = database
        .enumeration("account_state")
        .expect("Enumeration AccountState is missing");
    assert_eq!(
        states.iter().map(|(k, _)| k).collect::<Vec<_>>(),
        ["ACTIVE", "SUSPENDED", "CLOSED"]
    );
    let suspended = states.get("SUSPENDED").cloned().expect("SUSPENDED is missing");
    assert_eq!(database.enumerations().count(), 2);

    let account = database.model("Account").expect("Model Account is missing");
    assert!(!account.is_enumeration());
    let permission = database
        .model("AccountPermission")
        .expect("Model AccountPermission is missing");
    assert!(permission.is_enumeration());
    assert_eq!(permission.enumeration().map(|v| v.len()), Some(3));

    let mut steve = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    assert!(steve.association("accountPermissions").unwrap().is_enumeration());
    steve
        .populate("accountPermissions", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the permissions");
    assert_eq!(
        permission_ids(steve.association_value("accountPermissions").unwrap()),
        [Value::from(1)]
    );

    // Attach, then reload
    steve
        .attach(
            "accountPermissions",
            edit_tickets.clone(),
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not attach EDIT_TICKETS");
    steve.reload(None).await.expect("Could not reload steve");
    let ids = permission_ids(steve.association_value("accountPermissions").unwrap());
    assert!(ids.contains(&edit_tickets));
    assert_eq!(steve.to_json()["account_permissions"], serde_json::json!([1, 2]));

    // Detach removes it
    steve
        .detach(
            "accountPermissions",
            edit_tickets.clone(),
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not detach EDIT_TICKETS");
    let ids = permission_ids(steve.association_value("accountPermissions").unwrap());
    assert!(!ids.contains(&edit_tickets));
    steve.reload(None).await.expect("Could not reload steve");
    let ids = permission_ids(steve.association_value("accountPermissions").unwrap());
    assert_eq!(ids, [Value::from(1)]);

    // A one enumeration is assigned by value
    match steve.association_value("accountState").unwrap() {
        AssociationValue::Id(id) => assert_eq!(id, Value::from(1)),
        other => panic!("Expected an enumeration id, got {:?}", other),
    }
    steve
        .set_association("accountState", suspended.clone())
        .expect("Could not suspend steve");
    assert!(steve.is_dirty());
    steve.save(None).await.expect("Could not save steve");
    assert_eq!(steve.get("account_state_id"), Some(&suspended));

    let error = steve
        .set_association("accountState", 42)
        .expect_err("42 is not a state");
    assert!(error.is_invalid_enumeration_value());
    assert!(!steve.is_dirty());
    let error = steve
        .set_association("accountGroup", 1)
        .expect_err("Groups are not an enumeration");
    assert!(matches!(
        error.kind(),
        Some(ErrorKind::AssociationNotAssignable { .. })
    ));
    steve
        .set_association("accountState", Value::Null)
        .expect("Could not clear the state");
    steve.save(None).await.expect("Could not save steve");
    assert!(steve.association_value("accountState").unwrap().is_empty());
}
