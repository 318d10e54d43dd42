use crate::config;
use tessera::{
    AssociationKind, AssociationOptions, AssociationValue, Database, Driver, ErrorExt, ErrorKind,
    Filter, ModelOptions, OrderBy, Record, Value, values,
};

fn ids<D: Driver>(records: &[Record<D>]) -> Vec<i32> {
    records
        .iter()
        .map(|v| v.get_as::<i32>("id").expect("Id must be an integer"))
        .collect()
}

pub async fn one_associations<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");
    let mut steve = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");

    // Lazy until populated
    let proxy = steve.association("accountGroup").expect("Missing accountGroup");
    assert_eq!(proxy.kind(), AssociationKind::One);
    assert!(!proxy.is_populated());
    assert!(steve.to_json().get("account_group").is_none());
    let error = steve.association("nope").expect_err("No such association");
    assert!(error.is_unknown_association());

    steve
        .populate("account_group", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the group");
    let proxy = steve.association("accountGroup").expect("Missing accountGroup");
    assert!(proxy.is_populated());
    assert_eq!(
        proxy.first().map(|v| v.get_as::<String>("name").unwrap()),
        Some("avengers".into())
    );
    match steve.association_value("accountGroup").unwrap() {
        AssociationValue::Record(record) => {
            assert_eq!(record.primary_key_value(), Some(Value::from(1)))
        }
        other => panic!("Unexpected association value {:?}", other),
    }
    assert_eq!(steve.to_json()["account_group"]["name"], "avengers");

    // A filter pinned on another key finds nothing
    let found = steve
        .find_associations(
            "accountGroup",
            AssociationOptions::new().filter(Filter::eq("id", 2)),
            None,
        )
        .await
        .expect("Could not look for the group");
    assert!(found.is_empty());
    let found = steve
        .find_one_association("accountGroup", AssociationOptions::new(), None)
        .await
        .expect("Could not find the group")
        .expect("The group is missing");
    assert_eq!(found.get_as::<String>("name").unwrap(), "avengers");

    // Attach another group
    steve
        .attach("accountGroup", 2, AssociationOptions::new(), None)
        .await
        .expect("Could not attach the guardians");
    assert!(!steve.is_dirty());
    assert_eq!(steve.get_as::<i32>("account_group_id").unwrap(), 2);
    assert_eq!(
        steve
            .association("accountGroup")
            .unwrap()
            .first()
            .map(|v| v.get_as::<String>("name").unwrap()),
        Some("guardians".into())
    );
    let error = steve
        .attach("accountGroup", vec![1, 2], AssociationOptions::new(), None)
        .await
        .expect_err("A single group can be attached");
    assert!(matches!(error.kind(), Some(ErrorKind::TooManyTargets { count: 2, .. })));

    // Detaching another group leaves it alone
    steve
        .detach("accountGroup", 1, AssociationOptions::new(), None)
        .await
        .expect("Could not detach");
    assert_eq!(steve.get_as::<i32>("account_group_id").unwrap(), 2);
    steve
        .detach("accountGroup", 2, AssociationOptions::new(), None)
        .await
        .expect("Could not detach the guardians");
    assert!(steve.get("account_group_id").is_some_and(Value::is_null));
    assert!(steve.association_value("accountGroup").unwrap().is_empty());
    assert!(steve.to_json()["account_group"].is_null());
    assert_eq!(group.count(()).await.expect("Could not count"), 3);

    // Create a related row
    let defenders = steve
        .create_association(
            "accountGroup",
            values! { "name" => "defenders" },
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not create the defenders");
    assert_eq!(
        steve.get("account_group_id").cloned(),
        defenders.primary_key_value()
    );
    assert_eq!(steve.association("accountGroup").unwrap().records().len(), 1);

    // Destroy it
    let destroyed = steve
        .destroy_associations(
            "accountGroup",
            &defenders,
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not destroy the defenders");
    assert_eq!(destroyed.len(), 1);
    assert!(steve.get("account_group_id").is_some_and(Value::is_null));
    assert_eq!(
        group
            .count(Filter::eq("name", "defenders"))
            .await
            .expect("Could not count"),
        0
    );

    // Nested populate
    let event = database
        .model("AccountEvent")
        .expect("Model AccountEvent is missing")
        .find_one(3)
        .populate(
            "account",
            AssociationOptions::new().populate("accountGroup", AssociationOptions::new()),
        )
        .await
        .expect("Could not find the event")
        .expect("The event is missing");
    let json = event.to_json();
    assert_eq!(json["account"]["email"], "tony@stark.com");
    assert_eq!(json["account"]["account_group"]["name"], "avengers");
    assert!(json["account"].get("encrypted_password").is_none());
}

pub async fn many_associations<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");
    let mut avengers = group
        .find_one(1)
        .await
        .expect("Could not find the avengers")
        .expect("The avengers are missing");
    assert_eq!(
        avengers.association("accounts").unwrap().kind(),
        AssociationKind::Many
    );

    avengers
        .populate(
            "accounts",
            AssociationOptions::new().order(OrderBy::desc("email")),
            None,
        )
        .await
        .expect("Could not populate the accounts");
    assert_eq!(ids(avengers.association("accounts").unwrap().records()), [2, 1]);
    let found = avengers
        .find_associations("accounts", AssociationOptions::new().limit(1), None)
        .await
        .expect("Could not look for the accounts");
    assert_eq!(ids(&found), [1]);
    let found = avengers
        .find_associations(
            "accounts",
            AssociationOptions::new().filter(Filter::eq("first_name", "Tony")),
            None,
        )
        .await
        .expect("Could not look for tony");
    assert_eq!(ids(&found), [2]);

    // A single account
    let tony = avengers
        .find_one_association(
            "accounts",
            AssociationOptions::new().filter(Filter::eq("first_name", "Tony")),
            None,
        )
        .await
        .expect("Could not find tony")
        .expect("Tony is missing");
    assert_eq!(tony.get_as::<i32>("id").unwrap(), 2);
    let nobody = avengers
        .find_one_association(
            "accounts",
            AssociationOptions::new().filter(Filter::eq("first_name", "Thanos")),
            None,
        )
        .await
        .expect("Could not look for thanos");
    assert!(nobody.is_none());
    let error = avengers
        .find_one_association("accounts", AssociationOptions::new(), None)
        .await
        .expect_err("Two accounts match");
    assert!(error.is_multiple_results());
    assert!(avengers.association("accounts").unwrap().is_populated());
    assert_eq!(avengers.association("accounts").unwrap().records().len(), 2);

    // Attach peter and wanda
    avengers
        .attach("accounts", vec![3, 4], AssociationOptions::new(), None)
        .await
        .expect("Could not attach");
    assert_eq!(ids(avengers.association("accounts").unwrap().records()), [1, 2, 3, 4]);
    let peter = account
        .find_one(3)
        .await
        .expect("Could not find peter")
        .expect("Peter is missing");
    assert_eq!(peter.get_as::<i32>("account_group_id").unwrap(), 1);

    // Detach tony
    avengers
        .detach("accounts", 2, AssociationOptions::new(), None)
        .await
        .expect("Could not detach tony");
    assert_eq!(ids(avengers.association("accounts").unwrap().records()), [1, 3, 4]);
    let tony = account
        .find_one(2)
        .await
        .expect("Could not find tony")
        .expect("Tony is missing");
    assert!(tony.get("account_group_id").is_some_and(Value::is_null));

    // Rows of another owner are left alone
    let contractor = account
        .create(values! { "email" => "scott@lang.com", "account_group_id" => 100 })
        .await
        .expect("Could not create scott");
    avengers
        .detach("accounts", &contractor, AssociationOptions::new(), None)
        .await
        .expect("Could not detach scott");
    let destroyed = avengers
        .destroy_associations("accounts", &contractor, AssociationOptions::new(), None)
        .await
        .expect("Could not destroy scott");
    assert!(destroyed.is_empty());
    let scott = account
        .find_one(Filter::eq("email", "scott@lang.com"))
        .await
        .expect("Could not find scott")
        .expect("Scott is missing");
    assert_eq!(scott.get_as::<i32>("account_group_id").unwrap(), 100);

    // Create through the association
    let bucky = avengers
        .create_association(
            "accounts",
            values! { "email" => "bucky@barnes.com" },
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not create bucky");
    assert_eq!(bucky.get_as::<i32>("account_group_id").unwrap(), 1);
    assert_eq!(avengers.association("accounts").unwrap().records().len(), 4);
    assert!(
        avengers
            .association("accounts")
            .unwrap()
            .get(bucky.get_as::<i32>("id").unwrap())
            .is_some()
    );
    match avengers.association_value("accounts").unwrap() {
        AssociationValue::Records(records) => assert_eq!(records.len(), 4),
        other => panic!("Unexpected association value {:?}", other),
    }
    assert_eq!(
        avengers.to_json()["accounts"]
            .as_array()
            .map(Vec::len),
        Some(4)
    );

    // Destroy through the association
    let destroyed = avengers
        .destroy_associations("accounts", &bucky, AssociationOptions::new(), None)
        .await
        .expect("Could not destroy bucky");
    assert_eq!(destroyed.len(), 1);
    assert_eq!(avengers.association("accounts").unwrap().records().len(), 3);
    assert_eq!(
        account
            .count(Filter::eq("email", "bucky@barnes.com"))
            .await
            .expect("Could not count"),
        0
    );

    // The populated associations follow a reload
    account
        .update_one(4, values! { "account_group_id" => 2 })
        .await
        .expect("Could not move wanda");
    avengers.reload(None).await.expect("Could not reload");
    assert_eq!(ids(avengers.association("accounts").unwrap().records()), [1, 3]);
}

pub async fn through_associations<D: Driver>(database: &Database<D>) {
    let account = database.model("Account").expect("Model Account is missing");
    let agency = database.model("Agency").expect("Model Agency is missing");
    let join = database
        .model("AccountXAgency")
        .expect("Model AccountXAgency is missing");
    assert!(join.associations().is_empty());
    let joined = async |filter: Filter| join.count(filter).await.expect("Could not count");

    let mut steve = account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    let proxy = steve.association("agencies").expect("Missing agencies");
    assert_eq!(proxy.kind(), AssociationKind::Through);
    assert_eq!(proxy.description().through_table.as_deref(), Some("account_x_agency"));

    steve
        .populate("agencies", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the agencies");
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1]);

    // Attach
    steve
        .attach("agencies", vec![2, 3], AssociationOptions::new(), None)
        .await
        .expect("Could not attach");
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1, 2, 3]);
    assert_eq!(joined(Filter::eq("account_id", 1)).await, 3);

    // The other side sees it too
    let mut shield = agency
        .find_one(1)
        .await
        .expect("Could not find shield")
        .expect("Shield is missing");
    shield
        .populate("accounts", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the accounts");
    assert_eq!(ids(shield.association("accounts").unwrap().records()), [1, 2]);

    // Options on the related rows
    let found = steve
        .find_associations(
            "agencies",
            AssociationOptions::new().order(OrderBy::desc("name")).limit(1),
            None,
        )
        .await
        .expect("Could not look for the agencies");
    assert_eq!(ids(&found), [2]);
    let found = steve
        .find_associations(
            "agencies",
            AssociationOptions::new().filter(Filter::eq("name", "hydra")),
            None,
        )
        .await
        .expect("Could not look for hydra");
    assert_eq!(ids(&found), [3]);
    let hydra = steve
        .find_one_association(
            "agencies",
            AssociationOptions::new().filter(Filter::eq("name", "hydra")),
            None,
        )
        .await
        .expect("Could not find hydra");
    assert_eq!(hydra.and_then(|v| v.primary_key_value()), Some(Value::from(3)));
    let error = steve
        .find_one_association("agencies", AssociationOptions::new(), None)
        .await
        .expect_err("Three agencies match");
    assert!(error.is_multiple_results());

    // Detach deletes the join row
    steve
        .detach("agencies", 3, AssociationOptions::new(), None)
        .await
        .expect("Could not detach hydra");
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1, 2]);
    assert_eq!(joined(Filter::eq("account_id", 1)).await, 2);
    assert_eq!(agency.count(()).await.expect("Could not count"), 3);

    // Or keeps it, without the target
    steve
        .detach(
            "agencies",
            2,
            AssociationOptions::new().keep_join_rows(),
            None,
        )
        .await
        .expect("Could not detach sword");
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1]);
    assert_eq!(joined(Filter::eq("account_id", 1)).await, 2);
    assert_eq!(
        joined(Filter::eq("account_id", 1).and_eq("agency_id", Value::Null)).await,
        1
    );

    // Create
    let nexus = steve
        .create_association(
            "agencies",
            values! { "name" => "nexus" },
            AssociationOptions::new(),
            None,
        )
        .await
        .expect("Could not create nexus");
    let nexus_id = nexus.get_as::<i32>("id").unwrap();
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1, nexus_id]);
    assert_eq!(
        joined(Filter::eq("account_id", 1).and_eq("agency_id", nexus_id)).await,
        1
    );

    // Destroy deletes the join rows and the related rows
    let destroyed = steve
        .destroy_associations("agencies", &nexus, AssociationOptions::new(), None)
        .await
        .expect("Could not destroy nexus");
    assert_eq!(ids(&destroyed), [nexus_id]);
    assert_eq!(ids(steve.association("agencies").unwrap().records()), [1]);
    assert_eq!(
        agency
            .count(Filter::eq("name", "nexus"))
            .await
            .expect("Could not count"),
        0
    );

    // Unrelated rows are not destroyed
    let destroyed = steve
        .destroy_associations("agencies", 3, AssociationOptions::new(), None)
        .await
        .expect("Could not destroy hydra");
    assert!(destroyed.is_empty());
    assert_eq!(agency.count(()).await.expect("Could not count"), 3);
}

/// Association rows are bounded by the association options only.
pub async fn association_limits<D: Driver>(driver: D, url: &str) {
    let database = Database::connect(
        driver,
        config(url).with_model_options(
            "Account",
            ModelOptions {
                limit: Some(1),
                ..Default::default()
            },
        ),
    )
    .await
    .expect("Could not connect with a small limit");
    let account = database.model("Account").expect("Model Account is missing");
    let group = database
        .model("AccountGroup")
        .expect("Model AccountGroup is missing");
    assert_eq!(account.find(()).await.expect("Could not find").len(), 1);

    let mut avengers = group
        .find_one(1)
        .await
        .expect("Could not find the avengers")
        .expect("The avengers are missing");
    avengers
        .populate("accounts", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the accounts");
    assert_eq!(ids(avengers.association("accounts").unwrap().records()), [1, 2]);
    let found = avengers
        .find_associations("accounts", AssociationOptions::new().offset(1), None)
        .await
        .expect("Could not look for the accounts");
    assert_eq!(ids(&found), [2]);

    let mut shield = database
        .model("Agency")
        .expect("Model Agency is missing")
        .find_one(1)
        .await
        .expect("Could not find shield")
        .expect("Shield is missing");
    shield
        .populate("accounts", AssociationOptions::new(), None)
        .await
        .expect("Could not populate the accounts");
    assert_eq!(ids(shield.association("accounts").unwrap().records()), [1, 2]);
    database.close();
}
