mod common;

#[cfg(test)]
mod tests {
    use crate::common::registry_database;
    use serde_json::json;
    use tessera::{AssociationValue, ErrorExt, ErrorKind, Value};

    #[tokio::test]
    async fn built_records_track_changes() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let mut record = account.build([("email", "bucky@barnes.com"), ("firstName", "Bucky")]);
        assert!(record.is_detached());
        assert!(record.is_dirty());
        assert!(record.row().is_empty());
        assert_eq!(record.dirty().len(), 2);
        assert_eq!(record.get("first_name"), Some(&Value::from("Bucky")));
        assert_eq!(record.get_as::<String>("firstName").unwrap(), "Bucky");
        assert_eq!(record.get_as::<Option<String>>("encrypted_password").unwrap(), None);

        record.set("nickname", "Winter Soldier");
        assert_eq!(record.dirty().len(), 2);
        record.set_values([("encryptedPassword", "hydra")]);
        assert_eq!(record.dirty().len(), 3);

        let json = record.to_json();
        assert_eq!(json, json!({"email": "bucky@barnes.com", "first_name": "Bucky"}));
        assert_eq!(record.to_object()["encrypted_password"], "hydra");

        record.reset();
        assert!(!record.is_dirty());
        assert_eq!(record.get("email"), None);
        assert!(record.primary_key_value().is_none());
    }

    #[tokio::test]
    async fn drafts_are_destroyed_locally() {
        let database = registry_database();
        let group = database.model("AccountGroup").unwrap();
        let mut draft = group.new_record();
        draft.set("name", "thunderbolts");
        draft.destroy(None).await.expect("A draft needs no statement");
        assert!(draft.is_destroyed());
        let error = draft.save(None).await.expect_err("The draft is destroyed");
        assert!(error.is_destroyed_record());
    }

    #[tokio::test]
    async fn enumeration_associations_are_assignable() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let mut record = account.new_record();
        assert!(record.association_value("accountState").unwrap().is_empty());
        assert!(record.association("accountState").unwrap().is_enumeration());

        record.set_association("account_state", 2).unwrap();
        assert_eq!(record.get("accountStateId"), Some(&Value::from(2)));
        assert!(matches!(
            record.association_value("accountState").unwrap(),
            AssociationValue::Id(id) if id == Value::from(2)
        ));

        let error = record.set_association("accountState", 9).unwrap_err();
        assert!(error.is_invalid_enumeration_value());
        assert_eq!(record.get("account_state_id"), Some(&Value::from(2)));
        let error = record.set_association("accountGroup", 1).unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::AssociationNotAssignable { association, .. })
                if association == "accountGroup"
        ));
        let error = record.set_association("agencies", 1).unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::AssociationNotAssignable { .. })
        ));
        record.set_association("accountState", Value::Null).unwrap();
        assert!(record.association_value("accountState").unwrap().is_empty());
    }

    #[tokio::test]
    async fn associations_start_empty() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let mut record = account.new_record();
        let proxy = record.association("accountGroup").unwrap();
        assert!(!proxy.is_populated());
        assert!(proxy.records().is_empty());
        assert!(record.association_value("agencies").unwrap().is_empty());
        assert_eq!(record.to_json(), json!({}));

        let error = record.association("friends").unwrap_err();
        assert!(error.is_unknown_association());
        let error = record.association("encryptedPassword").unwrap_err();
        assert!(error.is_unknown_association());
    }
}
