mod common;

#[cfg(test)]
mod tests {
    use crate::common::{
        assemble, column, foreign_key, id, registry, registry_database, table, tables,
    };
    use tessera::{
        AssociationKind, DatabaseConfig, ErrorExt, ErrorKind, Naming, infer_associations,
        join_table,
    };

    #[tokio::test]
    async fn one_and_many_mirror_each_other() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let group = database.model("account_group").unwrap();
        assert_eq!(group.identity(), "AccountGroup");

        let one = account.association("accountGroup").unwrap();
        assert_eq!(one.kind, AssociationKind::One);
        assert_eq!(one.target_table, "account_group");
        assert_eq!(one.column, "account_group_id");
        let many = group.association("accounts").unwrap();
        assert_eq!(many.kind, AssociationKind::Many);
        assert_eq!(many.target_table, "account");
        assert_eq!(many.column, "account_group_id");

        let event = database.model("AccountEvent").unwrap();
        assert_eq!(
            event.associations().keys().collect::<Vec<_>>(),
            ["account"]
        );
        assert_eq!(
            account.associations().keys().collect::<Vec<_>>(),
            ["accountGroup", "accountState", "accountEvents", "agencies"]
        );
    }

    #[tokio::test]
    async fn join_tables_link_both_sides() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let agencies = account.association("agencies").unwrap();
        assert_eq!(agencies.kind, AssociationKind::Through);
        assert_eq!(agencies.target_table, "agency");
        assert_eq!(agencies.through_table.as_deref(), Some("account_x_agency"));
        assert_eq!(agencies.from_column.as_deref(), Some("account_x_agency.account_id"));
        assert_eq!(agencies.to_column.as_deref(), Some("account_x_agency.agency_id"));

        let agency = database.model("Agency").unwrap();
        let accounts = agency.association("accounts").unwrap();
        assert_eq!(accounts.kind, AssociationKind::Through);
        assert_eq!(accounts.from_column.as_deref(), Some("account_x_agency.agency_id"));
        assert_eq!(accounts.to_column.as_deref(), Some("account_x_agency.account_id"));

        let join = database.model("AccountXAgency").unwrap();
        assert!(join.associations().is_empty());
    }

    #[test]
    fn extra_columns_make_a_regular_table() {
        let descriptions = tables([
            table("account", [id()]),
            table("agency", [id()]),
            table(
                "account_x_agency",
                [id(), foreign_key("account_id"), foreign_key("agency_id"), column("role")],
            ),
        ]);
        let naming = Naming::default();
        let join = descriptions.get("account_x_agency").unwrap();
        assert_eq!(join_table(join, &descriptions, &naming), None);
        let associations = infer_associations(&descriptions, &naming).unwrap();
        assert_eq!(
            associations["account_x_agency"].keys().collect::<Vec<_>>(),
            ["account", "agency"]
        );
        assert_eq!(
            associations["account"].keys().collect::<Vec<_>>(),
            ["accountXAgencies"]
        );
    }

    #[tokio::test]
    async fn views_are_left_out() {
        let database = registry_database();
        let view = database.model("ActiveAccount").unwrap();
        assert!(view.associations().is_empty());
        let group = database.model("AccountGroup").unwrap();
        assert!(group.association("activeAccounts").is_none());
        assert!(
            database
                .table_descriptions()
                .get("active_account")
                .unwrap()
                .is_view()
        );
    }

    #[tokio::test]
    async fn colliding_names_fail() {
        let mut descriptions = registry();
        descriptions.insert(
            "agency".into(),
            table("agency", [id(), column("name"), foreign_key("account_id")]),
        );
        let error = assemble(DatabaseConfig::default(), descriptions)
            .err()
            .expect("Two associations are named `agencies`");
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::AssociationCollision { association, .. }) if association == "agencies"
        ));
    }

    #[tokio::test]
    async fn pluralized_tables() {
        let descriptions = tables([
            table("account_groups", [id(), column("name")]),
            table("accounts", [id(), foreign_key("account_group_id")]),
        ]);
        let config = DatabaseConfig {
            pluralized_table_names: true,
            ..Default::default()
        };
        let database = assemble(config, descriptions).unwrap();
        let accounts = database.model("accounts").unwrap();
        let group = accounts.association("accountGroup").unwrap();
        assert_eq!(group.target_table, "account_groups");
        let groups = database.model("AccountGroups").unwrap();
        assert_eq!(
            groups.association("accounts").map(|v| v.kind),
            Some(AssociationKind::Many)
        );
    }

    #[tokio::test]
    async fn enumerations_by_suffix() {
        let database = registry_database();
        assert!(database.model("AccountState").unwrap().is_enumeration());
        assert!(!database.model("Account").unwrap().is_enumeration());
        let states = database.enumeration("account_state").unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states.name_of(&2.into()), Some("SUSPENDED"));
        assert!(database.enumeration("AccountGroup").is_none());
    }
}
