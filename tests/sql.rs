mod common;

#[cfg(test)]
mod tests {
    use crate::common::registry_database;
    use indoc::indoc;
    use tessera::{
        Condition, Filter, LockMode, OrderBy, Query, Selection, SqlWriter, Value, values,
    };
    use tessera_postgres::PostgresSqlWriter;

    const WRITER: PostgresSqlWriter = PostgresSqlWriter {};

    #[tokio::test]
    async fn select_locked_row() {
        let database = registry_database();
        let account = database.model("Account").unwrap();
        let mut query = Query::default();
        let filter = Filter::eq("id", 1);
        WRITER.write_select(
            &mut query,
            account.table_ref(),
            &Selection {
                limit: Some(2),
                lock: Some(LockMode::NoWait),
                ..Selection::new(account.columns(), &filter)
            },
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                SELECT "id", "account_group_id", "account_state_id", "email", "first_name", "encrypted_password" FROM "public"."account" WHERE "id" = $1 LIMIT 2 FOR UPDATE NOWAIT
            "#}
            .trim()
        );
        assert_eq!(query.params, [Value::from(1)]);
    }

    #[tokio::test]
    async fn select_through_join_table() {
        let database = registry_database();
        let agency = database.model("Agency").unwrap();
        let join = database.model("AccountXAgency").unwrap();
        let mut query = Query::default();
        let filter = Filter::new().with("name", Condition::Like("s%".into()));
        let order = [OrderBy::desc("name")];
        WRITER.write_select_through(
            &mut query,
            agency.table_ref(),
            "id",
            join.table_ref(),
            "account_x_agency.account_id",
            "account_x_agency.agency_id",
            Value::from(1),
            &Selection {
                order: &order,
                limit: Some(1),
                offset: Some(1),
                ..Selection::new(&[], &filter)
            },
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                SELECT "agency".* FROM "public"."agency" JOIN "public"."account_x_agency" ON "account_x_agency"."agency_id" = "agency"."id" WHERE "account_x_agency"."account_id" = $1 AND "agency"."name" LIKE $2 ORDER BY "agency"."name" DESC LIMIT 1 OFFSET 1
            "#}
            .trim()
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn insert_rows() {
        let mut query = Query::default();
        WRITER.write_insert(
            &mut query,
            &tessera::TableRef::new("public", "agency"),
            &["name".to_string()],
            vec![vec![Value::from("shield")], vec![Value::from("sword")]],
            &["id".to_string(), "name".to_string()],
        );
        assert_eq!(
            query.sql,
            r#"INSERT INTO "public"."agency" ("name") VALUES ($1), ($2) RETURNING "id", "name""#
        );
        let mut query = Query::default();
        WRITER.write_insert(
            &mut query,
            &tessera::TableRef::new("", "agency"),
            &[],
            vec![],
            &[],
        );
        assert_eq!(query.sql, r#"INSERT INTO "agency" DEFAULT VALUES RETURNING *"#);
    }

    #[test]
    fn conditions() {
        let mut query = Query::default();
        let filter = Filter::eq("deleted_at", Value::Null)
            .with("version", Condition::Gte(Value::from(2)))
            .with("account_state_id", Condition::NotIn(vec![]))
            .with("email", Condition::Ne(Value::Null))
            .with("id", Condition::In(vec![Value::from(1), Value::from(2)]));
        WRITER.write_update(
            &mut query,
            &tessera::TableRef::new("", "account"),
            &values! { "first_name" => "Steve" },
            &filter,
            &[],
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                UPDATE "account" SET "first_name" = $1 WHERE "deleted_at" IS NULL AND "version" >= $2 AND TRUE AND "email" IS NOT NULL AND "id" IN ($3, $4) RETURNING *
            "#}
            .trim()
        );
    }
}
