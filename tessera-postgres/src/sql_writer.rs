use tessera_core::{Query, SqlWriter, Value};

/// Postgres numbers its placeholders: `$1`, `$2`...
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn write_placeholder(&self, out: &mut Query, value: Value) {
        let position = out.bind(value);
        out.sql.push('$');
        out.sql.push_str(&position.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::PostgresSqlWriter;
    use indoc::indoc;
    use tessera_core::{Filter, Query, SqlWriter, TableRef, values};

    #[test]
    fn numbered_placeholders() {
        let writer = PostgresSqlWriter {};
        let mut query = Query::default();
        writer.write_update(
            &mut query,
            &TableRef::new("public", "account"),
            &values! { "email" => "steve@rogers.com", "account_state_id" => 2 },
            &Filter::eq("id", 7),
            &["id".to_string()],
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                UPDATE "public"."account" SET "email" = $1, "account_state_id" = $2 WHERE "id" = $3 RETURNING "id"
            "#}
            .trim()
        );
        assert_eq!(query.params.len(), 3);
    }
}
