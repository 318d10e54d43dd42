use crate::{
    Condition, Direction, Filter, OrderBy, Query, TableRef, Value, Values, separated_by,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// `FOR UPDATE`, waits for the current holder.
    Wait,
    /// `FOR UPDATE NOWAIT`, fails right away when the row is locked.
    NoWait,
}

/// Everything a `SELECT` needs besides the table.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// Projected columns, every column (`*`) when empty.
    pub columns: &'a [String],
    pub filter: &'a Filter,
    pub order: &'a [OrderBy],
    /// Zero means no limit.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub lock: Option<LockMode>,
}

impl<'a> Selection<'a> {
    pub fn new(columns: &'a [String], filter: &'a Filter) -> Self {
        Self {
            columns,
            filter,
            order: &[],
            limit: None,
            offset: None,
            lock: None,
        }
    }
}

/// Renders the statements issued by models and records.
///
/// Every method has a default producing standard SQL with `?` placeholders, drivers override
/// what their dialect does differently.
pub trait SqlWriter {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_table_ref(&self, out: &mut String, table: &TableRef) {
        if !table.schema.is_empty() {
            self.write_identifier_quoted(out, &table.schema);
            out.push('.');
        }
        self.write_identifier_quoted(out, &table.name);
    }

    /// Writes `column`, qualified by its own `table.` prefix or else by `qualifier`.
    fn write_column_ref(&self, out: &mut String, column: &str, qualifier: Option<&str>) {
        let (table, column) = match column.split_once('.') {
            Some((table, column)) => (Some(table), column),
            None => (qualifier, column),
        };
        if let Some(table) = table {
            self.write_identifier_quoted(out, table);
            out.push('.');
        }
        self.write_identifier_quoted(out, column);
    }

    fn write_placeholder(&self, out: &mut Query, value: Value) {
        out.bind(value);
        out.sql.push('?');
    }

    fn write_columns(&self, out: &mut String, columns: &[String], qualifier: Option<&str>) {
        if columns.is_empty() {
            if let Some(qualifier) = qualifier {
                self.write_identifier_quoted(out, qualifier);
                out.push('.');
            }
            out.push('*');
            return;
        }
        separated_by(
            out,
            columns,
            |out, v| self.write_column_ref(out, v, qualifier),
            ", ",
        );
    }

    fn write_condition(
        &self,
        out: &mut Query,
        column: &str,
        condition: &Condition,
        qualifier: Option<&str>,
    ) {
        let binary = |out: &mut Query, op: &str, value: &Value| {
            self.write_column_ref(&mut out.sql, column, qualifier);
            out.sql.push_str(op);
            self.write_placeholder(out, value.clone());
        };
        let list = |out: &mut Query, op: &str, values: &[Value]| {
            self.write_column_ref(&mut out.sql, column, qualifier);
            out.sql.push_str(op);
            out.sql.push('(');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(", ");
                }
                self.write_placeholder(out, value.clone());
            }
            out.sql.push(')');
        };
        match condition {
            Condition::Eq(v) if v.is_null() => {
                self.write_column_ref(&mut out.sql, column, qualifier);
                out.sql.push_str(" IS NULL");
            }
            Condition::Ne(v) if v.is_null() => {
                self.write_column_ref(&mut out.sql, column, qualifier);
                out.sql.push_str(" IS NOT NULL");
            }
            Condition::Eq(v) => binary(out, " = ", v),
            Condition::Ne(v) => binary(out, " <> ", v),
            Condition::Gt(v) => binary(out, " > ", v),
            Condition::Gte(v) => binary(out, " >= ", v),
            Condition::Lt(v) => binary(out, " < ", v),
            Condition::Lte(v) => binary(out, " <= ", v),
            Condition::In(v) if v.is_empty() => out.sql.push_str("FALSE"),
            Condition::NotIn(v) if v.is_empty() => out.sql.push_str("TRUE"),
            Condition::In(v) => list(out, " IN ", v),
            Condition::NotIn(v) => list(out, " NOT IN ", v),
            Condition::Like(v) => binary(out, " LIKE ", &Value::Varchar(Some(v.clone()))),
        }
    }

    fn write_where(&self, out: &mut Query, filter: &Filter, qualifier: Option<&str>) {
        for (i, (column, condition)) in filter.iter().enumerate() {
            out.sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.write_condition(out, column, condition, qualifier);
        }
    }

    fn write_order(&self, out: &mut String, order: &[OrderBy], qualifier: Option<&str>) {
        if order.is_empty() {
            return;
        }
        out.push_str(" ORDER BY ");
        separated_by(
            out,
            order,
            |out, v| {
                self.write_column_ref(out, &v.column, qualifier);
                out.push_str(match v.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
            },
            ", ",
        );
    }

    fn write_limit(&self, out: &mut String, limit: Option<u32>, offset: Option<u32>) {
        if let Some(limit) = limit.filter(|v| *v > 0) {
            out.push_str(" LIMIT ");
            out.push_str(&limit.to_string());
        }
        if let Some(offset) = offset.filter(|v| *v > 0) {
            out.push_str(" OFFSET ");
            out.push_str(&offset.to_string());
        }
    }

    fn write_lock(&self, out: &mut String, lock: LockMode) {
        out.push_str(match lock {
            LockMode::Wait => " FOR UPDATE",
            LockMode::NoWait => " FOR UPDATE NOWAIT",
        });
    }

    fn write_returning(&self, out: &mut String, returning: &[String]) {
        out.push_str(" RETURNING ");
        self.write_columns(out, returning, None);
    }

    fn write_select(&self, out: &mut Query, table: &TableRef, selection: &Selection) {
        out.sql.push_str("SELECT ");
        self.write_columns(&mut out.sql, selection.columns, None);
        out.sql.push_str(" FROM ");
        self.write_table_ref(&mut out.sql, table);
        self.write_where(out, selection.filter, None);
        self.write_order(&mut out.sql, selection.order, None);
        self.write_limit(&mut out.sql, selection.limit, selection.offset);
        if let Some(lock) = selection.lock {
            self.write_lock(&mut out.sql, lock);
        }
    }

    /// Rows of `table` linked to `owner` through the join table.
    ///
    /// `from_column` and `to_column` are qualified by the join table name, unqualified columns
    /// of the selection belong to `table`.
    #[allow(clippy::too_many_arguments)]
    fn write_select_through(
        &self,
        out: &mut Query,
        table: &TableRef,
        key: &str,
        through: &TableRef,
        from_column: &str,
        to_column: &str,
        owner: Value,
        selection: &Selection,
    ) {
        let qualifier = Some(table.name.as_str());
        out.sql.push_str("SELECT ");
        self.write_columns(&mut out.sql, selection.columns, qualifier);
        out.sql.push_str(" FROM ");
        self.write_table_ref(&mut out.sql, table);
        out.sql.push_str(" JOIN ");
        self.write_table_ref(&mut out.sql, through);
        out.sql.push_str(" ON ");
        self.write_column_ref(&mut out.sql, to_column, Some(&through.name));
        out.sql.push_str(" = ");
        self.write_column_ref(&mut out.sql, key, qualifier);
        let filter = Filter::eq(from_column, owner).and(selection.filter.clone());
        self.write_where(out, &filter, qualifier);
        self.write_order(&mut out.sql, selection.order, qualifier);
        self.write_limit(&mut out.sql, selection.limit, selection.offset);
    }

    fn write_count(
        &self,
        out: &mut Query,
        table: &TableRef,
        column: Option<&str>,
        filter: &Filter,
    ) {
        out.sql.push_str("SELECT COUNT(");
        match column {
            Some(column) => self.write_column_ref(&mut out.sql, column, None),
            None => out.sql.push('*'),
        }
        out.sql.push_str(") AS ");
        self.write_identifier_quoted(&mut out.sql, "count");
        out.sql.push_str(" FROM ");
        self.write_table_ref(&mut out.sql, table);
        self.write_where(out, filter, None);
    }

    /// Multi row insert, `rows` are aligned with `columns`.
    fn write_insert(
        &self,
        out: &mut Query,
        table: &TableRef,
        columns: &[String],
        rows: Vec<Vec<Value>>,
        returning: &[String],
    ) {
        out.sql.push_str("INSERT INTO ");
        self.write_table_ref(&mut out.sql, table);
        if columns.is_empty() {
            out.sql.push_str(" DEFAULT VALUES");
        } else {
            out.sql.push_str(" (");
            self.write_columns(&mut out.sql, columns, None);
            out.sql.push_str(") VALUES ");
            for (i, row) in rows.into_iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(", ");
                }
                out.sql.push('(');
                for (j, value) in row.into_iter().enumerate() {
                    if j > 0 {
                        out.sql.push_str(", ");
                    }
                    self.write_placeholder(out, value);
                }
                out.sql.push(')');
            }
        }
        self.write_returning(&mut out.sql, returning);
    }

    fn write_update(
        &self,
        out: &mut Query,
        table: &TableRef,
        values: &Values,
        filter: &Filter,
        returning: &[String],
    ) {
        out.sql.push_str("UPDATE ");
        self.write_table_ref(&mut out.sql, table);
        out.sql.push_str(" SET ");
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(", ");
            }
            self.write_identifier_quoted(&mut out.sql, column);
            out.sql.push_str(" = ");
            self.write_placeholder(out, value.clone());
        }
        self.write_where(out, filter, None);
        self.write_returning(&mut out.sql, returning);
    }

    fn write_delete(
        &self,
        out: &mut Query,
        table: &TableRef,
        filter: &Filter,
        returning: &[String],
    ) {
        out.sql.push_str("DELETE FROM ");
        self.write_table_ref(&mut out.sql, table);
        self.write_where(out, filter, None);
        self.write_returning(&mut out.sql, returning);
    }
}

/// Writer with the default behavior of every method.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSqlWriter;

impl SqlWriter for GenericSqlWriter {}

#[cfg(test)]
mod tests {
    use super::{GenericSqlWriter, LockMode, Selection, SqlWriter};
    use crate::{Condition, Filter, OrderBy, Query, TableRef, Value};
    use indoc::indoc;

    #[test]
    fn select_with_everything() {
        let writer = GenericSqlWriter;
        let mut query = Query::default();
        let columns = ["id".to_string(), "email".to_string()];
        let filter = Filter::eq("active", true)
            .with("id", Condition::In(vec![Value::from(1), Value::from(2)]))
            .with("deleted_at", Condition::Eq(Value::Null));
        let order = [OrderBy::desc("id")];
        let selection = Selection {
            order: &order,
            limit: Some(10),
            offset: Some(0),
            lock: Some(LockMode::NoWait),
            ..Selection::new(&columns, &filter)
        };
        writer.write_select(&mut query, &TableRef::new("public", "account"), &selection);
        assert_eq!(
            query.sql,
            indoc! {r#"
                SELECT "id", "email" FROM "public"."account" WHERE "active" = ? AND "id" IN (?, ?) AND "deleted_at" IS NULL ORDER BY "id" DESC LIMIT 10 FOR UPDATE NOWAIT
            "#}
            .trim()
        );
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let writer = GenericSqlWriter;
        let mut query = Query::default();
        let filter = Filter::is_in("id", Vec::<Value>::new());
        writer.write_delete(&mut query, &TableRef::new("", "agency"), &filter, &[]);
        assert_eq!(query.sql, r#"DELETE FROM "agency" WHERE FALSE RETURNING *"#);
        assert!(query.params.is_empty());
    }

    #[test]
    fn quoted_identifiers() {
        let writer = GenericSqlWriter;
        let mut out = String::new();
        writer.write_column_ref(&mut out, "we\"ird.col", None);
        assert_eq!(out, r#""we""ird"."col""#);
    }
}
