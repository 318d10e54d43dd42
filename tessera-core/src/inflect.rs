use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use pluralizer::pluralize;

/// Columns ignored when deciding whether a table is a pure join table.
pub const BOOKKEEPING_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "version"];

/// Naming conventions linking tables, columns, models and associations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Naming {
    /// Table names are plural (`accounts`) while foreign keys are singular (`account_id`).
    pub pluralized_table_names: bool,
}

impl Naming {
    pub fn new(pluralized_table_names: bool) -> Self {
        Self {
            pluralized_table_names,
        }
    }

    /// `account_group` => `AccountGroup`
    pub fn model_identity(&self, table: &str) -> String {
        table.to_upper_camel_case()
    }

    /// Table a `<x>_id` column points to, `None` for other columns.
    pub fn referenced_table(&self, column: &str) -> Option<String> {
        let stem = column.strip_suffix("_id").filter(|v| !v.is_empty())?;
        Some(if self.pluralized_table_names {
            inflect_last_word(stem, 2)
        } else {
            stem.to_string()
        })
    }

    /// Name of the association pointing at a single row of `table`.
    pub fn one_name(&self, table: &str) -> String {
        if self.pluralized_table_names {
            inflect_last_word(table, 1).to_lower_camel_case()
        } else {
            table.to_lower_camel_case()
        }
    }

    /// Name of the association pointing at many rows of `table`.
    pub fn many_name(&self, table: &str) -> String {
        if self.pluralized_table_names {
            table.to_lower_camel_case()
        } else {
            inflect_last_word(table, 2).to_lower_camel_case()
        }
    }

    /// Key of an enumeration entry from its `name` column.
    pub fn enumeration_key(&self, name: &str) -> String {
        name.to_shouty_snake_case()
    }

    /// Canonical column name for a camelCase or snake_case key.
    pub fn column_key(&self, key: &str) -> String {
        key.to_snake_case()
    }
}

fn inflect_last_word(name: &str, count: isize) -> String {
    match name.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last, count, false)),
        None => pluralize(name, count, false),
    }
}

#[cfg(test)]
mod tests {
    use super::Naming;

    #[test]
    fn singular_tables() {
        let naming = Naming::new(false);
        assert_eq!(naming.model_identity("account_x_agency"), "AccountXAgency");
        assert_eq!(naming.referenced_table("account_group_id").as_deref(), Some("account_group"));
        assert_eq!(naming.referenced_table("email"), None);
        assert_eq!(naming.referenced_table("_id"), None);
        assert_eq!(naming.one_name("account_group"), "accountGroup");
        assert_eq!(naming.many_name("account"), "accounts");
        assert_eq!(naming.many_name("account_permission"), "accountPermissions");
        assert_eq!(naming.many_name("agency"), "agencies");
        assert_eq!(naming.enumeration_key("modify profile"), "MODIFY_PROFILE");
        assert_eq!(naming.column_key("firstName"), "first_name");
        assert_eq!(naming.column_key("first_name"), "first_name");
    }

    #[test]
    fn pluralized_tables() {
        let naming = Naming::new(true);
        assert_eq!(naming.referenced_table("account_id").as_deref(), Some("accounts"));
        assert_eq!(
            naming.referenced_table("account_group_id").as_deref(),
            Some("account_groups")
        );
        assert_eq!(naming.one_name("account_groups"), "accountGroup");
        assert_eq!(naming.many_name("accounts"), "accounts");
    }
}
