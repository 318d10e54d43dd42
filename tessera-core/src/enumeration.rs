use crate::{DatabaseConfig, Driver, Naming, Record, Value};
use indexmap::IndexMap;

/// Whether `table` holds a fixed set of named values rather than domain rows.
pub fn is_enumeration_table(config: &DatabaseConfig, table: &str) -> bool {
    config.enumeration_tables.iter().any(|v| v == table)
        || config
            .enumeration_table_suffixes
            .iter()
            .any(|v| table.ends_with(v.as_str()))
}

/// Content of an enumeration table, loaded once at startup and never refreshed.
///
/// Keys are the `name` column in SHOUTY_SNAKE_CASE, values the primary key:
/// `{ "EDIT_TICKETS": 2, "VIEW_TICKETS": 1 }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    identity: String,
    table: String,
    entries: IndexMap<String, Value>,
}

impl Enumeration {
    pub fn new<K: Into<String>, V: Into<Value>>(
        identity: impl Into<String>,
        table: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            identity: identity.into(),
            table: table.into(),
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub(crate) fn from_records<D: Driver>(
        identity: &str,
        table: &str,
        key: &str,
        naming: &Naming,
        records: &[Record<D>],
    ) -> Self {
        let mut entries = IndexMap::new();
        for record in records {
            let Some(name) = record.get("name").and_then(Value::as_str) else {
                log::warn!("Skipping a row of enumeration `{}` without a name", table);
                continue;
            };
            let id = record.get(key).cloned().unwrap_or_default();
            entries.insert(naming.enumeration_key(name), id);
        }
        Self {
            identity: identity.to_string(),
            table: table.to_string(),
            entries,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
    pub fn table(&self) -> &str {
        &self.table
    }
    /// Identifier of the entry named `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
    /// Name of the entry whose identifier is `id`.
    pub fn name_of(&self, id: &Value) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == id)
            .map(|(k, _)| k.as_str())
    }
    pub fn contains(&self, id: &Value) -> bool {
        self.entries.values().any(|v| v == id)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Enumeration, is_enumeration_table};
    use crate::{DatabaseConfig, Value};

    #[test]
    fn detect_tables() {
        let config = DatabaseConfig::default().with_enumeration_table("account_permission");
        assert!(is_enumeration_table(&config, "account_permission"));
        assert!(is_enumeration_table(&config, "account_state"));
        assert!(is_enumeration_table(&config, "ticket_type"));
        assert!(!is_enumeration_table(&config, "account"));
        assert!(!is_enumeration_table(&config, "state_machine"));
    }

    #[test]
    fn lookups() {
        let permission = Enumeration::new(
            "AccountPermission",
            "account_permission",
            [("VIEW_TICKETS", 1), ("EDIT_TICKETS", 2)],
        );
        assert_eq!(permission.get("EDIT_TICKETS"), Some(&Value::Int32(Some(2))));
        assert_eq!(permission.name_of(&Value::Int64(Some(1))), Some("VIEW_TICKETS"));
        assert!(permission.contains(&Value::Int16(Some(2))));
        assert!(!permission.contains(&Value::Int32(Some(3))));
        assert!(!permission.contains(&Value::Null));
        assert_eq!(permission.len(), 2);
    }
}
