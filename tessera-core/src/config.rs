use crate::OrderBy;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, env};

/// Defaults applied to the operations of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Default `find` limit, `None` or `Some(0)` mean unlimited.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Default `find` order, the primary key when empty.
    pub order: Vec<OrderBy>,
    /// Columns left out of `Record::to_json`.
    pub omit: Vec<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            limit: Some(100),
            offset: None,
            order: Vec::new(),
            omit: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_size: 5 }
    }
}

/// Startup configuration of a [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection url understood by the driver.
    pub connection: String,
    /// Statement timeout in milliseconds, applied to every connection.
    pub statement_timeout: u64,
    /// Schema to introspect, the first existing entry of `search_path` when missing.
    pub schema: Option<String>,
    pub enumeration_tables: Vec<String>,
    pub enumeration_table_suffixes: Vec<String>,
    pub pluralized_table_names: bool,
    pub pool: PoolConfig,
    pub models: ModelOptions,
    /// Per model options, keyed by model identity or table name.
    pub model_options: BTreeMap<String, ModelOptions>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection: String::new(),
            statement_timeout: 10_000,
            schema: None,
            enumeration_tables: Vec::new(),
            enumeration_table_suffixes: ["_type", "_status", "_state"]
                .into_iter()
                .map(Into::into)
                .collect(),
            pluralized_table_names: false,
            pool: Default::default(),
            models: Default::default(),
            model_options: Default::default(),
        }
    }
}

impl DatabaseConfig {
    /// Defaults with the connection url taken from `DATABASE_URL`.
    pub fn from_env() -> Self {
        Self {
            connection: env::var("DATABASE_URL").unwrap_or_default(),
            ..Default::default()
        }
    }
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
    pub fn with_enumeration_table(mut self, table: impl Into<String>) -> Self {
        self.enumeration_tables.push(table.into());
        self
    }
    pub fn with_model_options(mut self, model: impl Into<String>, options: ModelOptions) -> Self {
        self.model_options.insert(model.into(), options);
        self
    }
    /// Options of the model, the per model entry replaces the defaults.
    pub fn model_options(&self, identity: &str, table: &str) -> ModelOptions {
        self.model_options
            .get(identity)
            .or_else(|| self.model_options.get(table))
            .unwrap_or(&self.models)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::DatabaseConfig;
    use crate::OrderBy;

    #[test]
    fn deserialize_partial() {
        let config: DatabaseConfig = serde_json::from_value(serde_json::json!({
            "connection": "postgres://localhost/app",
            "statement_timeout": 2500,
            "enumeration_tables": ["account_permission"],
            "model_options": {
                "Account": { "omit": ["encrypted_password"], "order": ["created_at desc"] }
            }
        }))
        .expect("Could not deserialize the config");
        assert_eq!(config.statement_timeout, 2500);
        assert_eq!(config.enumeration_table_suffixes, ["_type", "_status", "_state"]);
        assert_eq!(config.pool.max_size, 5);
        let account = config.model_options("Account", "account");
        assert_eq!(account.omit, ["encrypted_password"]);
        assert_eq!(account.order, [OrderBy::desc("created_at")]);
        assert_eq!(account.limit, Some(100));
        assert_eq!(config.model_options("Agency", "agency").omit, Vec::<String>::new());
    }
}
