use crate::{
    AVAILABLE_SCHEMAS_QUERY, DatabaseConfig, Driver, Enumeration, ErrorContext, ErrorKind, Event,
    Executor, Handle, Model, ModelExtension, Naming, Observer, Phase, Pool, Query, Result,
    RowLabeled, RowsAffected, SEARCH_PATH_QUERY, TABLE_DESCRIPTION_QUERY, TableDescription,
    TableModel, Transaction, Value, describe_tables, infer_associations, is_enumeration_table,
    resolve_schema,
};
use indexmap::IndexMap;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

struct DatabaseInner<D: Driver> {
    driver: Arc<D>,
    config: Arc<DatabaseConfig>,
    naming: Naming,
    pool: Pool<D>,
    schema: String,
    descriptions: IndexMap<String, TableDescription>,
    /// Keyed by table name.
    models: IndexMap<String, Arc<TableModel>>,
    /// Model identity to table name.
    identities: HashMap<String, String>,
    /// Keyed by model identity, frozen once loaded.
    enumerations: OnceLock<IndexMap<String, Enumeration>>,
    observers: Vec<Arc<dyn Observer<D>>>,
}

/// Entry point: the models of every table of one schema, sharing a connection pool.
///
/// Cloning is cheap, every clone refers to the same pool and models.
pub struct Database<D: Driver> {
    inner: Arc<DatabaseInner<D>>,
}

impl<D: Driver> Clone for Database<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct DatabaseBuilder<D: Driver> {
    driver: D,
    config: DatabaseConfig,
    observers: Vec<Arc<dyn Observer<D>>>,
    extensions: HashMap<String, Arc<dyn ModelExtension>>,
}

impl<D: Driver> DatabaseBuilder<D> {
    /// Registers an observer notified around every model operation.
    pub fn observe(mut self, observer: impl Observer<D> + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Attaches an extension to the model with the given identity or table name.
    pub fn extend(
        mut self,
        model: impl Into<String>,
        extension: impl ModelExtension + 'static,
    ) -> Self {
        self.extensions.insert(model.into(), Arc::new(extension));
        self
    }

    /// Introspects the schema, builds the models and loads the enumerations.
    pub async fn connect(self) -> Result<Database<D>> {
        let driver = Arc::new(self.driver);
        let config = Arc::new(self.config);
        let pool = Pool::new(driver.clone(), config.clone())?;
        let (schema, descriptions) = {
            let mut connection = pool.get().await?;
            let schema = find_schema(&mut *connection, config.schema.as_deref()).await?;
            log::info!("Introspecting schema `{}` with {}", schema, D::NAME);
            let rows = connection
                .fetch(&Query::new(TABLE_DESCRIPTION_QUERY).with_param(schema.as_str()))
                .await
                .with_context(|| format!("While describing the tables of `{}`", schema))?;
            (schema, describe_tables(rows)?)
        };
        let database = Database::build(
            driver,
            config,
            pool,
            schema,
            descriptions,
            self.observers,
            self.extensions,
        )?;
        let mut enumerations = IndexMap::new();
        for model in database.models().filter(Model::is_enumeration) {
            let key = model.primary_key().unwrap_or("id").to_string();
            if !model.has_column(&key) || !model.has_column("name") {
                log::warn!(
                    "Enumeration table `{}` needs `{}` and `name` columns, it is left empty",
                    model.table_name(),
                    key
                );
                enumerations.insert(
                    model.identity().to_string(),
                    Enumeration::new(
                        model.identity(),
                        model.table_name(),
                        Vec::<(String, Value)>::new(),
                    ),
                );
                continue;
            }
            let records = model
                .find(())
                .limit(0)
                .await
                .with_context(|| format!("While loading enumeration `{}`", model.identity()))?;
            let enumeration = Enumeration::from_records(
                model.identity(),
                model.table_name(),
                &key,
                &database.inner.naming,
                &records,
            );
            log::debug!(
                "Enumeration `{}` loaded with {} entries",
                enumeration.identity(),
                enumeration.len()
            );
            enumerations.insert(model.identity().to_string(), enumeration);
        }
        database.freeze_enumerations(enumerations)?;
        log::info!(
            "Database ready: {} models, {} enumerations",
            database.inner.models.len(),
            database.enumerations().count()
        );
        Ok(database)
    }

    /// Builds the database from already known table descriptions and enumerations, without
    /// talking to the server. The pool still connects lazily on the first statement.
    pub fn assemble(
        self,
        schema: impl Into<String>,
        descriptions: IndexMap<String, TableDescription>,
        enumerations: impl IntoIterator<Item = Enumeration>,
    ) -> Result<Database<D>> {
        let driver = Arc::new(self.driver);
        let config = Arc::new(self.config);
        let pool = Pool::new(driver.clone(), config.clone())?;
        let database = Database::build(
            driver,
            config,
            pool,
            schema.into(),
            descriptions,
            self.observers,
            self.extensions,
        )?;
        database.freeze_enumerations(
            enumerations
                .into_iter()
                .map(|v| (v.identity().to_string(), v))
                .collect(),
        )?;
        Ok(database)
    }
}

async fn find_schema<E: Executor>(executor: &mut E, configured: Option<&str>) -> Result<String> {
    let available = executor
        .fetch(&Query::new(AVAILABLE_SCHEMAS_QUERY))
        .await?
        .iter()
        .map(|v| v.get::<String>("schema_name"))
        .collect::<Result<Vec<_>>>()?;
    if let Some(schema) = configured {
        if available.iter().any(|v| v == schema) {
            return Ok(schema.to_string());
        }
        return Err(ErrorKind::SchemaNotFound {
            schema: Some(schema.to_string()),
        }
        .into_error());
    }
    let search_path = executor
        .fetch(&Query::new(SEARCH_PATH_QUERY))
        .await?
        .first()
        .map(|v| v.get::<String>("search_path"))
        .transpose()?
        .unwrap_or_default();
    resolve_schema(&search_path, available.iter().map(String::as_str)).ok_or_else(|| {
        let error = ErrorKind::SchemaNotFound { schema: None }.into_error();
        log::error!("{:#} (search_path: {})", error, search_path);
        error
    })
}

impl<D: Driver> Database<D> {
    pub fn builder(driver: D, config: DatabaseConfig) -> DatabaseBuilder<D> {
        DatabaseBuilder {
            driver,
            config,
            observers: Vec::new(),
            extensions: HashMap::new(),
        }
    }

    pub async fn connect(driver: D, config: DatabaseConfig) -> Result<Self> {
        Self::builder(driver, config).connect().await
    }

    fn build(
        driver: Arc<D>,
        config: Arc<DatabaseConfig>,
        pool: Pool<D>,
        schema: String,
        descriptions: IndexMap<String, TableDescription>,
        observers: Vec<Arc<dyn Observer<D>>>,
        extensions: HashMap<String, Arc<dyn ModelExtension>>,
    ) -> Result<Self> {
        let naming = Naming::new(config.pluralized_table_names);
        let mut associations = infer_associations(&descriptions, &naming)?;
        let mut models = IndexMap::new();
        let mut identities = HashMap::new();
        for description in descriptions.values() {
            let identity = naming.model_identity(&description.name);
            let extension = extensions
                .get(&identity)
                .or_else(|| extensions.get(&description.name))
                .cloned();
            let mut options = config.model_options(&identity, &description.name);
            if let Some(extension) = &extension {
                extension.configure(&mut options);
            }
            if description.primary_key().is_none() {
                log::debug!(
                    "Table `{}` has no single column primary key, key lookups are unavailable",
                    description.name
                );
            }
            let model = TableModel::new(
                identity.clone(),
                description.clone(),
                associations.shift_remove(&description.name).unwrap_or_default(),
                is_enumeration_table(&config, &description.name),
                options,
                extension,
            );
            identities.insert(identity, description.name.clone());
            models.insert(description.name.clone(), Arc::new(model));
        }
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                driver,
                config,
                naming,
                pool,
                schema,
                descriptions,
                models,
                identities,
                enumerations: OnceLock::new(),
                observers,
            }),
        })
    }

    fn freeze_enumerations(&self, enumerations: IndexMap<String, Enumeration>) -> Result<()> {
        self.inner
            .enumerations
            .set(enumerations)
            .map_err(|_| crate::Error::msg("The enumerations are already loaded"))
    }

    pub fn driver(&self) -> &D {
        &self.inner.driver
    }
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }
    pub fn naming(&self) -> &Naming {
        &self.inner.naming
    }
    /// The introspected schema.
    pub fn schema(&self) -> &str {
        &self.inner.schema
    }
    pub fn table_descriptions(&self) -> &IndexMap<String, TableDescription> {
        &self.inner.descriptions
    }

    /// Model by identity (`AccountGroup`) or table name (`account_group`).
    pub fn model(&self, name: &str) -> Option<Model<D>> {
        let table = self
            .inner
            .identities
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        self.model_by_table(table)
    }

    /// Like [`Database::model`], failing with [`ErrorKind::UnknownModel`].
    pub fn try_model(&self, name: &str) -> Result<Model<D>> {
        self.model(name).ok_or_else(|| {
            ErrorKind::UnknownModel {
                name: name.to_string(),
            }
            .into_error()
        })
    }

    pub fn model_by_table(&self, table: &str) -> Option<Model<D>> {
        self.inner
            .models
            .get(table)
            .map(|v| Model::new(self.clone(), v.clone()))
    }

    pub fn models(&self) -> impl Iterator<Item = Model<D>> + '_ {
        self.inner
            .models
            .values()
            .map(|v| Model::new(self.clone(), v.clone()))
    }

    /// Enumeration by model identity or table name.
    pub fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        let enumerations = self.inner.enumerations.get()?;
        enumerations
            .get(name)
            .or_else(|| enumerations.values().find(|v| v.table() == name))
    }

    pub fn enumerations(&self) -> impl Iterator<Item = &Enumeration> {
        self.inner.enumerations.get().into_iter().flat_map(|v| v.values())
    }

    /// Opens a transaction on a connection reserved until it commits or rolls back.
    pub async fn begin(&self) -> Result<Transaction<D>> {
        let connection = self.inner.pool.get().await?;
        Transaction::begin(connection).await
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` succeeds and rolls back when it fails, unless `f` already closed the
    /// transaction itself. A failing rollback is logged and the error of `f` is returned.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Transaction<D>) -> Result<T>,
    {
        let mut transaction = self.begin().await?;
        match f(&mut transaction).await {
            Ok(value) => {
                transaction.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if !transaction.is_closed() {
                    if let Err(rollback) = transaction.rollback().await {
                        log::error!("Could not roll back the transaction: {:#}", rollback);
                    }
                }
                Err(e)
            }
        }
    }

    /// Runs a raw query, on the transaction when given.
    pub async fn fetch(
        &self,
        query: &Query,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<RowLabeled>> {
        self.handle(transaction).await?.fetch(query).await
    }

    pub async fn execute(
        &self,
        query: &Query,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<RowsAffected> {
        self.handle(transaction).await?.execute(query).await
    }

    /// Runs one or more statements without parameters.
    pub async fn batch(&self, sql: &str, transaction: Option<&mut Transaction<D>>) -> Result<()> {
        self.handle(transaction).await?.batch(sql).await
    }

    pub(crate) async fn handle<'t>(
        &self,
        transaction: Option<&'t mut Transaction<D>>,
    ) -> Result<Handle<'t, D>> {
        Ok(match transaction {
            Some(transaction) => Handle::Transaction(transaction),
            None => Handle::Pooled(self.inner.pool.get().await?),
        })
    }

    pub(crate) async fn emit(&self, event: &Event<'_, D>) -> Result<()> {
        if event.phase == Phase::Before {
            log::debug!("{} on `{}`", event.name(), event.model.identity());
        }
        for observer in &self.inner.observers {
            observer.notify(event).await.with_context(|| {
                format!(
                    "While notifying `{}` on `{}`",
                    event.name(),
                    event.model.identity()
                )
            })?;
        }
        Ok(())
    }

    /// Closes the pool, statements issued afterwards fail.
    pub fn close(&self) {
        log::info!("Closing the {} connection pool", D::NAME);
        self.inner.pool.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }
}
