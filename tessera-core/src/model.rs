use crate::{
    AddRows, AssociationDescription, AssociationOptions, Associations, Count, Create, Database,
    Destroy, Driver, Enumeration, ErrorKind, Event, Executor, Filter, Find, FindOne, ModelOptions,
    OrderBy, Query, Record, Result, Select, TableDescription, TableRef, Transaction, Update,
    UpdateOne, Value, Values, Where,
};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Hooks customizing a single model.
pub trait ModelExtension: Send + Sync {
    /// Adjusts the default options of the model, called once at startup.
    fn configure(&self, options: &mut ModelOptions) {
        let _ = options;
    }
    /// Transforms every row read by the model before it becomes a record.
    fn parse(&self, row: Values) -> Result<Values> {
        Ok(row)
    }
}

/// Everything known about one table, built at startup and immutable afterwards.
pub struct TableModel {
    identity: String,
    table: TableRef,
    description: TableDescription,
    columns: Vec<String>,
    associations: Associations,
    is_enumeration: bool,
    options: ModelOptions,
    extension: Option<Arc<dyn ModelExtension>>,
}

impl TableModel {
    pub(crate) fn new(
        identity: String,
        description: TableDescription,
        associations: Associations,
        is_enumeration: bool,
        options: ModelOptions,
        extension: Option<Arc<dyn ModelExtension>>,
    ) -> Self {
        Self {
            identity,
            table: TableRef::new(description.schema.clone(), description.name.clone()),
            columns: description.column_names().map(ToString::to_string).collect(),
            description,
            associations,
            is_enumeration,
            options,
            extension,
        }
    }
}

/// Handle to the model of one table, cheap to clone.
pub struct Model<D: Driver> {
    database: Database<D>,
    table: Arc<TableModel>,
}

impl<D: Driver> Clone for Model<D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            table: self.table.clone(),
        }
    }
}

impl<D: Driver> fmt::Debug for Model<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("identity", &self.table.identity)
            .field("table", &self.table.table)
            .finish()
    }
}

impl<D: Driver> Model<D> {
    pub(crate) fn new(database: Database<D>, table: Arc<TableModel>) -> Self {
        Self { database, table }
    }

    pub fn database(&self) -> &Database<D> {
        &self.database
    }
    pub fn identity(&self) -> &str {
        &self.table.identity
    }
    pub fn table_name(&self) -> &str {
        &self.table.table.name
    }
    pub fn table_ref(&self) -> &TableRef {
        &self.table.table
    }
    pub fn description(&self) -> &TableDescription {
        &self.table.description
    }
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }
    pub fn has_column(&self, column: &str) -> bool {
        self.table.description.has_column(column)
    }
    /// The single column primary key.
    pub fn primary_key(&self) -> Option<&str> {
        self.table.description.primary_key()
    }
    pub fn primary_keys(&self) -> &[String] {
        &self.table.description.primary_keys
    }
    pub fn associations(&self) -> &Associations {
        &self.table.associations
    }
    pub fn association(&self, name: &str) -> Option<&AssociationDescription> {
        self.table.associations.get(name)
    }
    /// Model of the rows the association points to.
    pub fn association_model(&self, name: &str) -> Option<Model<D>> {
        self.database
            .model_by_table(&self.association(name)?.target_table)
    }
    pub fn options(&self) -> &ModelOptions {
        &self.table.options
    }
    pub fn is_enumeration(&self) -> bool {
        self.table.is_enumeration
    }
    pub fn enumeration(&self) -> Option<&Enumeration> {
        self.database.enumeration(&self.table.identity)
    }

    /// A record not yet persisted, `save` inserts it.
    pub fn new_record(&self) -> Record<D> {
        Record::detached(self.clone())
    }

    pub fn build<K: AsRef<str>, V: Into<Value>>(
        &self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Record<D> {
        let mut record = self.new_record();
        record.set_values(values);
        record
    }

    /// Rows projected on `columns`, every column when empty.
    pub fn select<C: Into<String>>(
        &self,
        columns: impl IntoIterator<Item = C>,
        target: impl Into<Where>,
    ) -> Select<'static, D> {
        Select::new(
            self.clone(),
            columns.into_iter().map(Into::into).collect(),
            target.into(),
        )
    }
    pub fn count(&self, target: impl Into<Where>) -> Count<'static, D> {
        Count::new(self.clone(), target.into())
    }
    pub fn find(&self, target: impl Into<Where>) -> Find<'static, D> {
        Find::new(self.clone(), target.into())
    }
    pub fn find_one(&self, target: impl Into<Where>) -> FindOne<'static, D> {
        FindOne::new(self.clone(), target.into())
    }
    pub fn create(&self, values: Values) -> Create<'static, D> {
        Create::new(self.clone(), values)
    }
    pub fn add_rows(&self, rows: impl IntoIterator<Item = Values>) -> AddRows<'static, D> {
        AddRows::new(self.clone(), rows.into_iter().collect())
    }
    pub fn update(&self, target: impl Into<Where>, values: Values) -> Update<'static, D> {
        Update::new(self.clone(), target.into(), values)
    }
    pub fn update_one(&self, target: impl Into<Where>, values: Values) -> UpdateOne<'static, D> {
        UpdateOne::new(self.clone(), target.into(), values)
    }
    pub fn destroy(&self, target: impl Into<Where>) -> Destroy<'static, D> {
        Destroy::new(self.clone(), target.into())
    }

    pub(crate) fn sql_writer(&self) -> D::SqlWriter {
        self.database.driver().sql_writer()
    }

    pub(crate) fn key_column(&self) -> Result<&str> {
        self.primary_key().ok_or_else(|| {
            ErrorKind::MissingPrimaryKey {
                table: self.table_name().to_string(),
            }
            .into_error()
        })
    }

    pub(crate) fn filter(&self, target: Where) -> Result<Filter> {
        Ok(match target {
            Where::All => Filter::new(),
            Where::Key(value) => Filter::eq(self.key_column()?, value),
            Where::Filter(filter) => filter,
        })
    }

    /// The configured order, else the primary key ascending.
    pub(crate) fn default_order(&self) -> Vec<OrderBy> {
        if !self.table.options.order.is_empty() {
            return self.table.options.order.clone();
        }
        self.primary_key()
            .map(|v| vec![OrderBy::asc(v)])
            .unwrap_or_default()
    }

    /// Canonical column names for the keys of `values`.
    pub(crate) fn normalize(&self, values: Values) -> Values {
        values
            .into_iter()
            .map(|(k, v)| (self.column_key(&k).unwrap_or(k), v))
            .collect()
    }

    /// The column `key` designates, either verbatim or in snake_case.
    pub(crate) fn column_key(&self, key: &str) -> Option<String> {
        if self.has_column(key) {
            return Some(key.to_string());
        }
        let column = self.database.naming().column_key(key);
        self.has_column(&column).then_some(column)
    }

    pub(crate) fn materialize(&self, row: Values) -> Result<Record<D>> {
        let row = match &self.table.extension {
            Some(extension) => extension
                .parse(row)
                .map_err(|e| e.context(format!("While parsing a row of `{}`", self.identity())))?,
            None => row,
        };
        Ok(Record::persisted(self.clone(), row))
    }

    pub(crate) async fn fetch_records(
        &self,
        query: &Query,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<Record<D>>> {
        let rows = self
            .database
            .handle(transaction)
            .await?
            .fetch(query)
            .await?;
        rows.into_iter()
            .map(|v| self.materialize(v.into_values()))
            .collect()
    }

    /// Boxed: associations populate their own nested associations through here.
    pub(crate) fn populate_records<'a>(
        records: &'a mut [Record<D>],
        populate: &'a IndexMap<String, AssociationOptions>,
        mut transaction: Option<&'a mut Transaction<D>>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for record in records {
                for (name, options) in populate {
                    record
                        .populate(name, options.clone(), transaction.as_deref_mut())
                        .await?;
                }
            }
            Ok(())
        })
    }

    pub(crate) async fn emit(&self, event: Event<'_, D>) -> Result<()> {
        self.database.emit(&event).await
    }
}
