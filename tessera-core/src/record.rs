use crate::{
    AsValue, AssociationOptions, AssociationProxy, AssociationValue, Driver, ErrorKind, Filter,
    LockMode, Model, Result, Targets, Transaction, Value, Values,
};
use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// One row of a model.
///
/// Reads see the pending changes (the dirty values) over the last persisted row. A record built
/// by [`Model::new_record`] is detached until its first `save`, after `destroy` it can no
/// longer be saved.
pub struct Record<D: Driver> {
    model: Model<D>,
    row: Arc<Values>,
    dirty: Values,
    associations: BTreeMap<String, AssociationProxy<D>>,
    detached: bool,
    destroyed: bool,
}

impl<D: Driver> Clone for Record<D> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            row: self.row.clone(),
            dirty: self.dirty.clone(),
            associations: self.associations.clone(),
            detached: self.detached,
            destroyed: self.destroyed,
        }
    }
}

impl<D: Driver> fmt::Debug for Record<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.identity())
            .field("row", &self.row)
            .field("dirty", &self.dirty)
            .field("detached", &self.detached)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl<D: Driver> Record<D> {
    pub(crate) fn persisted(model: Model<D>, row: Values) -> Self {
        Self {
            model,
            row: Arc::new(row),
            dirty: Values::new(),
            associations: BTreeMap::new(),
            detached: false,
            destroyed: false,
        }
    }

    pub(crate) fn detached(model: Model<D>) -> Self {
        Self {
            detached: true,
            ..Self::persisted(model, Values::new())
        }
    }

    pub fn model(&self) -> &Model<D> {
        &self.model
    }
    pub fn is_detached(&self) -> bool {
        self.detached
    }
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
    /// The last persisted row.
    pub fn row(&self) -> &Values {
        &self.row
    }
    /// Changes not yet saved.
    pub fn dirty(&self) -> &Values {
        &self.dirty
    }

    /// Value of a column, `key` may be snake_case or camelCase.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let column = self.model.column_key(key);
        let key = column.as_deref().unwrap_or(key);
        self.dirty.get(key).or_else(|| self.row.get(key))
    }

    /// Typed read, a missing column reads as null.
    pub fn get_as<T: AsValue>(&self, key: &str) -> Result<T> {
        T::try_from_value(self.get(key).cloned().unwrap_or_default())
            .map_err(|e| {
                e.context(format!(
                    "While reading `{}` of `{}`",
                    key,
                    self.model.identity()
                ))
            })
    }

    /// Stages a change, keys that are not columns of the model are dropped.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        match self.model.column_key(key) {
            Some(column) => {
                self.dirty.insert(column, value.into());
            }
            None => log::warn!(
                "Ignoring `{}`, it is not a column of `{}`",
                key,
                self.model.identity()
            ),
        }
        self
    }

    pub fn set_values<K: AsRef<str>, V: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self {
        for (k, v) in values {
            self.set(k.as_ref(), v);
        }
        self
    }

    /// Discards the pending changes.
    pub fn reset(&mut self) -> &mut Self {
        self.dirty.clear();
        self
    }

    pub fn primary_key_value(&self) -> Option<Value> {
        let key = self.model.primary_key()?;
        self.row
            .get(key)
            .or_else(|| self.dirty.get(key))
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn key_filter(&self) -> Result<Filter> {
        let key = self.model.key_column()?;
        let value = self
            .row
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                ErrorKind::RecordNotFound {
                    table: self.model.table_name().to_string(),
                }
                .into_error()
            })?;
        Ok(Filter::eq(key, value))
    }

    fn render(
        &self,
        omit: &[String],
        nested: &dyn Fn(&Record<D>) -> JsonValue,
    ) -> Map<String, JsonValue> {
        let mut result = Map::new();
        for (k, v) in self.row.iter().chain(self.dirty.iter()) {
            if !omit.contains(k) {
                result.insert(k.clone(), v.to_json());
            }
        }
        for (name, proxy) in &self.associations {
            let key = name.to_snake_case();
            if proxy.is_populated() && !result.contains_key(&key) {
                result.insert(key, proxy.render(self, nested));
            }
        }
        result
    }

    /// Every column with the pending changes applied, plus the populated associations under
    /// their snake_case name.
    pub fn to_object(&self) -> Map<String, JsonValue> {
        self.render(&[], &|v| JsonValue::Object(v.to_object()))
    }

    /// Like [`Record::to_object`], without the columns the model omits.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.render(&self.model.options().omit, &Record::to_json))
    }

    /// Inserts a detached record or updates the changed columns of a persisted one, then
    /// refreshes the row and the populated associations.
    pub async fn save(
        &mut self,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<&mut Self> {
        if self.destroyed {
            return Err(ErrorKind::DestroyedRecord {
                model: self.model.identity().to_string(),
            }
            .into_error());
        }
        let row = if self.detached {
            let created = self
                .model
                .create(self.dirty.clone())
                .optional_transaction(transaction.as_deref_mut())
                .await?;
            self.detached = false;
            created.row
        } else if self.is_dirty() {
            self.model
                .update_one(self.key_filter()?, self.dirty.clone())
                .optional_transaction(transaction.as_deref_mut())
                .await?
                .ok_or_else(|| self.not_found())?
                .row
        } else {
            self.fetch_row(transaction.as_deref_mut(), None).await?
        };
        self.row = row;
        self.dirty.clear();
        self.reload_associations(transaction).await?;
        Ok(self)
    }

    /// Deletes the row, saving afterwards fails.
    pub async fn destroy(&mut self, transaction: Option<&mut Transaction<D>>) -> Result<&mut Self> {
        if self.destroyed {
            return Ok(self);
        }
        if !self.detached {
            let filter = self.key_filter()?;
            self.model
                .destroy(filter)
                .optional_transaction(transaction)
                .await?;
        }
        self.destroyed = true;
        Ok(self)
    }

    /// Reads the row again, dropping the pending changes.
    pub async fn reload(
        &mut self,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<&mut Self> {
        self.row = self.fetch_row(transaction.as_deref_mut(), None).await?;
        self.dirty.clear();
        self.reload_associations(transaction).await?;
        Ok(self)
    }

    /// Reloads the row with `SELECT ... FOR UPDATE`, waiting for other holders.
    pub async fn lock(&mut self, transaction: &mut Transaction<D>) -> Result<&mut Self> {
        self.lock_with(transaction, LockMode::Wait).await
    }

    /// Reloads the row with `SELECT ... FOR UPDATE NOWAIT`, failing with
    /// [`ErrorKind::LockUnavailable`] when another transaction holds it.
    pub async fn lock_no_wait(&mut self, transaction: &mut Transaction<D>) -> Result<&mut Self> {
        self.lock_with(transaction, LockMode::NoWait).await
    }

    async fn lock_with(
        &mut self,
        transaction: &mut Transaction<D>,
        lock: LockMode,
    ) -> Result<&mut Self> {
        self.row = self.fetch_row(Some(&mut *transaction), Some(lock)).await?;
        self.dirty.clear();
        self.reload_associations(Some(transaction)).await?;
        Ok(self)
    }

    async fn fetch_row(
        &self,
        transaction: Option<&mut Transaction<D>>,
        lock: Option<LockMode>,
    ) -> Result<Arc<Values>> {
        let mut find = self.model.find_one(self.key_filter()?);
        if let Some(lock) = lock {
            find = find.lock(lock);
        }
        let record = find
            .optional_transaction(transaction)
            .await?
            .ok_or_else(|| self.not_found())?;
        Ok(record.row)
    }

    fn not_found(&self) -> crate::Error {
        ErrorKind::RecordNotFound {
            table: self.model.table_name().to_string(),
        }
        .into_error()
    }

    fn association_name(&self, name: &str) -> Result<String> {
        let model = &self.model;
        model
            .association(name)
            .or_else(|| model.association(&name.to_lower_camel_case()))
            .map(|v| v.name.clone())
            .ok_or_else(|| {
                ErrorKind::UnknownAssociation {
                    model: model.identity().to_string(),
                    association: name.to_string(),
                }
                .into_error()
            })
    }

    /// Removes the proxy from the cache, creating it when missing. Operations taking the
    /// record mutably run on the detached proxy and put it back.
    fn take_association(&mut self, name: &str) -> Result<(String, AssociationProxy<D>)> {
        let name = self.association_name(name)?;
        if let Some(proxy) = self.associations.remove(&name) {
            return Ok((name, proxy));
        }
        let description = self.model.association(&name).cloned().ok_or_else(|| {
            ErrorKind::UnknownAssociation {
                model: self.model.identity().to_string(),
                association: name.clone(),
            }
            .into_error()
        })?;
        let target = self
            .model
            .database()
            .try_model(&description.target_table)?;
        Ok((name, AssociationProxy::new(target, description)))
    }

    /// The cached proxy of the association, created unpopulated on first access.
    pub fn association(&mut self, name: &str) -> Result<&AssociationProxy<D>> {
        let (name, proxy) = self.take_association(name)?;
        Ok(self.associations.entry(name).or_insert(proxy))
    }

    pub fn association_value(&mut self, name: &str) -> Result<AssociationValue<D>> {
        let (name, proxy) = self.take_association(name)?;
        let value = proxy.value(self);
        self.associations.insert(name, proxy);
        Ok(value)
    }

    /// Assigns an enumeration `one` association, validated against the enumeration.
    pub fn set_association(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let (name, proxy) = self.take_association(name)?;
        let result = proxy.set_value(self, value.into());
        self.associations.insert(name, proxy);
        result.map(|_| self)
    }

    /// Loads the association and keeps the related records, see [`Record::association`].
    pub async fn populate(
        &mut self,
        name: &str,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<&mut Self> {
        let (name, mut proxy) = self.take_association(name)?;
        let result = proxy.populate(self, options, transaction).await;
        self.associations.insert(name, proxy);
        result.map(|_| self)
    }

    /// Related records matching `options`, without caching them.
    pub async fn find_associations(
        &mut self,
        name: &str,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<Record<D>>> {
        let (name, proxy) = self.take_association(name)?;
        let result = proxy.fetch(self, &options, transaction).await;
        self.associations.insert(name, proxy);
        result
    }

    /// The related record matching `options`, `None` when there is none.
    ///
    /// Fails with [`ErrorKind::MultipleResults`] when more than one row matches.
    pub async fn find_one_association(
        &mut self,
        name: &str,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Option<Record<D>>> {
        let (name, proxy) = self.take_association(name)?;
        let result = proxy.find_one(self, options, transaction).await;
        self.associations.insert(name, proxy);
        result
    }

    /// Links existing rows, then populates the association with `options`.
    pub async fn attach(
        &mut self,
        name: &str,
        targets: impl Into<Targets>,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<&mut Self> {
        let (name, mut proxy) = self.take_association(name)?;
        let result = proxy
            .attach(self, targets.into(), options, transaction)
            .await;
        self.associations.insert(name, proxy);
        result.map(|_| self)
    }

    /// Unlinks rows without deleting them, then populates the association with `options`.
    pub async fn detach(
        &mut self,
        name: &str,
        targets: impl Into<Targets>,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<&mut Self> {
        let (name, mut proxy) = self.take_association(name)?;
        let result = proxy
            .detach(self, targets.into(), options, transaction)
            .await;
        self.associations.insert(name, proxy);
        result.map(|_| self)
    }

    /// Creates a related row and links it.
    pub async fn create_association(
        &mut self,
        name: &str,
        values: Values,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Record<D>> {
        let (name, mut proxy) = self.take_association(name)?;
        let result = proxy.create(self, values, options, transaction).await;
        self.associations.insert(name, proxy);
        result
    }

    /// Deletes related rows and returns them.
    pub async fn destroy_associations(
        &mut self,
        name: &str,
        targets: impl Into<Targets>,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<Record<D>>> {
        let (name, mut proxy) = self.take_association(name)?;
        let result = proxy
            .destroy(self, targets.into(), options, transaction)
            .await;
        self.associations.insert(name, proxy);
        result
    }

    /// Populates again every association populated so far, with the same options.
    pub async fn reload_associations(
        &mut self,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<()> {
        let mut associations = std::mem::take(&mut self.associations);
        let mut result = Ok(());
        for proxy in associations.values_mut() {
            result = proxy.reload(self, transaction.as_deref_mut()).await;
            if result.is_err() {
                break;
            }
        }
        self.associations = associations;
        result
    }
}

impl<D: Driver> Serialize for Record<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
