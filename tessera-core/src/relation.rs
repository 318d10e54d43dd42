use crate::{
    AssociationDescription, AssociationKind, Driver, Error, ErrorKind, Filter, Model, OrderBy,
    Query, Record, Result, Selection, SqlWriter, Transaction, Value, Values,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt;

/// How an association is loaded, and how `detach` treats join rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationOptions {
    /// Extra conditions on the related rows.
    pub filter: Filter,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: Vec<OrderBy>,
    /// Nested associations loaded on every related record.
    pub populate: IndexMap<String, AssociationOptions>,
    /// `detach` on a join table association nulls the target column instead of deleting the
    /// join row.
    pub keep_join_rows: bool,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }
    pub fn populate(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.populate.insert(name.into(), options);
        self
    }
    pub fn keep_join_rows(mut self) -> Self {
        self.keep_join_rows = true;
        self
    }
}

/// Related rows designated by their primary keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Targets(Vec<Value>);

impl Targets {
    pub fn ids(&self) -> &[Value] {
        &self.0
    }

    fn into_ids(self, association: &str) -> Result<Vec<Value>> {
        if self.0.iter().any(Value::is_null) {
            return Err(Error::msg(format!(
                "The targets of `{}` must all have a primary key",
                association
            )));
        }
        Ok(self.0)
    }
}

macro_rules! impl_targets_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Targets {
                fn from(value: $ty) -> Self {
                    Targets(vec![value.into()])
                }
            }
            impl From<Vec<$ty>> for Targets {
                fn from(value: Vec<$ty>) -> Self {
                    Targets(value.into_iter().map(Into::into).collect())
                }
            }
        )+
    };
}
impl_targets_from!(i16, i32, i64, Value, String, uuid::Uuid);

impl<D: Driver> From<&Record<D>> for Targets {
    fn from(value: &Record<D>) -> Self {
        Targets(vec![value.primary_key_value().unwrap_or_default()])
    }
}

impl<D: Driver> From<&[Record<D>]> for Targets {
    fn from(value: &[Record<D>]) -> Self {
        Targets(
            value
                .iter()
                .map(|v| v.primary_key_value().unwrap_or_default())
                .collect(),
        )
    }
}

impl<D: Driver> From<&Vec<Record<D>>> for Targets {
    fn from(value: &Vec<Record<D>>) -> Self {
        value.as_slice().into()
    }
}

/// Content of an association as seen from its owner.
///
/// Enumeration targets are represented by their identifiers.
pub enum AssociationValue<D: Driver> {
    Empty,
    Id(Value),
    Ids(Vec<Value>),
    Record(Record<D>),
    Records(Vec<Record<D>>),
}

impl<D: Driver> AssociationValue<D> {
    pub fn is_empty(&self) -> bool {
        match self {
            AssociationValue::Empty => true,
            AssociationValue::Ids(v) => v.is_empty(),
            AssociationValue::Records(v) => v.is_empty(),
            _ => false,
        }
    }
}

impl<D: Driver> fmt::Debug for AssociationValue<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationValue::Empty => f.write_str("Empty"),
            AssociationValue::Id(v) => f.debug_tuple("Id").field(v).finish(),
            AssociationValue::Ids(v) => f.debug_tuple("Ids").field(v).finish(),
            AssociationValue::Record(v) => f.debug_tuple("Record").field(v).finish(),
            AssociationValue::Records(v) => f.debug_tuple("Records").field(v).finish(),
        }
    }
}

struct Join<D: Driver> {
    model: Model<D>,
    /// Column pointing at the owner.
    from_column: String,
    /// Column pointing at the related row.
    to_column: String,
}

/// Lazily loaded association of one record.
///
/// Owned by its record, which passes itself to every operation.
pub struct AssociationProxy<D: Driver> {
    description: AssociationDescription,
    model: Model<D>,
    records: Vec<Record<D>>,
    options: AssociationOptions,
    populated: bool,
}

impl<D: Driver> Clone for AssociationProxy<D> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            model: self.model.clone(),
            records: self.records.clone(),
            options: self.options.clone(),
            populated: self.populated,
        }
    }
}

impl<D: Driver> fmt::Debug for AssociationProxy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationProxy")
            .field("name", &self.description.name)
            .field("kind", &self.description.kind)
            .field("populated", &self.populated)
            .field("records", &self.records)
            .finish()
    }
}

impl<D: Driver> AssociationProxy<D> {
    pub(crate) fn new(model: Model<D>, description: AssociationDescription) -> Self {
        Self {
            description,
            model,
            records: Vec::new(),
            options: AssociationOptions::default(),
            populated: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }
    pub fn kind(&self) -> AssociationKind {
        self.description.kind
    }
    pub fn description(&self) -> &AssociationDescription {
        &self.description
    }
    /// Model of the related rows.
    pub fn model(&self) -> &Model<D> {
        &self.model
    }
    pub fn is_populated(&self) -> bool {
        self.populated
    }
    pub fn options(&self) -> &AssociationOptions {
        &self.options
    }
    pub fn records(&self) -> &[Record<D>] {
        &self.records
    }
    pub fn first(&self) -> Option<&Record<D>> {
        self.records.first()
    }
    /// Populated record with the given primary key.
    pub fn get(&self, id: impl Into<Value>) -> Option<&Record<D>> {
        let id = Some(id.into());
        self.records.iter().find(|v| v.primary_key_value() == id)
    }
    pub fn is_enumeration(&self) -> bool {
        self.model.is_enumeration()
    }

    pub fn value(&self, owner: &Record<D>) -> AssociationValue<D> {
        if self.is_enumeration() {
            return match self.description.kind {
                AssociationKind::One => owner
                    .get(&self.description.column)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .map_or(AssociationValue::Empty, AssociationValue::Id),
                _ => AssociationValue::Ids(
                    self.records
                        .iter()
                        .filter_map(Record::primary_key_value)
                        .collect(),
                ),
            };
        }
        match self.description.kind {
            AssociationKind::One => self
                .records
                .first()
                .cloned()
                .map_or(AssociationValue::Empty, AssociationValue::Record),
            _ => AssociationValue::Records(self.records.clone()),
        }
    }

    pub(crate) fn render(
        &self,
        owner: &Record<D>,
        record: impl Fn(&Record<D>) -> JsonValue,
    ) -> JsonValue {
        match self.value(owner) {
            AssociationValue::Empty => match self.description.kind {
                AssociationKind::One => JsonValue::Null,
                _ => JsonValue::Array(Vec::new()),
            },
            AssociationValue::Id(v) => v.to_json(),
            AssociationValue::Ids(v) => v.iter().map(Value::to_json).collect(),
            AssociationValue::Record(v) => record(&v),
            AssociationValue::Records(v) => v.iter().map(record).collect(),
        }
    }

    /// Assigns an enumeration value to a `one` association, the owner still has to be saved.
    pub(crate) fn set_value(&self, owner: &mut Record<D>, value: Value) -> Result<()> {
        if self.description.kind != AssociationKind::One || !self.is_enumeration() {
            return Err(ErrorKind::AssociationNotAssignable {
                model: owner.model().identity().to_string(),
                association: self.description.name.clone(),
            }
            .into_error());
        }
        if !value.is_null() && !self.model.enumeration().is_some_and(|v| v.contains(&value)) {
            return Err(ErrorKind::InvalidEnumerationValue {
                enumeration: self.model.identity().to_string(),
                value: value.to_string(),
            }
            .into_error());
        }
        owner.set(&self.description.column, value);
        Ok(())
    }

    fn join(&self) -> Result<Join<D>> {
        let broken = || {
            Error::msg(format!(
                "Association `{}` has no usable join table",
                self.description.name
            ))
        };
        let table = self
            .description
            .through_table
            .as_deref()
            .ok_or_else(broken)?;
        let model = self
            .model
            .database()
            .model_by_table(table)
            .ok_or_else(broken)?;
        let unqualified = |column: &Option<String>| {
            column
                .as_deref()
                .map(|v| v.rsplit_once('.').map_or(v, |(_, c)| c).to_string())
                .ok_or_else(broken)
        };
        Ok(Join {
            from_column: unqualified(&self.description.from_column)?,
            to_column: unqualified(&self.description.to_column)?,
            model,
        })
    }

    fn owner_key(&self, owner: &Record<D>) -> Result<Value> {
        owner.primary_key_value().ok_or_else(|| {
            Error::msg(format!(
                "`{}` needs a persisted `{}` record",
                self.description.name,
                owner.model().identity()
            ))
        })
    }

    fn foreign_key(&self, owner: &Record<D>) -> Value {
        owner
            .get(&self.description.column)
            .cloned()
            .unwrap_or_default()
    }

    /// Loads the related records without keeping them.
    pub(crate) async fn fetch(
        &self,
        owner: &Record<D>,
        options: &AssociationOptions,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<Record<D>>> {
        let target = &self.model;
        match self.description.kind {
            AssociationKind::One => {
                let key = target.key_column()?;
                let id = self.foreign_key(owner);
                if id.is_null() || options.filter.pinned(key).is_some_and(|v| *v != id) {
                    return Ok(Vec::new());
                }
                let record = target
                    .find_one(options.filter.clone().and_eq(key, id))
                    .populate_all(options.populate.clone())
                    .optional_transaction(transaction)
                    .await?;
                Ok(record.into_iter().collect())
            }
            AssociationKind::Many => {
                let column = self.description.column.as_str();
                let Some(id) = owner.primary_key_value() else {
                    return Ok(Vec::new());
                };
                if options.filter.pinned(column).is_some_and(|v| *v != id) {
                    return Ok(Vec::new());
                }
                // Only the association options bound the rows, never the model defaults.
                let mut find = target
                    .find(options.filter.clone().and_eq(column, id))
                    .populate_all(options.populate.clone())
                    .limit(options.limit.unwrap_or(0))
                    .offset(options.offset.unwrap_or(0));
                for order in &options.order {
                    find = find.order(order.clone());
                }
                find.optional_transaction(transaction).await
            }
            AssociationKind::Through => {
                let Some(id) = owner.primary_key_value() else {
                    return Ok(Vec::new());
                };
                let key = target.key_column()?;
                let join = self.join()?;
                let order = if options.order.is_empty() {
                    target.default_order()
                } else {
                    options.order.clone()
                };
                let from_column = format!("{}.{}", join.model.table_name(), join.from_column);
                let to_column = format!("{}.{}", join.model.table_name(), join.to_column);
                let mut query = Query::default();
                target.sql_writer().write_select_through(
                    &mut query,
                    target.table_ref(),
                    key,
                    join.model.table_ref(),
                    &from_column,
                    &to_column,
                    id,
                    &Selection {
                        order: &order,
                        limit: options.limit,
                        offset: options.offset,
                        ..Selection::new(target.columns(), &options.filter)
                    },
                );
                let mut records = target
                    .fetch_records(&query, transaction.as_deref_mut())
                    .await?;
                Model::populate_records(&mut records, &options.populate, transaction).await?;
                Ok(records)
            }
        }
    }

    /// The single related record matching `options`, failing when several match.
    pub(crate) async fn find_one(
        &self,
        owner: &Record<D>,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<Option<Record<D>>> {
        let options = AssociationOptions {
            limit: Some(2),
            offset: None,
            ..options
        };
        let mut records = self.fetch(owner, &options, transaction).await?;
        if records.len() > 1 {
            return Err(ErrorKind::MultipleResults {
                table: self.model.table_name().to_string(),
                operation: "findOne",
            }
            .into_error()
            .context(format!(
                "While finding one `{}` of `{}`",
                self.description.name,
                owner.model().identity()
            )));
        }
        Ok(records.pop())
    }

    pub(crate) async fn populate(
        &mut self,
        owner: &Record<D>,
        options: AssociationOptions,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<()> {
        self.records = self.fetch(owner, &options, transaction).await?;
        self.options = options;
        self.populated = true;
        Ok(())
    }

    /// Populates again with the same options, if it was populated.
    pub(crate) async fn reload(
        &mut self,
        owner: &Record<D>,
        transaction: Option<&mut Transaction<D>>,
    ) -> Result<()> {
        if !self.populated {
            return Ok(());
        }
        let options = self.options.clone();
        self.populate(owner, options, transaction).await
    }

    pub(crate) async fn create(
        &mut self,
        owner: &mut Record<D>,
        values: Values,
        options: AssociationOptions,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<Record<D>> {
        let target = self.model.clone();
        let created = match self.description.kind {
            AssociationKind::One => {
                let created = target
                    .create(values)
                    .optional_transaction(transaction.as_deref_mut())
                    .await?;
                owner.set(
                    &self.description.column,
                    created.primary_key_value().unwrap_or_default(),
                );
                owner.save(transaction.as_deref_mut()).await?;
                created
            }
            AssociationKind::Many => {
                let mut values = values;
                values.insert(self.description.column.clone(), self.owner_key(owner)?);
                target
                    .create(values)
                    .optional_transaction(transaction.as_deref_mut())
                    .await?
            }
            AssociationKind::Through => {
                let id = self.owner_key(owner)?;
                let join = self.join()?;
                let created = target
                    .create(values)
                    .optional_transaction(transaction.as_deref_mut())
                    .await?;
                let row = Values::from([
                    (join.from_column, id),
                    (join.to_column, created.primary_key_value().unwrap_or_default()),
                ]);
                join.model
                    .add_rows([row])
                    .optional_transaction(transaction.as_deref_mut())
                    .await?;
                created
            }
        };
        self.populate(owner, options, transaction).await?;
        Ok(created)
    }

    pub(crate) async fn attach(
        &mut self,
        owner: &mut Record<D>,
        targets: Targets,
        options: AssociationOptions,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<()> {
        let ids = targets.into_ids(&self.description.name)?;
        match self.description.kind {
            AssociationKind::One => {
                if ids.len() > 1 {
                    return Err(self.too_many_targets(ids.len()));
                }
                if let Some(id) = ids.into_iter().next() {
                    owner.set(&self.description.column, id);
                    owner.save(transaction.as_deref_mut()).await?;
                }
            }
            AssociationKind::Many => {
                let id = self.owner_key(owner)?;
                if !ids.is_empty() {
                    let key = self.model.key_column()?;
                    self.model
                        .update(
                            Filter::is_in(key, ids),
                            Values::from([(self.description.column.clone(), id)]),
                        )
                        .optional_transaction(transaction.as_deref_mut())
                        .await?;
                }
            }
            AssociationKind::Through => {
                let id = self.owner_key(owner)?;
                let join = self.join()?;
                if !ids.is_empty() {
                    let rows = ids.into_iter().map(|v| {
                        Values::from([
                            (join.from_column.clone(), id.clone()),
                            (join.to_column.clone(), v),
                        ])
                    });
                    join.model
                        .add_rows(rows)
                        .optional_transaction(transaction.as_deref_mut())
                        .await?;
                }
            }
        }
        self.populate(owner, options, transaction).await
    }

    pub(crate) async fn detach(
        &mut self,
        owner: &mut Record<D>,
        targets: Targets,
        options: AssociationOptions,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<()> {
        let ids = targets.into_ids(&self.description.name)?;
        match self.description.kind {
            AssociationKind::One => {
                let current = self.foreign_key(owner);
                if !current.is_null() && (ids.is_empty() || ids.contains(&current)) {
                    owner.set(&self.description.column, Value::Null);
                    owner.save(transaction.as_deref_mut()).await?;
                }
            }
            AssociationKind::Many => {
                let id = self.owner_key(owner)?;
                if !ids.is_empty() {
                    let key = self.model.key_column()?;
                    let column = self.description.column.clone();
                    self.model
                        .update(
                            Filter::is_in(key, ids).and_eq(column.as_str(), id),
                            Values::from([(column, Value::Null)]),
                        )
                        .optional_transaction(transaction.as_deref_mut())
                        .await?;
                }
            }
            AssociationKind::Through => {
                let id = self.owner_key(owner)?;
                let join = self.join()?;
                if !ids.is_empty() {
                    let filter = Filter::is_in(join.to_column.as_str(), ids)
                        .and_eq(join.from_column.as_str(), id);
                    if options.keep_join_rows {
                        join.model
                            .update(filter, Values::from([(join.to_column.clone(), Value::Null)]))
                            .optional_transaction(transaction.as_deref_mut())
                            .await?;
                    } else {
                        join.model
                            .destroy(filter)
                            .optional_transaction(transaction.as_deref_mut())
                            .await?;
                    }
                }
            }
        }
        self.populate(owner, options, transaction).await
    }

    /// Deletes related rows, only those actually related to `owner`.
    pub(crate) async fn destroy(
        &mut self,
        owner: &mut Record<D>,
        targets: Targets,
        options: AssociationOptions,
        mut transaction: Option<&mut Transaction<D>>,
    ) -> Result<Vec<Record<D>>> {
        let ids = targets.into_ids(&self.description.name)?;
        let key = self.model.key_column()?.to_string();
        let destroyed = match self.description.kind {
            AssociationKind::One => {
                if ids.len() > 1 {
                    return Err(self.too_many_targets(ids.len()));
                }
                let current = self.foreign_key(owner);
                match ids.into_iter().next() {
                    Some(id) if !current.is_null() && id == current => {
                        owner.set(&self.description.column, Value::Null);
                        owner.save(transaction.as_deref_mut()).await?;
                        self.model
                            .destroy(Filter::eq(key, id))
                            .optional_transaction(transaction.as_deref_mut())
                            .await?
                    }
                    _ => Vec::new(),
                }
            }
            AssociationKind::Many => {
                let id = self.owner_key(owner)?;
                self.model
                    .destroy(
                        Filter::is_in(key, ids).and_eq(self.description.column.as_str(), id),
                    )
                    .optional_transaction(transaction.as_deref_mut())
                    .await?
            }
            AssociationKind::Through => {
                let id = self.owner_key(owner)?;
                let join = self.join()?;
                let join_rows = join
                    .model
                    .destroy(
                        Filter::is_in(join.to_column.as_str(), ids)
                            .and_eq(join.from_column.as_str(), id),
                    )
                    .optional_transaction(transaction.as_deref_mut())
                    .await?;
                let related = join_rows
                    .iter()
                    .filter_map(|v| v.get(&join.to_column).filter(|v| !v.is_null()).cloned())
                    .collect::<Vec<_>>();
                self.model
                    .destroy(Filter::is_in(key, related))
                    .optional_transaction(transaction.as_deref_mut())
                    .await?
            }
        };
        self.populate(owner, options, transaction).await?;
        Ok(destroyed)
    }

    fn too_many_targets(&self, count: usize) -> Error {
        ErrorKind::TooManyTargets {
            association: self.description.name.clone(),
            count,
        }
        .into_error()
    }
}
