use crate::{
    AssociationOptions, Driver, Error, ErrorKind, Event, Executor, LockMode, Model, Operation,
    OrderBy, Query, Record, Result, Selection, SqlWriter, Transaction, Value, Values, Where,
};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::{future::IntoFuture, slice};

/// Implements the transaction switch and `IntoFuture` of a statement builder, `run` does the
/// work.
macro_rules! impl_statement {
    ($name:ident => $output:ty { $($field:ident),* $(,)? }) => {
        impl<'t, D: Driver> $name<'t, D> {
            /// Runs the statement on `transaction` instead of a pooled connection.
            pub fn transaction<'u>(self, transaction: &'u mut Transaction<D>) -> $name<'u, D> {
                self.optional_transaction(Some(transaction))
            }
            pub fn optional_transaction<'u>(
                self,
                transaction: Option<&'u mut Transaction<D>>,
            ) -> $name<'u, D> {
                $name {
                    transaction,
                    $($field: self.$field,)*
                }
            }
        }

        impl<'t, D: Driver> IntoFuture for $name<'t, D> {
            type Output = Result<$output>;
            type IntoFuture = BoxFuture<'t, Self::Output>;
            fn into_future(self) -> Self::IntoFuture {
                Box::pin(self.run())
            }
        }
    };
}

/// Rows projected on some columns.
pub struct Select<'t, D: Driver> {
    model: Model<D>,
    columns: Vec<String>,
    target: Where,
    limit: Option<u32>,
    offset: Option<u32>,
    order: Vec<OrderBy>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Select<'t, D> {
    pub(crate) fn new(model: Model<D>, columns: Vec<String>, target: Where) -> Self {
        Self {
            model,
            columns,
            target,
            limit: None,
            offset: None,
            order: Vec::new(),
            transaction: None,
        }
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

    async fn run(self) -> Result<Vec<Record<D>>> {
        let model = self.model;
        let filter = model.filter(self.target)?;
        model
            .emit(Event::before(&model, Operation::Select, Some(&filter), &[]))
            .await?;
        let mut query = Query::default();
        let selection = Selection {
            order: &self.order,
            limit: self.limit,
            offset: self.offset,
            ..Selection::new(&self.columns, &filter)
        };
        model
            .sql_writer()
            .write_select(&mut query, model.table_ref(), &selection);
        let records = model.fetch_records(&query, self.transaction).await?;
        model
            .emit(Event::after(&model, Operation::Select, Some(&filter), &records))
            .await?;
        Ok(records)
    }
}

impl_statement!(Select => Vec<Record<D>> { model, columns, target, limit, offset, order });

/// Number of rows matching, counted on the primary key.
pub struct Count<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Count<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where) -> Self {
        Self {
            model,
            target,
            transaction: None,
        }
    }

    async fn run(self) -> Result<i64> {
        let model = self.model;
        let filter = model.filter(self.target)?;
        model
            .emit(Event::before(&model, Operation::Count, Some(&filter), &[]))
            .await?;
        let mut query = Query::default();
        model.sql_writer().write_count(
            &mut query,
            model.table_ref(),
            model.primary_key(),
            &filter,
        );
        let rows = model
            .database()
            .handle(self.transaction)
            .await?
            .fetch(&query)
            .await?;
        let count = rows
            .first()
            .map(|v| v.get::<i64>("count"))
            .transpose()?
            .unwrap_or_default();
        let mut event = Event::after(&model, Operation::Count, Some(&filter), &[]);
        event.count = Some(count);
        model.emit(event).await?;
        Ok(count)
    }
}

impl_statement!(Count => i64 { model, target });

/// Rows matching, in the default order and limited by the model options unless overridden.
pub struct Find<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    limit: Option<u32>,
    offset: Option<u32>,
    order: Vec<OrderBy>,
    populate: IndexMap<String, AssociationOptions>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Find<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where) -> Self {
        Self {
            model,
            target,
            limit: None,
            offset: None,
            order: Vec::new(),
            populate: IndexMap::new(),
            transaction: None,
        }
    }
    /// Zero removes the limit.
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
    /// Loads the association `name` of every record found.
    pub fn populate(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.populate.insert(name.into(), options);
        self
    }
    pub(crate) fn populate_all(mut self, populate: IndexMap<String, AssociationOptions>) -> Self {
        self.populate.extend(populate);
        self
    }

    async fn run(self) -> Result<Vec<Record<D>>> {
        let Find {
            model,
            target,
            limit,
            offset,
            order,
            populate,
            mut transaction,
        } = self;
        let filter = model.filter(target)?;
        model
            .emit(Event::before(&model, Operation::Find, Some(&filter), &[]))
            .await?;
        let order = if order.is_empty() {
            model.default_order()
        } else {
            order
        };
        let mut query = Query::default();
        let selection = Selection {
            order: &order,
            limit: limit.or(model.options().limit),
            offset: offset.or(model.options().offset),
            ..Selection::new(model.columns(), &filter)
        };
        model
            .sql_writer()
            .write_select(&mut query, model.table_ref(), &selection);
        let mut records = model
            .fetch_records(&query, transaction.as_deref_mut())
            .await?;
        Model::populate_records(&mut records, &populate, transaction).await?;
        model
            .emit(Event::after(&model, Operation::Find, Some(&filter), &records))
            .await?;
        Ok(records)
    }
}

impl_statement!(Find => Vec<Record<D>> { model, target, limit, offset, order, populate });

/// The single row matching, `None` when there is none.
///
/// Fails with [`ErrorKind::MultipleResults`] when more than one row matches.
pub struct FindOne<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    populate: IndexMap<String, AssociationOptions>,
    lock: Option<LockMode>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> FindOne<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where) -> Self {
        Self {
            model,
            target,
            populate: IndexMap::new(),
            lock: None,
            transaction: None,
        }
    }
    pub fn populate(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.populate.insert(name.into(), options);
        self
    }
    pub(crate) fn populate_all(mut self, populate: IndexMap<String, AssociationOptions>) -> Self {
        self.populate.extend(populate);
        self
    }
    /// Locks the row until the transaction ends, only meaningful inside one.
    pub fn lock(mut self, lock: LockMode) -> Self {
        self.lock = Some(lock);
        self
    }

    async fn run(self) -> Result<Option<Record<D>>> {
        let FindOne {
            model,
            target,
            populate,
            lock,
            mut transaction,
        } = self;
        let filter = model.filter(target)?;
        model
            .emit(Event::before(&model, Operation::FindOne, Some(&filter), &[]))
            .await?;
        let order = model.default_order();
        let mut query = Query::default();
        let selection = Selection {
            order: &order,
            limit: Some(2),
            lock,
            ..Selection::new(model.columns(), &filter)
        };
        model
            .sql_writer()
            .write_select(&mut query, model.table_ref(), &selection);
        let mut records = model
            .fetch_records(&query, transaction.as_deref_mut())
            .await?;
        if records.len() > 1 {
            return Err(ErrorKind::MultipleResults {
                table: model.table_name().to_string(),
                operation: Operation::FindOne.name(),
            }
            .into_error());
        }
        Model::populate_records(&mut records, &populate, transaction).await?;
        model
            .emit(Event::after(&model, Operation::FindOne, Some(&filter), &records))
            .await?;
        Ok(records.pop())
    }
}

impl_statement!(FindOne => Option<Record<D>> { model, target, populate, lock });

/// Inserts one row, an empty map inserts the column defaults.
pub struct Create<'t, D: Driver> {
    model: Model<D>,
    values: Values,
    populate: IndexMap<String, AssociationOptions>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Create<'t, D> {
    pub(crate) fn new(model: Model<D>, values: Values) -> Self {
        Self {
            model,
            values,
            populate: IndexMap::new(),
            transaction: None,
        }
    }
    pub fn populate(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.populate.insert(name.into(), options);
        self
    }

    async fn run(self) -> Result<Record<D>> {
        let Create {
            model,
            values,
            populate,
            mut transaction,
        } = self;
        let values = model.normalize(values);
        model
            .emit(Event::before(
                &model,
                Operation::Create,
                None,
                slice::from_ref(&values),
            ))
            .await?;
        let columns = values.keys().cloned().collect::<Vec<_>>();
        let row = values.values().cloned().collect::<Vec<_>>();
        let mut query = Query::default();
        model.sql_writer().write_insert(
            &mut query,
            model.table_ref(),
            &columns,
            vec![row],
            model.columns(),
        );
        let mut records = model
            .fetch_records(&query, transaction.as_deref_mut())
            .await?;
        Model::populate_records(&mut records, &populate, transaction).await?;
        model
            .emit(Event::after(&model, Operation::Create, None, &records))
            .await?;
        records.pop().ok_or_else(|| {
            Error::msg(format!(
                "Insert into `{}` returned no row",
                model.table_name()
            ))
        })
    }
}

impl_statement!(Create => Record<D> { model, values, populate });

/// Inserts many rows in one statement, the columns are the keys of the first row.
pub struct AddRows<'t, D: Driver> {
    model: Model<D>,
    rows: Vec<Values>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> AddRows<'t, D> {
    pub(crate) fn new(model: Model<D>, rows: Vec<Values>) -> Self {
        Self {
            model,
            rows,
            transaction: None,
        }
    }

    async fn run(self) -> Result<Vec<Record<D>>> {
        let model = self.model;
        let rows = self
            .rows
            .into_iter()
            .map(|v| model.normalize(v))
            .collect::<Vec<_>>();
        model
            .emit(Event::before(&model, Operation::AddRows, None, &rows))
            .await?;
        if rows.is_empty() {
            model
                .emit(Event::after(&model, Operation::AddRows, None, &[]))
                .await?;
            return Ok(Vec::new());
        }
        let columns = rows
            .first()
            .map(|v| v.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        if columns.is_empty() && rows.len() > 1 {
            return Err(Error::msg(format!(
                "Cannot add {} rows without columns to `{}`",
                rows.len(),
                model.table_name()
            )));
        }
        let values = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        let mut query = Query::default();
        model.sql_writer().write_insert(
            &mut query,
            model.table_ref(),
            &columns,
            values,
            model.columns(),
        );
        let records = model.fetch_records(&query, self.transaction).await?;
        model
            .emit(Event::after(&model, Operation::AddRows, None, &records))
            .await?;
        Ok(records)
    }
}

impl_statement!(AddRows => Vec<Record<D>> { model, rows });

fn nothing_to_update<D: Driver>(model: &Model<D>) -> Error {
    Error::msg(format!("Nothing to update on `{}`", model.table_name()))
}

/// Updates every row matching and returns them.
pub struct Update<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    values: Values,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Update<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where, values: Values) -> Self {
        Self {
            model,
            target,
            values,
            transaction: None,
        }
    }

    async fn run(self) -> Result<Vec<Record<D>>> {
        let model = self.model;
        if self.values.is_empty() {
            return Err(nothing_to_update(&model));
        }
        let values = model.normalize(self.values);
        let filter = model.filter(self.target)?;
        model
            .emit(Event::before(
                &model,
                Operation::Update,
                Some(&filter),
                slice::from_ref(&values),
            ))
            .await?;
        let mut query = Query::default();
        model.sql_writer().write_update(
            &mut query,
            model.table_ref(),
            &values,
            &filter,
            model.columns(),
        );
        let records = model.fetch_records(&query, self.transaction).await?;
        model
            .emit(Event::after(&model, Operation::Update, Some(&filter), &records))
            .await?;
        Ok(records)
    }
}

impl_statement!(Update => Vec<Record<D>> { model, target, values });

/// Updates the single row matching.
///
/// Without a caller transaction it opens its own and rolls it back when more than one row
/// matched, so nothing changes. Inside a caller transaction the error is returned and rolling
/// back is up to the caller.
pub struct UpdateOne<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    values: Values,
    populate: IndexMap<String, AssociationOptions>,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> UpdateOne<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where, values: Values) -> Self {
        Self {
            model,
            target,
            values,
            populate: IndexMap::new(),
            transaction: None,
        }
    }
    pub fn populate(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.populate.insert(name.into(), options);
        self
    }

    async fn run(self) -> Result<Option<Record<D>>> {
        let UpdateOne {
            model,
            target,
            values,
            populate,
            transaction,
        } = self;
        if values.is_empty() {
            return Err(nothing_to_update(&model));
        }
        if let Some(transaction) = transaction {
            return update_one(&model, target, values, &populate, transaction).await;
        }
        let mut transaction = model.database().begin().await?;
        match update_one(&model, target, values, &populate, &mut transaction).await {
            Ok(record) => {
                transaction.commit().await?;
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    log::error!("Could not roll back updateOne: {:#}", rollback);
                }
                Err(e)
            }
        }
    }
}

async fn update_one<D: Driver>(
    model: &Model<D>,
    target: Where,
    values: Values,
    populate: &IndexMap<String, AssociationOptions>,
    transaction: &mut Transaction<D>,
) -> Result<Option<Record<D>>> {
    let values = model.normalize(values);
    let filter = model.filter(target)?;
    model
        .emit(Event::before(
            model,
            Operation::UpdateOne,
            Some(&filter),
            slice::from_ref(&values),
        ))
        .await?;
    let mut query = Query::default();
    model.sql_writer().write_update(
        &mut query,
        model.table_ref(),
        &values,
        &filter,
        model.columns(),
    );
    let mut records = model.fetch_records(&query, Some(&mut *transaction)).await?;
    if records.len() > 1 {
        let error = ErrorKind::MultipleResults {
            table: model.table_name().to_string(),
            operation: Operation::UpdateOne.name(),
        }
        .into_error();
        log::warn!("{:#}", error);
        return Err(error);
    }
    Model::populate_records(&mut records, populate, Some(transaction)).await?;
    model
        .emit(Event::after(
            model,
            Operation::UpdateOne,
            Some(&filter),
            &records,
        ))
        .await?;
    Ok(records.pop())
}

impl_statement!(UpdateOne => Option<Record<D>> { model, target, values, populate });

/// Deletes every row matching and returns them.
pub struct Destroy<'t, D: Driver> {
    model: Model<D>,
    target: Where,
    transaction: Option<&'t mut Transaction<D>>,
}

impl<'t, D: Driver> Destroy<'t, D> {
    pub(crate) fn new(model: Model<D>, target: Where) -> Self {
        Self {
            model,
            target,
            transaction: None,
        }
    }

    async fn run(self) -> Result<Vec<Record<D>>> {
        let model = self.model;
        let filter = model.filter(self.target)?;
        model
            .emit(Event::before(&model, Operation::Destroy, Some(&filter), &[]))
            .await?;
        let mut query = Query::default();
        model
            .sql_writer()
            .write_delete(&mut query, model.table_ref(), &filter, model.columns());
        let records = model.fetch_records(&query, self.transaction).await?;
        model
            .emit(Event::after(&model, Operation::Destroy, Some(&filter), &records))
            .await?;
        Ok(records)
    }
}

impl_statement!(Destroy => Vec<Record<D>> { model, target });
