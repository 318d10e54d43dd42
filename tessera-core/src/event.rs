use crate::{Driver, Filter, Model, Record, Result, Values};
use futures::future::{self, BoxFuture};
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Count,
    Find,
    FindOne,
    Create,
    AddRows,
    Update,
    UpdateOne,
    Destroy,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Count => "count",
            Operation::Find => "find",
            Operation::FindOne => "findOne",
            Operation::Create => "create",
            Operation::AddRows => "addRows",
            Operation::Update => "update",
            Operation::UpdateOne => "updateOne",
            Operation::Destroy => "destroy",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    After,
}

/// Notification sent to every observer around a model operation.
///
/// `Before` events carry the filter and input values, `After` events also carry the resulting
/// records (or the count).
pub struct Event<'a, D: Driver> {
    pub model: &'a Model<D>,
    pub operation: Operation,
    pub phase: Phase,
    pub filter: Option<&'a Filter>,
    pub values: &'a [Values],
    pub records: &'a [Record<D>],
    pub count: Option<i64>,
}

impl<'a, D: Driver> Event<'a, D> {
    pub(crate) fn before(
        model: &'a Model<D>,
        operation: Operation,
        filter: Option<&'a Filter>,
        values: &'a [Values],
    ) -> Self {
        Self {
            model,
            operation,
            phase: Phase::Before,
            filter,
            values,
            records: &[],
            count: None,
        }
    }

    pub(crate) fn after(
        model: &'a Model<D>,
        operation: Operation,
        filter: Option<&'a Filter>,
        records: &'a [Record<D>],
    ) -> Self {
        Self {
            model,
            operation,
            phase: Phase::After,
            filter,
            values: &[],
            records,
            count: None,
        }
    }

    /// `before:<operation>` or `<operation>`
    pub fn name(&self) -> String {
        match self.phase {
            Phase::Before => format!("before:{}", self.operation),
            Phase::After => self.operation.name().to_string(),
        }
    }
}

/// Receives the events of every model of a database.
///
/// An error returned while handling a `Before` event aborts the operation before any statement
/// runs, one returned on `After` is reported to the caller after the statement ran.
pub trait Observer<D: Driver>: Send + Sync {
    fn notify<'a>(&'a self, event: &'a Event<'a, D>) -> BoxFuture<'a, Result<()>>;
}

/// Adapts a synchronous closure into an [`Observer`].
pub struct ObserverFn<F>(pub F);

impl<D, F> Observer<D> for ObserverFn<F>
where
    D: Driver,
    F: for<'e> Fn(&Event<'e, D>) -> Result<()> + Send + Sync,
{
    fn notify<'a>(&'a self, event: &'a Event<'a, D>) -> BoxFuture<'a, Result<()>> {
        Box::pin(future::ready((self.0)(event)))
    }
}
