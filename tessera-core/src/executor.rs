use crate::{Query, Result, RowLabeled, RowsAffected};
use std::future::Future;

pub trait Executor: Send {
    /// Execute the query and return the rows.
    fn fetch(&mut self, query: &Query) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send;

    /// Execute the query and return the total number of rows affected.
    fn execute(&mut self, query: &Query) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Run parameterless statements, possibly several separated by `;`.
    fn batch(&mut self, sql: &str) -> impl Future<Output = Result<()>> + Send;
}
