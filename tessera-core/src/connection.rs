use crate::Executor;

/// A single live connection produced by a [`Driver`](crate::Driver) and owned by the pool.
pub trait Connection: Executor + 'static {
    /// The server side of the connection went away, the pool discards it.
    fn is_closed(&self) -> bool;
}
