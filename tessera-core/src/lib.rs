mod as_value;
mod association;
mod config;
mod connection;
mod database;
mod driver;
mod enumeration;
mod error;
mod event;
mod executor;
mod filter;
mod inflect;
mod model;
mod pool;
mod query;
mod record;
mod relation;
mod schema;
mod sql_writer;
mod statement;
mod table_ref;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use association::*;
pub use config::*;
pub use connection::*;
pub use database::*;
pub use driver::*;
pub use enumeration::*;
pub use error::*;
pub use event::*;
pub use executor::*;
pub use filter::*;
pub use inflect::*;
pub use model::*;
pub use pool::*;
pub use query::*;
pub use record::*;
pub use relation::*;
pub use schema::*;
pub use sql_writer::*;
pub use statement::*;
pub use table_ref::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use ::futures::future;
pub use ::indexmap;
pub use ::serde_json;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
