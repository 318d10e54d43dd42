//! Tessera maps the tables of a live database into models at startup.
//!
//! The schema is introspected once, associations are inferred from the `<table>_id` naming
//! convention and small lookup tables become enumerations. Records track their changes and
//! load their associations lazily.
//!
//! ```no_run
//! # async fn run<D: tessera::Driver>(driver: D) -> tessera::Result<()> {
//! use tessera::{AssociationOptions, Database, DatabaseConfig, Filter};
//!
//! let database = Database::connect(driver, DatabaseConfig::from_env()).await?;
//! let account = database.try_model("Account")?;
//! if let Some(mut record) = account.find_one(Filter::eq("email", "steve@rogers.com")).await? {
//!     record.set("firstName", "Steven");
//!     record.save(None).await?;
//!     record.populate("accountGroup", AssociationOptions::new(), None).await?;
//!     println!("{}", record.to_json());
//! }
//! # Ok(())
//! # }
//! ```
pub use tessera_core::*;
