//! # storehouse
//!
//! A dynamic hierarchical table manager for inventory tracking, built on
//! the `may` coroutine runtime through `may_postgres`.
//!
//! The hierarchy is three levels deep: categories own a dynamically-named
//! table of items, and each item owns a dynamically-named table of units.
//! Table names are derived from user-entered display names, validated
//! against a strict identifier grammar, persisted on the owning rows, and
//! catalogued in a registry so sibling collisions are caught up front.
//!
//! All storage access goes through the [`StoreExecutor`] seam: the
//! production executor wraps a single pipelined `may_postgres` connection,
//! and the `mock` feature provides a scripted executor for tests.
//!
//! ```ignore
//! // Requires the `postgres` feature.
//! use storehouse::{connect, HierarchyRepository, MayPostgresExecutor, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::load()?;
//! let client = connect(&config.url)?;
//! let repo = HierarchyRepository::new(MayPostgresExecutor::new(client));
//! repo.bootstrap()?;
//!
//! let category = repo.create_category(&serde_json::json!({ "name": "Electronics" }))?;
//! let item = repo.create_item(category.id, &serde_json::json!({ "name": "PC" }))?;
//! let unit = repo.create_unit(
//!     category.id,
//!     item.id,
//!     &serde_json::json!({ "code": "24--001", "cost": "899.99" }),
//! )?;
//! println!("created unit {}", unit.id);
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod config;
#[cfg(feature = "postgres")]
pub mod connection;
pub mod error;
pub mod executor;
pub mod export;
pub mod hierarchy;
pub mod ident;
#[cfg(feature = "mock")]
pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod quantity;
pub mod schema;
pub mod transaction;
pub mod value;

pub use config::StoreConfig;
#[cfg(feature = "postgres")]
pub use connection::{connect, ConnectionError};
pub use error::StoreError;
pub use executor::StoreExecutor;
pub use export::{snapshot, InventorySnapshot};
pub use hierarchy::{Category, HierarchyRepository, Item, ItemUpdate, Unit};
pub use ident::TableIdent;
#[cfg(feature = "mock")]
pub use mock::MockExecutor;
#[cfg(feature = "postgres")]
pub use postgres::MayPostgresExecutor;
pub use schema::{RenameOutcome, TableKind, TableLifecycle};
pub use transaction::{with_transaction, Transaction};
pub use value::Row;
