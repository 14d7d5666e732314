//! SQLite backend for the Campus workflow core.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Domain queries live in named SQL assets
//! (see [`assets`]) that the [`executor`] resolves, binds and normalizes.

pub mod assets;
pub mod error;
pub mod executor;
pub mod session;
pub mod value;

mod invitations;
mod registrations;
mod roles;
mod store;

pub use assets::AssetCatalog;
pub use error::{DbErrorKind, Error, Result};
pub use executor::Executor;
pub use session::{Database, DbSession};
pub use store::{BUNDLED_SQL_ROOT, SqliteStore};
pub use value::{Param, Params, Row};
