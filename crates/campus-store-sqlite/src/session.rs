//! Session-scoped connections and units of work.
//!
//! A [`Database`] is only a recipe: path, busy timeout and the asset catalog.
//! Each [`DbSession`] opens its own connection, which is closed when the
//! session is dropped. Nothing is pooled.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use rusqlite::TransactionBehavior;
use tokio_rusqlite::Connection;

use crate::{
  AssetCatalog, Executor, Result,
  assets::SCHEMA_ASSET,
  value::{Params, Row},
};

/// Bumped whenever `schema.sql` changes shape.
pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct Database {
  path:         PathBuf,
  busy_timeout: Duration,
  assets:       Arc<AssetCatalog>,
}

impl Database {
  pub fn new(
    path: impl AsRef<Path>,
    assets: AssetCatalog,
    busy_timeout: Duration,
  ) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      busy_timeout,
      assets: Arc::new(assets),
    }
  }

  pub fn assets(&self) -> &AssetCatalog { &self.assets }

  /// Apply the bundled schema unless the database already carries
  /// [`SCHEMA_VERSION`]. Safe to call on every start.
  pub async fn initialize(&self) -> Result<()> {
    let schema = self.assets.get(SCHEMA_ASSET)?.to_owned();
    let session = self.session().await?;

    let (before, after) = session
      .conn
      .call(move |conn| {
        let before: i64 =
          conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if before < SCHEMA_VERSION {
          conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
          })?;
          conn.execute_batch(&schema)?;
        }
        let after: i64 =
          conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok((before, after))
      })
      .await?;

    if before < SCHEMA_VERSION {
      tracing::info!(from = before, to = after, path = %self.path.display(), "schema applied");
    } else {
      tracing::debug!(version = before, "schema up to date");
    }
    Ok(())
  }

  /// Open a fresh connection for one caller.
  pub async fn session(&self) -> Result<DbSession> {
    let conn = Connection::open(&self.path).await?;
    let timeout = self.busy_timeout;
    conn
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(())
      })
      .await?;
    Ok(DbSession { conn, assets: self.assets.clone() })
  }
}

/// One caller's connection. Single statements run in autocommit mode;
/// anything larger goes through [`DbSession::unit_of_work`].
pub struct DbSession {
  conn:   Connection,
  assets: Arc<AssetCatalog>,
}

impl DbSession {
  pub async fn fetch_all(&self, asset: &str, params: Params) -> Result<Vec<Row>> {
    let asset = asset.to_owned();
    self
      .with_connection(move |conn, assets| {
        Executor::new(conn, assets).fetch_all(&asset, &params)
      })
      .await
  }

  pub async fn fetch_one(&self, asset: &str, params: Params) -> Result<Option<Row>> {
    let asset = asset.to_owned();
    self
      .with_connection(move |conn, assets| {
        Executor::new(conn, assets).fetch_one(&asset, &params)
      })
      .await
  }

  /// Run `work` inside one immediate write transaction. `Ok` commits; any
  /// error rolls back before it is returned.
  pub async fn unit_of_work<T, F>(&self, work: F) -> Result<T>
  where
    F: FnOnce(&Executor<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .with_connection(move |conn, assets| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = work(&Executor::new(&tx, assets));
        match result {
          Ok(value) => {
            tx.commit()?;
            Ok(value)
          }
          Err(e) => {
            if let Err(rollback) = tx.rollback() {
              tracing::warn!(error = %rollback, "rollback failed");
            }
            tracing::debug!(error = %e, "unit of work rolled back");
            Err(e)
          }
        }
      })
      .await
  }

  /// Hand `f` the raw connection, for callers that manage their own
  /// transaction boundaries.
  pub async fn with_connection<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection, &AssetCatalog) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let assets = self.assets.clone();
    self.conn.call(move |conn| Ok(f(conn, &assets))).await?
  }
}
