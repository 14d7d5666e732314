//! Error type for `campus-store-sqlite`.
//!
//! Database failures are classified by SQLite's extended result code into a
//! [`DbErrorKind`]; nothing here inspects diagnostic text.

use std::path::PathBuf;

use campus_core::Classify;
use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] campus_core::Error),

  #[error("sql asset not found: {0}")]
  AssetNotFound(String),

  #[error("cannot read sql assets at {path:?}: {source}")]
  AssetRead {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("sql asset {asset} needs parameter {name:?}, which was not bound")]
  MissingParameter { asset: String, name: String },

  /// The database rejected a statement of `asset`.
  #[error("sql asset {asset} failed ({kind}): {source}")]
  Execution {
    asset:  String,
    kind:   DbErrorKind,
    #[source]
    source: rusqlite::Error,
  },

  /// A routine that must answer with a result row answered with nothing.
  #[error("sql asset {asset} returned no result")]
  NoResult { asset: String },

  #[error("role flags for {person_id} diverged from the plan after the cascade")]
  RoleDrift { person_id: String },

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("row decode error: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn execution(asset: &str, source: rusqlite::Error) -> Self {
    Self::Execution {
      asset: asset.to_owned(),
      kind: DbErrorKind::of(&source),
      source,
    }
  }

  /// The structured kind of the underlying database failure, if any.
  pub fn db_kind(&self) -> Option<DbErrorKind> {
    match self {
      Self::Execution { kind, .. } => Some(*kind),
      Self::Sqlite(e) | Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => {
        Some(DbErrorKind::of(e))
      }
      _ => None,
    }
  }
}

// ─── DbErrorKind ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DbErrorKind {
  UniqueViolation,
  ForeignKeyViolation,
  NotNullViolation,
  CheckViolation,
  /// Raised by a trigger or another constraint without a finer code.
  Constraint,
  Busy,
  Other,
}

impl DbErrorKind {
  pub fn of(err: &rusqlite::Error) -> Self {
    let rusqlite::Error::SqliteFailure(e, _) = err else {
      return Self::Other;
    };
    match e.extended_code {
      ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
        Self::UniqueViolation
      }
      ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKeyViolation,
      ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNullViolation,
      ffi::SQLITE_CONSTRAINT_CHECK => Self::CheckViolation,
      _ => match e.code {
        ErrorCode::ConstraintViolation => Self::Constraint,
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::Busy,
        _ => Self::Other,
      },
    }
  }

  /// Client-safe wording for this failure.
  pub fn public_message(self) -> &'static str {
    match self {
      Self::UniqueViolation => "A record with these details already exists",
      Self::ForeignKeyViolation => {
        "The referenced record does not exist or is still in use"
      }
      Self::NotNullViolation => "A required field was not provided",
      Self::CheckViolation | Self::Constraint => {
        "The data provided does not satisfy the validation rules"
      }
      Self::Busy => "The database is busy, please try again",
      Self::Other => "Error processing the operation",
    }
  }
}

impl Classify for Error {
  fn rejection(&self) -> Option<&campus_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }

  fn public_message(&self) -> String {
    if let Self::Core(e) = self {
      return e.to_string();
    }
    match self.db_kind() {
      Some(kind) => kind.public_message().to_owned(),
      None => "Error processing the operation".to_owned(),
    }
  }
}
