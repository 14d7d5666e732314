//! Business error taxonomy for `campus-core`.
//!
//! Every variant here is an expected, user-facing rejection. None of them is a
//! fault: the boundary answers them with a 4xx (or a 200 with
//! `success: false`) and logs them at debug level.

use thiserror::Error;

use crate::roles::{Role, RoleField};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("person not found: {0}")]
  PersonNotFound(String),

  #[error("invitation not found")]
  InvitationNotFound,

  #[error("activity not found: {0}")]
  ActivityNotFound(i64),

  #[error("registration request not found: {0}")]
  RegistrationNotFound(i64),

  /// Invitations or enrollments still point at this person.
  #[error("person {0} still has invitations or enrollments")]
  PersonHasDependents(String),

  #[error("{role} requires the {requires} role")]
  PrecursorRoleMissing { role: Role, requires: Role },

  #[error("{field} is required to grant the {role} role")]
  RequiredFieldMissing { role: Role, field: RoleField },

  #[error("only internal members can invite guests")]
  InviterNotInternal,

  #[error("{0} is required")]
  MissingInput(&'static str),

  #[error("invalid invitation token")]
  InvalidToken,

  #[error("invitation is not pending")]
  NotPending,

  #[error("passwords do not match")]
  PasswordMismatch,

  #[error("this national id already has an account or a pending request")]
  AlreadyRegistered,

  #[error("this email address belongs to another person")]
  EmailInUse,
}

impl Error {
  /// The HTTP status class the boundary should answer with.
  pub fn status_code(&self) -> u16 {
    match self {
      Self::PersonNotFound(_)
      | Self::InvitationNotFound
      | Self::ActivityNotFound(_)
      | Self::RegistrationNotFound(_) => 404,
      Self::PrecursorRoleMissing { .. }
      | Self::RequiredFieldMissing { .. }
      | Self::MissingInput(_)
      | Self::PasswordMismatch => 400,
      Self::PersonHasDependents(_) | Self::AlreadyRegistered | Self::EmailInUse => 409,
      Self::InvalidToken => 401,
      Self::InviterNotInternal => 403,
      // Double submission is an ordinary outcome, not a client error.
      Self::NotPending => 200,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Lets the boundary tell business rejections apart from infrastructure
/// faults without knowing the concrete backend error type.
pub trait Classify {
  /// The business rejection wrapped by this error, if any.
  fn rejection(&self) -> Option<&Error>;

  /// A message that is safe to show to a client. Never contains raw database
  /// diagnostics.
  fn public_message(&self) -> String;
}

impl Classify for Error {
  fn rejection(&self) -> Option<&Error> { Some(self) }

  fn public_message(&self) -> String { self.to_string() }
}
