//! Invitations: token-bearing records that let an external guest join an
//! activity without holding an account.

use std::fmt;

use chrono::NaiveDateTime;
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, activity::Participation, de};

/// Random bytes behind every token; hex-encoded to twice this many characters.
pub const TOKEN_BYTES: usize = 32;

/// Characters of a token that may appear in diagnostics.
const TOKEN_VISIBLE_PREFIX: usize = 8;

// ─── Status ──────────────────────────────────────────────────────────────────

/// PENDING is the only non-terminal state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
  Pending,
  Accepted,
  Rejected,
}

impl InvitationStatus {
  pub fn is_pending(self) -> bool { matches!(self, Self::Pending) }
}

/// The two transitions out of PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Accept,
  Reject,
}

impl Transition {
  /// The status a successful transition lands in.
  pub fn target(self) -> InvitationStatus {
    match self {
      Self::Accept => InvitationStatus::Accepted,
      Self::Reject => InvitationStatus::Rejected,
    }
  }
}

// ─── Token ───────────────────────────────────────────────────────────────────

/// An opaque bearer credential. `Debug` and `Display` only ever show a short
/// prefix, so a token can be logged without leaking it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationToken(String);

impl InvitationToken {
  /// Generate a fresh token from the operating system RNG.
  pub fn generate() -> Self {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Self(hex::encode(bytes))
  }

  /// Wrap a token received from a client, trimming surrounding whitespace.
  pub fn new(raw: impl AsRef<str>) -> Self { Self(raw.as_ref().trim().to_owned()) }

  /// The full secret. Only for binding into queries and for the one response
  /// that hands the token to its creator.
  pub fn expose(&self) -> &str { &self.0 }

  pub fn redacted(&self) -> String {
    let prefix: String = self.0.chars().take(TOKEN_VISIBLE_PREFIX).collect();
    format!("{prefix}…")
  }
}

impl fmt::Debug for InvitationToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("InvitationToken").field(&self.redacted()).finish()
  }
}

impl fmt::Display for InvitationToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.redacted())
  }
}

// ─── Invitation ──────────────────────────────────────────────────────────────

/// An invitation row as the store returns it. The token is not part of this
/// view; it is handed out once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
  pub invitation_id:    i64,
  pub inviter_id:       String,
  pub invitee_document: String,
  pub invitee_name:     String,
  pub invitee_email:    Option<String>,
  pub invitee_phone:    Option<String>,
  pub activity_id:      Option<i64>,
  pub activity_name:    Option<String>,
  pub status:           InvitationStatus,
  pub notes:            Option<String>,
  pub created_at:       NaiveDateTime,
}

/// What a guest sees: the invitation and, once accepted, the seat it holds.
#[derive(Debug, Clone, Serialize)]
pub struct GuestDashboard {
  pub invitation:    Invitation,
  pub participation: Option<Participation>,
}

/// Input to [`crate::store::CampusStore::create_invitation`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvitation {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub invitee_document: Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub invitee_name:     Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub invitee_email:    Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub invitee_phone:    Option<String>,
  #[serde(default)]
  pub activity_id:      Option<i64>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub notes:            Option<String>,
}

/// A [`NewInvitation`] whose mandatory fields have been checked.
#[derive(Debug, Clone)]
pub struct ValidInvitation {
  pub invitee_document: String,
  pub invitee_name:     String,
  pub invitee_email:    Option<String>,
  pub invitee_phone:    Option<String>,
  pub activity_id:      Option<i64>,
  pub notes:            Option<String>,
}

impl NewInvitation {
  pub fn validate(self) -> Result<ValidInvitation> {
    Ok(ValidInvitation {
      invitee_document: self
        .invitee_document
        .ok_or(Error::MissingInput("invitee document"))?,
      invitee_name:     self.invitee_name.ok_or(Error::MissingInput("invitee name"))?,
      invitee_email:    self.invitee_email,
      invitee_phone:    self.invitee_phone,
      activity_id:      self.activity_id,
      notes:            self.notes,
    })
  }
}

/// Returned to the inviter exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvitation {
  pub invitation_id: i64,
  pub token:         String,
  pub status:        InvitationStatus,
}
