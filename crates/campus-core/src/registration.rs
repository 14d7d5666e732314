//! Self-service account requests.
//!
//! Anyone may ask for an account under their national id and membership
//! number. Nothing is granted until an administrator approves the request;
//! approval creates (or completes) the person, stores the password hash and
//! makes them an internal member.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, de};

/// Like invitations, PENDING is the only state a request may leave.
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
pub enum RegistrationStatus {
  Pending,
  Approved,
  Rejected,
}

/// The two administrative decisions on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Review {
  Approve,
  Reject,
}

impl Review {
  pub fn target(self) -> RegistrationStatus {
    match self {
      Self::Approve => RegistrationStatus::Approved,
      Self::Reject => RegistrationStatus::Rejected,
    }
  }
}

/// A request as listed for review. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
  pub registration_id:   i64,
  pub person_id:         String,
  pub name:              String,
  pub email:             String,
  pub phone:             Option<String>,
  pub membership_number: String,
  pub status:            RegistrationStatus,
  pub requested_at:      NaiveDateTime,
  pub reviewed_by:       Option<String>,
  pub reviewed_at:       Option<NaiveDateTime>,
  pub notes:             Option<String>,
}

/// The registration form. Every field but the phone is mandatory.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistration {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub person_id:         Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub name:              Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub email:             Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub phone:             Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub membership_number: Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub password:          Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub password_confirm:  Option<String>,
}

/// A checked [`NewRegistration`]. The plain password stays with the caller,
/// which hashes it before the store sees the request.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
  pub person_id:         String,
  pub name:              String,
  pub email:             String,
  pub phone:             Option<String>,
  pub membership_number: String,
}

impl NewRegistration {
  /// Split into the request and its confirmed password.
  pub fn validate(self) -> Result<(ValidRegistration, String)> {
    let password = self.password.ok_or(Error::MissingInput("password"))?;
    let confirm = self
      .password_confirm
      .ok_or(Error::MissingInput("password confirmation"))?;
    if password != confirm {
      return Err(Error::PasswordMismatch);
    }
    let request = ValidRegistration {
      person_id:         self.person_id.ok_or(Error::MissingInput("national id"))?,
      name:              self.name.ok_or(Error::MissingInput("name"))?,
      email:             self.email.ok_or(Error::MissingInput("email"))?,
      phone:             self.phone,
      membership_number: self
        .membership_number
        .ok_or(Error::MissingInput("membership number"))?,
    };
    Ok((request, password))
  }
}

/// Returned to the applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedRegistration {
  pub registration_id: i64,
  pub status:          RegistrationStatus,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn form(password_confirm: &str) -> NewRegistration {
    serde_json::from_value(json!({
      "person_id": " 123 ",
      "name": "Ana",
      "email": "ana@campus.test",
      "phone": "",
      "membership_number": "9001",
      "password": "secret",
      "password_confirm": password_confirm,
    }))
    .unwrap()
  }

  #[test]
  fn valid_form_keeps_the_password_apart() {
    let (request, password) = form("secret").validate().unwrap();
    assert_eq!(request.person_id, "123");
    assert_eq!(request.phone, None);
    assert_eq!(password, "secret");
  }

  #[test]
  fn passwords_must_match() {
    assert!(matches!(form("other").validate(), Err(Error::PasswordMismatch)));
  }

  #[test]
  fn blank_fields_are_missing() {
    let mut input = form("secret");
    input.membership_number = None;
    assert!(matches!(
      input.validate(),
      Err(Error::MissingInput("membership number"))
    ));
  }

  #[test]
  fn reviews_land_in_terminal_states() {
    assert_eq!(Review::Approve.target(), RegistrationStatus::Approved);
    assert_eq!(Review::Reject.target().to_string(), "REJECTED");
  }
}
