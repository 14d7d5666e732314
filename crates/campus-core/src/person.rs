//! A person, identified by an immutable national id.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, de,
  roles::RoleFlags,
};

/// A person as listed by the administrative views, with resolved role flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:  String,
  pub name:       String,
  pub email:      String,
  pub phone:      Option<String>,
  pub birth_date: Option<NaiveDate>,
  pub created_at: NaiveDateTime,
  #[serde(flatten)]
  pub roles:      RoleFlags,
}

/// A person with every role-specific field and attribution label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetail {
  #[serde(flatten)]
  pub person:              Person,
  pub membership_number:   Option<String>,
  pub category:            Option<String>,
  pub qualification:       Option<String>,
  pub registration_number: Option<String>,
  #[serde(default)]
  pub attributions:        Vec<String>,
}

/// Input to [`crate::store::CampusStore::create_person`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPerson {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub person_id:  Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub name:       Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub email:      Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub phone:      Option<String>,
  #[serde(default)]
  pub birth_date: Option<NaiveDate>,
}

/// A [`NewPerson`] whose mandatory fields have been checked.
#[derive(Debug, Clone)]
pub struct ValidPerson {
  pub person_id:  String,
  pub name:       String,
  pub email:      String,
  pub phone:      Option<String>,
  pub birth_date: Option<NaiveDate>,
}

impl NewPerson {
  pub fn validate(self) -> Result<ValidPerson> {
    Ok(ValidPerson {
      person_id:  self.person_id.ok_or(Error::MissingInput("national id"))?,
      name:       self.name.ok_or(Error::MissingInput("name"))?,
      email:      self.email.ok_or(Error::MissingInput("email"))?,
      phone:      self.phone,
      birth_date: self.birth_date,
    })
  }
}

/// Mutable person attributes. The national id never changes.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonUpdate {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub name:  Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub email: Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub phone: Option<String>,
}

impl PersonUpdate {
  /// Name and email are mandatory on update, as on creation.
  pub fn validate(&self) -> Result<()> {
    if self.name.is_none() {
      return Err(Error::MissingInput("name"));
    }
    if self.email.is_none() {
      return Err(Error::MissingInput("email"));
    }
    Ok(())
  }
}

/// What a login lookup returns: identity, the stored password hash and flags.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRecord {
  pub person_id:     String,
  pub name:          String,
  pub email:         String,
  pub password_hash: Option<String>,
  #[serde(flatten)]
  pub roles:         RoleFlags,
}
