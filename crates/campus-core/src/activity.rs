//! Activities and the capacity-bound participations they hold.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, de};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id: i64,
  pub name:        String,
  pub capacity:    i64,
  pub starts_on:   Option<NaiveDate>,
  /// Participations currently held against `capacity`.
  pub enrolled:    i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub name:      Option<String>,
  pub capacity:  i64,
  #[serde(default)]
  pub starts_on: Option<NaiveDate>,
}

impl NewActivity {
  pub fn validate(&self) -> Result<()> {
    if self.name.is_none() {
      return Err(Error::MissingInput("name"));
    }
    if self.capacity < 0 {
      return Err(Error::MissingInput("a non-negative capacity"));
    }
    Ok(())
  }
}

/// A seat in an activity, held either by a person or by an invited guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
  pub participation_id: i64,
  pub activity_id:      i64,
  pub activity_name:    String,
  pub person_id:        Option<String>,
  pub invitation_id:    Option<i64>,
  pub enrolled_at:      NaiveDateTime,
}
