//! Serde helpers shared by row decoding and request bodies.

use serde::{Deserialize, Deserializer, de::Error as _};

/// Accept a JSON boolean or a `0`/`1` integer. SQLite has no boolean type, so
/// computed flag columns arrive as integers.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Bool(bool),
    Int(i64),
  }

  match Raw::deserialize(deserializer)? {
    Raw::Bool(b) => Ok(b),
    Raw::Int(0) => Ok(false),
    Raw::Int(1) => Ok(true),
    Raw::Int(other) => Err(D::Error::custom(format!("not a flag: {other}"))),
  }
}

/// An optional flag from JSON (`true`, `1`) or from a form field (`"true"`,
/// `"on"`, `"1"`). A blank string means the field was left untouched.
pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Bool(bool),
    Int(i64),
    Text(String),
  }

  match Option::<Raw>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Raw::Bool(b)) => Ok(Some(b)),
    Some(Raw::Int(0)) => Ok(Some(false)),
    Some(Raw::Int(1)) => Ok(Some(true)),
    Some(Raw::Int(other)) => Err(D::Error::custom(format!("not a flag: {other}"))),
    Some(Raw::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
      "" => Ok(None),
      "true" | "on" | "yes" | "1" => Ok(Some(true)),
      "false" | "off" | "no" | "0" => Ok(Some(false)),
      other => Err(D::Error::custom(format!("not a flag: {other}"))),
    },
  }
}

/// Trim a string and map blank input to `None`. Form-encoded bodies send
/// empty strings for untouched fields.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(deserializer)?;
  Ok(raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  #[derive(Deserialize)]
  struct Fields {
    #[serde(deserialize_with = "super::flag")]
    on:   bool,
    #[serde(default, deserialize_with = "super::blank_as_none")]
    note: Option<String>,
  }

  #[derive(Deserialize)]
  struct Toggle {
    #[serde(default, deserialize_with = "super::opt_flag")]
    staff: Option<bool>,
  }

  #[test]
  fn flag_accepts_integers_and_booleans() {
    let p: Fields = serde_json::from_str(r#"{"on": 1}"#).unwrap();
    assert!(p.on);
    let p: Fields = serde_json::from_str(r#"{"on": false}"#).unwrap();
    assert!(!p.on);
    assert!(serde_json::from_str::<Fields>(r#"{"on": 7}"#).is_err());
  }

  #[test]
  fn blank_strings_become_none() {
    let p: Fields = serde_json::from_str(r#"{"on": 0, "note": "   "}"#).unwrap();
    assert_eq!(p.note, None);
    let p: Fields = serde_json::from_str(r#"{"on": 0, "note": " hi "}"#).unwrap();
    assert_eq!(p.note.as_deref(), Some("hi"));
    let p: Fields = serde_json::from_str(r#"{"on": 0}"#).unwrap();
    assert_eq!(p.note, None);
  }

  #[test]
  fn opt_flag_accepts_form_values() {
    let t: Toggle = serde_json::from_str(r#"{"staff": "on"}"#).unwrap();
    assert_eq!(t.staff, Some(true));
    let t: Toggle = serde_json::from_str(r#"{"staff": "false"}"#).unwrap();
    assert_eq!(t.staff, Some(false));
    let t: Toggle = serde_json::from_str(r#"{"staff": ""}"#).unwrap();
    assert_eq!(t.staff, None);
    let t: Toggle = serde_json::from_str(r#"{"staff": true}"#).unwrap();
    assert_eq!(t.staff, Some(true));
    let t: Toggle = serde_json::from_str("{}").unwrap();
    assert_eq!(t.staff, None);
    assert!(serde_json::from_str::<Toggle>(r#"{"staff": "maybe"}"#).is_err());
  }
}
