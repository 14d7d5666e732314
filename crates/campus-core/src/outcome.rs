//! The `{success, message, ...}` shape every workflow operation answers with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
  pub success: bool,
  #[serde(default)]
  pub message: String,
  /// Any further fields reported by the database routine.
  #[serde(flatten)]
  pub payload: Map<String, Value>,
}

impl Outcome {
  pub fn ok(message: impl Into<String>) -> Self {
    Self { success: true, message: message.into(), payload: Map::new() }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self { success: false, message: message.into(), payload: Map::new() }
  }

  /// Decode a routine result. Anything but an object carrying `success` is
  /// not an outcome.
  pub fn from_value(value: Value) -> Option<Self> {
    match value {
      Value::Object(_) => serde_json::from_value(value).ok(),
      _ => None,
    }
  }

  pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.payload.insert(key.to_owned(), value.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn decodes_object_results_only() {
    let failed = Outcome::from_value(json!({"success": false, "message": "full"}));
    assert_eq!(failed, Some(Outcome::failed("full")));

    let from_object =
      Outcome::from_value(json!({"success": true, "message": "ok", "participation_id": 4}))
        .unwrap();
    assert!(from_object.success);
    assert_eq!(from_object.payload.get("participation_id"), Some(&json!(4)));

    assert_eq!(Outcome::from_value(json!(null)), None);
    assert_eq!(Outcome::from_value(json!(r#"{"success":true}"#)), None);
    assert_eq!(Outcome::from_value(json!({"message": "no flag"})), None);
  }

  #[test]
  fn payload_flattens_into_the_body() {
    let body = serde_json::to_value(Outcome::ok("done").with("status", "ACCEPTED")).unwrap();
    assert_eq!(body, json!({"success": true, "message": "done", "status": "ACCEPTED"}));
  }
}
