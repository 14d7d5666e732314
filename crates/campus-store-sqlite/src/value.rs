//! Values crossing the SQL boundary.
//!
//! [`Param`] is what callers bind; [`Row`] is what the executor hands back.
//! Temporal values travel as ISO-8601 text in both directions so that a row
//! serializes to JSON exactly as it was stored.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// A result row: lower-cased column name → normalized value.
pub type Row = serde_json::Map<String, Value>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn iso_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn iso_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn iso_naive(dt: NaiveDateTime) -> String {
  dt.format(NAIVE_DATETIME_FORMAT).to_string()
}

pub fn iso_utc(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
  Null,
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
  Date(NaiveDate),
  Time(NaiveTime),
  DateTime(DateTime<Utc>),
  NaiveDateTime(NaiveDateTime),
  Json(Value),
}

impl ToSql for Param {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match self {
      Self::Null => ToSqlOutput::Owned(SqlValue::Null),
      Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
      Self::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
      Self::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
      Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
      Self::Date(d) => ToSqlOutput::Owned(SqlValue::Text(iso_date(*d))),
      Self::Time(t) => ToSqlOutput::Owned(SqlValue::Text(iso_time(*t))),
      Self::DateTime(dt) => ToSqlOutput::Owned(SqlValue::Text(iso_utc(*dt))),
      Self::NaiveDateTime(dt) => ToSqlOutput::Owned(SqlValue::Text(iso_naive(*dt))),
      Self::Json(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
    })
  }
}

macro_rules! param_from {
  ($($ty:ty => $variant:ident),* $(,)?) => {
    $(impl From<$ty> for Param {
      fn from(v: $ty) -> Self { Self::$variant(v.into()) }
    })*
  };
}

param_from! {
  bool => Bool,
  i32 => Integer,
  i64 => Integer,
  f64 => Real,
  String => Text,
  &str => Text,
  &String => Text,
  NaiveDate => Date,
  NaiveTime => Time,
  DateTime<Utc> => DateTime,
  NaiveDateTime => NaiveDateTime,
  Value => Json,
}

impl<T: Into<Param>> From<Option<T>> for Param {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Named parameters for one asset execution. Names carry no prefix: the
/// statement placeholder `:person_id` binds the entry `person_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Param>);

impl Params {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, name: &str, value: impl Into<Param>) -> Self {
    self.0.insert(name.to_owned(), value.into());
    self
  }

  pub fn get(&self, name: &str) -> Option<&Param> { self.0.get(name) }
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// How a column's declared type asks its values to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
  Date,
  Time,
  DateTime,
  Boolean,
  Json,
  Plain,
  /// Expression columns (aggregates, `CASE`, `json_object(...)`) carry no
  /// declared type at all.
  Untyped,
}

impl ColumnKind {
  pub(crate) fn from_decl(decl: Option<&str>) -> Self {
    let Some(decl) = decl else { return Self::Untyped };
    let decl = decl.to_ascii_uppercase();
    if decl.contains("DATETIME") || decl.contains("TIMESTAMP") {
      Self::DateTime
    } else if decl.contains("DATE") {
      Self::Date
    } else if decl.contains("TIME") {
      Self::Time
    } else if decl.contains("BOOL") {
      Self::Boolean
    } else if decl.contains("JSON") {
      Self::Json
    } else {
      Self::Plain
    }
  }
}

/// Render one cell as JSON. Values that do not parse as their declared type
/// pass through unchanged rather than failing the whole row.
pub(crate) fn normalize(value: ValueRef<'_>, kind: ColumnKind) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => match kind {
      ColumnKind::Boolean => Value::Bool(i != 0),
      ColumnKind::DateTime => DateTime::from_timestamp(i, 0)
        .map_or(Value::from(i), |dt| Value::String(iso_utc(dt))),
      _ => Value::from(i),
    },
    ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(bytes) => normalize_text(&String::from_utf8_lossy(bytes), kind),
    ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
  }
}

fn normalize_text(text: &str, kind: ColumnKind) -> Value {
  let rendered = match kind {
    ColumnKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT).ok().map(iso_date),
    ColumnKind::Time => NaiveTime::parse_from_str(text, TIME_FORMAT).ok().map(iso_time),
    ColumnKind::DateTime => parse_datetime(text),
    ColumnKind::Boolean => {
      return match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" => Value::Bool(true),
        "0" | "false" | "f" | "no" => Value::Bool(false),
        _ => Value::String(text.to_owned()),
      };
    }
    ColumnKind::Json => {
      return serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()));
    }
    ColumnKind::Untyped => return untyped_text(text),
    ColumnKind::Plain => None,
  };
  Value::String(rendered.unwrap_or_else(|| text.to_owned()))
}

/// SQLite's JSON functions return text. In an untyped column, text that is a
/// JSON array or object is decoded so nested collections reach callers as
/// values at any depth.
fn untyped_text(text: &str) -> Value {
  let trimmed = text.trim_start();
  if (trimmed.starts_with('[') || trimmed.starts_with('{'))
    && let Ok(value) = serde_json::from_str(text)
  {
    return value;
  }
  Value::String(text.to_owned())
}

/// Time-zone-aware text keeps its offset as RFC 3339; naive text (with a `T`
/// or a space separator) comes back naive with a `T`.
fn parse_datetime(text: &str) -> Option<String> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
    return Some(dt.to_rfc3339());
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    .map(iso_naive)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn declared_types_pick_a_kind() {
    assert_eq!(ColumnKind::from_decl(Some("TIMESTAMP")), ColumnKind::DateTime);
    assert_eq!(ColumnKind::from_decl(Some("datetime")), ColumnKind::DateTime);
    assert_eq!(ColumnKind::from_decl(Some("DATE")), ColumnKind::Date);
    assert_eq!(ColumnKind::from_decl(Some("TIME")), ColumnKind::Time);
    assert_eq!(ColumnKind::from_decl(Some("BOOLEAN")), ColumnKind::Boolean);
    assert_eq!(ColumnKind::from_decl(Some("JSON")), ColumnKind::Json);
    assert_eq!(ColumnKind::from_decl(Some("TEXT")), ColumnKind::Plain);
    assert_eq!(ColumnKind::from_decl(None), ColumnKind::Untyped);
  }

  #[test]
  fn temporal_text_becomes_iso_8601() {
    assert_eq!(
      normalize(ValueRef::Text(b"2024-03-01 10:15:00"), ColumnKind::DateTime),
      json!("2024-03-01T10:15:00")
    );
    assert_eq!(
      normalize(ValueRef::Text(b"2024-03-01T10:15:00+02:00"), ColumnKind::DateTime),
      json!("2024-03-01T10:15:00+02:00")
    );
    assert_eq!(
      normalize(ValueRef::Text(b"2024-03-01"), ColumnKind::Date),
      json!("2024-03-01")
    );
    assert_eq!(
      normalize(ValueRef::Text(b"09:30:00"), ColumnKind::Time),
      json!("09:30:00")
    );
    assert_eq!(
      normalize(ValueRef::Integer(0), ColumnKind::DateTime),
      json!("1970-01-01T00:00:00+00:00")
    );
  }

  #[test]
  fn other_cells_pass_through() {
    assert_eq!(normalize(ValueRef::Integer(7), ColumnKind::Plain), json!(7));
    assert_eq!(normalize(ValueRef::Integer(1), ColumnKind::Boolean), json!(true));
    assert_eq!(normalize(ValueRef::Text(b"hello"), ColumnKind::Plain), json!("hello"));
    assert_eq!(normalize(ValueRef::Text(b"not a date"), ColumnKind::Date), json!("not a date"));
    assert_eq!(normalize(ValueRef::Blob(&[0xde, 0xad]), ColumnKind::Plain), json!("dead"));
    assert_eq!(normalize(ValueRef::Null, ColumnKind::Date), Value::Null);
    assert_eq!(
      normalize(ValueRef::Text(br#"{"a":[1,2]}"#), ColumnKind::Json),
      json!({"a": [1, 2]})
    );
  }

  #[test]
  fn untyped_json_text_is_decoded() {
    assert_eq!(
      normalize(ValueRef::Text(br#"["Administrator","Coach"]"#), ColumnKind::Untyped),
      json!(["Administrator", "Coach"])
    );
    assert_eq!(
      normalize(ValueRef::Text(br#"{"success":true,"seats":{"left":[1]}}"#), ColumnKind::Untyped),
      json!({"success": true, "seats": {"left": [1]}})
    );
    assert_eq!(normalize(ValueRef::Text(b"[not json"), ColumnKind::Untyped), json!("[not json"));
    assert_eq!(normalize(ValueRef::Text(b"plain"), ColumnKind::Untyped), json!("plain"));
    // Declared TEXT columns keep bracketed text verbatim.
    assert_eq!(normalize(ValueRef::Text(b"[1]"), ColumnKind::Plain), json!("[1]"));
  }

  #[test]
  fn params_bind_iso_text() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let param = Param::from(date);
    let out = param.to_sql().unwrap();
    assert_eq!(out, ToSqlOutput::Owned(SqlValue::Text("2024-03-01".into())));
    assert_eq!(Param::from(None::<String>), Param::Null);
    assert_eq!(Param::from(Some("x")), Param::Text("x".into()));
  }
}
