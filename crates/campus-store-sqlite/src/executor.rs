//! The SQL-asset executor.
//!
//! An [`Executor`] borrows a connection (or an open transaction, which derefs
//! to one) and runs named assets against it. It never begins, commits or rolls
//! back anything itself; callers own the transaction.

use rusqlite::{Batch, Connection, Statement};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
  AssetCatalog, Error, Result,
  value::{ColumnKind, Params, Row, normalize},
};

pub struct Executor<'c> {
  conn:   &'c Connection,
  assets: &'c AssetCatalog,
}

impl<'c> Executor<'c> {
  pub fn new(conn: &'c Connection, assets: &'c AssetCatalog) -> Self {
    Self { conn, assets }
  }

  /// Every row of the asset's last statement.
  pub fn fetch_all(&self, asset: &str, params: &Params) -> Result<Vec<Row>> {
    self.run(asset, params)
  }

  /// The first row of the asset's last statement, if any.
  pub fn fetch_one(&self, asset: &str, params: &Params) -> Result<Option<Row>> {
    Ok(self.run(asset, params)?.into_iter().next())
  }

  /// Run the asset for its side effects.
  pub fn execute_statement(&self, asset: &str, params: &Params) -> Result<()> {
    self.run(asset, params).map(drop)
  }

  /// [`Self::fetch_one`], decoding the row into `T`.
  pub fn fetch_one_as<T: DeserializeOwned>(
    &self,
    asset: &str,
    params: &Params,
  ) -> Result<Option<T>> {
    self.fetch_one(asset, params)?.map(decode).transpose()
  }

  /// Statements run in order; each binds the parameters it names. Only the
  /// last statement's rows are returned.
  fn run(&self, asset: &str, params: &Params) -> Result<Vec<Row>> {
    let sql = self.assets.get(asset)?;
    tracing::debug!(asset, "executing sql asset");

    let mut batch = Batch::new(self.conn, sql);
    let mut rows = Vec::new();
    while let Some(mut stmt) = batch.next().map_err(|e| Error::execution(asset, e))? {
      bind(&mut stmt, asset, params)?;
      rows = collect(&mut stmt).map_err(|e| Error::execution(asset, e))?;
    }
    Ok(rows)
  }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T> {
  Ok(serde_json::from_value(Value::Object(row))?)
}

fn bind(stmt: &mut Statement<'_>, asset: &str, params: &Params) -> Result<()> {
  for index in 1..=stmt.parameter_count() {
    // Placeholders keep their `:`, `@` or `$` prefix.
    let name = stmt
      .parameter_name(index)
      .map(|raw| raw[1..].to_owned())
      .unwrap_or_else(|| format!("?{index}"));
    let value = params.get(&name).ok_or_else(|| Error::MissingParameter {
      asset: asset.to_owned(),
      name:  name.clone(),
    })?;
    stmt
      .raw_bind_parameter(index, value)
      .map_err(|e| Error::execution(asset, e))?;
  }
  Ok(())
}

fn collect(stmt: &mut Statement<'_>) -> rusqlite::Result<Vec<Row>> {
  let columns: Vec<(String, ColumnKind)> = stmt
    .columns()
    .iter()
    .map(|c| (c.name().to_lowercase(), ColumnKind::from_decl(c.decl_type())))
    .collect();

  let mut out = Vec::new();
  let mut rows = stmt.raw_query();
  while let Some(row) = rows.next()? {
    let mut map = Row::new();
    for (index, (name, kind)) in columns.iter().enumerate() {
      map.insert(name.clone(), normalize(row.get_ref(index)?, *kind));
    }
    out.push(map);
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone as _, Utc};
  use serde_json::json;

  use super::*;
  use crate::value::{iso_naive, iso_utc};

  fn catalog() -> AssetCatalog {
    AssetCatalog::from_pairs([
      (
        "sample/setup",
        "CREATE TABLE sample (
           id      INTEGER PRIMARY KEY,
           label   TEXT NOT NULL UNIQUE,
           day     DATE,
           seen_at TIMESTAMP,
           active  BOOLEAN,
           doc     JSON
         );",
      ),
      (
        "sample/insert",
        "INSERT INTO sample (label, day, seen_at, active, doc)
         VALUES (:label, :day, :seen_at, :active, :doc)
         RETURNING id;",
      ),
      ("sample/all", "SELECT id, label AS Label, day, seen_at, active, doc FROM sample ORDER BY id;"),
      ("sample/by_label", "SELECT day, seen_at FROM sample WHERE label = :label;"),
      (
        "sample/summary",
        "SELECT json_group_array(label) AS labels,
                json_object('count', COUNT(*), 'active', json('true')) AS summary
           FROM sample;",
      ),
      (
        "sample/two_step",
        "UPDATE sample SET label = :label WHERE id = :id;
         SELECT label FROM sample WHERE id = :id;",
      ),
    ])
  }

  fn setup(conn: &Connection, assets: &AssetCatalog) {
    Executor::new(conn, assets)
      .execute_statement("sample/setup", &Params::new())
      .unwrap();
  }

  fn sample(label: &str) -> Params {
    Params::new()
      .with("label", label)
      .with("day", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
      .with("seen_at", "2024-05-01 08:00:00")
      .with("active", true)
      .with("doc", json!({"tags": ["a"]}))
  }

  #[test]
  fn rows_are_normalized_by_declared_type() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    exec.fetch_one("sample/insert", &sample("first")).unwrap();
    let rows = exec.fetch_all("sample/all", &Params::new()).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
      Value::Object(rows[0].clone()),
      json!({
        "id": 1,
        "label": "first",
        "day": "2024-05-01",
        "seen_at": "2024-05-01T08:00:00",
        "active": true,
        "doc": {"tags": ["a"]},
      })
    );
  }

  #[test]
  fn zero_rows_is_empty_not_an_error() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    assert!(exec.fetch_all("sample/all", &Params::new()).unwrap().is_empty());
    assert_eq!(exec.fetch_one("sample/all", &Params::new()).unwrap(), None);
  }

  #[test]
  fn multi_statement_assets_return_the_last_result() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    exec.execute_statement("sample/insert", &sample("old")).unwrap();
    let row = exec
      .fetch_one("sample/two_step", &Params::new().with("id", 1).with("label", "new"))
      .unwrap()
      .unwrap();
    assert_eq!(row.get("label"), Some(&json!("new")));
  }

  #[test]
  fn unbound_parameters_are_reported() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    let err = exec
      .execute_statement("sample/insert", &Params::new().with("label", "x"))
      .unwrap_err();
    assert!(matches!(err, Error::MissingParameter { ref name, .. } if name == "day"));
  }

  #[test]
  fn constraint_failures_carry_a_kind() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    exec.execute_statement("sample/insert", &sample("dup")).unwrap();
    let err = exec.execute_statement("sample/insert", &sample("dup")).unwrap_err();
    assert_eq!(err.db_kind(), Some(crate::DbErrorKind::UniqueViolation));
    assert!(matches!(err, Error::Execution { ref asset, .. } if asset == "sample/insert"));
  }

  #[test]
  fn unknown_assets_fail_before_touching_the_database() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    let err = Executor::new(&conn, &assets)
      .fetch_all("sample/nope", &Params::new())
      .unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(_)));
  }

  #[test]
  fn temporal_params_come_back_as_their_iso_rendering() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
      .unwrap()
      .and_hms_milli_opt(8, 30, 15, 250)
      .unwrap();
    let utc = Utc.with_ymd_and_hms(2024, 5, 2, 17, 45, 0).unwrap();
    exec
      .execute_statement("sample/insert", &sample("naive").with("seen_at", naive))
      .unwrap();
    exec
      .execute_statement("sample/insert", &sample("utc").with("seen_at", utc))
      .unwrap();

    let read = |label: &str| {
      exec
        .fetch_one("sample/by_label", &Params::new().with("label", label))
        .unwrap()
        .unwrap()
    };
    assert_eq!(read("naive")["seen_at"], json!(iso_naive(naive)));
    assert_eq!(read("utc")["seen_at"], json!(iso_utc(utc)));
    assert_eq!(read("utc")["day"], json!("2024-05-01"));
  }

  #[test]
  fn json_function_results_come_back_nested() {
    let conn = Connection::open_in_memory().unwrap();
    let assets = catalog();
    setup(&conn, &assets);
    let exec = Executor::new(&conn, &assets);

    exec.execute_statement("sample/insert", &sample("a")).unwrap();
    exec.execute_statement("sample/insert", &sample("b")).unwrap();
    let row = exec.fetch_one("sample/summary", &Params::new()).unwrap().unwrap();

    assert_eq!(row["labels"], json!(["a", "b"]));
    assert_eq!(row["summary"], json!({"count": 2, "active": true}));
  }
}
