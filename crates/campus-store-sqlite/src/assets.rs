//! Named SQL assets.
//!
//! Every `*.sql` file under the asset root is loaded once, at startup, and
//! addressed by its path relative to the root without the extension:
//! `sql/invitations/accept.sql` is the asset `invitations/accept`.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
  sync::Arc,
};

use crate::{Error, Result};

/// The asset holding the idempotent schema bootstrap.
pub const SCHEMA_ASSET: &str = "schema";

#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
  assets: BTreeMap<String, Arc<str>>,
}

impl AssetCatalog {
  /// Load every asset under `root`, recursing into subdirectories.
  pub fn load(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref();
    let mut catalog = Self::default();
    catalog.walk(root, root)?;
    tracing::debug!(root = %root.display(), count = catalog.assets.len(), "loaded sql assets");
    Ok(catalog)
  }

  /// Build a catalog from in-memory `(name, sql)` pairs.
  pub fn from_pairs<N, S>(pairs: impl IntoIterator<Item = (N, S)>) -> Self
  where
    N: Into<String>,
    S: AsRef<str>,
  {
    Self {
      assets: pairs
        .into_iter()
        .map(|(name, sql)| (name.into(), Arc::from(sql.as_ref())))
        .collect(),
    }
  }

  /// The SQL text of `name`. A trailing `.sql` on the name is ignored.
  pub fn get(&self, name: &str) -> Result<&str> {
    let key = name.strip_suffix(".sql").unwrap_or(name);
    self
      .assets
      .get(key)
      .map(|sql| &**sql)
      .ok_or_else(|| Error::AssetNotFound(name.to_owned()))
  }

  pub fn contains(&self, name: &str) -> bool { self.get(name).is_ok() }

  pub fn len(&self) -> usize { self.assets.len() }

  pub fn is_empty(&self) -> bool { self.assets.is_empty() }

  fn walk(&mut self, root: &Path, dir: &Path) -> Result<()> {
    let read_err = |path: &Path| {
      let path = path.to_path_buf();
      move |source| Error::AssetRead { path, source }
    };

    for entry in fs::read_dir(dir).map_err(read_err(dir))? {
      let path = entry.map_err(read_err(dir))?.path();
      if path.is_dir() {
        self.walk(root, &path)?;
        continue;
      }
      if path.extension().is_none_or(|ext| ext != "sql") {
        continue;
      }
      let sql = fs::read_to_string(&path).map_err(read_err(&path))?;
      self.assets.insert(asset_name(root, &path), Arc::from(sql));
    }
    Ok(())
  }
}

/// `root/a/b.sql` → `a/b`, with `/` separators on every platform.
fn asset_name(root: &Path, path: &Path) -> String {
  let relative: PathBuf = path
    .strip_prefix(root)
    .unwrap_or(path)
    .with_extension("");
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_relative_paths_without_extension() {
    let root = Path::new("/srv/sql");
    assert_eq!(asset_name(root, Path::new("/srv/sql/schema.sql")), "schema");
    assert_eq!(
      asset_name(root, Path::new("/srv/sql/invitations/accept.sql")),
      "invitations/accept"
    );
  }

  #[test]
  fn lookup_ignores_extension_and_reports_missing() {
    let catalog = AssetCatalog::from_pairs([("people/list", "SELECT 1;")]);
    assert_eq!(catalog.get("people/list").unwrap(), "SELECT 1;");
    assert_eq!(catalog.get("people/list.sql").unwrap(), "SELECT 1;");
    assert!(matches!(
      catalog.get("people/missing"),
      Err(Error::AssetNotFound(name)) if name == "people/missing"
    ));
  }

  #[test]
  fn bundled_assets_load() {
    let catalog = AssetCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/sql")).unwrap();
    assert!(catalog.contains(SCHEMA_ASSET));
    assert!(catalog.contains("invitations/accept"));
    assert!(catalog.contains("roles/state"));
  }

  #[test]
  fn missing_root_is_an_error() {
    let err = AssetCatalog::load("/definitely/not/here").unwrap_err();
    assert!(matches!(err, Error::AssetRead { .. }));
  }
}
