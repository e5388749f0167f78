//! Client stats - the bundler's description of compiled client assets.
//!
//! Only `entrypoints.<name>.assets` is read. Everything else the bundler
//! writes into its stats file is ignored.

use crate::error::PageError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Name of the entry point whose assets the page loads.
pub const MAIN_ENTRYPOINT: &str = "main";

/// Build output metadata, keyed by entry point name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientStats {
    #[serde(default)]
    pub entrypoints: HashMap<String, Entrypoint>,
}

/// A named build target and the files it needs at runtime, in load order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entrypoint {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One compiled file. Older stats list bare paths, newer ones list objects
/// with a `name` (plus size and other fields we don't need).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    Path(String),
    Named { name: String },
}

impl Asset {
    pub fn path(&self) -> &str {
        match self {
            Asset::Path(path) => path,
            Asset::Named { name } => name,
        }
    }
}

impl From<&str> for Asset {
    fn from(path: &str) -> Self {
        Asset::Path(path.to_string())
    }
}

impl ClientStats {
    /// Parse stats from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a stats file written by the client build.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PageError::StatsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Look up an entry point by name; missing names are an error.
    pub fn entrypoint(&self, name: &str) -> Result<&Entrypoint, PageError> {
        self.entrypoints
            .get(name)
            .ok_or_else(|| PageError::MissingEntrypoint(name.to_string()))
    }

    /// Assets of the `main` entry point, in load order.
    pub fn main_assets(&self) -> Result<&[Asset], PageError> {
        Ok(&self.entrypoint(MAIN_ENTRYPOINT)?.assets)
    }

    /// Stats with a single `main` entry point. Handy for callers that know
    /// their asset list without a stats file.
    pub fn with_main_assets<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entrypoint = Entrypoint {
            assets: assets.into_iter().map(|a| Asset::Path(a.into())).collect(),
        };
        Self {
            entrypoints: HashMap::from([(MAIN_ENTRYPOINT.to_string(), entrypoint)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_reads_string_assets_in_order() {
        let stats = ClientStats::from_json(
            r#"{"entrypoints":{"main":{"assets":["/static/runtime.js","/static/main.js"]}}}"#,
        )
        .unwrap();

        let paths: Vec<&str> = stats.main_assets().unwrap().iter().map(Asset::path).collect();
        assert_eq!(paths, vec!["/static/runtime.js", "/static/main.js"]);
    }

    #[test]
    fn test_reads_object_assets() {
        let stats = ClientStats::from_json(
            r#"{"entrypoints":{"main":{"name":"main","assets":[{"name":"main.js","size":1024}]}}}"#,
        )
        .unwrap();

        assert_eq!(stats.main_assets().unwrap()[0].path(), "main.js");
    }

    #[test]
    fn test_ignores_unrelated_stats_fields() {
        let stats = ClientStats::from_json(
            r#"{"hash":"abc","publicPath":"/","chunks":[],"entrypoints":{"main":{"assets":[]}}}"#,
        )
        .unwrap();

        assert!(stats.main_assets().unwrap().is_empty());
    }

    #[test]
    fn test_missing_main_entrypoint() {
        let stats = ClientStats::from_json(r#"{"entrypoints":{"admin":{"assets":[]}}}"#).unwrap();

        let err = stats.main_assets().unwrap_err();
        assert!(matches!(err, PageError::MissingEntrypoint(ref name) if name == "main"));
    }

    #[test]
    fn test_missing_entrypoints_object() {
        let stats = ClientStats::from_json("{}").unwrap();
        assert!(stats.main_assets().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ClientStats::from_json("{not json").unwrap_err();
        assert!(matches!(err, PageError::StatsParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, r#"{"entrypoints":{"main":{"assets":["/a.js"]}}}"#).unwrap();

        let stats = ClientStats::load(&path).unwrap();
        assert_eq!(stats.main_assets().unwrap(), &[Asset::from("/a.js")]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ClientStats::load(dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
