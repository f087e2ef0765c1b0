//! Preload manifest.
//!
//! Maps a module id to the resources the browser should preload for it.
//! Empty in development; loaded once from the client build in production.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, Vec<String>>);

impl Manifest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read and parse a manifest file.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path).await.map_err(ManifestError::Io)?;
        Self::from_json(&content).map_err(ManifestError::Parse)
    }

    pub fn get(&self, module: &str) -> Option<&[String]> {
        self.0.get(module).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(String, Vec<String>)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
}
