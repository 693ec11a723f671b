// crates/server/src/secrets.rs
//! The set of secrets allowed to push updates, and who owns each one.
//!
//! On disk this is a directory with one file per owner: the file name is the
//! owner tag and the trimmed file content is that owner's secret. Issuing
//! the files is somebody else's job; the server only reads them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Cannot read secrets directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read secret file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SecretRegistry {
    owners: HashMap<String, String>,
}

impl SecretRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(owner, secret)` pairs.
    pub fn from_pairs<I, O, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (O, S)>,
        O: Into<String>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (owner, secret) in pairs {
            registry.insert(owner, secret);
        }
        registry
    }

    pub fn insert(&mut self, owner: impl Into<String>, secret: impl Into<String>) {
        let owner = owner.into();
        if let Some(previous) = self.owners.insert(secret.into(), owner.clone()) {
            if previous != owner {
                tracing::warn!(owner = %owner, previous = %previous, "Secret shared by two owners, keeping the latest");
            }
        }
    }

    /// Read every regular file in `dir`. A missing directory yields an empty
    /// registry; empty files are skipped.
    pub fn load_dir(dir: &Path) -> Result<Self, SecretsError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %dir.display(), "Secrets directory not found, no client can push updates");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(SecretsError::ReadDir {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut registry = Self::new();
        for entry in entries {
            let entry = entry.map_err(|source| SecretsError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(owner) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "Skipping secret file with non UTF-8 name");
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(|source| SecretsError::ReadFile {
                path: path.clone(),
                source,
            })?;
            let secret = content.trim();
            if secret.is_empty() {
                tracing::warn!(owner = %owner, "Skipping empty secret file");
                continue;
            }
            registry.insert(owner, secret);
        }

        tracing::info!(owners = registry.len(), path = %dir.display(), "Loaded secrets");
        Ok(registry)
    }

    /// Owner tag for `secret`, if it is one of ours.
    pub fn owner_for(&self, secret: &str) -> Option<&str> {
        if secret.is_empty() {
            return None;
        }
        self.owners.get(secret).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
