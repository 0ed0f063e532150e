//! Persisted "always approve" grants (`~/.ollama-agent-approvals.json`).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, warn};

const APPROVALS_FILE: &str = ".ollama-agent-approvals.json";
const ALWAYS: &str = "always";

/// Mapping from action key (command root or file path) to `"always"`.
///
/// The backing file is read lazily on first lookup and rewritten after every
/// new grant. Read failures yield an empty mapping; write failures are logged
/// and the grant still holds for the rest of the process.
#[derive(Debug, Clone)]
pub struct ApprovalStore {
    path: Option<PathBuf>,
    grants: Option<BTreeMap<String, String>>,
}

impl ApprovalStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            grants: None,
        }
    }

    /// Store backed by the approvals file in the user's home directory.
    ///
    /// Falls back to an in-memory store when no home directory is known.
    pub fn open_default() -> Self {
        match default_path() {
            Some(path) => Self::new(path),
            None => {
                warn!("no home directory; approvals will not be persisted");
                Self::in_memory()
            }
        }
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            grants: Some(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_always_approved(&mut self, key: &str) -> bool {
        self.grants()
            .get(key)
            .is_some_and(|value| value == ALWAYS)
    }

    /// Remember `key` as always approved and persist the mapping.
    pub fn grant_always(&mut self, key: &str) {
        // Merge with whatever is on disk now so concurrent grants are not dropped.
        let mut grants = match &self.path {
            Some(path) => load_approvals(path),
            None => BTreeMap::new(),
        };
        if let Some(current) = &self.grants {
            for (k, v) in current {
                grants.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        grants.insert(key.to_string(), ALWAYS.to_string());
        debug!(key, "granted always-approval");

        if let Some(path) = &self.path
            && let Err(err) = write_approvals(path, &grants)
        {
            error!(err = %format!("{err:#}"), "failed to persist approvals");
        }
        self.grants = Some(grants);
    }

    fn grants(&mut self) -> &BTreeMap<String, String> {
        let path = self.path.clone();
        self.grants.get_or_insert_with(|| match path {
            Some(path) => load_approvals(&path),
            None => BTreeMap::new(),
        })
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APPROVALS_FILE))
}

/// Load approvals, treating a missing or unreadable file as empty.
pub fn load_approvals(path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no approvals file");
            return BTreeMap::new();
        }
        Err(err) => {
            warn!(path = %path.display(), err = %err, "failed to read approvals file");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(grants) => grants,
        Err(err) => {
            warn!(path = %path.display(), err = %err, "failed to parse approvals file");
            BTreeMap::new()
        }
    }
}

/// Atomically write approvals to disk (temp file + rename).
pub fn write_approvals(path: &Path, grants: &BTreeMap<String, String>) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(grants).context("serialize approvals")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("approvals path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp approvals {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace approvals {}", path.display()))?;
    Ok(())
}
