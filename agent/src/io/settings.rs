//! User settings stored in `~/.ollama-agent-cli`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::core::approval::ApprovalPolicy;

const SETTINGS_FILE: &str = ".ollama-agent-cli";

/// Languages the system prompt can be rendered for.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "es"];

/// User settings (JSON).
///
/// Missing fields take their defaults, so older files that only carry
/// `language` and `showThinking` keep working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Language the model is asked to answer in.
    pub language: String,
    /// Show `<think>` spans from reasoning models.
    pub show_thinking: bool,
    /// Command roots that run without confirmation.
    pub safe_commands: Vec<String>,
    /// Read files inside the current directory without confirmation.
    pub auto_approve_workspace_reads: bool,
    /// Kill shell commands that run longer than this.
    pub command_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = ApprovalPolicy::default();
        Self {
            language: "en".to_string(),
            show_thinking: true,
            safe_commands: policy.safe_commands,
            auto_approve_workspace_reads: policy.auto_approve_workspace_reads,
            command_timeout_secs: 10 * 60,
        }
    }
}

impl Settings {
    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            safe_commands: self.safe_commands.clone(),
            auto_approve_workspace_reads: self.auto_approve_workspace_reads,
        }
    }

    pub fn set_language(&mut self, language: &str) -> Result<()> {
        let language = language.trim().to_ascii_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(anyhow!(
                "unsupported language {language:?} (expected one of: {})",
                SUPPORTED_LANGUAGES.join(", ")
            ));
        }
        self.language = language;
        Ok(())
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(SETTINGS_FILE))
}

/// Load settings, falling back to defaults when the file is missing or broken.
pub fn load_settings(path: &Path) -> Settings {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Settings::default();
        }
        Err(err) => {
            warn!(path = %path.display(), err = %err, "failed to read settings file");
            return Settings::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), err = %err, "failed to parse settings file");
            Settings::default()
        }
    }
}

/// Load settings from the home directory, or defaults if there is none.
pub fn load_default_settings() -> Settings {
    default_path()
        .map(|path| load_settings(&path))
        .unwrap_or_default()
}

/// Atomically write settings to disk (temp file + rename).
pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(settings).context("serialize settings")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("settings path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp settings {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace settings {}", path.display()))?;
    Ok(())
}

/// Persist settings to the home directory, logging instead of failing.
pub fn save_default_settings(settings: &Settings) {
    let Some(path) = default_path() else {
        warn!("no home directory; settings not saved");
        return;
    };
    if let Err(err) = write_settings(&path, settings) {
        error!(err = %format!("{err:#}"), "failed to save settings");
    }
}
