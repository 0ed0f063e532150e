//! System prompt rendering.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::warn;

use crate::core::parser::{
    COMMAND_MARKER, NEW_MARKER, OLD_MARKER, READ_FILE_MARKER, REPLACE_FILE_MARKER,
};

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .context("load system prompt template")?;
        Ok(Self { env })
    }

    fn render_system(&self, platform: &str, language: &str) -> Result<String> {
        let template = self.env.get_template("system")?;
        let rendered = template.render(context! {
            platform => platform,
            language => language,
            command_marker => COMMAND_MARKER,
            replace_marker => REPLACE_FILE_MARKER,
            read_marker => READ_FILE_MARKER,
            old_marker => OLD_MARKER,
            new_marker => NEW_MARKER,
        })?;
        Ok(rendered)
    }
}

/// Render the system prompt for `language` on the given platform.
pub fn render_system_prompt_for(platform: &str, language: &str) -> Result<String> {
    PromptEngine::new()?.render_system(platform, language)
}

/// System prompt for the current platform.
///
/// Rendering only fails if the embedded template is broken; in that case a
/// minimal prompt is returned so the session can still proceed.
pub fn system_prompt(language: &str) -> String {
    match render_system_prompt_for(std::env::consts::OS, language) {
        Ok(prompt) => prompt,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "failed to render system prompt");
            format!(
                "You are a command-line agent running on {}. Answer in {language}.",
                std::env::consts::OS
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_platform_language_and_markers() {
        let prompt = render_system_prompt_for("linux", "es").expect("render");
        assert!(prompt.contains("running on linux"));
        assert!(prompt.contains("specified language: es"));
        assert!(prompt.contains(COMMAND_MARKER));
        assert!(prompt.contains(REPLACE_FILE_MARKER));
        assert!(prompt.contains(READ_FILE_MARKER));
        assert!(prompt.contains(OLD_MARKER));
        assert!(prompt.contains(NEW_MARKER));
    }

    #[test]
    fn language_changes_the_prompt() {
        assert_ne!(system_prompt("en"), system_prompt("es"));
    }
}
