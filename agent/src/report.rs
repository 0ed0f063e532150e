//! User-facing output for turn events and outcomes.

use std::io::{self, IsTerminal};

use crossterm::style::Stylize;

use crate::chat::TurnEvent;
use crate::core::approval::AutoApproval;
use crate::core::render::render_response;
use crate::core::types::{ActionDirective, FailureKind, TurnOutcome};
use crate::executor::ApprovalDecision;

pub const RETRYING_NOTICE: &str = "Command failed. Asking the AI for a fix...";
pub const RETRIES_EXHAUSTED_NOTICE: &str =
    "The agent failed to fix the command after several attempts. Please try a different approach.";

/// Renders turn progress for the terminal.
#[derive(Debug, Clone)]
pub struct Reporter {
    pub show_thinking: bool,
    pub debug: bool,
    color: bool,
}

impl Reporter {
    pub fn new(show_thinking: bool, debug: bool) -> Self {
        Self {
            show_thinking,
            debug,
            color: io::stdout().is_terminal(),
        }
    }

    pub fn plain(show_thinking: bool, debug: bool) -> Self {
        Self {
            show_thinking,
            debug,
            color: false,
        }
    }

    pub fn print_event(&self, event: &TurnEvent<'_>) {
        if let Some(text) = self.render_event(event) {
            println!("{text}");
        }
    }

    pub fn print_outcome(&self, outcome: &TurnOutcome) {
        if let Some(text) = self.render_outcome(outcome) {
            println!("{text}");
        }
    }

    pub fn render_event(&self, event: &TurnEvent<'_>) -> Option<String> {
        match event {
            TurnEvent::ModelRequest { messages } => self.debug.then(|| {
                let history = serde_json::to_string_pretty(messages)
                    .unwrap_or_else(|err| format!("<unserializable history: {err}>"));
                self.dim(&format!("[debug] sending {} messages:\n{history}", messages.len()))
            }),
            TurnEvent::ModelResponse { raw } => self
                .debug
                .then(|| self.dim(&format!("[debug] raw response:\n{raw}"))),
            TurnEvent::Answer { text } => Some(self.render_model_text(text)),
            TurnEvent::ActionProposed { .. } => None,
            TurnEvent::ActionFinished {
                directive,
                dispatch,
            } => {
                let mut out = String::new();
                if let ApprovalDecision::Auto(rung) = dispatch.decision {
                    let explanation = self.render_model_text(directive.explanation());
                    if !explanation.trim().is_empty() {
                        out.push_str(explanation.trim());
                        out.push('\n');
                    }
                    out.push_str(&self.dim(&format!(
                        "{} ({})",
                        action_label(directive),
                        auto_reason(rung)
                    )));
                    out.push('\n');
                }
                let result = &dispatch.result;
                match result.failure_kind() {
                    None => {
                        if let Some(message) = &result.message {
                            out.push_str(&self.success(message));
                        } else if matches!(directive, ActionDirective::RunCommand { .. })
                            && let Some(stdout) = result.stdout.as_deref()
                        {
                            out.push_str(stdout.trim_end());
                        }
                    }
                    // Reported once by the outcome.
                    Some(FailureKind::Denied | FailureKind::Cancelled) => {}
                    Some(FailureKind::Execution) => {
                        let error = result.error.as_deref().unwrap_or_default();
                        out.push_str(&self.failure(&format!("Error: {error}")));
                        if let Some(stderr) = result.stderr.as_deref().filter(|s| !s.is_empty()) {
                            out.push('\n');
                            out.push_str(&self.dim(stderr.trim_end()));
                        }
                    }
                }
                if self.debug {
                    out.push('\n');
                    out.push_str(&self.dim(&format!("[debug] tool output:\n{}", result.to_json())));
                }
                let out = out.trim_end().to_string();
                (!out.is_empty()).then_some(out)
            }
            TurnEvent::Retrying {
                attempt,
                max_retries,
            } => Some(self.warning(&format!(
                "{RETRYING_NOTICE} (attempt {attempt} of {max_retries})"
            ))),
        }
    }

    pub fn render_outcome(&self, outcome: &TurnOutcome) -> Option<String> {
        match outcome {
            TurnOutcome::Answered { .. } => None,
            TurnOutcome::RetriesExhausted { last_error, .. } => Some(format!(
                "{}\n{}",
                self.failure(RETRIES_EXHAUSTED_NOTICE),
                self.dim(&format!("Last error: {last_error}"))
            )),
            TurnOutcome::Denied => Some(self.warning("Operation cancelled by user.")),
            TurnOutcome::Cancelled => Some(self.warning("Request cancelled by user.")),
            TurnOutcome::TransportFailed { reason } => {
                Some(self.failure(&format!("Error: {reason}")))
            }
        }
    }

    fn render_model_text(&self, text: &str) -> String {
        render_response(text, self.show_thinking, |thinking| self.dim(thinking))
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn failure(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }
}

fn action_label(directive: &ActionDirective) -> String {
    match directive {
        ActionDirective::RunCommand { command, .. } => format!("Running: {command}"),
        ActionDirective::ReplaceFile { path, .. } => format!("Writing: {path}"),
        ActionDirective::ReadFile { path, .. } => format!("Reading: {path}"),
        ActionDirective::PlainText { .. } => String::new(),
    }
}

fn auto_reason(rung: AutoApproval) -> &'static str {
    match rung {
        AutoApproval::SafeCommand => "safe command",
        AutoApproval::WorkspaceRead => "inside the working directory",
        AutoApproval::ApproveAll => "--yes-all",
        AutoApproval::Remembered => "always approved",
        AutoApproval::ApproveNext => "--yes",
        AutoApproval::CorrectionMode => "auto-approved fix",
    }
}
