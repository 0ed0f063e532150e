//! Shared types exchanged between the parser, the executor and the conversation loop.
//!
//! These types define stable contracts between components. They carry no I/O
//! handles, so they can be built and inspected freely in tests.

use serde::{Deserialize, Serialize};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }
}

/// The single action (or absence of one) derived from a model response.
///
/// `explanation` is the text the model wrote before the opening marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDirective {
    RunCommand {
        explanation: String,
        command: String,
    },
    ReplaceFile {
        explanation: String,
        path: String,
        old_content: String,
        new_content: String,
    },
    ReadFile {
        explanation: String,
        path: String,
    },
    PlainText {
        text: String,
    },
}

impl ActionDirective {
    /// Explanation shown before the action runs. Empty for plain text.
    pub fn explanation(&self) -> &str {
        match self {
            ActionDirective::RunCommand { explanation, .. }
            | ActionDirective::ReplaceFile { explanation, .. }
            | ActionDirective::ReadFile { explanation, .. } => explanation,
            ActionDirective::PlainText { .. } => "",
        }
    }

    pub fn is_action(&self) -> bool {
        !matches!(self, ActionDirective::PlainText { .. })
    }
}

/// Why an action did not succeed.
///
/// Only `Execution` failures are worth handing back to the model for a fix;
/// the other two end the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureKind {
    /// The effect itself failed (non-zero exit, missing match, I/O error).
    #[default]
    Execution,
    /// The user declined the approval prompt.
    Denied,
    /// The user interrupted the action while it ran.
    Cancelled,
}

/// Outcome of one action, serialized as the `tool` message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl ExecutionResult {
    /// Captured output of a command that exited successfully.
    pub fn output(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: Some(stdout.into()),
            stderr: Some(stderr.into()),
            ..Self::default()
        }
    }

    /// Contents returned by a file read.
    pub fn contents(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: Some(stdout.into()),
            ..Self::default()
        }
    }

    /// Human-readable confirmation of a file change.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            failure: Some(kind),
            ..Self::default()
        }
    }

    pub fn execution_error(error: impl Into<String>) -> Self {
        Self::failure(FailureKind::Execution, error)
    }

    pub fn denied() -> Self {
        Self::failure(FailureKind::Denied, "Operation cancelled by user.")
    }

    pub fn cancelled() -> Self {
        Self::failure(FailureKind::Cancelled, "Command was cancelled by user.")
    }

    /// Attach whatever output a failed command produced before it failed.
    pub fn with_partial_output(mut self, stdout: String, stderr: String) -> Self {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if !self.is_error() {
            return None;
        }
        Some(self.failure.unwrap_or_default())
    }

    /// Serialized form handed to the model as a `tool` message.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| {
            format!("{{\"success\":false,\"error\":\"failed to serialize result: {err}\"}}")
        })
    }
}

/// Outcome of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a plain-text answer.
    Answered { text: String },
    /// Actions kept failing until the retry budget ran out.
    RetriesExhausted { attempts: u32, last_error: String },
    /// The user declined an approval prompt.
    Denied,
    /// The user interrupted the model call or a running action.
    Cancelled,
    /// The model endpoint could not be reached or rejected the request.
    TransportFailed { reason: String },
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Answered { .. })
    }
}
