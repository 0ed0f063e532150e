//! Scripted doubles for the model, the approval prompt and the shell.
//!
//! Each double replays a fixed script in order and records what it was asked,
//! so tests can drive whole turns without a server, a terminal or processes.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::Result;

use crate::core::types::Message;
use crate::io::cancel::CancelToken;
use crate::io::console::{ApprovalAnswer, ApprovalRequest, Approver, PromptedAction};
use crate::io::ollama::{ChatModel, ModelError};
use crate::io::process::{CommandOutput, Shell, ShellRequest};

/// Replays model replies and records every request's message list.
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Result<String, ModelError>>>,
    requests: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self::with_results(replies.into_iter().map(|reply| Ok(reply.into())).collect())
    }

    pub fn with_results(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatModel for ScriptedModel {
    fn chat(
        &self,
        _model: &str,
        messages: &[Message],
        cancel: &CancelToken,
    ) -> Result<String, ModelError> {
        self.requests.borrow_mut().push(messages.to_vec());
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ModelError::Unreachable {
                    url: "scripted".to_string(),
                    reason: "no scripted reply left".to_string(),
                })
            })
    }
}

/// Replays approval answers. Runs out into `Deny`.
pub struct ScriptedApprover {
    answers: RefCell<VecDeque<ApprovalAnswer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedApprover {
    pub fn new(answers: Vec<ApprovalAnswer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Number of prompts shown.
    pub fn asked(&self) -> usize {
        self.asked.borrow().len()
    }

    /// The command or path each prompt was about.
    pub fn asked_about(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Approver for ScriptedApprover {
    fn ask(&self, request: &ApprovalRequest<'_>) -> Result<ApprovalAnswer> {
        let subject = match request.action {
            PromptedAction::Command(command) => command,
            PromptedAction::FileChange { path, .. } | PromptedAction::FileRead(path) => path,
        };
        self.asked.borrow_mut().push(subject.to_string());
        Ok(self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(ApprovalAnswer::Deny))
    }
}

/// Replays command outputs. Runs out into an empty success.
pub struct ScriptedShell {
    outputs: RefCell<VecDeque<CommandOutput>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedShell {
    pub fn new(outputs: Vec<CommandOutput>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl Shell for ScriptedShell {
    fn run(&self, request: &ShellRequest, _cancel: &CancelToken) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(request.command.clone());
        Ok(self
            .outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ok_output("")))
    }
}

/// A command that exited 0 with `stdout`.
pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        success: true,
        stdout: stdout.as_bytes().to_vec(),
        ..CommandOutput::default()
    }
}

/// A command that exited with `code`.
pub fn failed_output(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        success: false,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
        ..CommandOutput::default()
    }
}

/// A command the user interrupted.
pub fn cancelled_output() -> CommandOutput {
    CommandOutput {
        cancelled: true,
        ..CommandOutput::default()
    }
}
