//! Interactive approval prompts on the terminal.
//!
//! The [`Approver`] trait is the suspension point where a turn waits for a
//! human decision. Tests use scripted approvers instead of stdin.

use std::cell::Cell;
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use tracing::debug;

use crate::core::render::render_response;
use crate::io::diff::render_diff;

const DEFAULT_WIDTH: usize = 80;

/// The action a human is asked to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptedAction<'a> {
    Command(&'a str),
    FileChange {
        path: &'a str,
        old_content: &'a str,
        new_content: &'a str,
    },
    FileRead(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRequest<'a> {
    /// Model-written explanation shown above the action.
    pub explanation: &'a str,
    pub action: PromptedAction<'a>,
}

/// A human's answer to an approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAnswer {
    /// Run this action once.
    Once,
    /// Run it and remember the key for future actions.
    Always,
    Deny,
}

/// Asks a human whether an action may run.
pub trait Approver {
    fn ask(&self, request: &ApprovalRequest<'_>) -> Result<ApprovalAnswer>;
}

/// Interpret a typed answer: `y`/`yes`, `a`/`always`, anything else denies.
pub fn parse_answer(input: &str) -> ApprovalAnswer {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalAnswer::Once,
        "a" | "always" => ApprovalAnswer::Always,
        _ => ApprovalAnswer::Deny,
    }
}

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Clone)]
pub struct TerminalApprover {
    show_thinking: Cell<bool>,
    color: bool,
}

impl TerminalApprover {
    pub fn new(show_thinking: bool) -> Self {
        Self {
            show_thinking: Cell::new(show_thinking),
            color: io::stdout().is_terminal(),
        }
    }

    /// Follow a `/settings` change for the rest of the session.
    pub fn set_show_thinking(&self, show_thinking: bool) {
        self.show_thinking.set(show_thinking);
    }

    fn describe(&self, request: &ApprovalRequest<'_>) -> (String, &'static str) {
        let mut out = String::new();
        let explanation = render_response(request.explanation, self.show_thinking.get(), |t| {
            if self.color {
                t.dark_grey().to_string()
            } else {
                t.to_string()
            }
        });
        if !explanation.trim().is_empty() {
            out.push('\n');
            out.push_str(explanation.trim());
            out.push_str("\n\n");
        }
        let question = match request.action {
            PromptedAction::Command(command) => {
                let command = if self.color {
                    command.yellow().bold().to_string()
                } else {
                    command.to_string()
                };
                out.push_str(&format!("Command: {command}\n"));
                "Approve action? (y)es / (n)o / (a)lways: "
            }
            PromptedAction::FileChange {
                path,
                old_content,
                new_content,
            } => {
                let width = crossterm::terminal::size()
                    .map(|(cols, _)| usize::from(cols))
                    .unwrap_or(DEFAULT_WIDTH);
                out.push_str(&render_diff(
                    path,
                    old_content,
                    new_content,
                    width,
                    self.color,
                ));
                out.push('\n');
                "Approve file modification? (y)es / (n)o / (a)lways: "
            }
            PromptedAction::FileRead(path) => {
                out.push_str(&format!("Read file: {path}\n"));
                "Approve file read? (y)es / (n)o / (a)lways: "
            }
        };
        (out, question)
    }
}

impl Approver for TerminalApprover {
    fn ask(&self, request: &ApprovalRequest<'_>) -> Result<ApprovalAnswer> {
        let (body, question) = self.describe(request);
        let mut stdout = io::stdout().lock();
        write!(stdout, "{body}{question}").context("write approval prompt")?;
        stdout.flush().context("flush approval prompt")?;
        drop(stdout);

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read approval answer")?;
        if read == 0 {
            debug!("stdin closed while waiting for approval");
            return Ok(ApprovalAnswer::Deny);
        }
        Ok(parse_answer(&line))
    }
}
