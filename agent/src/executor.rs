//! Action execution: approval, effect, structured result.
//!
//! Every directive goes through the same three steps. The approval ladder is
//! walked first (see [`crate::core::approval`]); if nothing on it approves the
//! action, the [`Approver`] asks a human. Approved actions run and always yield
//! an [`ExecutionResult`]; failures are data, not errors. The only `Err` that
//! leaves this module is a broken approval prompt (e.g. stdin unreadable).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::approval::{
    ApprovalFlags, ApprovalPolicy, ApprovalSubject, AutoApproval, auto_approval,
};
use crate::core::types::{ActionDirective, ExecutionResult};
use crate::io::approvals::ApprovalStore;
use crate::io::cancel::CancelToken;
use crate::io::console::{ApprovalAnswer, ApprovalRequest, Approver, PromptedAction};
use crate::io::process::{DEFAULT_OUTPUT_LIMIT_BYTES, Shell, ShellRequest};

/// Static configuration for action execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Directory commands run in and relative paths resolve against.
    pub workdir: PathBuf,
    pub policy: ApprovalPolicy,
    pub command_timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ExecutorConfig {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            policy: ApprovalPolicy::default(),
            command_timeout: Duration::from_secs(10 * 60),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

/// How an action came to be approved, or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Auto(AutoApproval),
    Granted,
    GrantedAlways,
    Denied,
}

impl ApprovalDecision {
    pub fn is_approved(self) -> bool {
        !matches!(self, ApprovalDecision::Denied)
    }
}

/// Result of dispatching one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub decision: ApprovalDecision,
    pub result: ExecutionResult,
}

pub struct ActionExecutor<'a, S: Shell, A: Approver> {
    shell: &'a S,
    approver: &'a A,
    store: ApprovalStore,
    config: ExecutorConfig,
}

impl<'a, S: Shell, A: Approver> ActionExecutor<'a, S, A> {
    pub fn new(shell: &'a S, approver: &'a A, store: ApprovalStore, config: ExecutorConfig) -> Self {
        Self {
            shell,
            approver,
            store,
            config,
        }
    }

    /// Approve and run one action directive.
    pub fn execute(
        &mut self,
        directive: &ActionDirective,
        flags: ApprovalFlags,
        cancel: &CancelToken,
    ) -> Result<Dispatch> {
        match directive {
            ActionDirective::RunCommand {
                explanation,
                command,
            } => self.run_command(explanation, command, flags, cancel),
            ActionDirective::ReplaceFile {
                explanation,
                path,
                old_content,
                new_content,
            } => self.replace_file(explanation, path, old_content, new_content, flags),
            ActionDirective::ReadFile { explanation, path } => {
                self.read_file(explanation, path, flags)
            }
            ActionDirective::PlainText { .. } => {
                warn!("plain text passed to the action executor");
                Ok(Dispatch {
                    decision: ApprovalDecision::Denied,
                    result: ExecutionResult::execution_error("No action to execute."),
                })
            }
        }
    }

    #[instrument(skip_all, fields(command = %command))]
    fn run_command(
        &mut self,
        explanation: &str,
        command: &str,
        flags: ApprovalFlags,
        cancel: &CancelToken,
    ) -> Result<Dispatch> {
        if command.trim().is_empty() {
            return Ok(Dispatch {
                decision: ApprovalDecision::Denied,
                result: ExecutionResult::execution_error("No command was provided."),
            });
        }

        let explanation = if explanation.is_empty() {
            "I will execute the following command:"
        } else {
            explanation
        };
        let decision = self.approve(
            ApprovalRequest {
                explanation,
                action: PromptedAction::Command(command),
            },
            ApprovalSubject::Command(command),
            flags,
        )?;
        if !decision.is_approved() {
            return Ok(denied());
        }

        info!("executing command");
        let request = ShellRequest {
            command: command.to_string(),
            workdir: self.config.workdir.clone(),
            timeout: self.config.command_timeout,
            output_limit_bytes: self.config.output_limit_bytes,
        };
        let result = match self.shell.run(&request, cancel) {
            Err(err) => ExecutionResult::execution_error(format!("{err:#}")),
            Ok(output) if output.cancelled => ExecutionResult::cancelled(),
            Ok(output) if output.timed_out => ExecutionResult::execution_error(format!(
                "Command timed out after {}s: {command}",
                self.config.command_timeout.as_secs()
            ))
            .with_partial_output(output.stdout_lossy(), output.stderr_lossy()),
            Ok(output) if !output.success => {
                let code = output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |code| code.to_string());
                ExecutionResult::execution_error(format!(
                    "Command failed with exit code {code}: {command}"
                ))
                .with_partial_output(output.stdout_lossy(), output.stderr_lossy())
            }
            Ok(output) => ExecutionResult::output(output.stdout_lossy(), output.stderr_lossy()),
        };
        Ok(Dispatch { decision, result })
    }

    #[instrument(skip_all, fields(path = %path))]
    fn replace_file(
        &mut self,
        explanation: &str,
        path: &str,
        old_content: &str,
        new_content: &str,
        flags: ApprovalFlags,
    ) -> Result<Dispatch> {
        if path.trim().is_empty() {
            return Ok(Dispatch {
                decision: ApprovalDecision::Denied,
                result: ExecutionResult::execution_error("No file path was provided."),
            });
        }

        let decision = self.approve(
            ApprovalRequest {
                explanation,
                action: PromptedAction::FileChange {
                    path,
                    old_content,
                    new_content,
                },
            },
            ApprovalSubject::FileChange(path),
            flags,
        )?;
        if !decision.is_approved() {
            return Ok(denied());
        }

        let target = self.resolve(path);
        let result = write_file_contents(&target, path, old_content, new_content);
        Ok(Dispatch { decision, result })
    }

    #[instrument(skip_all, fields(path = %path))]
    fn read_file(&mut self, explanation: &str, path: &str, flags: ApprovalFlags) -> Result<Dispatch> {
        if path.trim().is_empty() {
            return Ok(Dispatch {
                decision: ApprovalDecision::Denied,
                result: ExecutionResult::execution_error("No file path was provided."),
            });
        }

        let decision = self.approve(
            ApprovalRequest {
                explanation,
                action: PromptedAction::FileRead(path),
            },
            ApprovalSubject::FileRead(path),
            flags,
        )?;
        if !decision.is_approved() {
            return Ok(denied());
        }

        let result = match fs::read_to_string(self.resolve(path)) {
            Ok(contents) => ExecutionResult::contents(contents),
            Err(err) => ExecutionResult::execution_error(format!("Failed to read {path}: {err}")),
        };
        Ok(Dispatch { decision, result })
    }

    fn approve(
        &mut self,
        request: ApprovalRequest<'_>,
        subject: ApprovalSubject<'_>,
        flags: ApprovalFlags,
    ) -> Result<ApprovalDecision> {
        let store = &mut self.store;
        if let Some(auto) = auto_approval(
            &self.config.policy,
            flags,
            subject,
            &self.config.workdir,
            |key| store.is_always_approved(key),
        ) {
            debug!(rung = ?auto, key = subject.key(), "auto-approved");
            return Ok(ApprovalDecision::Auto(auto));
        }

        let decision = match self.approver.ask(&request)? {
            ApprovalAnswer::Once => ApprovalDecision::Granted,
            ApprovalAnswer::Always => {
                self.store.grant_always(subject.key());
                ApprovalDecision::GrantedAlways
            }
            ApprovalAnswer::Deny => ApprovalDecision::Denied,
        };
        debug!(?decision, key = subject.key(), "approval answered");
        Ok(decision)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.config.workdir.join(path)
    }
}

fn denied() -> Dispatch {
    Dispatch {
        decision: ApprovalDecision::Denied,
        result: ExecutionResult::denied(),
    }
}

/// Apply a replace-file directive to `target`.
///
/// - Empty `old_content` writes `new_content` verbatim, creating the file if needed.
/// - Otherwise the first occurrence of `old_content` is replaced; if it is not
///   present the file is left untouched and an error is returned.
/// - A replacement that leaves the file empty (empty `new_content`) deletes it.
pub fn write_file_contents(
    target: &Path,
    display_path: &str,
    old_content: &str,
    new_content: &str,
) -> ExecutionResult {
    match fs::read_to_string(target) {
        Ok(original) => {
            if !old_content.is_empty() && !original.contains(old_content) {
                return ExecutionResult::execution_error(format!(
                    "Old content not found in {display_path}. Cannot perform replacement."
                ));
            }
            let updated = if old_content.is_empty() {
                new_content.to_string()
            } else {
                original.replacen(old_content, new_content, 1)
            };

            if !old_content.is_empty() && new_content.is_empty() && updated.trim().is_empty() {
                return match fs::remove_file(target) {
                    Ok(()) => {
                        ExecutionResult::message(format!("File {display_path} has been deleted."))
                    }
                    Err(err) => ExecutionResult::execution_error(format!(
                        "Failed to delete {display_path}: {err}"
                    )),
                };
            }

            match fs::write(target, updated) {
                Ok(()) => ExecutionResult::message(format!("File {display_path} has been updated.")),
                Err(err) => ExecutionResult::execution_error(format!(
                    "Failed to write {display_path}: {err}"
                )),
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound && old_content.is_empty() => {
            if let Some(parent) = target.parent()
                && let Err(err) = fs::create_dir_all(parent)
            {
                return ExecutionResult::execution_error(format!(
                    "Failed to create directory for {display_path}: {err}"
                ));
            }
            match fs::write(target, new_content) {
                Ok(()) => ExecutionResult::message(format!("File {display_path} has been created.")),
                Err(err) => ExecutionResult::execution_error(format!(
                    "Failed to create {display_path}: {err}"
                )),
            }
        }
        Err(err) => {
            ExecutionResult::execution_error(format!("Failed to read {display_path}: {err}"))
        }
    }
}
