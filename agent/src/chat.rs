//! Conversation loop: one user turn from prompt to answer or terminal failure.
//!
//! A turn alternates model calls and action dispatches:
//!
//! ```text
//! user prompt ─▶ model ─▶ parse ─┬─ plain text ─────────────▶ Answered
//!                  ▲              └─ action ─▶ executor ─┬─ ok ─────▶ summary request ─┐
//!                  │                                      ├─ failed ─▶ fix request ─────┤
//!                  │                                      └─ denied / cancelled ─▶ end  │
//!                  └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Summary requests after a successful action are the normal cycle and are not
//! counted. Fix requests are bounded by [`MAX_RETRIES`] failures per turn.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::approval::{ApprovalFlags, AutoApproval};
use crate::core::history::Conversation;
use crate::core::parser::parse_directive;
use crate::core::types::{ActionDirective, FailureKind, Message, TurnOutcome};
use crate::executor::{ActionExecutor, ApprovalDecision, Dispatch};
use crate::io::cancel::CancelToken;
use crate::io::console::Approver;
use crate::io::ollama::{ChatModel, ModelError};
use crate::io::process::Shell;
use crate::io::prompt::system_prompt;

/// Failed actions allowed per turn; the last one ends the turn.
pub const MAX_RETRIES: u32 = 3;

pub const RETRY_PROMPT: &str =
    "The previous command failed. Please analyze the error and provide a corrected command.";

/// Follow-up sent after a successful action so the model reports back.
pub fn summary_prompt(tool_output: &str) -> String {
    format!(
        "The command has finished executing. Here is the output: {tool_output}. Please summarize this output for the user in a friendly way."
    )
}

/// State that lives for one process or one interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    pub model: String,
    pub host: String,
    pub language: String,
    pub show_thinking: bool,
    flags: ApprovalFlags,
    retry_count: u32,
    conversation: Conversation,
}

impl Session {
    pub fn new(
        model: impl Into<String>,
        host: impl Into<String>,
        language: impl Into<String>,
        show_thinking: bool,
    ) -> Self {
        let language = language.into();
        let conversation = Conversation::new(system_prompt(&language));
        Self {
            model: model.into(),
            host: host.into(),
            language,
            show_thinking,
            flags: ApprovalFlags::default(),
            retry_count: 0,
            conversation,
        }
    }

    /// Approve every action for the rest of the session.
    pub fn approve_all(&mut self) {
        self.flags.approve_all = true;
    }

    /// Approve the next action that would otherwise prompt.
    pub fn approve_next(&mut self) {
        self.flags.approve_next = true;
    }

    pub fn is_correction_mode(&self) -> bool {
        self.flags.correction_mode
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Drop all history except a fresh system message.
    pub fn clear(&mut self) {
        self.conversation.clear(system_prompt(&self.language));
        self.retry_count = 0;
        self.flags.correction_mode = false;
    }

    /// Switch models. History is cleared so the new model starts fresh.
    pub fn switch_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.clear();
    }

    /// Flags for the next dispatch. Correction mode applies to one dispatch only.
    fn take_flags(&mut self) -> ApprovalFlags {
        let flags = self.flags;
        self.flags.correction_mode = false;
        flags
    }
}

/// Progress notifications emitted while a turn runs.
#[derive(Debug)]
pub enum TurnEvent<'a> {
    /// Full history about to be sent to the model.
    ModelRequest { messages: &'a [Message] },
    /// Raw model reply, before parsing.
    ModelResponse { raw: &'a str },
    /// The reply carried no directive and ends the turn.
    Answer { text: &'a str },
    ActionProposed { directive: &'a ActionDirective },
    ActionFinished {
        directive: &'a ActionDirective,
        dispatch: &'a Dispatch,
    },
    /// A failed action is being sent back to the model for a fix.
    Retrying { attempt: u32, max_retries: u32 },
}

/// Run one user turn to completion.
///
/// Returns `Err` only for failures outside the action protocol, such as an
/// unreadable approval prompt.
#[instrument(skip_all, fields(model = %session.model))]
pub fn run_turn<M, S, A, F>(
    session: &mut Session,
    prompt: &str,
    model: &M,
    executor: &mut ActionExecutor<'_, S, A>,
    cancel: &CancelToken,
    mut on_event: F,
) -> Result<TurnOutcome>
where
    M: ChatModel,
    S: Shell,
    A: Approver,
    F: FnMut(&TurnEvent<'_>),
{
    // Correction mode never outlives the turn whose failure set it.
    session.retry_count = 0;
    session.flags.correction_mode = false;
    session
        .conversation
        .set_system_prompt(system_prompt(&session.language));
    session.conversation.push_user(prompt);

    loop {
        on_event(&TurnEvent::ModelRequest {
            messages: session.conversation.messages(),
        });
        let raw = match model.chat(&session.model, session.conversation.messages(), cancel) {
            Ok(raw) => raw,
            Err(ModelError::Cancelled) => {
                info!("model request cancelled");
                return Ok(TurnOutcome::Cancelled);
            }
            Err(err) => {
                warn!(err = %err, "model request failed");
                return Ok(TurnOutcome::TransportFailed {
                    reason: err.to_string(),
                });
            }
        };
        on_event(&TurnEvent::ModelResponse { raw: &raw });

        let directive = parse_directive(&raw);
        if !directive.is_action() {
            session.conversation.push_assistant(raw.as_str());
            on_event(&TurnEvent::Answer { text: &raw });
            return Ok(TurnOutcome::Answered { text: raw });
        }

        on_event(&TurnEvent::ActionProposed {
            directive: &directive,
        });
        let flags = session.take_flags();
        let dispatch = executor.execute(&directive, flags, cancel)?;
        if dispatch.decision == ApprovalDecision::Auto(AutoApproval::ApproveNext) {
            session.flags.approve_next = false;
        }
        on_event(&TurnEvent::ActionFinished {
            directive: &directive,
            dispatch: &dispatch,
        });

        let tool_output = dispatch.result.to_json();
        session.conversation.push_assistant(raw);
        session.conversation.push_tool(tool_output.as_str());

        match dispatch.result.failure_kind() {
            None => {
                debug!("action succeeded, requesting summary");
                session.conversation.push_user(summary_prompt(&tool_output));
            }
            Some(FailureKind::Denied) => return Ok(TurnOutcome::Denied),
            Some(FailureKind::Cancelled) => return Ok(TurnOutcome::Cancelled),
            Some(FailureKind::Execution) => {
                session.retry_count += 1;
                let last_error = dispatch.result.error.clone().unwrap_or_default();
                if session.retry_count >= MAX_RETRIES {
                    warn!(attempts = session.retry_count, "retry budget exhausted");
                    return Ok(TurnOutcome::RetriesExhausted {
                        attempts: session.retry_count,
                        last_error,
                    });
                }
                debug!(attempt = session.retry_count, error = %last_error, "action failed, asking for a fix");
                session.flags.correction_mode = true;
                session.conversation.push_user(RETRY_PROMPT);
                on_event(&TurnEvent::Retrying {
                    attempt: session.retry_count,
                    max_retries: MAX_RETRIES,
                });
            }
        }
    }
}
