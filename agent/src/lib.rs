//! Command-line agent for a local Ollama server.
//!
//! The model answers in free text and may embed one action directive per
//! reply: run a shell command, replace file contents, or read a file. Each
//! action passes an approval ladder, runs, and its structured result goes back
//! to the model until it produces a plain answer. The crate is split the same
//! way throughout:
//!
//! - **[`core`]**: Pure logic (directive lexer, history, approval ladder,
//!   result types). No I/O.
//! - **[`io`]**: Side effects (model HTTP client, shell, files, terminal
//!   prompts, cancellation). Behind traits where tests need doubles.
//!
//! Orchestration lives at the root: [`executor`] approves and performs one
//! action, [`chat`] runs a whole turn, [`interactive`] wraps turns in a REPL.

pub mod chat;
pub mod core;
pub mod executor;
pub mod exit_codes;
pub mod interactive;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
