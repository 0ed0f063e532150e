//! Stable exit codes for the CLI.

use crate::core::types::TurnOutcome;

/// The turn ended with an answer, or the interactive session ended normally.
pub const OK: i32 = 0;
/// Invalid usage or an unexpected error.
pub const INVALID: i32 = 1;
/// The turn failed: retries exhausted or the model endpoint failed.
pub const FAILED: i32 = 2;
/// The user declined an action or interrupted the turn.
pub const CANCELLED: i32 = 3;

pub fn for_outcome(outcome: &TurnOutcome) -> i32 {
    match outcome {
        TurnOutcome::Answered { .. } => OK,
        TurnOutcome::RetriesExhausted { .. } | TurnOutcome::TransportFailed { .. } => FAILED,
        TurnOutcome::Denied | TurnOutcome::Cancelled => CANCELLED,
    }
}
