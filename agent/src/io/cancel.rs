//! Cooperative cancellation for model calls and running commands.
//!
//! A [`CancelToken`] is shared between the interrupt handler and whatever is
//! currently waiting (the model request or a shell command). Once it fires it
//! stays fired until [`CancelToken::rearm`] is called, so the next suspension
//! point can only be interrupted after a fresh arm.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the token can fire again.
    pub fn rearm(&self) {
        if self.fired.swap(false, Ordering::SeqCst) {
            debug!("cancel token rearmed");
        }
    }

    /// Fire this token on SIGINT instead of terminating the process.
    ///
    /// A second SIGINT that arrives while the token is still fired (nothing
    /// consumed the first one) exits with status 130.
    pub fn install_interrupt_handler(&self) -> Result<()> {
        use signal_hook::consts::SIGINT;
        use signal_hook::flag;

        // Order matters: the shutdown check must see the flag before this signal sets it.
        flag::register_conditional_shutdown(SIGINT, 130, Arc::clone(&self.fired))
            .context("register conditional shutdown on SIGINT")?;
        flag::register(SIGINT, Arc::clone(&self.fired)).context("register SIGINT flag")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn rearm_clears_a_fired_token() {
        let token = CancelToken::new();
        token.cancel();
        token.rearm();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
