//! I/O helpers: persistence, processes, the model endpoint and the terminal.

pub mod approvals;
pub mod cancel;
pub mod console;
pub mod diff;
pub mod ollama;
pub mod process;
pub mod prompt;
pub mod settings;
