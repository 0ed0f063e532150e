//! Chat with a local Ollama model that can run commands and edit files.
//!
//! Every action the model proposes is shown and needs approval unless the
//! approval ladder (safe commands, in-directory reads, remembered grants,
//! `--yes`/`--yes-all`) already allows it.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::debug;

use ollama_agent::chat::{Session, run_turn};
use ollama_agent::executor::{ActionExecutor, ExecutorConfig};
use ollama_agent::exit_codes;
use ollama_agent::interactive::Repl;
use ollama_agent::io::approvals::ApprovalStore;
use ollama_agent::io::cancel::CancelToken;
use ollama_agent::io::console::TerminalApprover;
use ollama_agent::io::ollama::{DEFAULT_HOST, DEFAULT_MODEL, OllamaClient};
use ollama_agent::io::process::SystemShell;
use ollama_agent::io::settings::load_default_settings;
use ollama_agent::logging;
use ollama_agent::report::Reporter;

#[derive(Parser)]
#[command(
    name = "ollama-agent",
    version,
    about = "Chat with a local Ollama model that can run commands and edit files"
)]
struct Cli {
    /// Prompt to send. Omit with --interactive to start a session.
    prompt: Vec<String>,
    /// Model to chat with.
    #[arg(short, long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    /// Ollama server URL.
    #[arg(short = 'H', long, env = "OLLAMA_HOST", default_value = DEFAULT_HOST)]
    host: String,
    /// Start an interactive chat session.
    #[arg(short, long)]
    interactive: bool,
    /// Print request history, raw responses and tool output.
    #[arg(short, long)]
    debug: bool,
    /// Approve the next action without asking.
    #[arg(long)]
    yes: bool,
    /// Approve every action without asking.
    #[arg(long)]
    yes_all: bool,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let prompt = cli.prompt.join(" ");
    if prompt.trim().is_empty() && !cli.interactive {
        Cli::command().print_help().context("print help")?;
        println!();
        return Ok(exit_codes::INVALID);
    }

    let settings = load_default_settings();
    let cancel = CancelToken::new();
    cancel.install_interrupt_handler()?;

    let client = OllamaClient::new(&cli.host)?;
    let shell = SystemShell;
    let approver = TerminalApprover::new(settings.show_thinking);
    let workdir = env::current_dir().context("resolve current directory")?;
    let config = ExecutorConfig {
        policy: settings.approval_policy(),
        command_timeout: Duration::from_secs(settings.command_timeout_secs),
        ..ExecutorConfig::new(workdir)
    };
    let mut executor =
        ActionExecutor::new(&shell, &approver, ApprovalStore::open_default(), config);

    let mut session = Session::new(
        &cli.model,
        client.host(),
        &settings.language,
        settings.show_thinking,
    );
    if cli.yes_all {
        session.approve_all();
    }
    if cli.yes {
        session.approve_next();
    }
    let reporter = Reporter::new(settings.show_thinking, cli.debug);

    if cli.debug {
        println!("[debug] model: {}, host: {}", session.model, session.host);
    }

    if cli.interactive {
        let mut repl = Repl {
            client: &client,
            executor,
            approver: &approver,
            reporter,
            settings,
            cancel: &cancel,
        };
        let first_prompt = Some(prompt.trim()).filter(|p| !p.is_empty());
        repl.run(&mut session, first_prompt)?;
        return Ok(exit_codes::OK);
    }

    debug!(prompt = %prompt, "single prompt");
    if cli.debug {
        println!("[debug] prompt: {prompt}");
    }
    let outcome = run_turn(
        &mut session,
        &prompt,
        &client,
        &mut executor,
        &cancel,
        |event| reporter.print_event(event),
    )?;
    reporter.print_outcome(&outcome);
    Ok(exit_codes::for_outcome(&outcome))
}
