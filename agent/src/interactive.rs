//! Interactive chat session with slash commands.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::chat::{Session, run_turn};
use crate::executor::ActionExecutor;
use crate::io::cancel::CancelToken;
use crate::io::console::TerminalApprover;
use crate::io::ollama::OllamaClient;
use crate::io::process::Shell;
use crate::io::settings::{SUPPORTED_LANGUAGES, Settings, save_default_settings};
use crate::report::Reporter;

const HELP: &str = "\
Available commands:
  /bye, /exit   Leave the session
  /clear        Clear the conversation history
  /models       List installed models and switch to another one
  /settings     Change the answer language or thinking display
  /help         Show this help

Anything else is sent to the model. Press Ctrl-C to interrupt a running
request or command; press it again to quit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand<'a> {
    Exit,
    Clear,
    Help,
    Models,
    Settings,
    Unknown(&'a str),
}

/// One line typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Command(SlashCommand<'a>),
    Prompt(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if !line.starts_with('/') {
        return Input::Prompt(line);
    }
    let command = line.split_whitespace().next().unwrap_or(line);
    Input::Command(match command {
        "/bye" | "/exit" => SlashCommand::Exit,
        "/clear" => SlashCommand::Clear,
        "/help" => SlashCommand::Help,
        "/models" => SlashCommand::Models,
        "/settings" => SlashCommand::Settings,
        other => SlashCommand::Unknown(other),
    })
}

/// Resolve a 1-based model number typed by the user.
///
/// `Ok(None)` means keep the current model.
pub fn select_model<'m>(models: &'m [String], input: &str) -> Result<Option<&'m str>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let index: usize = input
        .parse()
        .map_err(|_| format!("{input:?} is not a model number"))?;
    models
        .get(index.wrapping_sub(1))
        .map(|model| Some(model.as_str()))
        .ok_or_else(|| format!("no model numbered {index}"))
}

/// Interpret a yes/no answer. `Ok(None)` keeps the current value.
pub fn parse_yes_no(input: &str) -> Result<Option<bool>, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "y" | "yes" => Ok(Some(true)),
        "n" | "no" => Ok(Some(false)),
        other => Err(format!("expected yes or no, got {other:?}")),
    }
}

/// Everything the session loop needs besides the conversation itself.
pub struct Repl<'a, S: Shell> {
    pub client: &'a OllamaClient,
    pub executor: ActionExecutor<'a, S, TerminalApprover>,
    pub approver: &'a TerminalApprover,
    pub reporter: Reporter,
    pub settings: Settings,
    pub cancel: &'a CancelToken,
}

impl<S: Shell> Repl<'_, S> {
    /// Read prompts until `/bye`, `/exit` or end of input.
    ///
    /// `first_prompt`, if given, is sent before the first read.
    pub fn run(&mut self, session: &mut Session, first_prompt: Option<&str>) -> Result<()> {
        println!(
            "Starting interactive Ollama chat with {} at {}. Type /bye or /exit to quit, /help for commands.",
            session.model, session.host
        );
        if let Some(prompt) = first_prompt {
            self.turn(session, prompt);
        }

        loop {
            let Some(line) = read_line("> ")? else {
                println!();
                return Ok(());
            };
            match parse_input(&line) {
                Input::Empty => {}
                Input::Command(SlashCommand::Exit) => return Ok(()),
                Input::Command(SlashCommand::Clear) => {
                    session.clear();
                    println!("Conversation history cleared.");
                }
                Input::Command(SlashCommand::Help) => println!("{HELP}"),
                Input::Command(SlashCommand::Models) => self.choose_model(session)?,
                Input::Command(SlashCommand::Settings) => self.edit_settings(session)?,
                Input::Command(SlashCommand::Unknown(command)) => {
                    println!("Unknown command {command}. Type /help for the list of commands.");
                }
                Input::Prompt(prompt) => self.turn(session, prompt),
            }
        }
    }

    fn turn(&mut self, session: &mut Session, prompt: &str) {
        self.cancel.rearm();
        let reporter = &self.reporter;
        let result = run_turn(
            session,
            prompt,
            self.client,
            &mut self.executor,
            self.cancel,
            |event| reporter.print_event(event),
        );
        match result {
            Ok(outcome) => {
                debug!(?outcome, "turn finished");
                reporter.print_outcome(&outcome);
            }
            Err(err) => {
                error!(err = %format!("{err:#}"), "turn aborted");
                eprintln!("Error: {err:#}");
            }
        }
    }

    fn choose_model(&mut self, session: &mut Session) -> Result<()> {
        let models = match self.client.list_models() {
            Ok(models) => models,
            Err(err) => {
                eprintln!("Error: {err}");
                return Ok(());
            }
        };
        if models.is_empty() {
            println!("No models installed on {}.", session.host);
            return Ok(());
        }

        println!("Available models:");
        for (index, model) in models.iter().enumerate() {
            let marker = if *model == session.model { "*" } else { " " };
            println!("{marker} {}. {model}", index + 1);
        }
        let Some(answer) = read_line(&format!(
            "Select a model by number (Enter keeps {}): ",
            session.model
        ))?
        else {
            return Ok(());
        };
        match select_model(&models, &answer) {
            Ok(None) => {}
            Ok(Some(model)) if model == session.model => {}
            Ok(Some(model)) => {
                session.switch_model(model);
                println!("Switched to {model}. Conversation history cleared.");
            }
            Err(message) => println!("{message}"),
        }
        Ok(())
    }

    fn edit_settings(&mut self, session: &mut Session) -> Result<()> {
        println!(
            "Current settings: language = {}, show thinking = {}",
            self.settings.language,
            if self.settings.show_thinking { "yes" } else { "no" }
        );

        let Some(language) = read_line(&format!(
            "Language ({}) [{}]: ",
            SUPPORTED_LANGUAGES.join("/"),
            self.settings.language
        ))?
        else {
            return Ok(());
        };
        if !language.trim().is_empty()
            && let Err(err) = self.settings.set_language(&language)
        {
            println!("{err}");
        }

        let Some(thinking) = read_line(&format!(
            "Show thinking (yes/no) [{}]: ",
            if self.settings.show_thinking { "yes" } else { "no" }
        ))?
        else {
            return Ok(());
        };
        match parse_yes_no(&thinking) {
            Ok(Some(show)) => self.settings.show_thinking = show,
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }

        session.language = self.settings.language.clone();
        session.show_thinking = self.settings.show_thinking;
        self.reporter.show_thinking = self.settings.show_thinking;
        self.approver.set_show_thinking(self.settings.show_thinking);
        save_default_settings(&self.settings);
        println!("Settings saved.");
        Ok(())
    }
}

/// Print `prompt` and read one line. `None` at end of input.
fn read_line(prompt: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{prompt}").context("write prompt")?;
    stdout.flush().context("flush prompt")?;
    drop(stdout);

    let mut line = String::new();
    let read = io::stdin().read_line(&mut line).context("read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
