//! Yes/no decision points
//!
//! Stages ask `Question`s through a `Prompter`; the terminal implementation is
//! swapped for canned answers in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Every question the installer may ask
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    ContinueLowStorage { free_gb: u64, required_gb: u64 },
    ReplaceInstallDir { path: PathBuf },
    WriteServiceUnits,
    ReloadDaemon,
    EnableServices,
    EnableLinger { user: String },
}

impl Question {
    pub fn text(&self) -> String {
        match self {
            Question::ContinueLowStorage {
                free_gb,
                required_gb,
            } => format!(
                "Only {free_gb} GB of free storage (recommended: {required_gb} GB). Continue anyway?"
            ),
            Question::ReplaceInstallDir { path } => format!(
                "{} already exists. Delete it and reinstall?",
                path.display()
            ),
            Question::WriteServiceUnits => {
                "Create systemd user services for gzond and the beacon chain?".to_string()
            }
            Question::ReloadDaemon => "Reload the systemd user daemon to pick up the new units?".to_string(),
            Question::EnableServices => "Enable and start the services now?".to_string(),
            Question::EnableLinger { user } => format!(
                "Keep services running after '{user}' logs out (enables lingering, needs sudo)?"
            ),
        }
    }

    /// Every question defaults to "no"
    pub fn default_answer(&self) -> bool {
        false
    }
}

/// Source of answers for `Question`s
pub trait Prompter {
    fn confirm(&mut self, question: &Question) -> io::Result<bool>;
}

/// `y`/`yes` (any case) is yes, blank is the default, anything else is no
pub fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Asks on stdout, reads one line from stdin
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &Question) -> io::Result<bool> {
        let hint = if question.default_answer() { "[Y/n]" } else { "[y/N]" };
        print!("❓ {} {hint} ", question.text());
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            // EOF: no one is there to answer
            println!();
            return Ok(question.default_answer());
        }

        Ok(parse_answer(&line, question.default_answer()))
    }
}

/// Answers yes to everything except wiping an existing install, unless forced
#[derive(Debug, Default)]
pub struct AssumeYes {
    pub force_reinstall: bool,
}

impl Prompter for AssumeYes {
    fn confirm(&mut self, question: &Question) -> io::Result<bool> {
        let answer = match question {
            Question::ReplaceInstallDir { .. } => self.force_reinstall,
            _ => true,
        };
        println!("❓ {} {}", question.text(), if answer { "yes" } else { "no" });
        Ok(answer)
    }
}

/// Replays canned answers; once exhausted every question gets its default
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    pub asked: Vec<Question>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &Question) -> io::Result<bool> {
        self.asked.push(question.clone());
        Ok(self
            .answers
            .pop_front()
            .unwrap_or_else(|| question.default_answer()))
    }
}
