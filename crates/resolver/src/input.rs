//! Input provider abstraction
//!
//! Resolution logic never touches stdin directly; it asks questions
//! through this trait so it stays testable without a terminal.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of operator answers.
pub trait InputProvider {
    /// Ask one question. `default` is displayed when non-empty. Returns
    /// the trimmed answer, which may be empty.
    fn ask(&mut self, label: &str, default: &str) -> io::Result<String>;

    /// Yes/no question; anything but `y`/`yes` counts as no.
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(question, "")?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Blocking prompts on stdin/stdout.
pub struct StdinInput;

impl InputProvider for StdinInput {
    fn ask(&mut self, label: &str, default: &str) -> io::Result<String> {
        let mut out = io::stdout().lock();
        if default.is_empty() {
            write!(out, "{label}: ")?;
        } else {
            write!(out, "{label} [{default}]: ")?;
        }
        out.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim().to_string())
    }
}

/// Replays a fixed sequence of answers, in order.
///
/// Used by tests and by non-interactive runs that supply answers up
/// front. Running out of answers is an error, not a hang.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InputProvider for ScriptedInput {
    fn ask(&mut self, label: &str, _default: &str) -> io::Result<String> {
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer left for '{label}'"),
            )
        })
    }
}
