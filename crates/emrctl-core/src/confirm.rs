//! Yes/no confirmation capability used by teardown.
//!
//! The saga never reads stdin directly; it asks a [`Confirm`]. The CLI plugs
//! in [`StdinConfirm`] (or [`AutoConfirm`] for `--yes`), tests plug in
//! [`ScriptedConfirm`].

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

/// Answers a yes/no question.
pub trait Confirm: Send + Sync {
    /// Returns true if the answer is affirmative.
    fn confirm(&self, question: &str) -> bool;
}

/// Returns true for `y` or `yes`, ignoring case and surrounding whitespace.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Writes `question` to `prompt` and reads one answer line from `input`.
///
/// A write or read failure, or end of input, counts as "no".
pub fn ask(question: &str, prompt: &mut impl Write, input: &mut impl BufRead) -> bool {
    if write!(prompt, "{question}").and_then(|()| prompt.flush()).is_err() {
        return false;
    }
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_affirmative(&line),
    }
}

/// Prompts on stderr and reads one line from stdin.
///
/// Stdout is left to the command's report.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        ask(
            question,
            &mut std::io::stderr().lock(),
            &mut std::io::stdin().lock(),
        )
    }
}

/// Gives the same answer to every question.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "auto-answering confirmation");
        self.0
    }
}

/// Replays a fixed list of answers and records the questions asked.
///
/// Questions beyond the script are answered "no".
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    /// Creates a script from answers given in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Returns every question asked so far.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(false)
    }
}
