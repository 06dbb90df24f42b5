//! Confirmation gates for destructive steps.
//!
//! A gate passes only when the answer equals the expected token exactly.
//! Empty input, EOF and anything else decline.

use std::io::{BufRead, Write};

use crate::domain::{AppError, Result};

/// Source of answers for confirmation gates.
pub trait Confirmation {
    /// Ask `question` and return the raw answer (without the line ending).
    fn answer(&mut self, question: &str) -> Result<String>;
}

/// Interactive gate reading one line per question.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirmation for LinePrompt<R, W> {
    fn answer(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question} ")
            .and_then(|()| self.output.flush())
            .map_err(|e| AppError::io("Failed to write prompt", e))?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .map_err(|e| AppError::io("Failed to read confirmation", e))?;

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers supplied up front; a missing answer falls back to `fallback`.
pub struct PresetAnswers<C> {
    answers: std::collections::VecDeque<Option<String>>,
    fallback: C,
}

impl<C: Confirmation> PresetAnswers<C> {
    #[must_use]
    pub fn new(answers: Vec<Option<String>>, fallback: C) -> Self {
        Self {
            answers: answers.into(),
            fallback,
        }
    }
}

impl<C: Confirmation> Confirmation for PresetAnswers<C> {
    fn answer(&mut self, question: &str) -> Result<String> {
        match self.answers.pop_front().flatten() {
            Some(answer) => {
                tracing::debug!(question, "Using preset answer");
                Ok(answer)
            }
            None => self.fallback.answer(question),
        }
    }
}

/// Ask and compare against `token`. A blank token never confirms.
pub fn confirm(gate: &mut impl Confirmation, question: &str, token: &str) -> Result<bool> {
    if token.trim().is_empty() {
        tracing::warn!("Blank confirmation token, treating as declined");
        return Ok(false);
    }

    let answer = gate.answer(&format!("{question} Type '{token}' to confirm:"))?;
    Ok(answer == token)
}
