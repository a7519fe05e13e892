//! Interactive selection
//!
//! Every disambiguation point (artifact, tag, branch) goes through [`choose`],
//! which talks to the operator only via the [`InteractivePrompt`] capability.
//! [`ConsolePrompt`] is the terminal implementation; [`ScriptedPrompt`] replays
//! canned answers and records the transcript for tests.

use crate::error::{ImportError, Result};
use colored::Colorize;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait InteractivePrompt {
    /// Operator-facing status line.
    fn say(&mut self, message: &str);

    /// One numbered option of a selection list.
    fn show_option(&mut self, index: usize, label: &str);

    /// Complaint about the last answer.
    fn warn(&mut self, message: &str);

    /// Next line of operator input, `None` once input is exhausted.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Present `items` with 1-based indices and block until a valid index is entered.
///
/// Fails without prompting when `items` is empty. Unparseable or out of range
/// answers are rejected and asked again, with no retry limit; only exhausted
/// input ends the loop with an error.
pub fn choose<T, F>(
    prompt: &mut dyn InteractivePrompt,
    items: Vec<T>,
    what: &str,
    label: F,
) -> Result<T>
where
    F: Fn(&T) -> String,
{
    if items.is_empty() {
        return Err(ImportError::NoCandidates {
            what: what.to_string(),
        });
    }

    for (i, item) in items.iter().enumerate() {
        prompt.show_option(i + 1, &label(item));
    }

    let index = loop {
        let line = prompt.read_line().map_err(ImportError::Prompt)?.ok_or_else(|| {
            ImportError::Prompt(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input closed while choosing {}", what),
            ))
        })?;

        match line.trim().parse::<usize>() {
            Ok(n) if (1..=items.len()).contains(&n) => break n - 1,
            _ => prompt.warn("Invalid selection"),
        }
    };

    let selected = items.into_iter().nth(index).ok_or_else(|| ImportError::NoCandidates {
        what: what.to_string(),
    })?;
    prompt.say(&format!("Selected: {}", label(&selected)));
    tracing::debug!(what, index = index + 1, "selection made");
    Ok(selected)
}

// ============================================================================
// CONSOLE
// ============================================================================

/// Terminal prompt: green status lines, numbered options, line-based input.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    /// Write failures are logged, not propagated.
    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = self.output.write_fmt(format_args!("{}\n", line)) {
            tracing::debug!(error = %e, "prompt output dropped");
        }
    }
}

impl<R: BufRead, W: Write> InteractivePrompt for ConsolePrompt<R, W> {
    fn say(&mut self, message: &str) {
        self.emit(format_args!("{}", message.green()));
    }

    fn show_option(&mut self, index: usize, label: &str) {
        self.emit(format_args!("[{}] {}", index.to_string().green(), label));
    }

    fn warn(&mut self, message: &str) {
        self.emit(format_args!("{}", message));
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

// ============================================================================
// SCRIPTED
// ============================================================================

/// Replays a fixed sequence of answers and keeps a plain-text transcript.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InteractivePrompt for ScriptedPrompt {
    fn say(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }

    fn show_option(&mut self, index: usize, label: &str) {
        self.transcript.push(format!("[{}] {}", index, label));
    }

    fn warn(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.answers.pop_front())
    }
}
