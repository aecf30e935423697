//! # Terminal Input Helper
//!
//! Asks the operator a question and keeps asking until the answer passes
//! every [`Sanitize`] filter.
//!
//! ## Example
//! ```rust,no_run
//! use dnsdigger::utils::{Sanitize, Terminal, TerminalErrors};
//!
//! # fn run() -> Result<(), TerminalErrors> {
//! let domain = Terminal::ask_with_default(
//!     "Target domain (e.g., example.com)",
//!     "example.com",
//!     &[Sanitize::IsDomain],
//! )?;
//! let own = Terminal::confirm("Do you have your own wordlist?")?;
//!
//! println!("{} {}", domain.answer, own);
//! # Ok(())
//! # }
//! ```
use crate::utils::sanitize::Sanitize;
use std::io::{self, BufRead, Write};

#[derive(Debug, thiserror::Error)]
pub enum TerminalErrors {
    #[error("No input available for: {0}")]
    NoInput(String),

    #[error("Couldn't read from the terminal: {0}")]
    Read(#[from] io::Error),
}

/// The accepted answer of a prompt.
pub struct Terminal {
    pub answer: String,
}

impl Terminal {
    /// Prints `question` and loops until a valid answer is read from stdin.
    ///
    /// Fails once stdin is closed, since no answer can ever arrive.
    pub fn ask(question: &str, filters: &[Sanitize]) -> Result<Terminal, TerminalErrors> {
        Self::prompt(question, None, filters, &mut io::stdin().lock())
    }

    /// Like [`Terminal::ask`], but an empty answer (or closed stdin) picks `default`.
    pub fn ask_with_default(
        question: &str,
        default: &str,
        filters: &[Sanitize],
    ) -> Result<Terminal, TerminalErrors> {
        Self::prompt(question, Some(default), filters, &mut io::stdin().lock())
    }

    /// Yes/no question. Accepts `y`, `yes`, `n`, `no` in any case.
    pub fn confirm(question: &str) -> Result<bool, TerminalErrors> {
        Self::confirm_from(question, &mut io::stdin().lock())
    }

    fn confirm_from<R: BufRead>(question: &str, input: &mut R) -> Result<bool, TerminalErrors> {
        let options = ["y", "yes", "n", "no", "Y", "YES", "N", "NO", "Yes", "No"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let answer = Self::prompt(
            &format!("{question} [y/n]"),
            None,
            &[Sanitize::MatchStrings(options)],
            input,
        )?;

        Ok(answer.answer.to_ascii_lowercase().starts_with('y'))
    }

    fn prompt<R: BufRead>(
        question: &str,
        default: Option<&str>,
        filters: &[Sanitize],
        input: &mut R,
    ) -> Result<Terminal, TerminalErrors> {
        loop {
            match default {
                Some(d) => print!("{question} ({d}): "),
                None => print!("{question}: "),
            }
            io::stdout().flush()?;

            let mut answer = String::new();
            if input.read_line(&mut answer)? == 0 {
                // EOF: nothing more will ever come.
                return match default {
                    Some(d) => Ok(Terminal {
                        answer: d.to_string(),
                    }),
                    None => Err(TerminalErrors::NoInput(question.to_string())),
                };
            }

            let answer = match (answer.trim().is_empty(), default) {
                (true, Some(d)) => d.to_string(),
                _ => answer,
            };

            match Sanitize::execute(answer.as_str(), filters) {
                Ok(answer) => return Ok(Terminal { answer }),
                Err(e) => println!("{}", e),
            }
        }
    }
}
