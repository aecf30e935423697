//! # Input Sanitization & Validation
//!
//! Composable filters for the answers collected by
//! [`crate::utils::Terminal`]. Filters run in order and stop at the first
//! failure, returning a message the prompt prints before asking again.
//!
//! ## Example
//! ```rust,no_run
//! use dnsdigger::utils::{Sanitize, Terminal};
//!
//! # fn run() -> Result<(), dnsdigger::utils::TerminalErrors> {
//! let threads = Terminal::ask_with_default(
//!     "Number of threads",
//!     "20",
//!     &[Sanitize::IsBetween(1, 1000)],
//! )?;
//! println!("Threads: {}", threads.answer);
//! # Ok(())
//! # }
//! ```
use crate::utils::target::normalize_domain;
use std::path::Path;

/// A validation filter applied to a trimmed answer.
///
/// - `MatchStrings`: the answer is one of the given options.
/// - `IsBetween`: the answer is an integer within `[min, max]`.
/// - `IsDomain`: the answer normalizes into a valid target domain.
/// - `FileExists`: the answer is the path of an existing file.
pub enum Sanitize {
    MatchStrings(Vec<String>),
    IsBetween(isize, isize),
    IsDomain,
    FileExists,
}

trait Validate {
    fn validate(&self, input: &str) -> Result<(), FilterErrorNot>;
}

/// Why an answer was rejected.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FilterErrorNot {
    #[error("The value is not a number, try again!")]
    Number,
    #[error("The value doesn't match with the options: {}, try again!", .0.join(", "))]
    MatchStrings(Vec<String>),
    #[error("The value is not between {0} and {1}, try again!")]
    Between(isize, isize),
    #[error("{0}, try again!")]
    Domain(String),
    #[error("File not found. Try again.")]
    FileNotFound,
}

impl Sanitize {
    /// Executes all provided filters against the given answer.
    ///
    /// Returns the trimmed answer if every filter passes.
    pub(crate) fn execute(answer: &str, filters: &[Sanitize]) -> Result<String, FilterErrorNot> {
        let clean_answer = answer.trim();

        for filter in filters {
            filter.validate(clean_answer)?;
        }
        Ok(clean_answer.to_string())
    }
}

impl Validate for Sanitize {
    fn validate(&self, input: &str) -> Result<(), FilterErrorNot> {
        match self {
            Sanitize::MatchStrings(options) => {
                if options.iter().any(|o| o == input) {
                    Ok(())
                } else {
                    Err(FilterErrorNot::MatchStrings(options.clone()))
                }
            }
            Sanitize::IsBetween(n1, n2) => match input.parse::<isize>() {
                Ok(n) if n >= *n1 && n <= *n2 => Ok(()),
                Ok(_) => Err(FilterErrorNot::Between(*n1, *n2)),
                Err(_) => Err(FilterErrorNot::Number),
            },
            Sanitize::IsDomain => normalize_domain(input)
                .map(|_| ())
                .map_err(|e| FilterErrorNot::Domain(e.to_string())),
            Sanitize::FileExists => {
                if Path::new(input).is_file() {
                    Ok(())
                } else {
                    Err(FilterErrorNot::FileNotFound)
                }
            }
        }
    }
}
