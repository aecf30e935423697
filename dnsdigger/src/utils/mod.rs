//! Operator-facing helpers: validated prompts and target domain handling.
pub mod sanitize;
pub mod target;
pub mod terminal;

pub use sanitize::Sanitize;
pub use target::{TargetErrors, is_dns, normalize_domain, safe_dir_name};
pub use terminal::{Terminal, TerminalErrors};
