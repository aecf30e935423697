//! # Target domain helpers
//!
//! Turns whatever the operator typed (`Example.com`, `https://example.com/`,
//! `http://example.com/login`) into the bare, lowercase domain that the
//! scanner appends candidate labels to.
//!
//! ## Example
//!
//! ```rust
//! use dnsdigger::utils::{normalize_domain, safe_dir_name};
//!
//! assert_eq!(normalize_domain(" HTTPS://Example.com/ ").unwrap(), "example.com");
//! assert_eq!(safe_dir_name("https://example.com/"), "example.com");
//! ```

/// Represents possible errors when normalizing a target domain.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetErrors {
    #[error("The domain is empty")]
    DomainEmpty,

    #[error("Invalid size! A domain is at most 253 characters")]
    InvalidSize,

    #[error("Invalid label {0:?} => 1 to 63 characters of a-z, 0-9, '-' or '_', not starting or ending with '-'")]
    InvalidLabel(String),
}

const SCHEMES: [&str; 2] = ["http://", "https://"];

fn strip_scheme(input: &str) -> &str {
    SCHEMES
        .iter()
        .find_map(|scheme| {
            input
                .get(..scheme.len())
                .filter(|head| head.eq_ignore_ascii_case(scheme))
                .map(|_| &input[scheme.len()..])
        })
        .unwrap_or(input)
}

/// Cleans and validates a target domain.
///
/// - Trims whitespace and lowercases.
/// - Drops an `http://` / `https://` prefix.
/// - Drops everything from the first `/` on (path, trailing slash).
/// - Drops a trailing root dot (`example.com.`).
///
/// # Errors
/// Returns [`TargetErrors`] if nothing is left or the host isn't a DNS name.
pub fn normalize_domain(input: &str) -> Result<String, TargetErrors> {
    let lower = input.trim().to_ascii_lowercase();
    let host = strip_scheme(&lower);
    let host = host.split('/').next().unwrap_or_default();
    let host = host.strip_suffix('.').unwrap_or(host);

    if host.is_empty() {
        return Err(TargetErrors::DomainEmpty);
    }

    is_dns(host)?;
    Ok(host.to_string())
}

/// Checks that `target` is a plausible DNS name.
///
/// # Rules
/// - Maximum length: 253 characters
/// - Each label 1 to 63 characters
/// - Cannot start or end with `-`
/// - Only ASCII alphanumerics, `-` and `_` (service labels like `_dmarc`)
pub fn is_dns(target: &str) -> Result<(), TargetErrors> {
    if target.len() > 253 {
        return Err(TargetErrors::InvalidSize);
    }

    for label in target.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(TargetErrors::InvalidLabel(label.to_string()));
        }
    }

    Ok(())
}

/// Directory name used for the results of `domain`: the input without any
/// `http://` / `https://` prefix and without surrounding slashes.
pub fn safe_dir_name(domain: &str) -> String {
    strip_scheme(domain.trim()).trim_matches('/').to_string()
}
