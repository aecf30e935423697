//! Wordlist loading.
//!
//! A wordlist is newline-delimited text with one candidate label per line
//! (`www`, `mail`, `dev`...). Lines are trimmed, blank lines are skipped and
//! repeated labels are only kept once, in the order they first appear.
use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Default wordlist used when the operator doesn't bring one.
pub const DEFAULT_WORDLIST: &str = "wordlists/default.txt";

#[derive(Debug, thiserror::Error)]
pub enum WordlistErrors {
    #[error("Wordlist {path} not found")]
    NotFound { path: PathBuf },

    #[error("Couldn't read wordlist {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Couldn't read wordlist: {0}")]
    Io(#[from] io::Error),
}

/// Trims every label, drops blank ones and keeps the first occurrence of each.
pub fn clean_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();

    labels
        .into_iter()
        .filter_map(|l| {
            let label = l.as_ref().trim();
            (!label.is_empty() && seen.insert(label.to_string())).then(|| label.to_string())
        })
        .collect()
}

/// Collects the labels of an already opened wordlist.
pub fn read_labels<R: BufRead>(reader: R) -> Result<Vec<String>, WordlistErrors> {
    let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
    Ok(clean_labels(lines))
}

/// Opens the wordlist at `path` and collects its labels.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, WordlistErrors> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => WordlistErrors::NotFound {
            path: path.to_path_buf(),
        },
        _ => WordlistErrors::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    read_labels(BufReader::new(file)).map_err(|e| match e {
        WordlistErrors::Io(source) => WordlistErrors::Read {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
