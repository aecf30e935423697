//! Result files.
//!
//! A finished run is written to `<root>/<domain>/valid.txt` (names that
//! resolve) and `<root>/<domain>/invalid.txt` (names that don't), one name
//! per line. Existing files are overwritten.
use crate::{scanner::ScanResults, utils::target::safe_dir_name};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

pub const DEFAULT_OUTPUT_ROOT: &str = "output";
pub const VALID_FILE: &str = "valid.txt";
pub const INVALID_FILE: &str = "invalid.txt";

#[derive(Debug, thiserror::Error)]
pub enum OutputErrors {
    #[error("Couldn't create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Couldn't write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Can't derive an output directory from {0:?}")]
    InvalidDomain(String),
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_ROOT)
    }
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the results of `domain` go to.
    pub fn dir_for(&self, domain: &str) -> Result<PathBuf, OutputErrors> {
        let name = safe_dir_name(domain);
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(OutputErrors::InvalidDomain(domain.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Writes both result files and returns the directory holding them.
    pub fn write(&self, domain: &str, results: &ScanResults) -> Result<PathBuf, OutputErrors> {
        let dir = self.dir_for(domain)?;
        fs::create_dir_all(&dir).map_err(|source| OutputErrors::CreateDir {
            path: dir.clone(),
            source,
        })?;

        write_lines(&dir.join(VALID_FILE), &results.found)?;
        write_lines(&dir.join(INVALID_FILE), &results.not_found)?;

        info!(dir = %dir.display(), found = results.found.len(), "results saved");
        Ok(dir)
    }
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), OutputErrors> {
    let write_err = |source| OutputErrors::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    for line in lines {
        writeln!(writer, "{line}").map_err(write_err)?;
    }
    writer.flush().map_err(write_err)
}
