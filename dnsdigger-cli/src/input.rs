//! Collects the run parameters: command-line values first, prompts for the rest.
use crate::Cli;
use dnsdigger::{
    session::SessionConfig,
    utils::{Sanitize, Terminal, TerminalErrors, normalize_domain},
    wordlist::DEFAULT_WORDLIST,
};
use std::path::PathBuf;
use tracing::warn;

const MAX_THREADS: usize = 1_000;

pub(crate) fn collect(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let domain = match cli.domain.as_deref() {
        Some(d) => normalize_domain(d)?,
        None => {
            let answer = Terminal::ask_with_default(
                "Target domain (e.g., example.com)",
                "example.com",
                &[Sanitize::IsDomain],
            )?;
            normalize_domain(&answer.answer)?
        }
    };

    let wordlist = match cli.wordlist.as_deref() {
        Some(path) if path.is_file() => path.to_path_buf(),
        Some(path) => {
            eprintln!("Wordlist {} not found.", path.display());
            ask_wordlist_path()?
        }
        None => {
            if Terminal::confirm("Do you have your own wordlist?")? {
                ask_wordlist_path()?
            } else {
                println!("Using default wordlist: {DEFAULT_WORDLIST}");
                PathBuf::from(DEFAULT_WORDLIST)
            }
        }
    };

    let threads = match cli.threads {
        Some(t) => thread_count(t),
        None => Terminal::ask_with_default(
            "Number of threads",
            "20",
            &[Sanitize::IsBetween(1, MAX_THREADS as isize)],
        )?
        .answer
        .parse()?,
    };

    Ok(SessionConfig::new(domain, wordlist)
        .with_workers(threads)
        .with_cache_path(cli.cache.clone())
        .with_output_root(cli.output.clone())
        .with_report_cached(cli.include_cached))
}

/// Keeps a `--threads` value within what the prompt would accept.
fn thread_count(requested: usize) -> usize {
    let threads = requested.clamp(1, MAX_THREADS);
    if threads != requested {
        warn!(requested, used = threads, "thread count out of range");
    }
    threads
}

fn ask_wordlist_path() -> Result<PathBuf, TerminalErrors> {
    let answer = Terminal::ask("Path to your wordlist", &[Sanitize::FileExists])?;
    Ok(PathBuf::from(answer.answer))
}
