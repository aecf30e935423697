//! # Session
//!
//! One end-to-end run: load the cache and the wordlist, run the worker pool,
//! then save the cache and write the result files.
//!
//! Every setup step happens in [`Session::start`] before a single worker is
//! spawned, so a malformed cache or a missing wordlist aborts the run without
//! any lookup. [`RunningSession::finish`] is the only place the cache is
//! written, and it is used for both normal and interrupted runs.
//!
//! ```rust,ignore
//! use dnsdigger::resolver::{Nameservers, SystemResolver};
//! use dnsdigger::scanner::RawFormatter;
//! use dnsdigger::session::{Session, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = Arc::new(SystemResolver::new(&Nameservers::System)?);
//! let config = SessionConfig::new("example.com", "words.txt").with_workers(50);
//!
//! let running = Session::start::<RawFormatter>(config, resolver)?;
//! tokio::select! {
//!     _ = running.wait() => {}
//!     _ = tokio::signal::ctrl_c() => running.cancel(),
//! }
//! let report = running.finish().await?;
//! println!("{} found, saved in {}", report.results.found.len(), report.output_dir.display());
//! # Ok(())
//! # }
//! ```
use crate::{
    cache::{CacheErrors, ResultCache},
    output::{DEFAULT_OUTPUT_ROOT, OutputErrors, OutputWriter},
    resolver::Resolve,
    scanner::{
        DEFAULT_WORKERS, Digger, LogFormatter, LogStream, ScanResults, ScanStats, Scanner,
        ScannerOptions,
    },
    utils::target::{TargetErrors, normalize_domain},
    wordlist::{WordlistErrors, clean_labels, load_labels},
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

pub const DEFAULT_CACHE_FILE: &str = "cache.json";

/// Everything needed to run one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target domain, as typed. Normalized by [`Session::start`].
    pub domain: String,
    pub wordlist: PathBuf,
    pub workers: usize,
    pub cache_path: PathBuf,
    pub output_root: PathBuf,
    /// See [`ScannerOptions::report_cached`].
    pub report_cached: bool,
}

impl SessionConfig {
    pub fn new(domain: impl Into<String>, wordlist: impl Into<PathBuf>) -> Self {
        Self {
            domain: domain.into(),
            wordlist: wordlist.into(),
            workers: DEFAULT_WORKERS,
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            report_cached: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_report_cached(mut self, report_cached: bool) -> Self {
        self.report_cached = report_cached;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionErrors {
    #[error(transparent)]
    Target(#[from] TargetErrors),

    #[error(transparent)]
    Cache(#[from] CacheErrors),

    #[error(transparent)]
    Wordlist(#[from] WordlistErrors),

    #[error(transparent)]
    Output(#[from] OutputErrors),
}

/// What a finished session leaves behind.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub domain: String,
    pub results: ScanResults,
    pub stats: ScanStats,
    /// Entries in the cache file after the save.
    pub cache_entries: usize,
    pub output_dir: PathBuf,
    pub interrupted: bool,
}

pub struct Session;

impl Session {
    /// Loads the cache and the wordlist, then starts the worker pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(
        config: SessionConfig,
        resolver: Arc<dyn Resolve>,
    ) -> Result<RunningSession<F>, SessionErrors>
    where
        F: LogFormatter + Default,
    {
        let domain = normalize_domain(&config.domain)?;
        let cache = ResultCache::load(&config.cache_path)?;
        let labels = load_labels(&config.wordlist)?;

        Ok(Self::launch(config, domain, cache, labels, resolver))
    }

    /// Same as [`Session::start`] with labels that were already read. They go
    /// through the same trimming and de-duplication as a wordlist file.
    pub fn start_with_labels<F>(
        config: SessionConfig,
        labels: Vec<String>,
        resolver: Arc<dyn Resolve>,
    ) -> Result<RunningSession<F>, SessionErrors>
    where
        F: LogFormatter + Default,
    {
        let domain = normalize_domain(&config.domain)?;
        let cache = ResultCache::load(&config.cache_path)?;
        let labels = clean_labels(labels);

        Ok(Self::launch(config, domain, cache, labels, resolver))
    }

    fn launch<F>(
        config: SessionConfig,
        domain: String,
        cache: ResultCache,
        labels: Vec<String>,
        resolver: Arc<dyn Resolve>,
    ) -> RunningSession<F>
    where
        F: LogFormatter + Default,
    {
        info!(
            domain = %domain,
            labels = labels.len(),
            cached = cache.len(),
            workers = config.workers,
            "session starting"
        );

        let total = labels.len();
        let digger = Scanner::<F>::new(domain.clone(), resolver)
            .with_cache(cache)
            .with_options(ScannerOptions {
                workers: config.workers,
                report_cached: config.report_cached,
            })
            .build();

        let logs = digger.get_logs_stream();
        digger.add_labels(labels);
        digger.execute();

        RunningSession {
            config,
            domain,
            total,
            digger,
            logs,
        }
    }
}

/// A session whose workers are running.
pub struct RunningSession<F>
where
    F: LogFormatter,
{
    config: SessionConfig,
    domain: String,
    total: usize,
    digger: Arc<dyn Digger<F = F> + Send + Sync + 'static>,
    logs: Option<LogStream<F::Output>>,
}

impl<F> RunningSession<F>
where
    F: LogFormatter,
{
    /// Normalized target domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Number of distinct labels queued for this run.
    pub fn total_labels(&self) -> usize {
        self.total
    }

    pub fn digger(&self) -> &Arc<dyn Digger<F = F> + Send + Sync + 'static> {
        &self.digger
    }

    /// Event stream subscribed before the workers started, so no event is
    /// missed. Can only be taken once.
    pub fn take_logs(&mut self) -> Option<LogStream<F::Output>> {
        self.logs.take()
    }

    /// Stops claiming new labels. In-flight lookups still complete.
    pub fn cancel(&self) {
        self.digger.cancel();
    }

    /// Resolves once every label has been processed, or the run was cancelled.
    pub async fn wait(&self) {
        self.digger.await_idle().await;
    }

    /// Joins the pool, saves the cache and writes the result files.
    pub async fn finish(self) -> Result<SessionReport, SessionErrors> {
        let interrupted = self.digger.is_cancelled();
        let report = self.digger.shutdown_graceful().await;

        if interrupted {
            warn!(
                unclaimed = report.stats.unclaimed,
                "run interrupted, saving partial results"
            );
        }

        report.cache.save(&self.config.cache_path)?;
        let output_dir =
            OutputWriter::new(&self.config.output_root).write(&self.domain, &report.results)?;

        Ok(SessionReport {
            domain: self.domain,
            cache_entries: report.cache.len(),
            results: report.results,
            stats: report.stats,
            output_dir,
            interrupted,
        })
    }
}
