//! # Scanner Engine
//!
//! This module implements the **concurrent resolution engine**: a work queue
//! of candidate labels feeding a fixed pool of workers that check each
//! `label.domain` name against DNS, consult and update a shared result cache,
//! and partition the outcomes into found / not found.
//!
//! The engine is built around three pillars:
//!
//! - [`Digger`]: the high-level async API for queueing labels and controlling the run
//! - [`Scanner`]: the underlying shared state, work queue and log channel
//! - a pluggable [`LogFormatter`] for the live event stream
//!
//! ---
//!
//! ## Architecture Overview
//!
//! ```text
//! +------------------------------------------------------+
//! |                     User Code                        |
//! |      (queues labels, consumes logs, awaits idle)     |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                      Digger API                      |
//! |   - add_label, add_labels                            |
//! |   - execute                                          |
//! |   - get_logs_stream                                  |
//! |   - await_idle, cancel, shutdown_graceful            |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                 BuiltScanner (runtime)               |
//! |      spawns the workers, joins them, builds report   |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                    Scanner (state)                   |
//! | - work queue        - log broadcast sender           |
//! | - scan state lock   - formatter                      |
//! | - counters          - Notify (idle)                  |
//! +------------------------------------------------------+
//! ```
//!
//! ---
//!
//! ## Worker loop
//!
//! Each of the `workers` tasks repeats:
//!
//! 1. stop if the run was cancelled
//! 2. claim one label from the queue, stop if the queue is empty
//! 3. build `label.domain`
//! 4. if the cache already has an outcome, skip it (see [`ScannerOptions::report_cached`]);
//!    if another worker is resolving the same name, skip it too
//! 5. otherwise reserve the name and resolve it, **without** holding any lock
//! 6. record the outcome in the cache and in found / not found
//!
//! The scan state lock is only held for the in-memory read in step 4 and the
//! update in step 6, never across the network call.
//!
//! ## Idle Detection
//!
//! A scanner is **idle** when:
//!
//! ```text
//! pending == 0  AND  active == 0
//! ```
//!
//! A label moves from `pending` to `active` inside the queue lock, and an RAII
//! guard (`ActiveTasksGuard`) decrements `active` on every exit path of a
//! worker iteration. So idle is only observed once every claimed label has
//! been fully recorded, not merely when the queue is empty.
//!
//! ## Cancellation
//!
//! [`Digger::cancel`] stops workers from claiming new labels. Lookups already
//! in flight finish and are recorded. [`Digger::shutdown_graceful`] then joins
//! the pool and returns whatever was gathered.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsdigger::resolver::{Nameservers, SystemResolver};
//! use dnsdigger::scanner::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = Arc::new(SystemResolver::new(&Nameservers::Cloudflare).unwrap());
//!     let scanner = Scanner::<RawFormatter>::new("example.com", resolver).build();
//!
//!     let mut logs = scanner.get_logs_stream().unwrap();
//!     tokio::spawn(async move {
//!         while let Some(line) = logs.next().await {
//!             if RawFormatter.is_idle_signal(&line) {
//!                 break;
//!             }
//!             println!("{line}");
//!         }
//!     });
//!
//!     scanner.add_labels(vec!["www".to_string(), "mail".to_string()]);
//!     scanner.execute();
//!     scanner.await_idle().await;
//!
//!     let report = scanner.shutdown_graceful().await;
//!     println!("{:?}", report.results.found);
//! }
//! ```
use crate::{cache::ResultCache, resolver::Resolve};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{
    sync::{Notify, broadcast},
    task::JoinSet,
};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod formatter;
pub use formatter::{
    JsonFormatter, LogFormatter, RawFormatter, ScanEvent, ScanRecord, StructuredFormatter,
};
mod queue;
use queue::WorkQueue;
pub mod results;
pub use results::{ScanReport, ScanResults, ScanStats};
use results::{Claim, ScanState};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 20;

/// High-level asynchronous interface for the resolution engine.
///
/// Users never interact with the internal engine (`BuiltScanner`);
/// they only use the trait object returned from [`Scanner::build`].
///
/// # Concurrency
/// All methods are thread-safe and can be called from multiple tasks without
/// additional synchronization.
#[async_trait]
pub trait Digger: Send + Sync + 'static {
    type F: LogFormatter;

    /// Queues a single candidate label. Blank labels are ignored.
    fn add_label(&self, label: &str);

    /// Queues many candidate labels, in order. Labels are trimmed and blank
    /// ones dropped; a repeated label is queued again but resolved once.
    fn add_labels(&self, labels: Vec<String>);

    /// Returns the number of labels not claimed by any worker yet.
    fn total_labels(&self) -> usize;

    /// Returns pending plus in-flight labels.
    fn total_labels_on_queue(&self) -> usize;

    /// Number of names confirmed to resolve so far.
    fn found_count(&self) -> usize;

    /// Starts the worker pool.
    ///
    /// Workers drain the labels queued **before** this call and exit once the
    /// queue is empty. Calling it a second time is a no-op.
    fn execute(&self);

    /// Returns a stream of the log events produced from now on.
    ///
    /// Subscribe before [`Digger::execute`] to see every event. Returns
    /// `None` once the scanner has been shut down.
    fn get_logs_stream(&self) -> Option<LogStream<<Self::F as LogFormatter>::Output>>;

    /// Waits until no label is pending and no worker is busy, or until the
    /// run is cancelled.
    async fn await_idle(&self);

    /// Stops workers from claiming further labels.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;

    /// Joins every worker, closes the log channel and returns the outcome.
    ///
    /// Must be called once; later calls return an empty report.
    async fn shutdown_graceful(&self) -> ScanReport;
}

/// Live stream of formatted scan events.
///
/// Wraps a `BroadcastStream` and skips over records lost by a lagging
/// receiver. Ends once the scanner is shut down.
pub struct LogStream<T> {
    inner: BroadcastStream<T>,
}

impl<T: Clone + Send + Sync + 'static> LogStream<T> {
    pub fn new(rx: broadcast::Receiver<T>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }

    /// Next record, skipping over records lost to a lagging receiver.
    pub async fn next(&mut self) -> Option<T> {
        while let Some(msg) = self.inner.next().await {
            match msg {
                Ok(val) => return Some(val),
                Err(_) => continue,
            }
        }
        None
    }
}

/// Runtime configuration for the resolution engine.
///
/// # Defaults
/// ```rust,ignore
/// ScannerOptions {
///     workers: 20,
///     report_cached: false,
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ScannerOptions {
    /// Number of concurrent workers. `0` is treated as `1`.
    pub workers: usize,
    /// When `true`, names answered from the cache are also appended to
    /// found / not found. When `false` they are skipped silently and only
    /// names resolved in this run are reported.
    pub report_cached: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            report_cached: false,
        }
    }
}

/// Core shared state for the resolution engine.
///
/// This type does **not** execute anything. Call [`Scanner::build`] to
/// obtain the [`Digger`] that runs the workers.
pub struct Scanner<F>
where
    F: LogFormatter,
{
    /// Configuration options controlling runtime behavior.
    pub options: ScannerOptions,
    domain: Arc<str>,
    resolver: Arc<dyn Resolve>,
    queue: WorkQueue,
    active_tasks: Arc<AtomicUsize>,
    /// Cache and found / not found, behind the one lock of the engine.
    state: Mutex<ScanState>,
    found: AtomicUsize,
    /// Broadcast channel for log events.
    logger_tx: Mutex<Option<broadcast::Sender<<F as LogFormatter>::Output>>>,
    /// Formatter used to serialize log events.
    pub logger_format: Arc<F>,
    cancellation_token: CancellationToken,
    idle_notify: Arc<Notify>,
    workers: Mutex<Option<JoinSet<()>>>,
}

/// RAII guard for accurate active task counting.
///
/// When dropped, it decrements `active_tasks` and wakes idle waiters if no
/// active or pending labels remain.
struct ActiveTasksGuard {
    active_tasks: Arc<AtomicUsize>,
    pending_tasks: Arc<AtomicUsize>,
    idle_notify: Arc<Notify>,
}

impl Drop for ActiveTasksGuard {
    fn drop(&mut self) {
        if self.active_tasks.fetch_sub(1, Ordering::SeqCst) == 1
            && self.pending_tasks.load(Ordering::SeqCst) == 0
        {
            self.idle_notify.notify_waiters();
        }
    }
}

/// Internal runtime implementing the [`Digger`] trait.
struct BuiltScanner<F>(Arc<Scanner<F>>)
where
    F: LogFormatter;

impl<F> Scanner<F>
where
    F: LogFormatter,
{
    fn is_idle(&self) -> bool {
        self.queue.pending() == 0 && self.active_tasks.load(Ordering::SeqCst) == 0
    }

    fn emit(&self, event: ScanEvent) {
        let log = self.logger_format.format(&event);
        if let Some(logs_tx) = self.logger_tx.lock().as_ref() {
            logs_tx.send(log).ok();
        }
    }

    async fn worker(self: Arc<Self>) {
        loop {
            if self.cancellation_token.is_cancelled() {
                break;
            }

            let Some(label) = self.queue.claim(&self.active_tasks) else {
                break;
            };

            let _guard = ActiveTasksGuard {
                active_tasks: self.active_tasks.clone(),
                pending_tasks: self.queue.pending_counter(),
                idle_notify: self.idle_notify.clone(),
            };

            let fqc = format!("{}.{}", label, self.domain);

            let (claim, reported) = {
                let mut state = self.state.lock();
                let claim = state.claim(&fqc);
                let reported = match claim {
                    Claim::Cached(resolved) if self.options.report_cached => {
                        state.report_cached(&fqc, resolved)
                    }
                    _ => false,
                };
                (claim, reported)
            };

            match claim {
                Claim::Lookup => {}
                Claim::InFlight => {
                    debug!(name = %fqc, "already being resolved, skipping");
                    continue;
                }
                Claim::Cached(resolved) => {
                    debug!(name = %fqc, resolved, "cache hit");
                    if reported && resolved {
                        self.found.fetch_add(1, Ordering::SeqCst);
                    }
                    self.emit(ScanEvent::Cached { fqc, resolved });
                    continue;
                }
            }

            let lookup = self.resolver.lookup(&fqc).await;
            let resolved = lookup.is_resolved();
            debug!(name = %fqc, outcome = %lookup, "lookup done");

            {
                self.state.lock().record(&fqc, resolved);
            }

            if resolved {
                self.found.fetch_add(1, Ordering::SeqCst);
                self.emit(ScanEvent::Found { fqc });
            } else {
                self.emit(ScanEvent::NotFound {
                    fqc,
                    reason: lookup.to_string(),
                });
            }
        }
    }
}

#[async_trait]
impl<F> Digger for BuiltScanner<F>
where
    F: LogFormatter,
{
    type F = F;

    fn add_label(&self, label: &str) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        self.0.queue.push(label.to_string());
        self.0.idle_notify.notify_waiters();
    }

    fn add_labels(&self, labels: Vec<String>) {
        self.0.queue.extend(
            labels
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        );
        self.0.idle_notify.notify_waiters();
    }

    fn total_labels(&self) -> usize {
        self.0.queue.len()
    }

    fn total_labels_on_queue(&self) -> usize {
        self.0.queue.pending() + self.0.active_tasks.load(Ordering::SeqCst)
    }

    fn found_count(&self) -> usize {
        self.0.found.load(Ordering::SeqCst)
    }

    fn execute(&self) {
        let mut workers = self.0.workers.lock();
        if workers.is_some() {
            warn!("worker pool already started");
            return;
        }

        let size = self.0.options.workers.max(1);
        info!(
            domain = %self.0.domain,
            labels = self.0.queue.len(),
            workers = size,
            "starting worker pool"
        );

        let mut set = JoinSet::new();
        for _ in 0..size {
            set.spawn(self.0.clone().worker());
        }
        *workers = Some(set);
    }

    fn get_logs_stream(&self) -> Option<LogStream<<Self::F as LogFormatter>::Output>> {
        self.0
            .logger_tx
            .lock()
            .as_ref()
            .map(|logs_tx| LogStream::new(logs_tx.subscribe()))
    }

    async fn await_idle(&self) {
        loop {
            let notified = self.0.idle_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.0.is_idle() {
                self.0.emit(ScanEvent::Idle);
                break;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.0.cancellation_token.cancelled() => break,
            }
        }
    }

    fn cancel(&self) {
        if !self.0.cancellation_token.is_cancelled() {
            warn!(
                unclaimed = self.0.queue.len(),
                "cancellation requested, no further labels will be claimed"
            );
        }
        self.0.cancellation_token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.0.cancellation_token.is_cancelled()
    }

    async fn shutdown_graceful(&self) -> ScanReport {
        let workers = { self.0.workers.lock().take() };

        if let Some(mut set) = workers {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "worker ended abnormally");
                }
            }
        }

        if let Some(logs_tx) = self.0.logger_tx.lock().take() {
            drop(logs_tx);
        }

        let unclaimed = self.0.queue.len();
        let state = std::mem::take(&mut *self.0.state.lock());
        let report = state.into_report(unclaimed);

        info!(
            found = report.stats.resolved,
            not_found = report.stats.unresolved,
            cache_hits = report.stats.cache_hits,
            unclaimed,
            "worker pool finished"
        );
        report
    }
}

impl<F> Scanner<F>
where
    F: LogFormatter + Default,
{
    /// Creates a new [`Scanner`] for `domain` with default configuration and
    /// an empty cache.
    pub fn new(domain: impl Into<String>, resolver: Arc<dyn Resolve>) -> Self {
        let (sender, _) = broadcast::channel::<F::Output>(1024);
        let domain: String = domain.into();

        Self {
            options: ScannerOptions::default(),
            domain: Arc::from(domain),
            resolver,
            queue: WorkQueue::new(),
            active_tasks: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(ScanState::default()),
            found: AtomicUsize::new(0),
            logger_tx: Mutex::new(Some(sender)),
            logger_format: Arc::new(F::default()),
            cancellation_token: CancellationToken::new(),
            idle_notify: Arc::new(Notify::new()),
            workers: Mutex::new(None),
        }
    }

    /// Builds a ready-to-use [`Digger`] implementation using `BuiltScanner`.
    pub fn build(self) -> Arc<dyn Digger<F = F> + Send + Sync + 'static> {
        Arc::new(BuiltScanner(Arc::new(self)))
    }

    /// Sets custom configuration of the [`Scanner`].
    pub fn with_options(mut self, options: ScannerOptions) -> Self {
        self.options = options;
        self
    }

    /// Seeds the run with the outcomes of previous runs.
    pub fn with_cache(self, cache: ResultCache) -> Self {
        *self.state.lock() = ScanState::new(cache);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::resolver::Lookup;
    use crate::resolver::mock::MockResolver;
    use crate::scanner::*;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Parks every lookup until the test releases it.
    struct GatedResolver {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Resolve for GatedResolver {
        async fn lookup(&self, _fqc: &str) -> Lookup {
            self.entered.notify_one();
            self.release.notified().await;
            Lookup::Resolved(1)
        }
    }

    fn labels(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn run_with(
        resolver: Arc<MockResolver>,
        words: &[&str],
        cache: ResultCache,
        options: ScannerOptions,
    ) -> ScanReport {
        let scanner = Scanner::<StructuredFormatter>::new("example.com", resolver)
            .with_cache(cache)
            .with_options(options)
            .build();

        scanner.add_labels(labels(words));
        scanner.execute();
        scanner.await_idle().await;
        scanner.shutdown_graceful().await
    }

    fn set(v: &[String]) -> HashSet<String> {
        v.iter().cloned().collect()
    }

    #[test]
    fn test_build_scanner_default_and_custom_options() {
        let resolver = Arc::new(MockResolver::new(&[]));
        let scanner = Scanner::<JsonFormatter>::new("example.com", resolver.clone());
        let scanner_custom =
            Scanner::<JsonFormatter>::new("example.com", resolver).with_options(ScannerOptions {
                workers: 50,
                report_cached: true,
            });

        assert_eq!(scanner.options.workers, 20);
        assert!(!scanner.options.report_cached);
        assert_eq!(scanner_custom.options.workers, 50);
        assert!(scanner_custom.options.report_cached);
    }

    #[tokio::test]
    async fn test_scanner_add_labels() {
        let resolver = Arc::new(MockResolver::new(&[]));
        let scanner = Scanner::<RawFormatter>::new("example.com", resolver).build();

        scanner.add_label("www");
        scanner.add_labels(labels(&["mail", "dev"]));

        assert_eq!(scanner.total_labels(), 3);
        assert_eq!(scanner.total_labels_on_queue(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scenario_found_and_not_found() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com", "mail.example.com"]));

        let report = run_with(
            resolver.clone(),
            &["www", "mail", "doesnotexist123"],
            ResultCache::new(),
            ScannerOptions::default(),
        )
        .await;

        assert_eq!(
            set(&report.results.found),
            set(&labels(&["www.example.com", "mail.example.com"]))
        );
        assert_eq!(
            report.results.not_found,
            labels(&["doesnotexist123.example.com"])
        );
        assert_eq!(report.cache.len(), 3);
        assert_eq!(report.cache.get("www.example.com"), Some(true));
        assert_eq!(report.cache.get("doesnotexist123.example.com"), Some(false));
        assert_eq!(resolver.calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_empty_queue_makes_no_calls() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let mut cache = ResultCache::new();
        cache.insert("old.example.com", true);

        let report = run_with(resolver.clone(), &[], cache.clone(), ScannerOptions::default()).await;

        assert!(report.results.is_empty());
        assert_eq!(report.cache, cache);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cache_hits_skip_resolver_and_stay_out_of_results() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com", "api.example.com"]));
        let mut cache = ResultCache::new();
        cache.insert("www.example.com", true);
        cache.insert("gone.example.com", false);

        let report = run_with(
            resolver.clone(),
            &["www", "gone", "api", "nope"],
            cache,
            ScannerOptions::default(),
        )
        .await;

        // Cached names are neither re-resolved nor re-reported.
        assert_eq!(resolver.calls(), 2);
        assert!(!resolver.seen().contains(&"www.example.com".to_string()));
        assert_eq!(report.results.found, labels(&["api.example.com"]));
        assert_eq!(report.results.not_found, labels(&["nope.example.com"]));
        assert_eq!(report.stats.cache_hits, 2);
        assert_eq!(report.cache.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_report_cached_repopulates_results() {
        let resolver = Arc::new(MockResolver::new(&["api.example.com"]));
        let mut cache = ResultCache::new();
        cache.insert("www.example.com", true);
        cache.insert("gone.example.com", false);

        let report = run_with(
            resolver.clone(),
            &["www", "gone", "api"],
            cache,
            ScannerOptions {
                workers: 3,
                report_cached: true,
            },
        )
        .await;

        assert_eq!(resolver.calls(), 1);
        assert_eq!(
            set(&report.results.found),
            set(&labels(&["www.example.com", "api.example.com"]))
        );
        assert_eq!(report.results.not_found, labels(&["gone.example.com"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_second_run_hits_cache_for_every_name() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let words = ["www", "mail", "dev", "api"];

        let first = run_with(
            resolver.clone(),
            &words,
            ResultCache::new(),
            ScannerOptions::default(),
        )
        .await;
        assert_eq!(resolver.calls(), 4);

        let second = run_with(resolver.clone(), &words, first.cache.clone(), ScannerOptions::default()).await;

        assert_eq!(resolver.calls(), 4);
        assert_eq!(second.stats.cache_hits, 4);
        assert!(second.results.is_empty());
        assert_eq!(second.cache, first.cache);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_size_does_not_change_outcome() {
        let words: Vec<String> = (0..200).map(|i| format!("host{i}")).collect();
        let live: Vec<String> = (0..200)
            .filter(|i| i % 3 == 0)
            .map(|i| format!("host{i}.example.com"))
            .collect();
        let live_refs: Vec<&str> = live.iter().map(String::as_str).collect();
        let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();

        let mut outcomes = Vec::new();
        for workers in [1, 50] {
            let resolver =
                Arc::new(MockResolver::new(&live_refs).with_delay(Duration::from_millis(1)));
            let report = run_with(
                resolver.clone(),
                &word_refs,
                ResultCache::new(),
                ScannerOptions {
                    workers,
                    report_cached: false,
                },
            )
            .await;

            assert_eq!(resolver.calls(), 200);
            outcomes.push((set(&report.results.found), set(&report.results.not_found)));
        }

        assert_eq!(outcomes[0], outcomes[1]);

        let (found, not_found) = &outcomes[0];
        assert_eq!(found.len(), live.len());
        assert!(found.is_disjoint(not_found));
        assert_eq!(found.len() + not_found.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_name_resolved_once() {
        let resolver =
            Arc::new(MockResolver::new(&[]).with_delay(Duration::from_millis(2)));
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();

        let report = run_with(
            resolver.clone(),
            &word_refs,
            ResultCache::new(),
            ScannerOptions {
                workers: 16,
                report_cached: false,
            },
        )
        .await;

        let seen = resolver.seen();
        assert_eq!(seen.len(), 100);
        assert_eq!(set(&seen).len(), 100);
        assert_eq!(report.results.not_found.len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_await_idle_waits_for_in_flight_lookups() {
        let resolver =
            Arc::new(MockResolver::new(&["slow.example.com"]).with_delay(Duration::from_millis(50)));
        let scanner = Scanner::<RawFormatter>::new("example.com", resolver).build();

        scanner.add_label("slow");
        scanner.execute();
        scanner.await_idle().await;

        // The queue emptied right away, but idle only fires once the lookup is recorded.
        assert_eq!(scanner.total_labels_on_queue(), 0);
        assert_eq!(scanner.found_count(), 1);

        let report = scanner.shutdown_graceful().await;
        assert_eq!(report.results.found, labels(&["slow.example.com"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scanner_logger_stream() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let mut cache = ResultCache::new();
        cache.insert("old.example.com", false);

        let scanner = Scanner::<StructuredFormatter>::new("example.com", resolver)
            .with_cache(cache)
            .with_options(ScannerOptions {
                workers: 1,
                report_cached: false,
            })
            .build();
        let mut logs = scanner.get_logs_stream().unwrap();

        scanner.add_labels(labels(&["www", "nope", "old"]));
        scanner.execute();
        scanner.await_idle().await;

        let mut events = Vec::new();
        while let Some(record) = logs.next().await {
            if StructuredFormatter.is_idle_signal(&record) {
                break;
            }
            events.push(record.event);
        }

        assert_eq!(
            events,
            vec![
                ScanEvent::Found {
                    fqc: "www.example.com".into()
                },
                ScanEvent::NotFound {
                    fqc: "nope.example.com".into(),
                    reason: "nxdomain".into()
                },
                ScanEvent::Cached {
                    fqc: "old.example.com".into(),
                    resolved: false
                },
            ]
        );

        scanner.shutdown_graceful().await;
        assert!(scanner.get_logs_stream().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_stops_claiming_and_keeps_in_flight() {
        let resolver =
            Arc::new(MockResolver::new(&[]).with_delay(Duration::from_millis(30)));
        let scanner = Scanner::<RawFormatter>::new("example.com", resolver.clone())
            .with_options(ScannerOptions {
                workers: 1,
                report_cached: false,
            })
            .build();

        let words: Vec<String> = (0..50).map(|i| format!("w{i}")).collect();
        scanner.add_labels(words);
        scanner.execute();

        resolver.first_call.notified().await;
        scanner.cancel();
        scanner.await_idle().await;
        assert!(scanner.is_cancelled());

        let report = scanner.shutdown_graceful().await;

        // The lookup in flight at cancel time is still recorded.
        assert!(resolver.calls() >= 1);
        assert_eq!(report.results.not_found.len(), resolver.calls());
        assert_eq!(report.cache.len(), resolver.calls());
        assert_eq!(report.stats.unclaimed, 50 - resolver.calls());
        assert!(report.stats.unclaimed > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_execute_twice_is_noop() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let scanner = Scanner::<RawFormatter>::new("example.com", resolver.clone())
            .with_options(ScannerOptions {
                workers: 0,
                report_cached: false,
            })
            .build();

        scanner.add_label("www");
        scanner.execute();
        scanner.execute();
        scanner.await_idle().await;

        let report = scanner.shutdown_graceful().await;
        assert_eq!(resolver.calls(), 1);
        assert_eq!(report.results.found, labels(&["www.example.com"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_repeated_label_is_resolved_and_reported_once() {
        let resolver =
            Arc::new(MockResolver::new(&["www.example.com"]).with_delay(Duration::from_millis(50)));

        let report = run_with(
            resolver.clone(),
            &["www", "www", " ", "www"],
            ResultCache::new(),
            ScannerOptions {
                workers: 4,
                report_cached: true,
            },
        )
        .await;

        assert_eq!(resolver.calls(), 1);
        assert_eq!(resolver.seen(), labels(&["www.example.com"]));
        assert_eq!(report.results.found, labels(&["www.example.com"]));
        assert!(report.results.not_found.is_empty());
        assert_eq!(report.cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_state_lock_is_free_during_lookup() {
        let resolver = Arc::new(GatedResolver {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let old: Vec<String> = (0..20).map(|i| format!("old{i}")).collect();
        let mut cache = ResultCache::new();
        for label in &old {
            cache.insert(format!("{label}.example.com"), false);
        }

        let scanner = Scanner::<StructuredFormatter>::new("example.com", resolver.clone())
            .with_cache(cache)
            .with_options(ScannerOptions {
                workers: 2,
                report_cached: false,
            })
            .build();
        let mut logs = scanner.get_logs_stream().unwrap();

        scanner.add_label("slow");
        scanner.add_labels(old);
        scanner.execute();
        resolver.entered.notified().await;

        // Every cache hit completes while the other worker is parked in its lookup.
        let hits = tokio::time::timeout(Duration::from_secs(2), async {
            let mut hits = 0;
            while hits < 20 {
                match logs.next().await.map(|r| r.event) {
                    Some(ScanEvent::Cached { .. }) => hits += 1,
                    Some(_) => {}
                    None => break,
                }
            }
            hits
        })
        .await
        .unwrap();
        assert_eq!(hits, 20);
        assert_eq!(scanner.found_count(), 0);

        resolver.release.notify_one();
        scanner.await_idle().await;

        let report = scanner.shutdown_graceful().await;
        assert_eq!(report.results.found, labels(&["slow.example.com"]));
        assert_eq!(report.stats.cache_hits, 20);
    }
}
