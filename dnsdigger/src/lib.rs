//! # DNS Digger
//!
//! A Rust library for enumerating live subdomains of a target domain.
//!
//! Candidate labels from a wordlist are combined with the target domain and
//! checked for an `A` record by a fixed pool of concurrent workers. Outcomes
//! are kept in a persistent cache so repeat runs skip names that were already
//! tested, and the results are split into **valid** (resolves) and **invalid**
//! (does not resolve) lists.
//!
//! ## Features
//!
//! - **Resolver adapter** - one `A` lookup per name, every failure folded into "not found"
//! - **Result cache** - JSON mapping of name to outcome, loaded at start and saved at the end
//! - **Scanner engine** - bounded worker pool with idle detection, graceful shutdown and a live event stream
//! - **Output writer** - `valid.txt` / `invalid.txt` under a per-domain directory
//! - **Input helpers** - validated terminal prompts and domain normalization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dnsdigger::resolver::{Nameservers, SystemResolver};
//! use dnsdigger::session::{Session, SessionConfig};
//! use dnsdigger::scanner::RawFormatter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Arc::new(SystemResolver::new(&Nameservers::System)?);
//!     let config = SessionConfig::new("example.com", "wordlists/default.txt");
//!
//!     let running = Session::start::<RawFormatter>(config, resolver)?;
//!     running.wait().await;
//!     let report = running.finish().await?;
//!
//!     for name in &report.results.found {
//!         println!("{name}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   wordlist ──> WorkQueue ──> worker 1..N ──> Resolve::lookup
//!                                 │
//!                                 v
//!                  ScanState (cache + found + not found)
//!                                 │
//!                                 v
//!          ScanReport ──> ResultCache::save + OutputWriter::write
//! ```
//!
//! - **`resolver`** - the `Resolve` trait and the hickory-backed `SystemResolver`
//! - **`cache`** - persisted name -> outcome mapping
//! - **`wordlist`** - label loading
//! - **`scanner`** - work queue, worker pool, formatters, result partition
//! - **`output`** - result files
//! - **`session`** - wires everything together for one run
//! - **`utils`** - prompts, filters and domain helpers used by the CLI

pub mod cache;

pub mod output;

pub mod resolver;

pub mod scanner;

pub mod session;

pub mod utils;

pub mod wordlist;
