//! # Resolver Adapter
//!
//! Wraps a single "does this name have an `A` record?" check.
//!
//! The scanner only ever needs a yes/no answer, so every failure mode
//! (name does not exist, no answer, timeout, server failure, unreachable
//! network) is folded into "not resolved". The [`Lookup`] kind keeps the
//! reason around for logging without changing that contract.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnsdigger::resolver::{Nameservers, Resolve, SystemResolver};
//!
//! # async fn run() -> Result<(), dnsdigger::resolver::ResolverErrors> {
//! let resolver = SystemResolver::new(&"cloudflare".parse()?)?;
//!
//! if resolver.resolves("www.example.com").await {
//!     println!("www.example.com is live");
//! }
//! # Ok(())
//! # }
//! ```
use async_trait::async_trait;
use hickory_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
};
use std::{fmt::Display, net::IpAddr, str::FromStr};
use tracing::trace;

/// Outcome of a single `A` lookup.
///
/// Only [`Lookup::Resolved`] counts as a live name; every other variant
/// collapses to `false` in [`Resolve::resolves`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// At least one address record came back.
    Resolved(usize),
    /// The server answered NXDOMAIN.
    NxDomain,
    /// The name exists but carries no `A` record.
    NoRecords,
    TimedOut,
    /// Any other resolver or network failure.
    Failed,
}

impl Lookup {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Lookup::Resolved(n) if *n > 0)
    }
}

impl Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(n) => write!(f, "resolved ({n} records)"),
            Self::NxDomain => write!(f, "nxdomain"),
            Self::NoRecords => write!(f, "no records"),
            Self::TimedOut => write!(f, "timeout"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A name-resolution primitive used by the scanner workers.
///
/// Implementors must never panic or surface errors: every failure is a
/// [`Lookup`] value. They must be `Send + Sync + 'static` because one
/// instance is shared by every worker of the pool.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    /// Requests the `A` records of `fqc`.
    async fn lookup(&self, fqc: &str) -> Lookup;

    /// `true` if `fqc` has at least one `A` record.
    async fn resolves(&self, fqc: &str) -> bool {
        self.lookup(fqc).await.is_resolved()
    }
}

/// Upstream servers used by [`SystemResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nameservers {
    /// Whatever the host is configured with (`/etc/resolv.conf` or the OS equivalent).
    #[default]
    System,
    Google,
    Cloudflare,
    Quad9,
    /// Plain-UDP/TCP servers on port 53.
    Custom(Vec<IpAddr>),
}

impl FromStr for Nameservers {
    type Err = ResolverErrors;

    /// Accepts `system`, `google`, `cloudflare`, `quad9` or a comma separated
    /// list of IP addresses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ResolverErrors::EmptyServerList),
            "system" => Ok(Nameservers::System),
            "google" => Ok(Nameservers::Google),
            "cloudflare" => Ok(Nameservers::Cloudflare),
            "quad9" => Ok(Nameservers::Quad9),
            list => {
                let mut ips = Vec::new();
                for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                    let ip = entry
                        .trim_matches(['[', ']'].as_ref())
                        .parse::<IpAddr>()
                        .map_err(|_| ResolverErrors::InvalidServer(entry.to_string()))?;
                    ips.push(ip);
                }

                if ips.is_empty() {
                    return Err(ResolverErrors::EmptyServerList);
                }
                Ok(Nameservers::Custom(ips))
            }
        }
    }
}

/// Errors raised while building a resolver. Lookups themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum ResolverErrors {
    #[error("The server {0} is invalid")]
    InvalidServer(String),

    #[error("The nameserver list is empty")]
    EmptyServerList,

    #[error("Couldn't read the system resolver configuration: {0}")]
    SystemConfig(#[from] ResolveError),
}

/// Production [`Resolve`] implementation backed by hickory's Tokio resolver.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn new(nameservers: &Nameservers) -> Result<Self, ResolverErrors> {
        let opts = ResolverOpts::default();

        let inner = match nameservers {
            Nameservers::System => TokioAsyncResolver::tokio_from_system_conf()?,
            Nameservers::Google => TokioAsyncResolver::tokio(ResolverConfig::google(), opts),
            Nameservers::Cloudflare => {
                TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), opts)
            }
            Nameservers::Quad9 => TokioAsyncResolver::tokio(ResolverConfig::quad9(), opts),
            Nameservers::Custom(ips) => {
                if ips.is_empty() {
                    return Err(ResolverErrors::EmptyServerList);
                }
                let group = NameServerConfigGroup::from_ips_clear(ips, 53, true);
                TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], group), opts)
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, fqc: &str) -> Lookup {
        match self.inner.ipv4_lookup(fqc).await {
            Ok(records) => match records.iter().count() {
                0 => Lookup::NoRecords,
                n => Lookup::Resolved(n),
            },
            Err(e) => {
                trace!(name = fqc, error = %e, "lookup failed");
                classify(&e)
            }
        }
    }
}

fn classify(err: &ResolveError) -> Lookup {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                Lookup::NxDomain
            } else {
                Lookup::NoRecords
            }
        }
        ResolveErrorKind::Timeout => Lookup::TimedOut,
        _ => Lookup::Failed,
    }
}
