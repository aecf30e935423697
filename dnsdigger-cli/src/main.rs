mod input;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use dnsdigger::{
    resolver::{Nameservers, Resolve, SystemResolver},
    scanner::{Digger, JsonFormatter, LogFormatter, RawFormatter},
    session::{Session, SessionConfig, SessionReport},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dnsdigger")]
#[command(about = "Concurrent DNS subdomain enumerator", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Target domain. Prompted for when missing
    #[arg(short, long)]
    domain: Option<String>,

    /// Wordlist file, one label per line. Prompted for when missing
    #[arg(short, long)]
    wordlist: Option<PathBuf>,

    /// Number of concurrent workers. Prompted for when missing
    #[arg(short, long)]
    threads: Option<usize>,

    /// Persistent result cache
    #[arg(short, long, default_value = "cache.json")]
    cache: PathBuf,

    /// Root directory for the per-domain result files
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// system, google, cloudflare, quad9 or a comma separated list of IPs
    #[arg(short, long, default_value = "system")]
    nameservers: Nameservers,

    /// Also report names whose outcome came from the cache
    #[arg(long)]
    include_cached: bool,

    /// Format of the live event stream
    #[arg(long, value_enum, default_value_t = EventFormat::Raw)]
    format: EventFormat,

    /// Log level (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EventFormat {
    /// Only found names, one per line
    Raw,
    /// Every event as a JSON object
    Json,
}

fn banner() {
    println!("----------------------------------------------------------------");
    println!("██████  ███    ██ ███████     ██████  ██  ██████   ██████  ███████ ██████ ");
    println!("██   ██ ████   ██ ██          ██   ██ ██ ██       ██       ██      ██   ██");
    println!("██   ██ ██ ██  ██ ███████     ██   ██ ██ ██   ███ ██   ███ █████   ██████ ");
    println!("██   ██ ██  ██ ██      ██     ██   ██ ██ ██    ██ ██    ██ ██      ██   ██");
    println!("██████  ██   ████ ███████     ██████  ██  ██████   ██████  ███████ ██   ██");
    println!(
        "                     VERSION:   {}",
        env!("CARGO_PKG_VERSION")
    );
    println!("----------------------------------------------------------------");
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    banner();

    let config = input::collect(&cli)?;
    let resolver: Arc<dyn Resolve> = Arc::new(SystemResolver::new(&cli.nameservers)?);
    info!(nameservers = ?cli.nameservers, "resolver ready");

    let report = match cli.format {
        EventFormat::Raw => dig::<RawFormatter>(config, resolver, false).await?,
        EventFormat::Json => dig::<JsonFormatter>(config, resolver, true).await?,
    };

    summary(&report);

    if report.interrupted {
        println!("\n{}", "Interrupted by user.".red().bold());
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs one session, printing events live until every label is processed or
/// Ctrl-C is pressed.
async fn dig<F>(
    config: SessionConfig,
    resolver: Arc<dyn Resolve>,
    every_event: bool,
) -> anyhow::Result<SessionReport>
where
    F: LogFormatter<Output = String> + Default,
{
    let workers = config.workers;
    let mut running = Session::start::<F>(config, resolver)?;
    let total = running.total_labels();

    println!(
        "Scanning domain: {} | Subdomains: {} | Threads: {}\n",
        running.domain().cyan(),
        total,
        workers
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} Scanning subdomains... [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let digger = Arc::clone(running.digger());
    let printer = running.take_logs().map(|mut logs| {
        let formatter = F::default();
        let pb = pb.clone();
        tokio::spawn(async move {
            while let Some(line) = logs.next().await {
                if formatter.is_idle_signal(&line) {
                    break;
                }

                let done = total.saturating_sub(digger.total_labels_on_queue());
                pb.set_position(done as u64);
                pb.set_message(format!("{} found", digger.found_count()));

                if every_event {
                    pb.println(line);
                } else if line.starts_with('+') {
                    pb.println(line.as_str().green().bold().to_string());
                } else {
                    debug!("{line}");
                }
            }
        })
    });

    tokio::select! {
        _ = running.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            running.cancel();
        }
    }

    let report = running.finish().await?;
    if let Some(printer) = printer {
        printer.await.ok();
    }
    pb.finish_and_clear();

    Ok(report)
}

fn summary(report: &SessionReport) {
    println!(
        "\nResults saved in: {}",
        report.output_dir.display().to_string().cyan()
    );
    println!(
        "Resolved: {} | Unresolved: {} | From cache: {} | Cache entries: {}",
        report.stats.resolved,
        report.stats.unresolved,
        report.stats.cache_hits,
        report.cache_entries
    );

    if report.results.found.is_empty() {
        println!("\n{}", "No subdomains were found.".yellow());
        return;
    }

    println!("\n{}", "Valid subdomains found:".bold());
    for name in &report.results.found {
        println!("  {}", name.as_str().green());
    }
}
