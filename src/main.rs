//! Yoink main entry point
//!
//! Command-line interface for the resumable breadth-first crawler.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use yoink::config::{load_config, Config};
use yoink::crawler::{Coordinator, CrawlReport};
use yoink::output::{write_pages, CrawlStats, OutputFormat};

/// Yoink: a resumable breadth-first web crawler
///
/// Crawls outward from a start URL level by level, deduplicating URLs,
/// applying include/exclude rules and checkpointing progress so an
/// interrupted crawl can pick up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "yoink")]
#[command(version)]
#[command(about = "A resumable breadth-first web crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl outward from a start URL
    Crawl(CrawlArgs),

    /// Show statistics for a page file written by `crawl`
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Absolute http(s) URL to start from
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth (start URL is depth 0)
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Total page budget
    #[arg(short = 'n', long)]
    max_pages: Option<u64>,

    /// Number of concurrent workers
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Output format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (defaults to crawl_output.<format>)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Follow links to other hosts
    #[arg(long)]
    follow_external: bool,

    #[arg(long)]
    user_agent: Option<String>,

    /// Only crawl URLs matching one of these patterns
    #[arg(long = "include", value_name = "PATTERN")]
    include: Vec<String>,

    /// Skip URLs matching any of these patterns
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Comma-separated file extensions to skip
    #[arg(long, value_delimiter = ',')]
    skip_extensions: Vec<String>,

    /// Restrict the crawl to these domains and their subdomains
    #[arg(long = "allowed-domain", value_name = "DOMAIN")]
    allowed_domains: Vec<String>,

    /// Checkpoint location (local path, file:// or s3://bucket/key)
    #[arg(long, value_name = "LOCATION")]
    checkpoint: Option<String>,

    /// Pages between background checkpoint saves
    #[arg(long)]
    checkpoint_interval: Option<u64>,

    /// Resume from the checkpoint
    #[arg(long)]
    resume: bool,

    /// Do not extract visible text
    #[arg(long)]
    no_text: bool,

    /// Keep raw HTML in the output
    #[arg(long)]
    save_html: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Page file (.json or .jsonl)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,

    /// Also write headline statistics to this CSV file
    #[arg(long, value_name = "CSV")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Crawl(args) => handle_crawl(args).await,
        Command::Stats(args) => handle_stats(&args),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("yoink=info,warn"),
            1 => EnvFilter::new("yoink=debug,info"),
            2 => EnvFilter::new("yoink=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file (or defaults) and applies command-line overrides
fn build_config(args: &CrawlArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => Config::default(),
    };

    let crawler = &mut config.crawler;
    if let Some(depth) = args.max_depth {
        crawler.max_depth = depth;
    }
    if let Some(pages) = args.max_pages {
        crawler.max_pages = pages;
    }
    if let Some(concurrency) = args.concurrency {
        crawler.max_concurrency = concurrency;
    }
    if let Some(agent) = &args.user_agent {
        crawler.user_agent = agent.clone();
    }
    if let Some(timeout) = args.timeout {
        crawler.timeout_secs = timeout;
    }
    crawler.follow_external |= args.follow_external;
    crawler.save_html |= args.save_html;
    if args.no_text {
        crawler.extract_text = false;
    }

    let filters = &mut config.filters;
    filters.include.extend(args.include.iter().cloned());
    filters.exclude.extend(args.exclude.iter().cloned());
    filters.skip_extensions.extend(
        args.skip_extensions
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    );
    filters
        .allowed_domains
        .extend(args.allowed_domains.iter().cloned());

    if let Some(location) = &args.checkpoint {
        config.checkpoint.location = Some(location.clone());
    }
    if let Some(interval) = args.checkpoint_interval {
        config.checkpoint.interval = interval;
    }
    config.checkpoint.resume |= args.resume;

    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(path) = &args.output {
        config.output.path = Some(path.clone());
    }

    Ok(config)
}

/// Handles the `crawl` subcommand
async fn handle_crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let format = config.output.format;
    let output_path = config
        .output
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("crawl_output.{}", format.extension())));

    let coordinator = Coordinator::new(config, &args.url)?;
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl and saving checkpoint");
            cancel.cancel();
        }
    });

    let report = match coordinator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    write_pages(&report.pages, &output_path, format)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    print_report(&report, &output_path);
    Ok(())
}

fn print_report(report: &CrawlReport, output_path: &Path) {
    println!("=== Crawl Finished ({}) ===\n", report.stop_reason);
    println!("  Pages crawled: {}", report.crawled);
    println!("  Pages failed: {}", report.failed);
    println!("  URLs visited: {}", report.visited);
    println!("  URLs pending: {}", report.pending);
    println!("  URLs filtered: {}", report.filtered);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if report.resumed {
        println!(
            "  Resumed from checkpoint ({} pages restored)",
            report.restored_pages
        );
    }
    if report.fingerprint_mismatch {
        println!("  Warning: checkpoint was written with a different configuration");
    }
    if report.checkpoint_saved {
        println!("  Checkpoint saved");
    }
    println!("\n{} pages written to {}", report.pages.len(), output_path.display());
}

/// Handles the `stats` subcommand
fn handle_stats(args: &StatsArgs) -> anyhow::Result<()> {
    let stats = CrawlStats::from_file(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats.compute())?);
    } else {
        println!("{}", stats.format_summary());
    }

    if let Some(csv) = &args.export {
        stats.export_csv(csv)?;
        println!("\nStatistics exported to: {}", csv.display());
    }

    Ok(())
}
