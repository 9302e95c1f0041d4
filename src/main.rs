//! Cadence main entry point
//!
//! This is the command-line interface for the Cadence crawler.

use anyhow::{anyhow, Context};
use cadence_crawler::config::{load_config_with_hash, Config};
use cadence_crawler::crawler::Coordinator;
use cadence_crawler::monitor::{print_snapshot, TracingMonitor};
use cadence_crawler::{ContentAnalyzer, Spider, Task, TaskQueue, TaskScheduler};
use clap::{Parser, Subcommand};
use scraper::{Html, Selector};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Cadence: a polite page fetcher and content-pattern analyzer
///
/// Cadence fetches pages under per-domain rate limits, retries transient
/// failures, follows paginated listings, and files every page it fetches
/// into a keyword category in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "cadence-crawler")]
#[command(version)]
#[command(about = "A polite page fetcher and content-pattern analyzer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl, analyze, classify and store the given pages
    Crawl {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Walk a paginated listing and store every child page
    Paginate {
        #[arg(value_name = "BASE_URL")]
        base_url: String,

        /// CSS selector matching the child links on each listing page
        #[arg(long)]
        link_selector: String,

        /// First page index (defaults to the config value)
        #[arg(long)]
        start_page: Option<u32>,

        /// Number of listing pages (defaults to the config value)
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Fetch one page and print its ranked content patterns
    Analyze {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Schedule a page for later and wait until it has been processed
    Schedule {
        #[arg(value_name = "URL")]
        url: String,

        /// Seconds from now until the task is due
        #[arg(long, default_value_t = 0)]
        delay_secs: u64,
    },

    /// Validate the configuration and print a summary
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Command::Crawl { urls } => handle_crawl(&config, urls, &cancel).await,
        Command::Paginate {
            base_url,
            link_selector,
            start_page,
            max_pages,
        } => {
            handle_paginate(
                &config,
                &base_url,
                &link_selector,
                start_page.unwrap_or(config.pagination.start_page),
                max_pages.unwrap_or(config.pagination.max_pages),
                &cancel,
            )
            .await
        }
        Command::Analyze { url } => handle_analyze(&config, &url).await,
        Command::Schedule { url, delay_secs } => {
            handle_schedule(&config, &url, Duration::from_secs(delay_secs), &cancel).await
        }
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cadence_crawler=info,warn"),
            1 => EnvFilter::new("cadence_crawler=debug,info"),
            2 => EnvFilter::new("cadence_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the token on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current request");
            cancel.cancel();
        }
    });
}

fn build_coordinator(
    config: &Config,
) -> anyhow::Result<(Coordinator, Arc<TaskQueue>, Arc<TracingMonitor>)> {
    let queue = Arc::new(TaskQueue::new());
    let monitor = Arc::new(TracingMonitor::new());
    let coordinator = Coordinator::from_config(config, Arc::clone(&queue), monitor.clone())
        .context("Failed to set up the crawl pipeline")?;
    Ok((coordinator, queue, monitor))
}

/// Handles the crawl command: queues every valid URL and drains the queue
async fn handle_crawl(
    config: &Config,
    urls: Vec<String>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let (coordinator, queue, monitor) = build_coordinator(config)?;

    for url in urls {
        match Task::new(url) {
            Ok(task) => queue.push_task(task),
            Err(e) => tracing::warn!("Skipping: {}", e),
        }
    }

    tracing::info!("Crawling {} page(s)", queue.len());
    let processed = coordinator.drain(cancel).await;
    tracing::info!("Processed {} page(s)", processed);

    print_snapshot(&monitor.snapshot());
    Ok(())
}

/// Handles the paginate command: fan-out over listing pages, storing children
async fn handle_paginate(
    config: &Config,
    base_url: &str,
    link_selector: &str,
    start_page: u32,
    max_pages: u32,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let selector = Selector::parse(link_selector)
        .map_err(|e| anyhow!("Invalid link selector '{}': {}", link_selector, e))?;
    let base = Url::parse(base_url).with_context(|| format!("Invalid base URL {}", base_url))?;

    let (coordinator, _queue, monitor) = build_coordinator(config)?;
    let page_link_parser = |html: &str| -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .map(|url| url.to_string())
            .collect()
    };

    let run = coordinator
        .spider()
        .crawl_with_pagination(
            base_url,
            page_link_parser,
            start_page,
            max_pages,
            &config.pagination.page_param,
            cancel,
        )
        .await;

    let mut stored = 0;
    for page in run.results {
        let url = page.url.clone();
        match coordinator.record_page(page, None) {
            Ok(_) => stored += 1,
            Err(e) => tracing::error!("Failed to store {}: {}", url, e),
        }
    }

    println!(
        "Visited {} listing page(s), stored {} child page(s), stop reason: {:?}\n",
        run.pages_visited, stored, run.stop
    );
    print_snapshot(&monitor.snapshot());
    Ok(())
}

/// Handles the analyze command: prints ranked patterns and suggestions as JSON
async fn handle_analyze(config: &Config, url: &str) -> anyhow::Result<()> {
    let spider = Spider::from_config(config)?;
    let result = print_analysis(&spider, url).await;
    spider.executor().close();
    result
}

async fn print_analysis(spider: &Spider, url: &str) -> anyhow::Result<()> {
    let page = spider.crawl(url, None).await?;

    let analyzer = ContentAnalyzer::new();
    let patterns = analyzer.analyze_page(&page.html);
    let suggestions = analyzer.get_crawl_suggestions(&patterns);

    println!("=== {} ===\n", page.metadata.title.as_deref().unwrap_or(url));
    println!("Patterns ({}):", patterns.len());
    println!("{}", serde_json::to_string_pretty(&patterns)?);
    println!("\nSuggestions:");
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}

/// Handles the schedule command: runs scheduler and pipeline until the task is done
async fn handle_schedule(
    config: &Config,
    url: &str,
    delay: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let (coordinator, queue, monitor) = build_coordinator(config)?;
    let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&queue), config.scheduler.tick())?);

    let id = scheduler.schedule_in(Task::new(url)?, delay)?;
    tracing::info!("Scheduled task {} in {:?}", id, delay);

    let scheduler_stop = cancel.child_token();
    let scheduler_loop = {
        let scheduler = Arc::clone(&scheduler);
        let stop = scheduler_stop.clone();
        tokio::spawn(async move { scheduler.run(&stop).await })
    };

    let outcome = match queue.pop_task_or_cancel(cancel).await {
        Some(task) => coordinator.process_task(&task).await.map(Some),
        None => Ok(None),
    };

    scheduler_stop.cancel();
    scheduler_loop.await?;

    match outcome? {
        Some(record) => println!("Stored {} as {}\n", record.url, record.category),
        None => {
            println!("Cancelled before task {} ran\n", id);
            scheduler.cancel_task(id);
        }
    }

    print_snapshot(&monitor.snapshot());
    Ok(())
}

/// Handles the check command: shows the effective configuration
fn handle_check(config: &Config) {
    println!("=== Cadence Configuration ===\n");

    println!("Executor:");
    println!("  Max retries: {}", config.executor.max_retries);
    println!("  Retry delay: {}ms", config.executor.retry_delay_ms);
    println!("  Timeout: {}s", config.executor.timeout_secs);
    println!("  User agent: {}", config.executor.user_agent);
    println!(
        "  Proxy: {}",
        config.executor.proxy.as_deref().unwrap_or("none")
    );
    for (name, value) in &config.executor.headers {
        println!("  Header {}: {}", name, value);
    }

    println!("\nScheduler:");
    println!("  Tick: {}ms", config.scheduler.tick_ms);

    println!("\nPagination:");
    println!("  Page parameter: {}", config.pagination.page_param);
    println!("  Start page: {}", config.pagination.start_page);
    println!("  Max pages: {}", config.pagination.max_pages);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nRate Limits ({}):", config.rate_limits.len());
    for entry in &config.rate_limits {
        println!("  - {}: {}/s", entry.domain, entry.requests_per_second);
    }

    println!("\nCategories ({}):", config.categories.len());
    for entry in &config.categories {
        println!("  - {} ({} keywords)", entry.name, entry.keywords.len());
    }

    println!("\n✓ Configuration is valid");
}
