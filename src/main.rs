//! fragweb main entry point
//!
//! Fetches a server-rendered page, binds the profile's triggers, performs
//! one refresh (optionally by activating a time or pagination trigger),
//! and reports which regions were replaced.

use anyhow::Context;
use clap::Parser;
use fragweb_client::HttpFetcher;
use fragweb_config::Config;
use fragweb_core::{FragmentFetcher, PageController, RefreshOutcome, RefreshRequest};
use fragweb_dom::Document;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "fragweb")]
#[command(version = "0.1.0")]
#[command(about = "Fragment-based partial refresh client for server-rendered pages", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "fragweb.yaml")]
    config: PathBuf,

    /// Page profile name from the config (e.g. "transactions")
    #[arg(short, long, default_value = "transactions")]
    page: String,

    /// Path of the live page to refresh
    #[arg(long, default_value = "/transactions")]
    path: String,

    /// Time-range value to activate (clicks the matching time button)
    #[arg(short, long)]
    time: Option<String>,

    /// Page number to activate (clicks the matching pagination button)
    #[arg(short = 'n', long)]
    page_number: Option<u32>,

    /// Override the configured base URL
    #[arg(long)]
    url: Option<String>,

    /// Print the built-in default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let rt = Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match Config::load_or_default(args.config.clone()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}", error.to_details());
            anyhow::bail!("failed to load config from {}", args.config.display());
        }
    };
    if let Some(url) = &args.url {
        config.http.base_url = url.clone();
    }

    let profile = config.page(&args.page)?.clone();
    let suffix = profile.suffix.clone();
    log::info!(
        "profile '{}': {} regions, {} triggers, mode {}",
        args.page,
        profile.regions.len(),
        profile.triggers.len(),
        profile.refresh
    );

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);

    // Initial full rendering of the page
    let initial = fetcher
        .fetch(&RefreshRequest::get(&args.path))
        .await
        .with_context(|| format!("failed to fetch {}", args.path))?;
    let document = Document::parse(&initial);

    let mut controller = PageController::builder(document, &args.path)
        .profile(profile)
        .selection(config.selection.clone())
        .csrf_field(&config.http.csrf_field)
        .fetcher(fetcher)
        .build()?;
    let bound = controller.initialize();
    log::info!("bound {} triggers", bound);

    let outcome = if let Some(time) = &args.time {
        let button = controller.find(&format!(".select-time[data-time={}]", time))?;
        controller.activate(button).await?
    } else if let Some(page) = args.page_number {
        let button = controller.find(&format!(".pg-btn[data-page={}]", page))?;
        controller.activate(button).await?
    } else {
        let request = RefreshRequest::get(&args.path).with_suffix(&suffix);
        controller.refresh(&request).await?
    };

    match outcome {
        RefreshOutcome::Applied(report) => {
            println!("replaced regions: {}", report.replaced.join(", "));
            if !report.skipped.is_empty() {
                println!("skipped regions:  {}", report.skipped.join(", "));
            }
            if report.charts_rendered > 0 {
                println!("charts rendered:  {}", report.charts_rendered);
            }
        }
        RefreshOutcome::Stale => println!("response was stale; nothing applied"),
        RefreshOutcome::LocalOnly => println!("trigger acted locally; no request issued"),
    }

    Ok(())
}
