mod config;
mod fetch;
mod model;
mod normalizer;
mod parser;
mod session;
mod storage;
mod utils;

use clap::Parser;
use config::load_config;
use fetch::{FixedDelay, HttpFetcher, RateLimiter, Unthrottled};
use model::{ScrapeSummary, SessionOutcome};
use session::{ScrapeSession, SiteProfile};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use storage::{Columns, CsvSink, ListingSink, TeeSink};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const COMBINED_FILE: &str = "final.csv";

#[derive(Debug, Parser)]
#[command(author, version, about = "Scrapes used-car classifieds into CSV datasets")]
struct Args {
    /// Path to the JSON configuration
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Site to scrape; repeat for several. Defaults to every configured site
    #[arg(short, long = "site")]
    sites: Vec<String>,

    /// Directory for the CSV files, overriding the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sites = match config.select_sites(&args.sites).and_then(|selected| {
        selected
            .into_iter()
            .map(SiteProfile::from_config)
            .collect::<Result<Vec<_>, _>>()
    }) {
        Ok(sites) => sites,
        Err(e) => {
            error!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let delay = config.politeness_delay();
    let rate_limiter: Arc<dyn RateLimiter> = if delay.is_zero() {
        Arc::new(Unthrottled)
    } else {
        Arc::new(FixedDelay::new(delay))
    };
    let fetcher = match HttpFetcher::new(
        &config.user_agent,
        config.request_timeout(),
        rate_limiter,
    ) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let session = ScrapeSession::new(fetcher, config.concurrency, config.request_timeout())
        .with_debug_html_dir(config.debug_html_dir.clone());

    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    // final.csv only for multi-site runs
    let mut combined = (sites.len() > 1)
        .then(|| CsvSink::new(output_dir.join(COMBINED_FILE), Columns::WithSite));

    info!("Sites to scrape: {}", sites.len());
    let mut failed_sites = 0;
    for site in &sites {
        let mut site_sink = CsvSink::new(
            output_dir.join(format!("{}.csv", site.name)),
            Columns::SingleSite,
        );

        let result = match combined.as_mut() {
            Some(combined) => {
                let mut tee = TeeSink::new(vec![
                    &mut site_sink as &mut dyn ListingSink,
                    combined as &mut dyn ListingSink,
                ]);
                session.run(site, &mut tee).await
            }
            None => session.run(site, &mut site_sink).await,
        };

        match result {
            Ok(summary) => log_summary(&summary, &site_sink),
            Err(e) => {
                error!("Scrape of {} failed: {}", site.name, e);
                failed_sites += 1;
            }
        }
    }

    if failed_sites > 0 {
        warn!("{} of {} sites failed", failed_sites, sites.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn log_summary(summary: &ScrapeSummary, sink: &CsvSink) {
    match summary.outcome {
        SessionOutcome::Empty => warn!("{}: no cars found", summary.site),
        SessionOutcome::Completed => info!(
            "{}: {} cars saved to {} ({} of {} pages failed, {}s)",
            summary.site,
            summary.found,
            sink.path().display(),
            summary.failed_pages,
            summary.total_pages,
            (summary.finished_at - summary.started_at).num_seconds()
        ),
    }
}
