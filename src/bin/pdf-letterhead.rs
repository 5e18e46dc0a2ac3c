//! PDF Letterhead CLI tool
//!
//! Scrapes an index page for PDFs and writes a letterhead-stamped copy of each.
//! Flags override environment variables, which override the built-in
//! defaults. A `.env` file in the working directory is loaded first.

use clap::Parser;
use std::collections::HashMap;
use std::io;
use std::process;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use pdf_letterhead::config::{self, Config};
use pdf_letterhead::{run, HttpClient, RunError};

/// PDF Letterhead - Stamp every PDF linked from an index page
#[derive(Parser)]
#[command(name = "pdf-letterhead")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Configure through .env and run
    echo 'PDF_INDEX_URL=https://example.com/docs/' > .env
    pdf-letterhead

    # Override everything on the command line
    pdf-letterhead --index-url https://example.com/docs/ --letterhead head.pdf --output-dir out --shift-down 36

EXIT CODES:
    0  completed (individual documents may still have failed)
    2  configuration error
    3  letterhead missing or unreadable
    4  index page could not be fetched
    5  output directory could not be created")]
struct Cli {
    /// Page listing the PDFs to process [env: PDF_INDEX_URL]
    #[arg(long)]
    index_url: Option<String>,

    /// One-page PDF drawn behind every output page [env: LETTERHEAD_PATH, default: letterhead.pdf]
    #[arg(long)]
    letterhead: Option<String>,

    /// Directory receiving the stamped PDFs [env: OUTPUT_DIR, default: processed_pdfs]
    #[arg(long)]
    output_dir: Option<String>,

    /// Points to move page content down before stamping [env: SHIFT_DOWN_AMOUNT, default: 20]
    #[arg(long, allow_hyphen_values = true)]
    shift_down: Option<i32>,

    /// Per-request HTTP timeout in seconds [env: HTTP_TIMEOUT_SECS, default: none]
    #[arg(long)]
    timeout: Option<u64>,

    /// Show per-stage debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags given on the command line, keyed by the environment key they override
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        if let Some(url) = &self.index_url {
            overrides.insert(config::INDEX_URL_KEY, url.clone());
        }
        if let Some(path) = &self.letterhead {
            overrides.insert(config::LETTERHEAD_PATH_KEY, path.clone());
        }
        if let Some(dir) = &self.output_dir {
            overrides.insert(config::OUTPUT_DIR_KEY, dir.clone());
        }
        if let Some(points) = self.shift_down {
            overrides.insert(config::SHIFT_DOWN_KEY, points.to_string());
        }
        if let Some(secs) = self.timeout {
            overrides.insert(config::TIMEOUT_KEY, secs.to_string());
        }
        overrides
    }
}

fn main() {
    // A missing .env is fine; everything can come from the real environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = execute(cli) {
        error!("{}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), RunError> {
    let config = Config::from_env_with_overrides(&cli.overrides()).map_err(RunError::Config)?;

    let client = HttpClient::new(config.timeout).map_err(RunError::Config)?;

    let summary = run(&config, &client)?;

    if !summary.failures.is_empty() {
        warn!(
            "{} of {} documents failed",
            summary.failures.len(),
            summary.attempted()
        );
        for failure in &summary.failures {
            warn!(url = %failure.url, stage = %failure.stage, "Failed: {}", failure.filename);
        }
    }

    Ok(())
}
