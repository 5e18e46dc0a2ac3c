//! PDF Letterhead Library
//!
//! Scrapes an index page for links to PDF documents, downloads each one and
//! stamps every page with a letterhead background. This library provides
//! functionality to:
//! - Load run configuration from the environment
//! - Discover and resolve PDF links on an HTML index page
//! - Decode a one-page letterhead template
//! - Shift page content down and composite the letterhead behind it
//! - Drive the whole batch, isolating per-document failures
//!
//! # Example
//!
//! ```no_run
//! use pdf_letterhead::{run, Config, HttpClient};
//!
//! let config = Config::from_env().expect("Invalid configuration");
//! let client = HttpClient::new(config.timeout).expect("Failed to build HTTP client");
//!
//! let summary = run(&config, &client).expect("Run aborted");
//! println!("{} written, {} failed", summary.written.len(), summary.failures.len());
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod pdf;
pub mod run;

// Re-export commonly used items
pub use config::Config;
pub use error::{DocumentError, Error, Result, RunError, Stage};
pub use fetch::{Fetch, HttpClient};
pub use index::PdfLink;
pub use run::{run, RunSummary};
