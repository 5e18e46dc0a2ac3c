//! Discovery of PDF links on an index page

use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{info, warn};
use crate::error::{Error, Result};
use crate::fetch::Fetch;

/// A PDF link found on the index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLink {
    /// The href exactly as written in the page
    pub href: String,
    /// The href resolved against the index URL
    pub url: Url,
    /// Last path segment of the href, used as the output filename
    pub filename: String,
}

/// Check whether an href points at a PDF (case-insensitive `.pdf` suffix)
///
/// The check is on the raw trailing characters, so `report.pdf#page=2` and
/// `report.pdf?v=1` do not qualify.
pub fn is_pdf_href(href: &str) -> bool {
    href.to_lowercase().ends_with(".pdf")
}

/// Output filename for an href: everything after its last `/`
pub fn href_basename(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

/// Collect PDF links from an HTML document, in document order
///
/// Duplicates are kept. Hrefs that cannot be resolved against `base` are
/// skipped with a warning.
pub fn extract_pdf_links(html: &str, base: &Url) -> Result<Vec<PdfLink>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]")
        .map_err(|e| Error::General(format!("Invalid selector: {}", e)))?;

    let mut links = Vec::new();

    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if !is_pdf_href(href) {
            continue;
        }

        match base.join(href) {
            Ok(url) => links.push(PdfLink {
                href: href.to_string(),
                url,
                filename: href_basename(href).to_string(),
            }),
            Err(e) => warn!(href, error = %e, "Skipping unresolvable link"),
        }
    }

    Ok(links)
}

/// Fetch the index page and return the PDF links it contains
pub fn scrape_index<F: Fetch + ?Sized>(fetcher: &F, index_url: &Url) -> Result<Vec<PdfLink>> {
    info!("Scanning {}...", index_url);

    let body = fetcher.fetch(index_url)?;
    let html = String::from_utf8_lossy(&body);

    extract_pdf_links(&html, index_url)
}
