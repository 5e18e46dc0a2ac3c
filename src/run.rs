//! Batch driver: scrape the index, then stamp every linked PDF in turn

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use lopdf::Document;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::error::{DocumentError, Error, RunError, Stage};
use crate::fetch::Fetch;
use crate::index::{scrape_index, PdfLink};
use crate::pdf::{page_count, stamp_document, Letterhead, Transform};

/// Outcome of a completed run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files written, in processing order (repeats when basenames collide)
    pub written: Vec<PathBuf>,
    /// Documents that failed, in processing order
    pub failures: Vec<DocumentError>,
}

impl RunSummary {
    /// Number of links attempted
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failures.len()
    }
}

/// Run the whole batch
///
/// Fatal problems (output directory, letterhead, index page) abort before any
/// document is fetched. Per-document failures are logged and collected; the
/// run still completes.
pub fn run<F: Fetch + ?Sized>(config: &Config, fetcher: &F) -> Result<RunSummary, RunError> {
    fs::create_dir_all(&config.output_dir).map_err(|e| RunError::OutputDir {
        path: config.output_dir.clone(),
        source: e.into(),
    })?;

    let letterhead = Letterhead::load(&config.letterhead_path).map_err(|source| {
        RunError::Letterhead { path: config.letterhead_path.clone(), source }
    })?;
    info!("Loaded letterhead from: {}", config.letterhead_path.display());

    let links = scrape_index(fetcher, &config.index_url).map_err(|source| RunError::IndexFetch {
        url: config.index_url.to_string(),
        source,
    })?;
    info!("Found {} PDFs. Starting processing...", links.len());

    let transform = Transform::shift_down(config.shift_down);
    let mut summary = RunSummary::default();

    for link in &links {
        match process_document(link, fetcher, &letterhead, &transform, &config.output_dir) {
            Ok(path) => summary.written.push(path),
            Err(err) => {
                warn!("  -> {}", err);
                summary.failures.push(err);
            }
        }
    }

    info!(
        written = summary.written.len(),
        failed = summary.failures.len(),
        "All tasks completed."
    );

    Ok(summary)
}

/// Download, stamp and write a single document
///
/// The output file is only touched once the stamped document has been fully
/// encoded in memory.
pub fn process_document<F: Fetch + ?Sized>(
    link: &PdfLink,
    fetcher: &F,
    letterhead: &Letterhead,
    transform: &Transform,
    output_dir: &Path,
) -> Result<PathBuf, DocumentError> {
    info!("Processing: {}...", link.filename);

    let fail = |stage: Stage| {
        move |source: Error| DocumentError {
            filename: link.filename.clone(),
            url: link.url.to_string(),
            stage,
            source,
        }
    };

    let bytes = fetcher.fetch(&link.url).map_err(fail(Stage::Download))?;
    debug!(file = %link.filename, bytes = bytes.len(), "downloaded");

    let source = Document::load_mem(&bytes)
        .map_err(|e| fail(Stage::Decode)(e.into()))?;
    debug!(file = %link.filename, pages = source.get_pages().len(), "decoded");

    let mut stamped = stamp_document(source, letterhead, transform).map_err(fail(Stage::Stamp))?;
    debug!(
        file = %link.filename,
        pages = page_count(&stamped).unwrap_or_default(),
        "stamped"
    );

    stamped.compress();
    let mut buffer = Cursor::new(Vec::new());
    stamped
        .save_to(&mut buffer)
        .map_err(|e| fail(Stage::Write)(e.into()))?;

    let path = output_dir.join(&link.filename);
    fs::write(&path, buffer.into_inner()).map_err(|e| fail(Stage::Write)(e.into()))?;
    debug!(path = %path.display(), "written");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    struct FailingFetcher;

    impl Fetch for FailingFetcher {
        fn fetch(&self, url: &Url) -> crate::Result<Vec<u8>> {
            Err(Error::HttpStatus { url: url.to_string(), status: 404 })
        }
    }

    #[test]
    fn test_summary_attempted_counts_both_outcomes() {
        let mut summary = RunSummary::default();
        summary.written.push(PathBuf::from("a.pdf"));
        summary.failures.push(DocumentError {
            filename: "b.pdf".to_string(),
            url: "https://example.com/b.pdf".to_string(),
            stage: Stage::Decode,
            source: Error::General("bad".to_string()),
        });
        assert_eq!(summary.attempted(), 2);
    }

    #[test]
    fn test_process_document_reports_download_stage() {
        let link = PdfLink {
            href: "missing.pdf".to_string(),
            url: Url::parse("https://example.com/missing.pdf").unwrap(),
            filename: "missing.pdf".to_string(),
        };
        let letterhead = Letterhead::from_document(&single_page()).unwrap();
        let dir = tempfile::TempDir::new().unwrap();

        let err = process_document(
            &link,
            &FailingFetcher,
            &letterhead,
            &Transform::shift_down(20),
            dir.path(),
        )
        .unwrap_err();

        assert_eq!(err.stage, Stage::Download);
        assert_eq!(err.filename, "missing.pdf");
        assert!(!dir.path().join("missing.pdf").exists());
    }

    fn single_page() -> Document {
        use lopdf::{dictionary, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 100 100 l S".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }
}
