//! PDF page counting

use lopdf::{Document, Object};
use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
///
/// This is more reliable than get_pages() for nested page trees whose
/// intermediate nodes are damaged, and it is what viewers report.
pub fn page_count(doc: &Document) -> Result<usize> {
    let catalog_id = doc.trailer.get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Root reference in trailer".to_string()))?;

    let catalog_dict = doc.get_dictionary(catalog_id)?;

    let pages_id = catalog_dict.get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Pages reference in catalog".to_string()))?;

    let pages_dict = doc.get_dictionary(pages_id)?;

    let count = pages_dict.get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Count is not a non-negative integer".to_string())),
    }
}
