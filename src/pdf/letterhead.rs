//! Letterhead template loading and embedding
//!
//! The letterhead is the first page of a template PDF. It is decoded once per
//! run and then embedded into every output document as a Form XObject, which
//! each stamped page draws before its own content. Only the page's content
//! and resources are taken; its annotations are not copied.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;
use crate::error::{Error, Result};
use super::objects::{
    collect_reachable, inherited_attribute, renumber_dictionary, renumber_object_references,
    resolve_dictionary, resolve_rectangle,
};

/// US Letter, used when the template page declares no MediaBox
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A decoded letterhead page, independent of the document it was read from
#[derive(Debug, Clone)]
pub struct Letterhead {
    /// Decompressed content stream of the page
    content: Vec<u8>,
    /// Page resources, resolved to a direct dictionary
    resources: Dictionary,
    /// Page media box `[llx lly urx ury]`
    media_box: [f32; 4],
    /// Indirect objects reachable from `resources`, keyed by their original ids
    objects: BTreeMap<ObjectId, Object>,
}

impl Letterhead {
    /// Load the first page of the PDF at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)?;
        Self::from_document(&doc).map_err(|e| match e {
            Error::EmptyPdf(_) => Error::EmptyPdf(path.display().to_string()),
            other => other,
        })
    }

    /// Extract page index 0 of an already decoded document
    pub fn from_document(doc: &Document) -> Result<Self> {
        let page_id = *doc
            .get_pages()
            .values()
            .next()
            .ok_or_else(|| Error::EmptyPdf("letterhead".to_string()))?;

        let content = page_content(doc, page_id)?;

        let resources = inherited_attribute(doc, page_id, b"Resources")
            .map(|res| resolve_dictionary(doc, &res))
            .unwrap_or_else(Dictionary::new);

        let media_box = inherited_attribute(doc, page_id, b"MediaBox")
            .and_then(|mb| resolve_rectangle(doc, &mb))
            .unwrap_or(DEFAULT_MEDIA_BOX);

        let objects = collect_reachable(doc, &Object::Dictionary(resources.clone()));

        debug!(
            content_bytes = content.len(),
            objects = objects.len(),
            ?media_box,
            "Decoded letterhead page"
        );

        Ok(Self { content, resources, media_box, objects })
    }

    /// Media box of the letterhead page
    pub fn media_box(&self) -> [f32; 4] {
        self.media_box
    }

    /// Copy the letterhead into `doc` as a Form XObject and return its id
    ///
    /// Letterhead objects are renumbered above `doc.max_id` so they cannot
    /// collide with the target's own objects.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let id_offset = doc.max_id;

        let id_map: HashMap<ObjectId, ObjectId> = self
            .objects
            .keys()
            .map(|&old_id| (old_id, (old_id.0 + id_offset, old_id.1)))
            .collect();

        for (old_id, object) in &self.objects {
            doc.objects.insert(id_map[old_id], renumber_object_references(object, &id_map));
        }

        if let Some(highest) = id_map.values().map(|id| id.0).max() {
            doc.max_id = doc.max_id.max(highest);
        }

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
        xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        xobject_dict.set("FormType", Object::Integer(1));
        xobject_dict.set(
            "BBox",
            Object::Array(self.media_box.iter().map(|&v| Object::Real(v)).collect()),
        );
        xobject_dict.set("Matrix", Object::Array(vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
        ]));
        xobject_dict.set(
            "Resources",
            Object::Dictionary(renumber_dictionary(&self.resources, &id_map)),
        );

        doc.add_object(Stream::new(xobject_dict, self.content.clone()))
    }
}

/// Decompressed content of every stream of a page, separated by newlines
/// so tokens at stream boundaries stay apart
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();

    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(stream_id)?.as_stream()?;
        let data = match stream.decompressed_content() {
            Ok(data) => data,
            Err(_) => stream.content.clone(),
        };
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&data);
    }

    Ok(content)
}
