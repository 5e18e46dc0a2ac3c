//! Low-level object graph helpers shared by the letterhead and stamping code

use std::collections::{BTreeMap, BTreeSet, HashMap};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes that may be inherited from ancestor `Pages` nodes
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Renumber all object references in an object
pub(crate) fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => {
            Object::Reference(*id_map.get(old_id).unwrap_or(old_id))
        }
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => Object::Stream(lopdf::Stream {
            dict: renumber_dictionary(&stream.dict, id_map),
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: stream.start_position,
        }),
        _ => object.clone(),
    }
}

pub(crate) fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Collect every indirect object reachable from `root`, following references
/// transitively. Cycles are handled.
pub(crate) fn collect_reachable(doc: &Document, root: &Object) -> BTreeMap<ObjectId, Object> {
    let mut found = BTreeMap::new();
    let mut pending = Vec::new();
    push_references(root, &mut pending);

    while let Some(id) = pending.pop() {
        if found.contains_key(&id) {
            continue;
        }
        if let Ok(object) = doc.get_object(id) {
            push_references(object, &mut pending);
            found.insert(id, object.clone());
        }
    }

    found
}

fn push_references(object: &Object, pending: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => pending.push(*id),
        Object::Array(arr) => arr.iter().for_each(|o| push_references(o, pending)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| push_references(v, pending)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, v)| push_references(v, pending)),
        _ => {}
    }
}

/// Drop every object not reachable from the trailer
pub(crate) fn retain_reachable(doc: &mut Document) {
    let keep: BTreeSet<ObjectId> = collect_reachable(doc, &Object::Dictionary(doc.trailer.clone()))
        .into_keys()
        .collect();
    doc.objects.retain(|id, _| keep.contains(id));
}

/// Look up a page attribute, walking up the `Parent` chain when the page
/// itself does not carry it
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    let mut visited = BTreeSet::from([page_id]);

    loop {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        if !visited.insert(parent_id) {
            return None;
        }
        current = doc.get_dictionary(parent_id).ok()?;
    }
}

/// Resolve an object that should be a dictionary, following one level of
/// indirection. Anything else yields an empty dictionary.
pub(crate) fn resolve_dictionary(doc: &Document, object: &Object) -> Dictionary {
    match object {
        Object::Dictionary(dict) => dict.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    }
}

/// Resolve a numeric rectangle such as `MediaBox`
pub(crate) fn resolve_rectangle(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let array = match object {
        Object::Array(arr) => arr,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        _ => return None,
    };

    if array.len() != 4 {
        return None;
    }

    let mut rect = [0.0; 4];
    for (slot, value) in rect.iter_mut().zip(array) {
        *slot = value.as_float().ok()?;
    }
    Some(rect)
}

/// Content stream entries of a page as a list of objects
///
/// A single reference becomes a one-element list; a missing `Contents` an
/// empty one. A reference to an array object is replaced by the array's
/// elements.
pub(crate) fn page_content_entries(doc: &Document, page: &Dictionary) -> Vec<Object> {
    let entries = match page.get(b"Contents") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(other) => vec![other.clone()],
        Err(_) => return vec![],
    };

    entries
        .into_iter()
        .flat_map(|entry| match entry {
            Object::Reference(id) => match doc.get_object(id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![entry],
            },
            other => vec![other],
        })
        .collect()
}
