//! Page transformation and letterhead compositing
//!
//! Each page of the source document is rebuilt as a new page dictionary whose
//! content is, in order:
//!
//! 1. `q /Letterhead Do Q` - the letterhead, drawn first so it sits behind
//! 2. `q <transform> cm` - the translation applied to the page's own content
//! 3. the page's original content streams
//! 4. `Q`
//!
//! The rebuilt pages keep their object ids so link annotations pointing at
//! them stay valid, and are gathered under a fresh page tree and catalog.
//! Catalog-level entries such as outlines are not carried over.

use std::fmt;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use super::letterhead::Letterhead;
use super::objects::{
    inherited_attribute, page_content_entries, resolve_dictionary, retain_reachable,
    INHERITABLE_KEYS,
};

/// Resource name the letterhead XObject is registered under, suffixed with a
/// counter if the page already uses it
const LETTERHEAD_RESOURCE: &str = "Letterhead";

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Transform {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Pure translation by `(tx, ty)`
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// Move content down by `points`
    ///
    /// PDF user space has its origin at the bottom left, so moving down is a
    /// negative y translation.
    pub fn shift_down(points: i32) -> Self {
        // 0.0 - x keeps a zero shift from printing as "-0"
        Self::translate(0.0, 0.0 - points as f32)
    }

    /// Check if this is (approximately) the identity matrix
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < 0.001 &&
        self.b.abs() < 0.001 &&
        self.c.abs() < 0.001 &&
        (self.d - 1.0).abs() < 0.001 &&
        self.e.abs() < 0.001 &&
        self.f.abs() < 0.001
    }
}

/// Formats as the six `cm` operands
impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {} {} {}", self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

/// Everything needed to rebuild one page, read from the source document
struct PagePlan {
    id: ObjectId,
    dict: Dictionary,
    resources: Dictionary,
    inherited: Vec<(&'static [u8], Object)>,
    contents: Vec<Object>,
}

/// Translate every page of `source` and composite `letterhead` behind it
///
/// The source document is consumed; the returned document holds one page per
/// source page, in the same order, and nothing unreachable from its catalog.
pub fn stamp_document(
    mut source: Document,
    letterhead: &Letterhead,
    transform: &Transform,
) -> Result<Document> {
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::EmptyPdf("source document".to_string()));
    }

    let plans: Vec<PagePlan> = page_ids
        .iter()
        .map(|&id| plan_page(&source, id))
        .collect::<Result<_>>()?;

    let mut output = Document::with_version("1.5");
    output.objects = std::mem::take(&mut source.objects);
    output.max_id = source.max_id;

    if let Ok(info) = source.trailer.get(b"Info") {
        output.trailer.set("Info", info.clone());
    }

    let letterhead_id = letterhead.embed(&mut output);
    let pages_id = output.new_object_id();

    let closing_id = output.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    for plan in plans {
        let name = unused_xobject_name(&output, &plan.resources);

        let opening = format!("q\n/{} Do\nQ\nq\n{} cm\n", name, transform);
        let opening_id = output.add_object(Stream::new(Dictionary::new(), opening.into_bytes()));

        let mut contents = Vec::with_capacity(plan.contents.len() + 2);
        contents.push(Object::Reference(opening_id));
        contents.extend(plan.contents);
        contents.push(Object::Reference(closing_id));

        let mut resources = plan.resources;
        let mut xobjects = resources
            .get(b"XObject")
            .map(|xo| resolve_dictionary(&output, xo))
            .unwrap_or_default();
        xobjects.set(name, Object::Reference(letterhead_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = plan.dict;
        for (key, value) in plan.inherited {
            page.set(key, value);
        }
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        page.set("Parent", Object::Reference(pages_id));

        output.objects.insert(plan.id, Object::Dictionary(page));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    output.objects.insert(pages_id, Object::Dictionary(pages_object));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = output.add_object(catalog);
    output.trailer.set("Root", Object::Reference(catalog_id));

    retain_reachable(&mut output);

    Ok(output)
}

fn plan_page(doc: &Document, id: ObjectId) -> Result<PagePlan> {
    let dict = doc.get_dictionary(id)?.clone();

    let resources = inherited_attribute(doc, id, b"Resources")
        .map(|res| resolve_dictionary(doc, &res))
        .unwrap_or_else(Dictionary::new);

    let inherited = INHERITABLE_KEYS
        .iter()
        .filter(|&&key| key != b"Resources" && !dict.has(key))
        .filter_map(|&key| inherited_attribute(doc, id, key).map(|value| (key, value)))
        .collect();

    let contents = page_content_entries(doc, &dict);

    Ok(PagePlan { id, dict, resources, inherited, contents })
}

/// First of `Letterhead`, `Letterhead1`, ... not already present in the
/// page's XObject resources
fn unused_xobject_name(doc: &Document, resources: &Dictionary) -> String {
    let existing = resources
        .get(b"XObject")
        .map(|xo| resolve_dictionary(doc, xo))
        .unwrap_or_default();

    let mut name = LETTERHEAD_RESOURCE.to_string();
    let mut counter = 1;
    while existing.has(name.as_bytes()) {
        name = format!("{}{}", LETTERHEAD_RESOURCE, counter);
        counter += 1;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    fn text_page_document(texts: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn letterhead() -> Letterhead {
        Letterhead::from_document(&text_page_document(&["LETTERHEAD"])).unwrap()
    }

    #[test]
    fn test_transform_display() {
        assert_eq!(Transform::shift_down(20).to_string(), "1 0 0 1 0 -20");
        assert_eq!(Transform::translate(1.5, 0.0).to_string(), "1 0 0 1 1.5 0");
    }

    #[test]
    fn test_transform_identity() {
        assert!(Transform::identity().is_identity());
        assert!(Transform::shift_down(0).is_identity());
        assert!(!Transform::shift_down(20).is_identity());
    }

    #[test]
    fn test_stamped_page_operator_order() {
        let source = text_page_document(&["hello"]);
        let output = stamp_document(source, &letterhead(), &Transform::shift_down(20)).unwrap();

        let pages = output.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();

        let content = Content::decode(&output.get_page_content(page_id).unwrap()).unwrap();
        let ops: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(&ops[..5], &["q", "Do", "Q", "q", "cm"]);
        assert_eq!(ops.last(), Some(&"Q"));

        let do_op = &content.operations[1];
        assert_eq!(do_op.operands[0].as_name().unwrap(), b"Letterhead");

        let cm = &content.operations[4];
        let operands: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(operands, vec![1.0, 0.0, 0.0, 1.0, 0.0, -20.0]);

        // Original text sits between the translation and the final restore
        let tj = ops.iter().position(|&op| op == "Tj").unwrap();
        assert!(tj > 4 && tj < ops.len() - 1);
    }

    #[test]
    fn test_inherited_attributes_copied_to_page() {
        let source = text_page_document(&["one", "two"]);
        let output = stamp_document(source, &letterhead(), &Transform::shift_down(20)).unwrap();

        for page_id in output.get_pages().values() {
            let page = output.get_dictionary(*page_id).unwrap();
            assert!(page.has(b"MediaBox"));

            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            assert!(resources.has(b"Font"));
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let lh_ref = xobjects.get(b"Letterhead").unwrap().as_reference().unwrap();
            let lh = output.get_object(lh_ref).unwrap().as_stream().unwrap();
            assert_eq!(lh.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        }
    }

    #[test]
    fn test_page_order_and_count_preserved() {
        let source = text_page_document(&["first", "second", "third"]);
        let output = stamp_document(source, &letterhead(), &Transform::shift_down(10)).unwrap();

        let texts: Vec<String> = output
            .get_pages()
            .values()
            .map(|&id| String::from_utf8_lossy(&output.get_page_content(id).unwrap()).into_owned())
            .collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("(first)"));
        assert!(texts[1].contains("(second)"));
        assert!(texts[2].contains("(third)"));
    }

    #[test]
    fn test_existing_letterhead_name_not_clobbered() {
        let mut source = text_page_document(&["page"]);
        let image_id = source.add_object(Object::Integer(0));
        let page_id = *source.get_pages().values().next().unwrap();
        let page = source.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
        page.set("Resources", dictionary! {
            "XObject" => dictionary! { "Letterhead" => image_id },
        });

        let output = stamp_document(source, &letterhead(), &Transform::shift_down(20)).unwrap();
        let page = output.get_dictionary(page_id).unwrap();
        let xobjects = page
            .get(b"Resources").unwrap().as_dict().unwrap()
            .get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.get(b"Letterhead").unwrap().as_reference().unwrap(), image_id);
        assert!(xobjects.has(b"Letterhead1"));
    }

    #[test]
    fn test_old_page_tree_is_dropped() {
        let source = text_page_document(&["only"]);
        let output = stamp_document(source, &letterhead(), &Transform::shift_down(20)).unwrap();

        let catalogs = output
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"Type").and_then(Object::as_name).ok() == Some(b"Catalog".as_slice()))
            .count();
        assert_eq!(catalogs, 1);
    }

    #[test]
    fn test_empty_document_rejected() {
        let result = stamp_document(
            Document::with_version("1.5"),
            &letterhead(),
            &Transform::shift_down(20),
        );
        assert!(matches!(result, Err(Error::EmptyPdf(_))));
    }

    #[test]
    fn test_indirect_contents_array_keeps_body() {
        let mut source = text_page_document(&["BODYTEXT"]);
        let page_id = *source.get_pages().values().next().unwrap();
        let stream_ref = source
            .get_dictionary(page_id).unwrap()
            .get(b"Contents").unwrap()
            .clone();
        let array_id = source.add_object(Object::Array(vec![stream_ref]));
        source
            .get_object_mut(page_id).unwrap()
            .as_dict_mut().unwrap()
            .set("Contents", Object::Reference(array_id));

        let output = stamp_document(source, &letterhead(), &Transform::shift_down(20)).unwrap();

        let page = output.get_dictionary(page_id).unwrap();
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);
        for entry in contents {
            let id = entry.as_reference().unwrap();
            assert!(output.get_object(id).unwrap().as_stream().is_ok());
        }

        let text = String::from_utf8_lossy(&output.get_page_content(page_id).unwrap()).into_owned();
        assert!(text.contains("(BODYTEXT)"));
    }
}
