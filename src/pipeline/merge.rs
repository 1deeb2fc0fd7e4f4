//! Page merging: concatenate single-page artifacts into one PDF via lopdf.
//!
//! Each artifact's first page is deep-copied into an accumulating document:
//! the page dictionary and everything it references (content streams, fonts,
//! images, annotations) get fresh object ids in the target. Attributes a
//! page inherits from its source page tree (`MediaBox`, `Resources`, …) are
//! pinned onto the page before the copy, and the source tree itself is never
//! copied.
//!
//! lopdf is synchronous and the work is CPU-bound, so [`merge_to_bytes`]
//! runs inside `spawn_blocking`.

use crate::error::ExportError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Bound on page-tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Result of a completed merge, ready to be written to disk.
#[derive(Debug)]
pub struct MergedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Merge `artifacts` (in slide order) and serialise the result.
pub async fn merge_to_bytes(artifacts: Vec<PathBuf>) -> Result<MergedDocument, ExportError> {
    tokio::task::spawn_blocking(move || {
        let mut doc = merge_artifacts(&artifacts)?;
        let page_count = doc.get_pages().len();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Internal(format!("Failed to serialise merged PDF: {e}")))?;
        Ok(MergedDocument { bytes, page_count })
    })
    .await
    .map_err(|e| ExportError::Internal(format!("Merge task panicked: {}", e)))?
}

/// Open each artifact in order and append its first page.
pub fn merge_artifacts(artifacts: &[PathBuf]) -> Result<Document, ExportError> {
    let mut merger = PageMerger::new();
    for path in artifacts {
        let source = Document::load(path).map_err(|e| ExportError::MergeFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        merger.append_first_page(&source, path)?;
    }
    info!("Merged {} page artifacts", merger.page_count());
    Ok(merger.finish())
}

/// An output document under construction.
pub struct PageMerger {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PageMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PageMerger {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy the first page of `source` to the end of the output.
    ///
    /// `origin` is only used for error messages.
    pub fn append_first_page(&mut self, source: &Document, origin: &Path) -> Result<(), ExportError> {
        let merge_err = |detail: String| ExportError::MergeFailed {
            path: origin.to_path_buf(),
            detail,
        };

        let pages = source.get_pages();
        let page_id = match pages.values().next() {
            Some(id) => *id,
            None => return Err(merge_err("artifact contains no pages".into())),
        };
        if pages.len() > 1 {
            warn!(
                "{} holds {} pages; only the first is kept (slide content overflowed the page)",
                origin.display(),
                pages.len()
            );
        }

        let mut page = source
            .get_dictionary(page_id)
            .map_err(|e| merge_err(format!("page object unreadable: {e}")))?
            .clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(source, &page, key) {
                    page.set(key.to_vec(), value);
                }
            }
        }
        page.remove(b"Parent");

        // Annotations may point back at their page; map it before copying.
        let new_page_id = self.doc.new_object_id();
        let mut copier = ObjectCopier::new(source, &mut self.doc);
        copier.id_map.insert(page_id, new_page_id);
        let copied = copier
            .remap_references(Object::Dictionary(page))
            .map_err(|e| merge_err(e.to_string()))?;

        let mut page = match copied {
            Object::Dictionary(dict) => dict,
            _ => return Err(merge_err("page object is not a dictionary".into())),
        };
        page.set("Parent", Object::Reference(self.pages_id));
        self.doc.objects.insert(new_page_id, Object::Dictionary(page));
        self.kids.push(Object::Reference(new_page_id));

        debug!(
            "Appended page from {} as output page {}",
            origin.display(),
            self.kids.len()
        );
        Ok(())
    }

    /// Install the page tree and catalog and hand back the document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}

/// Width and height in points of every page, in page order.
pub fn page_sizes(doc: &Document) -> Vec<Option<(f64, f64)>> {
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).ok()?;
            let media_box = match page.get(b"MediaBox") {
                Ok(obj) => obj.clone(),
                Err(_) => inherited_attribute(doc, page, b"MediaBox")?,
            };
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(id).ok()?.clone(),
                other => other,
            };
            let coords: Vec<f64> = media_box
                .as_array()
                .ok()?
                .iter()
                .map(number)
                .collect::<Option<_>>()?;
            match coords.as_slice() {
                [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => None,
            }
        })
        .collect()
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look `key` up on the ancestors of `page`.
fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        if depth >= MAX_TREE_DEPTH {
            return None;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    None
}

/// Copies objects from one document into another, renumbering references.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    /// Deep-copy one object, returning its id in the target.
    ///
    /// The target id is reserved before recursing so reference cycles
    /// (`/P` on annotations, `/Parent` on outline items) terminate.
    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }

        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        // A dangling reference reads as null.
        let obj = match self.source.get_object(source_id) {
            Ok(obj) => obj.clone(),
            Err(_) => Object::Null,
        };
        let new_obj = self.remap_references(obj)?;
        self.target.objects.insert(new_id, new_obj);

        Ok(new_id)
    }

    fn remap_references(&mut self, obj: Object) -> Result<Object, lopdf::Error> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .into_iter()
                    .map(|o| self.remap_references(o))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(mut dict) => {
                self.remap_dictionary(&mut dict)?;
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(mut stream) => {
                self.remap_dictionary(&mut stream.dict)?;
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }

    fn remap_dictionary(&mut self, dict: &mut Dictionary) -> Result<(), lopdf::Error> {
        for (_, value) in dict.iter_mut() {
            let taken = std::mem::replace(value, Object::Null);
            *value = self.remap_references(taken)?;
        }
        Ok(())
    }
}
