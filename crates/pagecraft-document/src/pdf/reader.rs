// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — structural access to a validated document using the `lopdf`
// crate: page count, zero-based page lookup, and inherited page attributes.

use std::collections::BTreeSet;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use pagecraft_core::error::{PagecraftError, Result};
use tracing::{debug, instrument};

/// Page tree attributes a page may inherit from its ancestors.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when no MediaBox can be found anywhere in the tree.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Bound on /Parent chains and reference hops; real files stay far below it.
const MAX_TREE_DEPTH: usize = 64;

/// Parsed view of an existing PDF.
///
/// Wraps `lopdf::Document` and keeps the page tree flattened into natural
/// order so pages can be addressed by zero-based index.
#[derive(Debug)]
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in natural order.
    pages: Vec<ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Parse raw PDF bytes already in memory.
    ///
    /// Password-protected and page-less documents are refused: neither can be
    /// indexed or copied.
    #[instrument(skip_all, fields(file = %file, bytes_len = data.len()))]
    pub fn from_bytes(file: &str, data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| PagecraftError::CorruptDocument {
            file: file.to_string(),
            detail: err.to_string(),
        })?;
        Self::from_document(file, document)
    }

    /// Wrap an already-parsed document.
    pub fn from_document(file: &str, document: Document) -> Result<Self> {
        if document.is_encrypted() {
            return Err(PagecraftError::CorruptDocument {
                file: file.to_string(),
                detail: "document is password-protected".into(),
            });
        }

        // lopdf pages are keyed by 1-indexed page number, already in order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PagecraftError::CorruptDocument {
                file: file.to_string(),
                detail: "document has no pages".into(),
            });
        }

        debug!(pages = pages.len(), "PDF loaded");
        Ok(Self { document, pages })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the page at a zero-based index.
    pub fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        self.pages
            .get(page_index)
            .copied()
            .ok_or_else(|| PagecraftError::Internal(format!(
                "page index {} out of range (document has {} pages)",
                page_index,
                self.pages.len()
            )))
    }

    /// All page object ids, for recognising page references during copies.
    pub fn page_id_set(&self) -> BTreeSet<ObjectId> {
        self.pages.iter().copied().collect()
    }

    /// The page dictionary at a zero-based index.
    pub fn page_dictionary(&self, page_index: usize) -> Result<&Dictionary> {
        let page_id = self.page_id(page_index)?;
        self.document.get_dictionary(page_id).map_err(|err| {
            PagecraftError::Internal(format!("page object {:?} unreadable: {}", page_id, err))
        })
    }

    /// Look up `key` on the page, walking up the /Parent chain for
    /// inheritable attributes. References are resolved.
    pub fn inherited_attribute(&self, page_index: usize, key: &[u8]) -> Option<&Object> {
        let mut current = self.page_dictionary(page_index).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(self.resolve(value));
            }
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.document.get_dictionary(parent_id).ok()?;
        }
        None
    }

    /// Follow indirect references until a direct object is reached. A dangling
    /// reference resolves to itself.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..MAX_TREE_DEPTH {
            match current {
                Object::Reference(id) => match self.document.get_object(*id) {
                    Ok(target) => current = target,
                    Err(_) => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Effective MediaBox `[llx, lly, urx, ury]` of a page.
    pub fn media_box(&self, page_index: usize) -> [f32; 4] {
        let Some(Object::Array(values)) = self.inherited_attribute(page_index, b"MediaBox") else {
            return FALLBACK_MEDIA_BOX;
        };
        let numbers: Vec<f32> = values
            .iter()
            .filter_map(|value| self.resolve(value).as_float().ok())
            .collect();
        match numbers.as_slice() {
            [x0, y0, x1, y1] => [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)],
            _ => FALLBACK_MEDIA_BOX,
        }
    }

    /// Effective /Rotate of a page, normalised to 0, 90, 180, or 270.
    pub fn rotation(&self, page_index: usize) -> u32 {
        self.inherited_attribute(page_index, b"Rotate")
            .and_then(|value| value.as_i64().ok())
            .map(|degrees| (degrees.rem_euclid(360) / 90 * 90) as u32)
            .unwrap_or(0)
    }

    /// Effective /Resources dictionary of a page.
    pub fn resources(&self, page_index: usize) -> Option<&Dictionary> {
        self.inherited_attribute(page_index, b"Resources")
            .and_then(|value| value.as_dict().ok())
    }

    /// Decoded, concatenated content stream bytes of a page.
    pub fn page_content(&self, page_index: usize) -> Result<Vec<u8>> {
        let page_id = self.page_id(page_index)?;
        self.document.get_page_content(page_id).map_err(|err| PagecraftError::RenderFailure {
            page_index,
            detail: format!("content stream unreadable: {}", err),
        })
    }
}

/// A validated document opened for both structural access and rendering.
///
/// Keeps the original bytes next to the parsed form: renderers that bring
/// their own decoder work from the bytes, the assembly engine from the parse.
/// Shared read-only across tasks; nothing here is ever mutated.
pub struct OpenedDocument {
    name: String,
    bytes: Arc<[u8]>,
    reader: PdfReader,
}

impl OpenedDocument {
    /// Parse `bytes`. Blocking; run it off the async executor.
    pub fn open(name: impl Into<String>, bytes: Arc<[u8]>) -> Result<Self> {
        let name = name.into();
        let reader = PdfReader::from_bytes(&name, &bytes)?;
        Ok(Self {
            name,
            bytes,
            reader,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn reader(&self) -> &PdfReader {
        &self.reader
    }

    pub fn page_count(&self) -> usize {
        self.reader.page_count()
    }
}

impl std::fmt::Debug for OpenedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("pages", &self.reader.page_count())
            .finish()
    }
}
