// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page copying — move single pages, with every object they need to render
// (content streams, fonts, images, inherited resources), from a source
// document into a fresh output document.
//
// Object numbering in the output depends only on the order pages are copied,
// so identical inputs in identical order serialise to identical bytes.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pagecraft_core::error::{PagecraftError, Result};
use tracing::{debug, warn};

use super::reader::{INHERITABLE_ATTRIBUTES, PdfReader};

const OUTPUT_VERSION: &str = "1.7";
const PRODUCER: &str = "Pagecraft";

/// Copy bookkeeping for one source document.
///
/// Objects shared between pages of the same source (a font used on every
/// page, say) are copied once and referenced from each copied page.
pub struct SourceCopyState {
    /// Source object id to output object id.
    mapped: BTreeMap<ObjectId, ObjectId>,
    /// Every page of the source, so stray links to pages that are not part
    /// of the output can be cut instead of dragging those pages along.
    source_pages: BTreeSet<ObjectId>,
    /// Referenced objects whose output id is reserved but whose body is not
    /// copied yet. Drained before `append_page` returns.
    pending: Vec<(ObjectId, ObjectId)>,
}

impl SourceCopyState {
    pub fn new(source: &PdfReader) -> Self {
        Self {
            mapped: BTreeMap::new(),
            source_pages: source.page_id_set(),
            pending: Vec::new(),
        }
    }
}

/// An output document under construction.
pub struct OutputDocument {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut document = Document::with_version(OUTPUT_VERSION);
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append page `page_index` of `source` as the last output page.
    ///
    /// Inherited attributes are materialised on the copied page, because the
    /// source's intermediate page tree nodes are not carried over.
    pub fn append_page(
        &mut self,
        source: &PdfReader,
        page_index: usize,
        state: &mut SourceCopyState,
    ) -> Result<()> {
        let page_id = source.page_id(page_index)?;
        let page = source.page_dictionary(page_index)?;
        let doc = source.document();

        let target_id = self.document.new_object_id();
        state.mapped.insert(page_id, target_id);

        let mut copied = Dictionary::new();
        for (key, value) in page.iter() {
            // /Parent is patched below; following it would pull in the whole
            // source page tree.
            if key == b"Parent" {
                continue;
            }
            let value = self.copy_object(value, state);
            copied.set(key.clone(), value);
        }
        for key in INHERITABLE_ATTRIBUTES {
            if copied.has(key) {
                continue;
            }
            if let Some(value) = source.inherited_attribute(page_index, key) {
                let value = self.copy_object(value, state);
                copied.set(key.to_vec(), value);
            }
        }
        copied.set("Parent", Object::Reference(self.pages_id));

        self.document
            .objects
            .insert(target_id, Object::Dictionary(copied));
        let referenced = self.copy_pending(doc, state);
        self.kids.push(target_id);

        debug!(page_index, ?target_id, referenced, "page copied");
        Ok(())
    }

    /// Write the page tree, catalog, and info dictionary, then serialise.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.document.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.trailer.set("Info", info_id);

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            PagecraftError::Internal(format!("failed to serialise output PDF: {}", err))
        })?;
        Ok(output)
    }

    /// Copy every object queued by `map_reference`, queueing whatever those
    /// refer to in turn. Reference chains of any length are walked with the
    /// queue, never the call stack. Returns the number of objects copied.
    fn copy_pending(&mut self, source: &Document, state: &mut SourceCopyState) -> usize {
        let mut copied = 0;
        while let Some((id, target_id)) = state.pending.pop() {
            let object = match source.get_object(id) {
                Ok(object) => self.copy_object(object, state),
                Err(err) => {
                    warn!(?id, %err, "Cannot resolve reference, using Null");
                    Object::Null
                }
            };
            self.document.objects.insert(target_id, object);
            copied += 1;
        }
        copied
    }

    /// Copy one object, mapping every reference into the output. Referenced
    /// objects are only queued; direct nesting is as deep as the parser allowed.
    fn copy_object(&mut self, object: &Object, state: &mut SourceCopyState) -> Object {
        match object {
            Object::Reference(id) => match self.map_reference(*id, state) {
                Some(target_id) => Object::Reference(target_id),
                None => Object::Null,
            },
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict, state)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item, state))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(&stream.dict, state);
                // Content stays encoded; the copied /Filter still describes it.
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            // Booleans, numbers, strings, names, and null copy as-is.
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary, state: &mut SourceCopyState) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.copy_object(value, state);
            copied.set(key.clone(), value);
        }
        copied
    }

    /// Map a source reference to an output object id, reserving the id and
    /// queueing the target on first sight. Reserving first makes cycles
    /// terminate.
    ///
    /// Returns `None` for links to source pages that are not (yet) part of
    /// the output.
    fn map_reference(&mut self, id: ObjectId, state: &mut SourceCopyState) -> Option<ObjectId> {
        if let Some(target_id) = state.mapped.get(&id) {
            return Some(*target_id);
        }
        if state.source_pages.contains(&id) {
            return None;
        }

        let target_id = self.document.new_object_id();
        state.mapped.insert(id, target_id);
        state.pending.push((id, target_id));
        Some(target_id)
    }
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}
