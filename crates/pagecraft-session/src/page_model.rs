// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page model — the ordered sequence of page references that becomes the
// output page order.
//
// Entries are addressed by `PageId` only, never by position, so late
// thumbnail completions can find (or fail to find) their target safely.

use std::collections::HashSet;

use pagecraft_core::error::{PagecraftError, Result};
use pagecraft_core::{DocumentId, PageId, RenderState, Thumbnail};
use tracing::debug;

/// One page of one source document, placed in the output order.
#[derive(Debug, Clone)]
pub struct PageReference {
    pub id: PageId,
    pub document_id: DocumentId,
    /// Zero-based, below the source document's page count.
    pub page_index: usize,
    pub thumbnail: Option<Thumbnail>,
    pub render_state: RenderState,
}

impl PageReference {
    /// A fresh reference with its thumbnail still pending.
    pub fn new(document_id: DocumentId, page_index: usize) -> Self {
        Self {
            id: PageId::new(),
            document_id,
            page_index,
            thumbnail: None,
            render_state: RenderState::Pending,
        }
    }

    /// One reference per page of a document, in natural order.
    pub fn for_document(document_id: DocumentId, page_count: usize) -> Vec<Self> {
        (0..page_count)
            .map(|page_index| Self::new(document_id, page_index))
            .collect()
    }
}

/// Ordered, versioned collection of page references.
///
/// Every successful mutation bumps `version`, so observers can tell whether
/// anything changed since they last looked.
#[derive(Debug, Default)]
pub struct PageModel {
    entries: Vec<PageReference>,
    version: u64,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageReference> {
        self.entries.iter()
    }

    /// Append references at the end, keeping their order.
    pub fn append(&mut self, refs: Vec<PageReference>) -> Result<()> {
        let len = self.entries.len();
        self.insert(len, refs)
    }

    /// Insert references so the first lands at `position` (0..=len).
    pub fn insert(&mut self, position: usize, refs: Vec<PageReference>) -> Result<()> {
        if position > self.entries.len() {
            return Err(PagecraftError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        let mut seen: HashSet<PageId> = self.entries.iter().map(|page| page.id).collect();
        if let Some(duplicate) = refs.iter().find(|page| !seen.insert(page.id)) {
            return Err(PagecraftError::Internal(format!(
                "page {} is already in the page model",
                duplicate.id
            )));
        }

        let count = refs.len();
        self.entries.splice(position..position, refs);
        self.version += 1;
        debug!(position, count, total = self.entries.len(), "pages inserted");
        Ok(())
    }

    /// Remove a single reference. Other entries keep their order.
    pub fn remove(&mut self, id: PageId) -> Result<PageReference> {
        let index = self.position(id).ok_or(PagecraftError::UnknownPage(id))?;
        self.version += 1;
        Ok(self.entries.remove(index))
    }

    /// Remove every reference into `document_id`, returning their ids.
    /// Remaining entries keep their relative order.
    pub fn remove_document(&mut self, document_id: DocumentId) -> Vec<PageId> {
        let mut removed = Vec::new();
        self.entries.retain(|page| {
            if page.document_id == document_id {
                removed.push(page.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.version += 1;
        }
        removed
    }

    /// Reposition `id` so it ends up at `position` (0..len).
    pub fn move_to(&mut self, id: PageId, position: usize) -> Result<()> {
        let index = self.position(id).ok_or(PagecraftError::UnknownPage(id))?;
        if position >= self.entries.len() {
            return Err(PagecraftError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        let page = self.entries.remove(index);
        self.entries.insert(position, page);
        self.version += 1;
        Ok(())
    }

    pub fn ordered_ids(&self) -> Vec<PageId> {
        self.entries.iter().map(|page| page.id).collect()
    }

    pub fn get(&self, id: PageId) -> Option<&PageReference> {
        self.entries.iter().find(|page| page.id == id)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: PageId) -> Option<usize> {
        self.entries.iter().position(|page| page.id == id)
    }

    /// The (source document, page index) a reference points at.
    pub fn resolve(&self, id: PageId) -> Option<(DocumentId, usize)> {
        self.get(id).map(|page| (page.document_id, page.page_index))
    }

    /// Attach a rendered thumbnail. Returns false, changing nothing, if the
    /// page is no longer in the model.
    pub fn set_thumbnail(&mut self, id: PageId, thumbnail: Thumbnail) -> bool {
        match self.entries.iter_mut().find(|page| page.id == id) {
            Some(page) => {
                page.thumbnail = Some(thumbnail);
                page.render_state = RenderState::Ready;
                self.version += 1;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.version += 1;
        }
    }
}
