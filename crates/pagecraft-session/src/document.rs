// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source documents — the user-ordered list of files handed to the session.

use std::sync::Arc;

use pagecraft_core::error::{PagecraftError, Result};
use pagecraft_core::{DocumentId, Thumbnail, ValidationStatus};
use pagecraft_document::OpenedDocument;

/// One ingested file.
///
/// Only files that passed the size policy become a `SourceDocument`; the
/// signature and structure checks then move it to `Valid` or `Invalid`.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub name: String,
    pub size_bytes: u64,
    pub bytes: Arc<[u8]>,
    /// SHA-256 of `bytes`, lowercase hex.
    pub sha256: String,
    pub status: ValidationStatus,
    /// Parsed form; present exactly when `status` is `Valid`.
    pub opened: Option<Arc<OpenedDocument>>,
    /// Preview of the first page, once rendered.
    pub preview: Option<Thumbnail>,
    /// Why the document is `Invalid`.
    pub error: Option<String>,
}

impl SourceDocument {
    pub fn pending(name: impl Into<String>, size_bytes: u64, bytes: Arc<[u8]>, sha256: String) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            size_bytes,
            bytes,
            sha256,
            status: ValidationStatus::Pending,
            opened: None,
            preview: None,
            error: None,
        }
    }

    pub fn mark_valid(&mut self, opened: Arc<OpenedDocument>) {
        self.status = ValidationStatus::Valid;
        self.opened = Some(opened);
        self.error = None;
    }

    pub fn mark_invalid(&mut self, reason: impl Into<String>) {
        self.status = ValidationStatus::Invalid;
        self.opened = None;
        self.error = Some(reason.into());
    }

    pub fn page_count(&self) -> Option<usize> {
        self.opened.as_ref().map(|doc| doc.page_count())
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }
}

/// Ordered document list. Order is the merge order.
#[derive(Debug, Default)]
pub struct DocumentList {
    entries: Vec<SourceDocument>,
}

impl DocumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDocument> {
        self.entries.iter()
    }

    pub fn push(&mut self, document: SourceDocument) {
        self.entries.push(document);
    }

    /// Insert at `position` (0..=len).
    pub fn insert(&mut self, position: usize, document: SourceDocument) -> Result<()> {
        if position > self.entries.len() {
            return Err(PagecraftError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        self.entries.insert(position, document);
        Ok(())
    }

    pub fn get(&self, id: DocumentId) -> Option<&SourceDocument> {
        self.entries.iter().find(|doc| doc.id == id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut SourceDocument> {
        self.entries.iter_mut().find(|doc| doc.id == id)
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: DocumentId) -> Option<usize> {
        self.entries.iter().position(|doc| doc.id == id)
    }

    pub fn remove(&mut self, id: DocumentId) -> Result<SourceDocument> {
        let index = self.position(id).ok_or(PagecraftError::UnknownDocument(id))?;
        Ok(self.entries.remove(index))
    }

    /// Reposition a document so it ends up at `position` (0..len).
    pub fn move_to(&mut self, id: DocumentId, position: usize) -> Result<()> {
        let index = self.position(id).ok_or(PagecraftError::UnknownDocument(id))?;
        if position >= self.entries.len() {
            return Err(PagecraftError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        let document = self.entries.remove(index);
        self.entries.insert(position, document);
        Ok(())
    }

    /// The first document that is not yet `Valid`, if any.
    pub fn first_unready(&self) -> Option<&SourceDocument> {
        self.entries.iter().find(|doc| !doc.is_valid())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
