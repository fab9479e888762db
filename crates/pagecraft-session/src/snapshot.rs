// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-only, serialisable view of the session for host UIs.

use chrono::{DateTime, Utc};
use pagecraft_core::error::Result;
use pagecraft_core::{DocumentId, PageId, RenderState, SessionStatus, ToolKind, ValidationStatus};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub size_bytes: u64,
    pub status: ValidationStatus,
    pub page_count: Option<usize>,
    pub has_preview: bool,
    pub error: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: PageId,
    pub document: DocumentId,
    pub page_index: usize,
    pub render_state: RenderState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub file_name: String,
    pub content_type: &'static str,
    pub size_bytes: usize,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Everything a host needs to redraw, without the byte buffers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tool: ToolKind,
    pub status: SessionStatus,
    pub countdown_secs: u32,
    /// Documents in list (merge) order.
    pub documents: Vec<DocumentSummary>,
    /// Pages in output order; empty for document-level tools.
    pub pages: Vec<PageSummary>,
    pub page_model_version: u64,
    pub result: Option<ResultSummary>,
}

impl SessionSnapshot {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentSummary> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    /// True when nothing user-supplied or derived is held.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.pages.is_empty() && self.result.is_none()
    }
}
