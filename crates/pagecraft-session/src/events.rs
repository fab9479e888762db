// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session events, broadcast to every subscriber.

use pagecraft_core::{DocumentId, PageId, ToolKind};
use serde::Serialize;

/// Something observable happened to the session.
///
/// Hosts subscribe instead of owning session state; every event names the
/// entity it concerns by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    DocumentAdded {
        document: DocumentId,
        name: String,
        size_bytes: u64,
    },
    /// Refused by the size policy; never entered the document list.
    DocumentRejected {
        name: String,
        reason: String,
        category: &'static str,
    },
    /// In the list, but failed the signature or structure check.
    DocumentInvalid {
        document: DocumentId,
        name: String,
        reason: String,
        category: &'static str,
    },
    PagesIndexed {
        document: DocumentId,
        page_count: usize,
        /// Page references created for a page-level tool, in natural order.
        pages: Vec<PageId>,
    },
    PreviewReady {
        document: DocumentId,
        placeholder: bool,
    },
    ThumbnailReady {
        page: PageId,
        placeholder: bool,
    },
    PageRemoved {
        page: PageId,
    },
    PageMoved {
        page: PageId,
        position: usize,
    },
    DocumentRemoved {
        document: DocumentId,
        pages_removed: usize,
    },
    DocumentMoved {
        document: DocumentId,
        position: usize,
    },
    ProcessingStarted {
        tool: ToolKind,
    },
    Completed {
        tool: ToolKind,
        file_name: String,
        size_bytes: usize,
        sha256: String,
    },
    Failed {
        tool: ToolKind,
        reason: String,
        category: &'static str,
    },
    CountdownTick {
        remaining_secs: u32,
    },
    /// The countdown expired and every buffer was released.
    Purged,
    /// Explicit reset, or the implicit one before ingesting into a
    /// completed session.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_a_tag() {
        let json = serde_json::to_value(SessionEvent::CountdownTick { remaining_secs: 42 }).unwrap();
        assert_eq!(json["event"], "countdown_tick");
        assert_eq!(json["remaining_secs"], 42);

        let json = serde_json::to_value(SessionEvent::ProcessingStarted {
            tool: ToolKind::PdfToJpg,
        })
        .unwrap();
        assert_eq!(json["tool"], "pdf-to-jpg");
        assert_eq!(serde_json::to_value(SessionEvent::Purged).unwrap()["event"], "purged");
    }
}
