// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagecraft.
//
// File-level errors (oversize, signature, corrupt) are isolated to one file of
// a batch. Operation-level errors (precondition, assembly failure) abort the
// whole operation. Render failures never leave the renderer: they degrade to a
// placeholder thumbnail and are only logged.

use thiserror::Error;

use crate::types::{DocumentId, PageId, SessionStatus};

/// Top-level error type for all Pagecraft operations.
#[derive(Debug, Error)]
pub enum PagecraftError {
    // -- Ingestion (per file, non-fatal to the batch) --
    #[error("\"{file}\" is {size_bytes} bytes, over the {limit_bytes} byte limit")]
    OversizedInput {
        file: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("\"{file}\" does not start with a PDF header")]
    InvalidSignature { file: String },

    #[error("\"{file}\" could not be read as a PDF: {detail}")]
    CorruptDocument { file: String, detail: String },

    // -- Assembly (per operation, atomic) --
    #[error("{operation} cannot start: {reason}")]
    AssemblyPrecondition { operation: String, reason: String },

    #[error("{operation} failed: {detail}")]
    AssemblyFailure { operation: String, detail: String },

    // -- Rendering (per page, logged only) --
    #[error("preview of page {} failed: {detail}", page_index + 1)]
    RenderFailure { page_index: usize, detail: String },

    // -- Session usage --
    #[error("session is {status}; edits are not accepted")]
    SessionBusy { status: SessionStatus },

    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("unknown page {0}")]
    UnknownPage(PageId),

    #[error("position {position} is out of range for {len} entries")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("unknown tool identifier: {0}")]
    UnknownTool(String),

    #[error("invalid session policy: {0}")]
    InvalidPolicy(String),

    #[error("internal error: {0}")]
    Internal(String),

    // -- Host I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PagecraftError {
    /// True for errors that concern a single input file and must not abort
    /// the rest of an ingestion batch.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Self::OversizedInput { .. } | Self::InvalidSignature { .. } | Self::CorruptDocument { .. }
        )
    }

    /// The file this error is about, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::OversizedInput { file, .. }
            | Self::InvalidSignature { file }
            | Self::CorruptDocument { file, .. } => Some(file),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagecraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_level_errors_name_their_file() {
        let err = PagecraftError::OversizedInput {
            file: "big.pdf".into(),
            size_bytes: 20,
            limit_bytes: 10,
        };
        assert!(err.is_file_level());
        assert_eq!(err.file(), Some("big.pdf"));
        assert!(err.to_string().contains("big.pdf"));
    }

    #[test]
    fn operation_errors_are_not_file_level() {
        let err = PagecraftError::AssemblyPrecondition {
            operation: "merge".into(),
            reason: "needs at least 2 documents".into(),
        };
        assert!(!err.is_file_level());
        assert_eq!(err.file(), None);
    }

    #[test]
    fn render_failure_reports_one_based_page() {
        let err = PagecraftError::RenderFailure {
            page_index: 0,
            detail: "boom".into(),
        };
        assert_eq!(err.to_string(), "preview of page 1 failed: boom");
    }
}
