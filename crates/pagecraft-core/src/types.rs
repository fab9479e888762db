// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagecraft assembly engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PagecraftError;

/// MIME type of every artifact the assembly engine produces.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Unique identifier for a source document within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a page reference. Unique across the whole session,
/// never reused, and never derived from a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation state of an ingested source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Admitted past the size check; signature and structure not yet verified.
    Pending,
    /// Parsed successfully; its pages may be referenced.
    Valid,
    /// Failed the signature or structural check. Never produces page references.
    Invalid,
}

/// Whether a page reference's thumbnail has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Pending,
    Ready,
}

/// Lifecycle state of the single active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No output; editing allowed. Initial state and the state after a purge.
    Idle,
    /// The assembly engine is running; editing is disallowed.
    Processing,
    /// An operation result is available and the purge countdown is running.
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// The tool catalogue. Only `Merge` and `Organize` have a dedicated
/// algorithm; the rest run the passthrough placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Merge,
    Organize,
    Split,
    Compress,
    PdfToWord,
    PdfToJpg,
    JpgToPdf,
    Protect,
    Unlock,
}

impl ToolKind {
    /// Every tool in catalogue order.
    pub const ALL: [ToolKind; 9] = [
        Self::Merge,
        Self::Organize,
        Self::Split,
        Self::Compress,
        Self::PdfToWord,
        Self::PdfToJpg,
        Self::JpgToPdf,
        Self::Protect,
        Self::Unlock,
    ];

    /// Stable identifier, used in routes and output filenames.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Organize => "organize",
            Self::Split => "split",
            Self::Compress => "compress",
            Self::PdfToWord => "pdf-to-word",
            Self::PdfToJpg => "pdf-to-jpg",
            Self::JpgToPdf => "jpg-to-pdf",
            Self::Protect => "protect",
            Self::Unlock => "unlock",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Merge => "Merge PDF",
            Self::Organize => "Organize PDF",
            Self::Split => "Split PDF",
            Self::Compress => "Compress PDF",
            Self::PdfToWord => "PDF to Word",
            Self::PdfToJpg => "PDF to JPG",
            Self::JpgToPdf => "JPG to PDF",
            Self::Protect => "Protect PDF",
            Self::Unlock => "Unlock PDF",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Merge => "Combine multiple PDFs into one document.",
            Self::Organize => "Reorder, delete, and manage pages within your PDF.",
            Self::Split => "Extract specific pages or split into files.",
            Self::Compress => "Reduce PDF file size efficiently.",
            Self::PdfToWord => "Convert PDF to editable DOCX format.",
            Self::PdfToJpg => "Extract high-quality images from PDF.",
            Self::JpgToPdf => "Convert images into a single PDF.",
            Self::Protect => "Add password and strong encryption.",
            Self::Unlock => "Remove PDF password protection.",
        }
    }

    /// Parse a tool identifier such as `"merge"` or `"pdf-to-jpg"`.
    pub fn from_id(id: &str) -> Result<Self, PagecraftError> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.id().eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| PagecraftError::UnknownTool(id.to_string()))
    }

    /// Tools that decompose every ingested document into page references.
    pub fn is_page_level(&self) -> bool {
        matches!(self, Self::Organize)
    }

    /// Whether the assembly engine has a real algorithm for this tool.
    pub fn has_dedicated_algorithm(&self) -> bool {
        matches!(self, Self::Merge | Self::Organize)
    }

    /// Minimum number of valid documents before the tool may run.
    pub fn min_documents(&self) -> usize {
        match self {
            Self::Merge => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = PagecraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

/// A low-resolution JPEG preview of one page.
///
/// A zero-sized thumbnail with no bytes is the placeholder used when
/// rendering failed; the page itself remains usable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub jpeg: Vec<u8>,
}

impl Thumbnail {
    pub fn new(width: u32, height: u32, jpeg: Vec<u8>) -> Self {
        Self {
            width,
            height,
            jpeg,
        }
    }

    /// The empty preview shown when rendering failed.
    pub fn placeholder() -> Self {
        Self {
            width: 0,
            height: 0,
            jpeg: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.jpeg.is_empty()
    }
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

/// The single live output of a successful assembly run.
#[derive(Clone)]
pub struct OperationResult {
    pub tool: ToolKind,
    pub output: Vec<u8>,
    pub content_type: &'static str,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of `output`, lowercase hex.
    pub sha256: String,
}

impl OperationResult {
    pub fn new(tool: ToolKind, output: Vec<u8>, sha256: String) -> Self {
        Self {
            tool,
            output,
            content_type: PDF_CONTENT_TYPE,
            created_at: Utc::now(),
            sha256,
        }
    }

    /// Download filename: `<prefix>_<tool>_<unix millis>.pdf`.
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{}_{}_{}.pdf",
            prefix,
            self.tool.id(),
            self.created_at.timestamp_millis()
        )
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

impl std::fmt::Debug for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationResult")
            .field("tool", &self.tool)
            .field("output_bytes", &self.output.len())
            .field("content_type", &self.content_type)
            .field("created_at", &self.created_at)
            .field("sha256", &self.sha256)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tool_ids_round_trip_through_parser() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_id(tool.id()).unwrap(), tool);
        }
        assert_eq!("PDF-TO-JPG".parse::<ToolKind>().unwrap(), ToolKind::PdfToJpg);
    }

    #[test]
    fn unknown_tool_is_rejected() {
        match ToolKind::from_id("shred") {
            Err(PagecraftError::UnknownTool(id)) => assert_eq!(id, "shred"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn only_merge_and_organize_have_algorithms() {
        let dedicated: Vec<_> = ToolKind::ALL
            .into_iter()
            .filter(ToolKind::has_dedicated_algorithm)
            .collect();
        assert_eq!(dedicated, vec![ToolKind::Merge, ToolKind::Organize]);
        assert!(ToolKind::Organize.is_page_level());
        assert!(!ToolKind::Merge.is_page_level());
        assert_eq!(ToolKind::Merge.min_documents(), 2);
        assert_eq!(ToolKind::Compress.min_documents(), 1);
    }

    #[test]
    fn result_file_name_uses_tool_and_millis() {
        let mut result = OperationResult::new(ToolKind::Merge, vec![1, 2, 3], "ab".into());
        result.created_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            result.file_name("pagecraft"),
            "pagecraft_merge_1700000000123.pdf"
        );
        assert_eq!(result.content_type, PDF_CONTENT_TYPE);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn placeholder_thumbnail_is_detectable() {
        assert!(Thumbnail::placeholder().is_placeholder());
        assert!(!Thumbnail::new(2, 2, vec![0xFF, 0xD8]).is_placeholder());
    }
}
