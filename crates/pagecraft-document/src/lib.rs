// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagecraft-document — Binary document handling for the Pagecraft engine.
//
// Validates raw buffers (size policy, PDF signature), opens them for structural
// access (page count, page attributes), renders low-resolution page previews
// through an injected renderer, and assembles output documents by copying
// pages (merge, page-level recomposition, passthrough). Holds no session state.

pub mod integrity;
pub mod pdf;
pub mod render;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

// Re-export the primary structs so callers can use `pagecraft_document::PdfReader` etc.
pub use pdf::assemble::{AssemblyEngine, AssemblyRequest, PagePick};
pub use pdf::reader::{OpenedDocument, PdfReader};
pub use render::sketch::SketchRenderer;
pub use render::thumbnail::ThumbnailRenderer;
pub use render::PageRenderer;
pub use validate::DocumentValidator;

#[cfg(feature = "pdfium")]
pub use render::pdfium::PdfiumRenderer;
