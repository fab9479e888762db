// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rendering — rasterise one page of an opened document into an image.
//
// The rasteriser is injected: `SketchRenderer` is the dependency-free default,
// `PdfiumRenderer` (feature "pdfium") gives full fidelity when the pdfium
// shared library is available. `ThumbnailRenderer` wraps either one and turns
// the raster into a bounded JPEG preview.

pub mod sketch;
pub mod thumbnail;

#[cfg(feature = "pdfium")]
pub mod pdfium;

use image::DynamicImage;
use pagecraft_core::error::{PagecraftError, Result};

use crate::pdf::reader::OpenedDocument;

/// Rasterises a single page.
///
/// Implementations are called from blocking threads, possibly several at
/// once for different documents, and must not mutate `source`.
pub trait PageRenderer: Send + Sync {
    /// Render page `page_index` (zero-based) at `scale` pixels per PDF point.
    fn render(&self, source: &OpenedDocument, page_index: usize, scale: f32) -> Result<DynamicImage>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Longest raster edge, in pixels, a renderer will allocate.
pub const MAX_RASTER_EDGE: u32 = 16_384;

/// Pixel size of a `width_pt` x `height_pt` page at `scale`, at least 1x1.
///
/// Degenerate boxes and rasters past [`MAX_RASTER_EDGE`] are refused before
/// anything is allocated.
pub(crate) fn scaled_size(page_index: usize, width_pt: f32, height_pt: f32, scale: f32) -> Result<(u32, u32)> {
    let width = width_pt * scale;
    let height = height_pt * scale;
    if !width.is_finite() || !height.is_finite() || width_pt <= 0.0 || height_pt <= 0.0 || scale <= 0.0 {
        return Err(PagecraftError::RenderFailure {
            page_index,
            detail: format!("unusable page size {}x{} pt at scale {}", width_pt, height_pt, scale),
        });
    }

    let (width, height) = (width.round().max(1.0), height.round().max(1.0));
    let limit = MAX_RASTER_EDGE as f32;
    if width > limit || height > limit {
        return Err(PagecraftError::RenderFailure {
            page_index,
            detail: format!("raster of {:.0}x{:.0} px exceeds the {} px limit", width, height, MAX_RASTER_EDGE),
        });
    }
    Ok((width as u32, height as u32))
}
