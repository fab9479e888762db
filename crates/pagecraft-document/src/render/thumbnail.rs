// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thumbnail renderer — bounded JPEG previews on top of any `PageRenderer`.

use std::sync::Arc;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use pagecraft_core::error::{PagecraftError, Result};
use pagecraft_core::{SessionPolicy, Thumbnail};
use tracing::{debug, instrument, warn};

use super::PageRenderer;
use crate::pdf::reader::OpenedDocument;

/// Produces one low-resolution preview per page.
///
/// Rendering problems never surface as errors from [`render_thumbnail`]:
/// the page gets a placeholder and a warning is logged, because a missing
/// preview must not stop the page from being used.
///
/// [`render_thumbnail`]: ThumbnailRenderer::render_thumbnail
#[derive(Clone)]
pub struct ThumbnailRenderer {
    renderer: Arc<dyn PageRenderer>,
    scale: f32,
    max_edge: u32,
    quality: u8,
}

impl ThumbnailRenderer {
    pub fn new(renderer: Arc<dyn PageRenderer>, policy: &SessionPolicy) -> Self {
        Self {
            renderer,
            scale: policy.thumbnail_scale,
            max_edge: policy.thumbnail_max_edge,
            quality: policy.thumbnail_jpeg_quality,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Render and encode, reporting failures.
    #[instrument(skip(self, source), fields(file = source.name(), renderer = self.renderer.name()))]
    pub fn try_render(&self, source: &OpenedDocument, page_index: usize) -> Result<Thumbnail> {
        let scale = self.effective_scale(source, page_index);
        let raster = self.renderer.render(source, page_index, scale)?;
        let raster = self.clamp(raster);
        let (width, height) = (raster.width(), raster.height());

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        DynamicImage::ImageRgb8(raster.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|err| PagecraftError::RenderFailure {
                page_index,
                detail: format!("JPEG encoding failed: {}", err),
            })?;

        debug!(page_index, width, height, jpeg_bytes = jpeg.len(), "thumbnail ready");
        Ok(Thumbnail::new(width, height, jpeg))
    }

    /// Render and encode, degrading to a placeholder on any failure.
    pub fn render_thumbnail(&self, source: &OpenedDocument, page_index: usize) -> Thumbnail {
        match self.try_render(source, page_index) {
            Ok(thumbnail) => thumbnail,
            Err(err) => {
                warn!(file = source.name(), page_index, %err, "preview failed, using placeholder");
                Thumbnail::placeholder()
            }
        }
    }

    /// The policy scale, lowered so the page's longest edge lands within
    /// `max_edge` before the renderer allocates anything.
    fn effective_scale(&self, source: &OpenedDocument, page_index: usize) -> f32 {
        let [x0, y0, x1, y1] = source.reader().media_box(page_index);
        let longest = (x1 - x0).max(y1 - y0);
        if !longest.is_finite() || longest <= 0.0 {
            return self.scale;
        }
        self.scale.min(self.max_edge as f32 / longest)
    }

    /// Shrink so the longest edge fits `max_edge`, keeping the aspect ratio.
    fn clamp(&self, raster: DynamicImage) -> DynamicImage {
        if raster.width().max(raster.height()) <= self.max_edge {
            return raster;
        }
        raster.thumbnail(self.max_edge, self.max_edge)
    }
}

impl std::fmt::Debug for ThumbnailRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailRenderer")
            .field("renderer", &self.renderer.name())
            .field("scale", &self.scale)
            .field("max_edge", &self.max_edge)
            .field("quality", &self.quality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::render::sketch::SketchRenderer;

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn render(&self, _: &OpenedDocument, page_index: usize, _: f32) -> Result<DynamicImage> {
            Err(PagecraftError::RenderFailure {
                page_index,
                detail: "always fails".into(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn letter_page() -> OpenedDocument {
        let bytes = fixtures::single_page_pdf([0, 0, 612, 792], 0, "0 g 0 0 612 100 re f");
        OpenedDocument::open("letter.pdf", Arc::from(bytes)).unwrap()
    }

    #[test]
    fn default_policy_yields_scaled_jpeg() {
        let renderer = ThumbnailRenderer::new(Arc::new(SketchRenderer), &SessionPolicy::default());
        let thumbnail = renderer.try_render(&letter_page(), 0).unwrap();

        assert_eq!((thumbnail.width, thumbnail.height), (184, 238));
        assert_eq!(&thumbnail.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn longest_edge_is_clamped() {
        let policy = SessionPolicy {
            thumbnail_scale: 2.0,
            thumbnail_max_edge: 100,
            ..SessionPolicy::default()
        };
        let renderer = ThumbnailRenderer::new(Arc::new(SketchRenderer), &policy);
        let thumbnail = renderer.try_render(&letter_page(), 0).unwrap();

        assert_eq!(thumbnail.height, 100);
        assert!(thumbnail.width < 100);
    }

    #[test]
    fn enormous_media_box_renders_within_the_edge_limit() {
        let policy = SessionPolicy::default();
        let renderer = ThumbnailRenderer::new(Arc::new(SketchRenderer), &policy);
        for edge in [1_000_000_000_i64, 100_000_000_000] {
            let bytes = fixtures::single_page_pdf([0, 0, edge, edge], 0, "0 g 0 0 10 10 re f");
            let doc = OpenedDocument::open("huge.pdf", Arc::from(bytes)).unwrap();

            let thumbnail = renderer.render_thumbnail(&doc, 0);
            assert!(!thumbnail.is_placeholder());
            assert!(thumbnail.width <= policy.thumbnail_max_edge);
            assert!(thumbnail.height <= policy.thumbnail_max_edge);
        }
    }

    #[test]
    fn failures_degrade_to_placeholder() {
        let renderer = ThumbnailRenderer::new(Arc::new(FailingRenderer), &SessionPolicy::default());
        let doc = letter_page();

        assert!(renderer.try_render(&doc, 0).is_err());
        assert!(renderer.render_thumbnail(&doc, 0).is_placeholder());
    }
}
