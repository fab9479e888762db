// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pdfium renderer — full-fidelity rasterisation through the pdfium shared
// library, bound at render time.

use std::path::PathBuf;

use image::DynamicImage;
use pagecraft_core::error::{PagecraftError, Result};
use pdfium_render::prelude::*;
use tracing::debug;

use super::{PageRenderer, scaled_size};
use crate::pdf::reader::OpenedDocument;

/// Renders pages with pdfium.
///
/// The library is bound on each call and released afterwards, so one
/// renderer can be shared across blocking threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    /// Directory holding the pdfium library; the system search path if unset.
    library_dir: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }

    fn bind(&self, page_index: usize) -> Result<Pdfium> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        };
        bindings.map(Pdfium::new).map_err(|err| PagecraftError::RenderFailure {
            page_index,
            detail: format!("pdfium library unavailable: {:?}", err),
        })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, source: &OpenedDocument, page_index: usize, scale: f32) -> Result<DynamicImage> {
        let failure = |detail: String| PagecraftError::RenderFailure { page_index, detail };

        let [x0, y0, x1, y1] = source.reader().media_box(page_index);
        scaled_size(page_index, x1 - x0, y1 - y0, scale)?;

        let pdfium = self.bind(page_index)?;
        let document = pdfium
            .load_pdf_from_byte_slice(source.bytes(), None)
            .map_err(|err| failure(format!("{:?}", err)))?;
        let index = u16::try_from(page_index)
            .map_err(|_| failure("page index beyond pdfium's range".into()))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|err| failure(format!("{:?}", err)))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| failure(format!("{:?}", err)))?;
        let image = bitmap.as_image();

        debug!(page_index, width = image.width(), height = image.height(), "pdfium render");
        Ok(image)
    }

    fn name(&self) -> &'static str {
        "pdfium"
    }
}
