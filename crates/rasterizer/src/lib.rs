//! Page rasterization for document text extraction
//!
//! Turns an uploaded document into an ordered sequence of page images:
//! PDFs are rendered page by page through pdfium at a fixed resolution,
//! raster images are decoded into a single-page sequence. Either way the
//! output is RGB pixel data, the channel order the recognition engine
//! expects.

pub mod classify;

use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::debug;

pub use classify::{classify, DocumentClass};
use doc_extract_common::{ExtractError, PageImage};

/// Default render resolution for PDF pages
///
/// A tuned default, not an invariant; higher values trade memory and time
/// for recognition quality.
pub const DEFAULT_RENDER_DPI: f32 = 300.0;

/// PDF user-space units per inch
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Rasterization errors
#[derive(Debug, Error)]
pub enum RasterError {
    /// PDF bytes could not be loaded (corrupt, encrypted, not a PDF)
    #[error("Failed to load PDF: {0}")]
    PdfLoad(String),

    /// A page failed to render
    #[error("Failed to render PDF page {page}: {cause}")]
    PdfRender { page: u32, cause: String },

    /// Image bytes could not be decoded
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),
}

impl From<RasterError> for ExtractError {
    fn from(err: RasterError) -> Self {
        ExtractError::Decode(err.to_string())
    }
}

/// Render every page of a PDF into an RGB image at the given resolution
///
/// Pages come back 1-indexed in document order. Memory use scales with
/// page count times resolution; callers needing a bound must impose their
/// own page-count limit.
///
/// # Errors
///
/// Returns [`RasterError`] if the pdfium library cannot be bound, the
/// bytes are not a loadable PDF, or any page fails to render. A decode
/// failure is never a silent empty result.
pub fn rasterize_pdf(bytes: &[u8], dpi: f32) -> Result<Vec<PageImage>, RasterError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| RasterError::PdfLoad(format!("{e:?}")))?;

    let scale = dpi / PDF_POINTS_PER_INCH;
    let page_count = document.pages().len();
    debug!("rendering {page_count} PDF pages at {dpi} dpi");

    let mut pages = Vec::with_capacity(page_count as usize);
    for (idx, page) in document.pages().iter().enumerate() {
        let index = idx as u32 + 1;
        let pixel_width = (page.width().value * scale) as i32;
        let pixel_height = (page.height().value * scale) as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(pixel_width)
                    .set_target_height(pixel_height)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| RasterError::PdfRender {
                page: index,
                cause: format!("{e:?}"),
            })?;

        pages.push(PageImage {
            index,
            pixels: bitmap.as_image().to_rgb8(),
        });
    }

    Ok(pages)
}

/// Decode a single raster image into a one-page sequence
///
/// # Errors
///
/// Returns [`RasterError::ImageDecode`] on corrupt or unsupported bytes.
pub fn rasterize_image(bytes: &[u8]) -> Result<Vec<PageImage>, RasterError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| RasterError::ImageDecode(e.to_string()))?;
    Ok(vec![PageImage {
        index: 1,
        pixels: decoded.to_rgb8(),
    }])
}

/// Bind the pdfium library, preferring a local build over the system one
fn bind_pdfium() -> Result<Pdfium, RasterError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| RasterError::PdfLoad(format!("failed to bind pdfium library: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}
