//! Request orchestration for document text extraction
//!
//! Composes the pipeline stages into the per-request flow:
//!
//! ```text
//! received ──▶ classified ──▶ rasterized ──▶ recognizing (page i of n) ──▶ aggregated
//! ```
//!
//! Each request runs the flow exactly once; any stage failure maps to one
//! [`ExtractError`] kind and produces no partial output. The only shared
//! state is the recognition engine handle, injected at construction and
//! immutable afterwards, which keeps the orchestrator testable with a
//! substitute engine.

mod aggregate;

use tracing::{debug, info};

pub use aggregate::aggregate;
use doc_extract_common::{Document, DocumentResult, ExtractError, PageImage, PageResult, RecognitionLine};
use doc_extract_ocr::TextRecognizer;
use doc_extract_rasterizer::{classify, rasterize_image, rasterize_pdf, DocumentClass, DEFAULT_RENDER_DPI};

/// Recognize one page through the engine
///
/// Lines keep the engine's detection order; an engine failure here fails
/// the whole document, there is no per-page retry.
///
/// # Errors
///
/// Returns [`ExtractError::Engine`] if the engine errors on the page.
pub fn recognize_page(
    page: &PageImage,
    engine: &dyn TextRecognizer,
) -> Result<PageResult, ExtractError> {
    let lines = engine.recognize(&page.pixels)?;
    Ok(PageResult {
        index: page.index,
        lines: lines
            .into_iter()
            .enumerate()
            .map(|(position, line)| RecognitionLine {
                page: page.index,
                position: position as u32,
                text: line.text,
            })
            .collect(),
    })
}

/// Drives one upload through classification, rasterization, recognition
/// and aggregation
pub struct Orchestrator {
    engine: Box<dyn TextRecognizer>,
    dpi: f32,
}

impl Orchestrator {
    /// Build an orchestrator around a shared engine handle
    #[must_use]
    pub fn new(engine: Box<dyn TextRecognizer>) -> Self {
        Self::with_dpi(engine, DEFAULT_RENDER_DPI)
    }

    /// Build an orchestrator with a custom PDF render resolution
    #[must_use]
    pub fn with_dpi(engine: Box<dyn TextRecognizer>, dpi: f32) -> Self {
        Self { engine, dpi }
    }

    /// Name of the recognition engine behind this orchestrator
    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Process one document end to end
    ///
    /// Blocking: rasterization and recognition are CPU/accelerator bound,
    /// so async callers drive this through a blocking task.
    ///
    /// # Errors
    ///
    /// Every failure mode maps to one [`ExtractError`] kind: rejected or
    /// unsupported content types fail before any rasterization work,
    /// decode failures and engine failures fail the whole document.
    pub fn process(&self, doc: Document) -> Result<DocumentResult, ExtractError> {
        let pages = match classify(&doc.content_type) {
            DocumentClass::Pdf => rasterize_pdf(&doc.bytes, self.dpi)?,
            DocumentClass::Image => rasterize_image(&doc.bytes)?,
            DocumentClass::Word => {
                return Err(ExtractError::UnsupportedFormat(doc.content_type.clone()))
            }
            DocumentClass::Rejected => {
                return Err(ExtractError::RejectedType(doc.content_type.clone()))
            }
        };

        info!("recognizing {} pages", pages.len());
        let mut results = Vec::with_capacity(pages.len());
        for page in &pages {
            debug!("page {}/{}", page.index, pages.len());
            results.push(recognize_page(page, self.engine.as_ref())?);
        }

        let filename = doc.filename.clone().unwrap_or_default();
        Ok(aggregate(&filename, &results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_extract_ocr::{OcrError, TextLine};
    use image::RgbImage;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Engine stub returning a fixed set of lines per call
    struct StubRecognizer {
        lines: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl StubRecognizer {
        fn new(lines: Vec<&'static str>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    lines,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl TextRecognizer for StubRecognizer {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextLine>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .lines
                .iter()
                .map(|text| TextLine {
                    text: (*text).to_string(),
                    confidence: 0.9,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    /// Engine stub that always fails
    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextLine>, OcrError> {
            Err(OcrError::Inference("model exploded".to_string()))
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn png_document(filename: &str) -> Document {
        let img = RgbImage::from_pixel(32, 32, image::Rgb([255, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        Document::new(buf.into_inner(), "image/png", Some(filename.to_string()))
    }

    #[test]
    fn test_process_single_image_has_one_page_marker() {
        let (stub, _) = StubRecognizer::new(vec!["hello", "world"]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let result = orchestrator.process(png_document("scan.png")).unwrap();
        assert_eq!(result.filename, "scan.png");
        assert_eq!(result.text, "\n--- Page 1 ---\nhello\nworld");
        assert_eq!(result.text.matches("--- Page ").count(), 1);
    }

    #[test]
    fn test_process_page_with_no_text_yields_empty_body() {
        let (stub, _) = StubRecognizer::new(vec![]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let result = orchestrator.process(png_document("blank.png")).unwrap();
        assert_eq!(result.text, "\n--- Page 1 ---\n");
    }

    #[test]
    fn test_process_rejected_type_skips_rasterization_and_engine() {
        let (stub, calls) = StubRecognizer::new(vec!["never"]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let doc = Document::new(b"plain text".to_vec(), "text/plain", None);
        let err = orchestrator.process(doc).err().unwrap();
        assert!(matches!(err, ExtractError::RejectedType(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_process_word_document_is_not_implemented() {
        let (stub, calls) = StubRecognizer::new(vec!["never"]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let doc = Document::new(b"doc bytes".to_vec(), "application/msword", None);
        let err = orchestrator.process(doc).err().unwrap();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_process_corrupt_image_is_decode_failure() {
        let (stub, calls) = StubRecognizer::new(vec!["never"]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let doc = Document::new(b"not a png".to_vec(), "image/png", None);
        let err = orchestrator.process(doc).err().unwrap();
        assert!(matches!(err, ExtractError::Decode(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_process_engine_failure_fails_whole_document() {
        let orchestrator = Orchestrator::new(Box::new(FailingRecognizer));
        let err = orchestrator.process(png_document("scan.png")).err().unwrap();
        assert!(matches!(err, ExtractError::Engine(_)));
    }

    #[test]
    fn test_process_missing_filename_yields_empty_filename() {
        let (stub, _) = StubRecognizer::new(vec!["text"]);
        let orchestrator = Orchestrator::new(Box::new(stub));
        let mut doc = png_document("x");
        doc.filename = None;
        let result = orchestrator.process(doc).unwrap();
        assert_eq!(result.filename, "");
    }

    #[test]
    fn test_recognize_page_positions_follow_detection_order() {
        let (stub, _) = StubRecognizer::new(vec!["first", "second", "third"]);
        let page = PageImage {
            index: 7,
            pixels: RgbImage::new(8, 8),
        };
        let result = recognize_page(&page, &stub).unwrap();
        assert_eq!(result.index, 7);
        let positions: Vec<u32> = result.lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(result.lines.iter().all(|l| l.page == 7));
    }

    #[test]
    fn test_three_page_aggregate_with_empty_middle_page() {
        // Aggregation contract for the multi-page case: rasterizing a PDF in
        // a unit test needs the pdfium library, so the page results are
        // built directly
        let (stub, _) = StubRecognizer::new(vec![]);
        let mut pages: Vec<PageResult> = (1..=3)
            .map(|index| {
                let image = PageImage {
                    index,
                    pixels: RgbImage::new(8, 8),
                };
                recognize_page(&image, &stub).unwrap()
            })
            .collect();
        pages[0].lines.push(RecognitionLine {
            page: 1,
            position: 0,
            text: "alpha".into(),
        });
        pages[2].lines.push(RecognitionLine {
            page: 3,
            position: 0,
            text: "omega".into(),
        });

        let result = aggregate("tri.pdf", &pages);
        assert_eq!(result.text.matches("--- Page ").count(), 3);
        assert!(result.text.contains("\n--- Page 1 ---\nalpha"));
        assert!(result.text.contains("\n--- Page 2 ---\n\n--- Page 3 ---\nomega"));
    }
}
