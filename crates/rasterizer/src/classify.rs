//! Content-type classification
//!
//! Exact-match against a fixed allow-list. Anything that is not an exact
//! match is rejected before any decoding work happens, including near
//! misses like parameterized MIME strings.

/// PDF content type
pub const MIME_PDF: &str = "application/pdf";
/// Raster image content types (two accepted JPEG spellings)
pub const MIME_IMAGES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];
/// Word-document content types: recognized, deliberately not processed
pub const MIME_WORD: [&str; 2] = [
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Outcome of classifying a declared content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentClass {
    /// Multi-page PDF document
    Pdf,
    /// Single raster image
    Image,
    /// Word document: on the allow-list but answered with "not implemented"
    Word,
    /// Everything else: refused outright
    Rejected,
}

/// Classify a declared content type
#[must_use]
pub fn classify(content_type: &str) -> DocumentClass {
    if content_type == MIME_PDF {
        DocumentClass::Pdf
    } else if MIME_IMAGES.contains(&content_type) {
        DocumentClass::Image
    } else if MIME_WORD.contains(&content_type) {
        DocumentClass::Word
    } else {
        DocumentClass::Rejected
    }
}
