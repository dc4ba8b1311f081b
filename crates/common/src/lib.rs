/// Common types and errors for document text extraction
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-level extraction errors
///
/// Every failure after a request has been received maps to exactly one of
/// these kinds. The HTTP layer translates them into response codes; the
/// pipeline never returns partial text alongside an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Content type outside the allow-list; nothing was processed
    #[error("Content type not allowed: {0}")]
    RejectedType(String),

    /// Content type is recognized but deliberately not processed (DOC/DOCX)
    #[error("Format not implemented: {0}")]
    UnsupportedFormat(String),

    /// Corrupt or undecodable PDF/image payload
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// The recognition engine failed on some page
    #[error("Text recognition failed: {0}")]
    Engine(String),
}

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// An uploaded document, immutable once received
///
/// Created when a request arrives and dropped when the request completes;
/// nothing is persisted.
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw payload bytes
    pub bytes: Vec<u8>,
    /// Content type declared by the caller
    pub content_type: String,
    /// Original filename, if the caller provided one
    pub filename: Option<String>,
}

impl Document {
    #[must_use]
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            filename,
        }
    }
}

/// One rasterized page of a document
///
/// `pixels` is always RGB channel order. The recognition engine's
/// normalization constants assume RGB; feeding it another channel layout
/// does not fail, it silently degrades recognition quality, so the
/// conversion happens at rasterization time and nowhere else.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page index matching the source document's page order
    pub index: u32,
    /// RGB pixel data
    pub pixels: RgbImage,
}

/// A single recognized text line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionLine {
    /// Page the line was detected on (1-based)
    pub page: u32,
    /// Position within the page's detection order (0-based, never re-sorted)
    pub position: u32,
    /// Recognized text content
    pub text: String,
}

/// Recognized text of one page, lines in detection order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page index
    pub index: u32,
    /// Lines in the order the engine detected them
    pub lines: Vec<RecognitionLine>,
}

impl PageResult {
    /// Joined page text, one recognized line per output line
    ///
    /// A page with no detected lines yields an empty string, not an error.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Final extraction result for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Filename echoed back to the caller (empty if none was provided)
    pub filename: String,
    /// Aggregated text with page-boundary markers, ascending page order
    pub text: String,
}

/// Inference device the process is bound to
///
/// Selected once at startup, before the recognition engine is constructed,
/// and never changed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CUDA accelerator
    Cuda,
    /// General-purpose CPU fallback
    Cpu,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(page: u32, position: u32, text: &str) -> RecognitionLine {
        RecognitionLine {
            page,
            position,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_page_result_text_joins_lines_in_order() {
        let result = PageResult {
            index: 1,
            lines: vec![line(1, 0, "First line"), line(1, 1, "Second line")],
        };
        assert_eq!(result.text(), "First line\nSecond line");
    }

    #[test]
    fn test_page_result_text_empty_page() {
        let result = PageResult {
            index: 2,
            lines: vec![],
        };
        assert_eq!(result.text(), "");
    }

    #[test]
    fn test_document_result_serialization() {
        let result = DocumentResult {
            filename: "scan.pdf".to_string(),
            text: "\n--- Page 1 ---\nhello".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"filename\":\"scan.pdf\""));
        let back: DocumentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cuda.to_string(), "cuda");
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_device_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Device::Cuda).unwrap(), "\"cuda\"");
        assert_eq!(serde_json::to_string(&Device::Cpu).unwrap(), "\"cpu\"");
    }

    #[test]
    fn test_extract_error_messages() {
        assert_eq!(
            ExtractError::RejectedType("text/plain".into()).to_string(),
            "Content type not allowed: text/plain"
        );
        assert_eq!(
            ExtractError::UnsupportedFormat("application/msword".into()).to_string(),
            "Format not implemented: application/msword"
        );
        assert!(ExtractError::Decode("bad pdf".into())
            .to_string()
            .contains("bad pdf"));
    }
}
