//! API response types

use doc_extract_common::Device;
use serde::{Deserialize, Serialize};

/// Status endpoint response
///
/// `device_used` reflects the device selected at startup; it never changes
/// while the process is serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Service status
    pub status: String,
    /// Recognition engine name
    pub engine: String,
    /// Inference device bound at startup
    pub device_used: Device,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind
    pub error: String,
    /// Short human-readable cause, never a stack trace
    pub message: String,
}
