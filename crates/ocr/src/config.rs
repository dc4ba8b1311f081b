//! Recognition engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default directory holding the PaddleOCR ONNX assets
pub const DEFAULT_MODEL_DIR: &str = "./models/ocr";

/// Configuration for the recognition engine
///
/// Defaults are the tuned values the service ships with; every field can be
/// overridden before engine construction but never afterwards. The engine
/// handle is immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recognition language code (e.g. "pl", "en")
    pub language: String,
    /// Rotate clearly vertical text regions before recognition
    pub use_angle_cls: bool,
    /// Detection binary-mask threshold
    pub det_db_thresh: f32,
    /// Detection box confidence threshold
    pub det_db_box_thresh: f32,
    /// Number of text regions recognized per inference batch
    pub rec_batch_num: usize,
    /// Accelerator memory budget in megabytes
    pub accelerator_mem_mb: usize,
    /// Enable CPU-specific graph optimizations
    ///
    /// Left off when the accelerator carries the inference work; only the
    /// CPU execution path benefits from them.
    pub cpu_math_kernels: bool,
    /// Directory holding `det_model.onnx`, `rec_model.onnx` and the
    /// character dictionary
    pub model_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: "pl".to_string(),
            use_angle_cls: true,
            det_db_thresh: 0.3,
            det_db_box_thresh: 0.5,
            rec_batch_num: 50,
            accelerator_mem_mb: 6000,
            cpu_math_kernels: false,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment overrides
    ///
    /// Recognized variables: `OCR_MODEL_DIR`, `OCR_LANGUAGE`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("OCR_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Ok(lang) = std::env::var("OCR_LANGUAGE") {
            config.language = lang;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.language, "pl");
        assert!(config.use_angle_cls);
        assert!((config.det_db_thresh - 0.3).abs() < f32::EPSILON);
        assert!((config.det_db_box_thresh - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.rec_batch_num, 50);
        assert_eq!(config.accelerator_mem_mb, 6000);
        assert!(!config.cpu_math_kernels);
        assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
    }

    #[test]
    fn test_engine_config_roundtrips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.language, config.language);
        assert_eq!(back.rec_batch_num, config.rec_batch_num);
    }
}
