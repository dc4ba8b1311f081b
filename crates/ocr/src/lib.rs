//! Text recognition engine for document pages
//!
//! Runs `PaddleOCR` PP-OCRv4 models through ONNX Runtime in two stages:
//!
//! 1. **Text Detection**: finds bounding boxes of text regions in the page
//! 2. **Text Recognition**: recognizes the text inside each region
//!
//! The engine handle is built once at process start on the device chosen by
//! [`device::select_device`] and shared read-only across all requests;
//! sessions are interior-locked, so invocation is a blocking call that
//! returns the recognized lines in detection order.
//!
//! Input images must be RGB channel order (see `doc-extract-common`).

pub mod config;
pub mod device;
mod detection;
mod recognition;

use image::RgbImage;
use ndarray::{s, Array4, Axis};
use ort::{
    execution_providers::{CPUExecutionProvider, CUDAExecutionProvider},
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use config::EngineConfig;
pub use device::select_device;
use detection::TextBox;
use doc_extract_common::{Device, ExtractError};
use recognition::REC_IMAGE_HEIGHT;

/// Model file names expected under the configured model directory
const DET_MODEL_FILE: &str = "det_model.onnx";
const REC_MODEL_FILE: &str = "rec_model.onnx";
const DICT_FILE: &str = "ppocr_keys.txt";

/// Engine errors
#[derive(Debug, Error)]
pub enum OcrError {
    /// Failed to load a model or its dictionary from disk
    #[error("Failed to load OCR model: {0}")]
    ModelLoad(String),

    /// Error during inference (forward pass)
    #[error("Failed to run OCR inference: {0}")]
    Inference(String),

    /// Image preprocessing failed
    #[error("Image preprocessing failed: {0}")]
    Preprocessing(String),
}

impl From<OcrError> for ExtractError {
    fn from(err: OcrError) -> Self {
        ExtractError::Engine(err.to_string())
    }
}

/// A recognized text line with its recognition confidence
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub confidence: f32,
}

/// The recognition seam between the pipeline and the engine
///
/// Implemented by [`OcrEngine`] in production; tests substitute stubs to
/// drive the pipeline without model files.
pub trait TextRecognizer: Send + Sync {
    /// Recognize all text lines on one page image, in detection order
    ///
    /// A page with no detectable text yields an empty vector, never an
    /// error.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextLine>, OcrError>;

    /// Engine name reported by the status endpoint
    fn name(&self) -> &'static str;
}

/// Recognition engine handle
///
/// Construction loads both ONNX sessions and the character dictionary, so
/// it is expensive and happens exactly once, before the service accepts
/// requests. The handle itself is immutable; sessions are locked per run.
pub struct OcrEngine {
    det: Mutex<Session>,
    rec: Mutex<Session>,
    dict: Vec<String>,
    config: EngineConfig,
}

impl OcrEngine {
    /// Build the engine on the given device
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::ModelLoad`] if the model files or dictionary are
    /// missing or fail to load. Callers treat this as fatal to startup.
    pub fn new(config: EngineConfig, device: Device) -> Result<Self, OcrError> {
        let det_path = config.model_dir.join(DET_MODEL_FILE);
        let rec_path = config.model_dir.join(REC_MODEL_FILE);
        let dict_path = config.model_dir.join(DICT_FILE);
        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "{} not found; set OCR_MODEL_DIR to the directory holding the PaddleOCR assets",
                    path.display()
                )));
            }
        }

        if device == Device::Cuda {
            debug!(
                "accelerator memory budget: {} MB",
                config.accelerator_mem_mb
            );
        }
        let det = build_session(&det_path, device, &config)?;
        let rec = build_session(&rec_path, device, &config)?;
        let dict = recognition::load_character_dict(&dict_path)?;
        debug!(
            "Recognition engine loaded: {} dictionary entries, device {device}",
            dict.len()
        );

        Ok(Self {
            det: Mutex::new(det),
            rec: Mutex::new(rec),
            dict,
            config,
        })
    }

    /// Detect text regions, in reading order
    fn detect(&self, image: &RgbImage) -> Result<Vec<TextBox>, OcrError> {
        let input = detection::preprocess(image)?;
        let output = {
            let input_ref: TensorRef<f32> = TensorRef::from_array_view(&input)
                .map_err(|e| OcrError::Inference(e.to_string()))?;
            let mut session = self.det.lock();
            let outputs = session
                .run(inputs![input_ref])
                .map_err(|e| OcrError::Inference(format!("detection inference failed: {e}")))?;
            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| OcrError::Inference(e.to_string()))?
                .into_owned()
                .into_dimensionality::<ndarray::Ix4>()
                .map_err(|e| OcrError::Inference(format!("unexpected detection output: {e}")))?
        };

        // Probability map is [1, 1, H, W]
        let map = output.index_axis(Axis(0), 0);
        let map = map.index_axis(Axis(0), 0);
        Ok(detection::extract_boxes(
            map,
            image.dimensions(),
            self.config.det_db_thresh,
            self.config.det_db_box_thresh,
        ))
    }

    /// Recognize the text inside each detected region
    fn recognize_regions(
        &self,
        image: &RgbImage,
        regions: &[TextBox],
    ) -> Result<Vec<TextLine>, OcrError> {
        let crops: Vec<RgbImage> = regions
            .iter()
            .map(|r| recognition::crop_region(image, r, self.config.use_angle_cls))
            .collect();
        let ratios: Vec<f32> = crops
            .iter()
            .map(|c| c.width() as f32 / c.height().max(1) as f32)
            .collect();

        // Batching regions of similar aspect ratio keeps padding small
        let mut order: Vec<usize> = (0..crops.len()).collect();
        order.sort_by(|&a, &b| ratios[a].total_cmp(&ratios[b]));

        let mut decoded = vec![(String::new(), 0.0f32); crops.len()];
        for chunk in order.chunks(self.config.rec_batch_num.max(1)) {
            let max_ratio = chunk.iter().map(|&i| ratios[i]).fold(1.0f32, f32::max);
            let target_w = ((REC_IMAGE_HEIGHT as f32) * max_ratio).ceil() as usize;

            let mut batch =
                Array4::<f32>::zeros((chunk.len(), 3, REC_IMAGE_HEIGHT, target_w.max(1)));
            for (row, &i) in chunk.iter().enumerate() {
                let norm = recognition::normalize_region(&crops[i], target_w.max(1));
                let width = norm.shape()[2];
                batch.slice_mut(s![row, .., .., ..width]).assign(&norm);
            }

            let output = {
                let batch_ref: TensorRef<f32> = TensorRef::from_array_view(&batch)
                    .map_err(|e| OcrError::Inference(e.to_string()))?;
                let mut session = self.rec.lock();
                let outputs = session.run(inputs![batch_ref]).map_err(|e| {
                    OcrError::Inference(format!("recognition inference failed: {e}"))
                })?;
                outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| OcrError::Inference(e.to_string()))?
                    .into_owned()
                    .into_dimensionality::<ndarray::Ix3>()
                    .map_err(|e| {
                        OcrError::Inference(format!("unexpected recognition output: {e}"))
                    })?
            };

            for (row, &i) in chunk.iter().enumerate() {
                let preds = output.index_axis(Axis(0), row);
                decoded[i] = recognition::ctc_decode(&self.dict, preds);
            }
        }

        Ok(decoded
            .into_iter()
            .map(|(text, confidence)| TextLine { text, confidence })
            .collect())
    }
}

impl TextRecognizer for OcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextLine>, OcrError> {
        let regions = self.detect(image)?;
        debug!("detected {} text regions", regions.len());
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        self.recognize_regions(image, &regions)
    }

    fn name(&self) -> &'static str {
        "PaddleOCR"
    }
}

/// Build one ONNX session for the selected device
fn build_session(path: &Path, device: Device, config: &EngineConfig) -> Result<Session, OcrError> {
    let builder = Session::builder().map_err(|e| OcrError::ModelLoad(e.to_string()))?;

    let builder = match device {
        Device::Cuda => builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?
            .with_memory_pattern(true)
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?
            .with_execution_providers([
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?,
        Device::Cpu => {
            // CPU-side graph tuning stays off unless explicitly requested;
            // the accelerator path never enables it
            let opt_level = if config.cpu_math_kernels {
                GraphOptimizationLevel::Level3
            } else {
                GraphOptimizationLevel::Level1
            };
            builder
                .with_optimization_level(opt_level)
                .map_err(|e| OcrError::ModelLoad(e.to_string()))?
                .with_intra_threads(cpu_threads())
                .map_err(|e| OcrError::ModelLoad(e.to_string()))?
        }
    };

    builder
        .commit_from_file(path)
        .map_err(|e| OcrError::ModelLoad(format!("{}: {e}", path.display())))
}

/// Intra-op thread count for CPU sessions
///
/// Overridable via `OCR_ONNX_THREADS`; defaults to the physical core count.
fn cpu_threads() -> usize {
    std::env::var("OCR_ONNX_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get() / 2)
                .unwrap_or(4)
                .clamp(1, 8)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_engine_requires_model_files() {
        let config = EngineConfig {
            model_dir: PathBuf::from("/nonexistent/models"),
            ..EngineConfig::default()
        };
        let err = OcrEngine::new(config, Device::Cpu).err().unwrap();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn test_engine_loads_when_models_present() {
        // Exercised only on machines with the PaddleOCR assets downloaded
        let config = EngineConfig::from_env();
        match OcrEngine::new(config, Device::Cpu) {
            Ok(engine) => {
                assert_eq!(engine.name(), "PaddleOCR");
                assert_eq!(engine.dict.first().map(String::as_str), Some("blank"));
                assert_eq!(engine.dict.last().map(String::as_str), Some(" "));
            }
            Err(e) => eprintln!("Skipping test (models unavailable): {e}"),
        }
    }

    #[test]
    fn test_cpu_threads_is_bounded() {
        let threads = cpu_threads();
        assert!(threads >= 1);
    }
}
