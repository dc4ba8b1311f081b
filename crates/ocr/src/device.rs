//! Inference device selection
//!
//! Runs once at process start, before the engine sessions are built. The
//! probe never fails the process: any problem binding the accelerator is
//! logged and the CPU is used instead, final for the process lifetime.

use doc_extract_common::Device;
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use tracing::{info, warn};

/// Select the inference device for this process
///
/// Tries the CUDA execution provider first and falls back to the CPU on any
/// failure. Always returns a usable device; there are no retries.
#[must_use]
pub fn select_device() -> Device {
    resolve_probe(
        CUDAExecutionProvider::default()
            .is_available()
            .map_err(|e| e.to_string()),
    )
}

fn resolve_probe(probe: std::result::Result<bool, String>) -> Device {
    match probe {
        Ok(true) => {
            info!("CUDA execution provider available, using accelerator");
            Device::Cuda
        }
        Ok(false) => {
            warn!("CUDA execution provider not available, falling back to CPU");
            Device::Cpu
        }
        Err(cause) => {
            warn!("CUDA availability probe failed ({cause}), falling back to CPU");
            Device::Cpu
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerator_available() {
        assert_eq!(resolve_probe(Ok(true)), Device::Cuda);
    }

    #[test]
    fn test_accelerator_missing_falls_back_to_cpu() {
        assert_eq!(resolve_probe(Ok(false)), Device::Cpu);
    }

    #[test]
    fn test_probe_error_falls_back_to_cpu() {
        // A broken driver must not abort startup
        assert_eq!(
            resolve_probe(Err("driver error".to_string())),
            Device::Cpu
        );
    }
}
