use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    ExecutionProviderDispatch,
};

use crate::shared::device::Device;

/// Accelerator families the ONNX backend knows how to target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Cuda { device_id: i32 },
    CoreMl,
    DirectMl,
}

impl Backend {
    /// Maps a device identifier onto a backend.
    ///
    /// Recognized: `cuda`/`gpu` (optionally `:N`), `coreml`/`mps`, `directml`/`dml`.
    /// Anything else runs on CPU.
    pub fn for_device(device: &Device) -> Backend {
        let Device::Accelerator(id) = device else {
            return Backend::Cpu;
        };
        let id = id.to_ascii_lowercase();
        let (family, index) = match id.split_once(':') {
            Some((family, index)) => (family, Some(index)),
            None => (id.as_str(), None),
        };
        match family {
            "cuda" | "gpu" => {
                let device_id = index.and_then(|i| i.parse().ok()).unwrap_or(0);
                Backend::Cuda { device_id }
            }
            "coreml" | "mps" => Backend::CoreMl,
            "directml" | "dml" => Backend::DirectMl,
            _ => {
                log::warn!("Unrecognized device '{id}', running on CPU");
                Backend::Cpu
            }
        }
    }
}

/// Execution providers for a session on `device`, in priority order.
///
/// ONNX Runtime falls back to its CPU provider when the requested one is
/// unavailable at runtime.
pub fn execution_providers_for(device: &Device) -> Vec<ExecutionProviderDispatch> {
    match Backend::for_device(device) {
        Backend::Cpu => vec![],
        Backend::Cuda { device_id } => {
            vec![CUDAExecutionProvider::default().with_device_id(device_id).build()]
        }
        Backend::CoreMl => vec![CoreMLExecutionProvider::default().build()],
        Backend::DirectMl => vec![DirectMLExecutionProvider::default().build()],
    }
}

/// Opens an ONNX session for `model_path` on `device`.
pub fn build_session(
    model_path: &std::path::Path,
    device: &Device,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(execution_providers_for(device))?
        .commit_from_file(model_path)?;
    log::debug!("Loaded {} on {device}", model_path.display());
    Ok(session)
}
