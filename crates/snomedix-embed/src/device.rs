//! Compute device selection.

use candle_core::Device;
use tracing::{debug, info};

/// Select the best available device, falling back to CPU.
pub fn select_device(use_gpu: bool) -> Device {
    if !use_gpu {
        return Device::Cpu;
    }
    debug!("GPU requested, probing accelerators");

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("CUDA device available");
                return device;
            }
            Err(e) => {
                debug!("CUDA not available: {}, falling back to CPU", e);
            }
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Metal device available");
                return device;
            }
            Err(e) => {
                debug!("Metal not available: {}, falling back to CPU", e);
            }
        }
    }

    info!("GPU requested but no accelerator compiled in, using CPU");
    Device::Cpu
}

/// Whether `device` is an accelerator.
pub fn is_gpu(device: &Device) -> bool {
    matches!(device, Device::Cuda(_) | Device::Metal(_))
}
