//! Device selection for inference.

use candle_core::Device;
use tracing::{debug, info};

/// Returns the device the screening models run on.
///
/// With `force_cpu` unset, a GPU is used when compiled in and available
/// (Metal, then CUDA); otherwise the CPU.
#[must_use]
pub fn get_device(force_cpu: bool) -> Device {
    if force_cpu {
        debug!("CPU inference requested");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Screening models on Metal");
            return device;
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Screening models on CUDA");
            return device;
        }
    }

    info!("Screening models on CPU");
    Device::Cpu
}
