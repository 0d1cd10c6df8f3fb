//! ML inference backend using Candle.
//!
//! Provides model loading and inference for:
//! - `EyeSegmenter` (eye-region instance segmentation)
//! - `AnemiaClassifier` (anemia / normal classification)

mod backend;
mod classifier;
mod device;
mod loader;
mod segmenter;
mod utils;

pub use backend::CandleModelLoader;
pub use classifier::AnemiaClassifier;
pub use device::get_device;
pub use loader::load_safetensors;
pub use segmenter::EyeSegmenter;
pub use utils::{image_to_tensor, sigmoid, softmax};
