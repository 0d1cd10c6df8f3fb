//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the screening core and external adapters.

mod asset_store;
mod predictor;
mod progress;
mod result_output;

pub use asset_store::AssetStore;
pub use predictor::{Classifier, ModelLoader, Segmenter};
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
