//! Anemia classifier.
//!
//! A CNN over the letterboxed eye region that predicts anemia vs. normal.
//! Class order follows [`crate::EyeClass`]: index 0 is anemia, index 1 normal.

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use image::RgbImage;

use super::{image_to_tensor, softmax};
use crate::domain::ClassDistribution;

/// Square input size.
pub const INPUT_SIZE: usize = 224;

/// Number of output classes.
pub const NUM_CLASSES: usize = 2;

/// Anemia classifier model.
///
/// Architecture: 4 conv layers with max pooling, global average pooling,
/// then 2 FC layers.
/// Input: `(1, 3, 224, 224)` RGB in `[0, 1]`
/// Output: class logits of shape `(1, 2)`
pub struct AnemiaClassifier {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    conv4: Conv2d,
    fc1: Linear,
    fc2: Linear,
    device: Device,
}

impl AnemiaClassifier {
    /// Creates the model from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let padded = Conv2dConfig {
            padding: 1,
            ..Conv2dConfig::default()
        };

        // 224 -> 112 -> 56 -> 28 -> 14
        let conv1 = conv2d(3, 16, 3, padded, vb.pp("conv1")).context("conv1")?;
        let conv2 = conv2d(16, 32, 3, padded, vb.pp("conv2")).context("conv2")?;
        let conv3 = conv2d(32, 64, 3, padded, vb.pp("conv3")).context("conv3")?;
        let conv4 = conv2d(64, 128, 3, padded, vb.pp("conv4")).context("conv4")?;

        let fc1 = linear(128, 64, vb.pp("fc1")).context("fc1")?;
        let fc2 = linear(64, NUM_CLASSES, vb.pp("fc2")).context("fc2")?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            conv4,
            fc1,
            fc2,
            device,
        })
    }

    /// Returns class probabilities for an opaque RGB image.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn predict(&self, image: &RgbImage) -> Result<ClassDistribution> {
        let input = image_to_tensor(image, INPUT_SIZE, &self.device)?;
        let logits: Vec<f32> = self
            .forward(&input)
            .and_then(|t| t.squeeze(0)?.to_vec1())
            .context("Classification forward pass failed")?;
        Ok(ClassDistribution::new(softmax(&logits)))
    }
}

impl Module for AnemiaClassifier {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.conv1.forward(x)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv3.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv4.forward(&x)?.relu()?.max_pool2d(2)?;

        // Global average pool: (1, 128, 14, 14) -> (1, 128)
        let x = x.mean((2, 3))?;

        let x = self.fc1.forward(&x)?.relu()?;
        self.fc2.forward(&x)
    }
}
