//! Eye-region instance segmentation model.
//!
//! A small fully-convolutional network. The image is stretched to a square
//! input; each of `MAX_INSTANCES` output slots yields a mask logit map at 1/8
//! resolution and a confidence obtained by averaging a score map.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use image::DynamicImage;
use tracing::debug;

use super::{image_to_tensor, sigmoid};
use crate::domain::{Detection, ProbabilityMask};

/// Square input size.
pub const INPUT_SIZE: usize = 320;

/// Number of candidate instances the model emits.
pub const MAX_INSTANCES: usize = 4;

/// Side of each output mask (three 2x2 pools).
pub const MASK_SIZE: usize = INPUT_SIZE / 8;

/// Eye-region segmentation model.
///
/// Architecture: 4 conv layers (pooling after the first three) and two 1x1
/// heads for masks and scores.
/// Input: `(1, 3, 320, 320)` RGB in `[0, 1]`
/// Output: `MAX_INSTANCES` masks of 40x40 and their confidences
pub struct EyeSegmenter {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    conv4: Conv2d,
    mask_head: Conv2d,
    score_head: Conv2d,
    device: Device,
}

#[allow(clippy::needless_pass_by_value)]
fn conv3x3(in_channels: usize, out_channels: usize, vb: VarBuilder) -> Result<Conv2d> {
    let config = Conv2dConfig {
        padding: 1,
        ..Conv2dConfig::default()
    };
    Ok(conv2d(in_channels, out_channels, 3, config, vb)?)
}

impl EyeSegmenter {
    /// Creates the model from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();

        let conv1 = conv3x3(3, 16, vb.pp("conv1")).context("conv1")?;
        let conv2 = conv3x3(16, 32, vb.pp("conv2")).context("conv2")?;
        let conv3 = conv3x3(32, 64, vb.pp("conv3")).context("conv3")?;
        let conv4 = conv3x3(64, 64, vb.pp("conv4")).context("conv4")?;

        let mask_head = conv2d(64, MAX_INSTANCES, 1, Conv2dConfig::default(), vb.pp("mask_head"))
            .context("mask_head")?;
        let score_head = conv2d(64, MAX_INSTANCES, 1, Conv2dConfig::default(), vb.pp("score_head"))
            .context("score_head")?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            conv4,
            mask_head,
            score_head,
            device,
        })
    }

    /// Converts an image to the model input tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor creation fails.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Tensor> {
        image_to_tensor(&image.to_rgb8(), INPUT_SIZE, &self.device)
    }

    /// Runs the network, returning `(mask_logits, score_logits)` with shapes
    /// `(1, K, 40, 40)` and `(1, K)`.
    fn heads(&self, x: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let x = self.conv1.forward(x)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv3.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv4.forward(&x)?.relu()?;

        let masks = self.mask_head.forward(&x)?;
        let scores = self.score_head.forward(&x)?.flatten_from(2)?.mean(2)?;
        Ok((masks, scores))
    }

    /// Segments an image, keeping candidates scoring at least `min_confidence`
    /// in output-slot order.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn detect(&self, image: &DynamicImage, min_confidence: f32) -> Result<Vec<Detection>> {
        let input = self.preprocess(image)?;
        let (masks, scores) = self.heads(&input).context("Segmentation forward pass failed")?;

        let scores: Vec<f32> = scores.squeeze(0)?.to_vec1()?;
        let masks: Vec<Vec<Vec<f32>>> = masks.squeeze(0)?.to_vec3()?;

        let side = MASK_SIZE as u32;
        let detections: Vec<Detection> = scores
            .into_iter()
            .map(sigmoid)
            .zip(masks)
            .filter(|(score, _)| *score >= min_confidence)
            .map(|(score, rows)| {
                let mask = ProbabilityMask::from_fn(side, side, |x, y| {
                    image::Luma([sigmoid(rows[y as usize][x as usize])])
                });
                Detection::new(score, mask)
            })
            .collect();

        debug!("Segmenter kept {} of {MAX_INSTANCES} slots", detections.len());
        Ok(detections)
    }
}

impl Module for EyeSegmenter {
    /// Returns the mask logits.
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        self.heads(x).map(|(masks, _)| masks)
    }
}
