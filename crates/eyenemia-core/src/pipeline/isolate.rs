//! Region isolation: the mask becomes the alpha channel.

use image::DynamicImage;

use crate::domain::{IsolatedRegion, SegmentationMask};
use crate::error::{PipelineError, PipelineStage};

/// Applies a binary mask as transparency.
///
/// The output has the source extent, RGB channels copied unchanged and
/// `alpha = 255` inside the mask, `0` outside. Any source layout (gray,
/// gray+alpha, 16-bit, float) is first brought to 8-bit RGB order.
///
/// # Errors
///
/// Returns a [`PipelineStage::Isolation`] error if the mask extent differs
/// from the image.
pub fn isolate_region(
    image: &DynamicImage,
    mask: &SegmentationMask,
) -> Result<IsolatedRegion, PipelineError> {
    let (width, height) = (image.width(), image.height());
    if mask.dimensions() != (width, height) {
        return Err(PipelineError::stage(
            PipelineStage::Isolation,
            format!(
                "applying {}x{} mask to {width}x{height} image",
                mask.width(),
                mask.height()
            ),
            "mask extent does not match image",
        ));
    }

    let mut region = image.to_rgba8();
    for (x, y, pixel) in region.enumerate_pixels_mut() {
        pixel.0[3] = if mask.contains(x, y) { 255 } else { 0 };
    }
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn left_half(width: u32, height: u32) -> SegmentationMask {
        SegmentationMask::from_fn(width, height, |x, _| x < width / 2)
    }

    #[test]
    fn test_alpha_matches_mask_exactly() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 6, |x, y| {
            Rgb([x as u8 * 10, y as u8 * 20, 7])
        }));
        let mask = left_half(8, 6);
        let region = isolate_region(&image, &mask).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(region.dimensions(), (8, 6));
        for (x, y, p) in region.enumerate_pixels() {
            let expected = if mask.contains(x, y) { 255 } else { 0 };
            assert_eq!(p.0[3], expected);
            assert_eq!(&p.0[..3], &[x as u8 * 10, y as u8 * 20, 7]);
        }
    }

    #[test]
    fn test_source_alpha_is_replaced() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 40])));
        let mask = SegmentationMask::from_fn(4, 4, |_, _| true);
        let region = isolate_region(&image, &mask).unwrap_or_else(|e| panic!("{e}"));
        assert!(region.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_gray_source_expands_to_rgb() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([90])));
        let mask = SegmentationMask::from_fn(3, 3, |_, _| true);
        let region = isolate_region(&image, &mask).unwrap_or_else(|e| panic!("{e}"));
        assert!(region.pixels().all(|p| p.0 == [90, 90, 90, 255]));
    }

    #[test]
    fn test_mismatched_mask_is_error() {
        let image = DynamicImage::new_rgb8(10, 10);
        let mask = SegmentationMask::from_fn(10, 9, |_, _| true);
        assert!(matches!(
            isolate_region(&image, &mask),
            Err(PipelineError::Stage {
                stage: PipelineStage::Isolation,
                ..
            })
        ));
    }
}
