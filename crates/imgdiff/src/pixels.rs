//! Decoded image samples as a flat `(height, width, channels)` array.

use std::fmt;

use image::DynamicImage;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of samples (not pixels) an array of this shape holds, or `None` if that count
    /// does not fit in `usize`.
    pub fn sample_count(&self) -> Option<usize> {
        self.height
            .checked_mul(self.width)?
            .checked_mul(self.channels)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

/// Sample storage in the decoder's native component type.
///
/// Values are widened to `f64` one at a time while comparing, so a decoded 8-bit image costs
/// one byte per sample rather than eight.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sample at `index` widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Self::U8(v) => v.get(index).map(|&s| f64::from(s)),
            Self::U16(v) => v.get(index).map(|&s| f64::from(s)),
            Self::F32(v) => v.get(index).map(|&s| f64::from(s)),
            Self::F64(v) => v.get(index).copied(),
        }
    }
}

impl From<Vec<u8>> for Samples {
    fn from(v: Vec<u8>) -> Self {
        Self::U8(v)
    }
}

impl From<Vec<u16>> for Samples {
    fn from(v: Vec<u16>) -> Self {
        Self::U16(v)
    }
}

impl From<Vec<f32>> for Samples {
    fn from(v: Vec<f32>) -> Self {
        Self::F32(v)
    }
}

impl From<Vec<f64>> for Samples {
    fn from(v: Vec<f64>) -> Self {
        Self::F64(v)
    }
}

/// Row-major, channel-interleaved samples in their native range.
///
/// 8-bit images keep values in `0..=255`, 16-bit in `0..=65535`, float images as stored. No
/// color-space conversion or normalization is applied, so two images only compare equal when
/// they were decoded from the same pixel format.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    shape: Shape,
    samples: Samples,
}

impl PixelArray {
    /// Returns `None` when the sample count does not match the shape, or the shape's sample
    /// count overflows.
    pub fn new(shape: Shape, samples: impl Into<Samples>) -> Option<Self> {
        let samples = samples.into();
        (shape.sample_count()? == samples.len()).then_some(Self { shape, samples })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (height, width) = (image.height() as usize, image.width() as usize);
        let channels = usize::from(image.color().channel_count());
        let samples = match image {
            DynamicImage::ImageLuma8(buf) => Samples::U8(buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => Samples::U8(buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => Samples::U8(buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => Samples::U8(buf.into_raw()),
            DynamicImage::ImageLuma16(buf) => Samples::U16(buf.into_raw()),
            DynamicImage::ImageLumaA16(buf) => Samples::U16(buf.into_raw()),
            DynamicImage::ImageRgb16(buf) => Samples::U16(buf.into_raw()),
            DynamicImage::ImageRgba16(buf) => Samples::U16(buf.into_raw()),
            DynamicImage::ImageRgb32F(buf) => Samples::F32(buf.into_raw()),
            DynamicImage::ImageRgba32F(buf) => Samples::F32(buf.into_raw()),
            // `DynamicImage` is non-exhaustive; anything new is compared as RGBA floats.
            other => Samples::F32(other.to_rgba32f().into_raw()),
        };
        let mut shape = Shape::new(height, width, channels);
        if shape.sample_count() != Some(samples.len()) {
            shape.channels = 4;
        }
        Self { shape, samples }
    }

    /// Counts samples where `|gold - self|` exceeds `zero_threshold`.
    ///
    /// Returns `None` when the shapes differ; callers report that separately and never get a
    /// partial subtraction.
    pub fn count_differing(&self, gold: &PixelArray, zero_threshold: f64) -> Option<usize> {
        if self.shape != gold.shape {
            return None;
        }
        let count = (0..self.samples.len())
            .filter(|&i| match (gold.samples.get(i), self.samples.get(i)) {
                (Some(g), Some(t)) => (g - t).abs() > zero_threshold,
                _ => false,
            })
            .count();
        Some(count)
    }

    /// Fraction of samples that differ by more than `zero_threshold`, in `[0, 1]`.
    ///
    /// An empty array has nothing that can differ and yields `0.0`.
    pub fn difference_fraction(&self, gold: &PixelArray, zero_threshold: f64) -> Option<f64> {
        let count = self.count_differing(gold, zero_threshold)?;
        let total = self.samples.len();
        if total == 0 {
            return Some(0.0);
        }
        Some(count as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gray(width: u32, height: u32, value: u8) -> PixelArray {
        PixelArray::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            width,
            height,
            Luma([value]),
        )))
    }

    #[test]
    fn shape_follows_height_width_channels_order() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])));
        let arr = PixelArray::from_dynamic(img);
        assert_eq!(arr.shape(), Shape::new(10, 20, 3));
        assert_eq!(arr.samples().len(), 600);
        assert_eq!(arr.samples().get(2), Some(3.0));
    }

    #[test]
    fn eight_bit_images_keep_byte_storage() {
        let arr = gray(4, 4, 9);
        assert!(matches!(arr.samples(), Samples::U8(v) if v.len() == 16));
    }

    #[test]
    fn sixteen_bit_samples_are_not_normalized() {
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(2, 2, Luma([4000u16])));
        let arr = PixelArray::from_dynamic(img);
        assert_eq!(arr.shape(), Shape::new(2, 2, 1));
        assert!(matches!(arr.samples(), Samples::U16(_)));
        assert!((0..4).all(|i| arr.samples().get(i) == Some(4000.0)));
    }

    #[test]
    fn subtraction_is_signed_before_absolute_value() {
        let test = gray(1, 2, 200);
        let gold = PixelArray::new(test.shape(), vec![10u8, 200]).unwrap();

        // 10 - 200 = -190; an unsigned wrap would give 66.
        assert_eq!(test.count_differing(&gold, 100.0), Some(1));
        assert_eq!(test.count_differing(&gold, 190.0), Some(0));
    }

    #[test]
    fn different_storage_types_compare_numerically() {
        let bytes = PixelArray::new(Shape::new(1, 3, 1), vec![1u8, 2, 3]).unwrap();
        let floats = PixelArray::new(Shape::new(1, 3, 1), vec![1.0f64, 2.5, 3.0]).unwrap();
        assert_eq!(bytes.count_differing(&floats, 0.0), Some(1));
        assert_eq!(bytes.count_differing(&floats, 0.5), Some(0));
    }

    #[test]
    fn mismatched_shapes_are_not_subtracted() {
        let a = gray(10, 10, 0);
        let b = gray(20, 10, 0);
        assert_eq!(a.count_differing(&b, 0.0), None);
        assert_eq!(a.difference_fraction(&b, 0.0), None);
    }

    #[test]
    fn empty_arrays_have_zero_difference() {
        let a = PixelArray::new(Shape::new(0, 0, 3), Vec::<u8>::new()).unwrap();
        assert_eq!(a.difference_fraction(&a.clone(), 0.0), Some(0.0));
    }

    #[test]
    fn new_rejects_sample_count_mismatch() {
        assert!(PixelArray::new(Shape::new(2, 2, 1), vec![0.0f64; 3]).is_none());
    }

    #[test]
    fn overflowing_shape_is_rejected_instead_of_wrapping() {
        let shape = Shape::new(usize::MAX, 2, 1);
        assert_eq!(shape.sample_count(), None);
        // usize::MAX * 2 wraps to usize::MAX - 1; two samples must not match that either.
        assert!(PixelArray::new(shape, vec![0u8; 2]).is_none());
        assert!(PixelArray::new(Shape::new(usize::MAX / 2 + 1, 2, 1), Vec::<u8>::new()).is_none());
    }
}
