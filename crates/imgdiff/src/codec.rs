//! Image decoding behind the [`ImageCodec`] seam.

use std::path::Path;

use image::{ImageFormat, ImageReader};

use crate::error::{CapabilityError, DecodeError};
use crate::pixels::PixelArray;

/// Turns image files into pixel arrays.
///
/// `probe` is called once when a comparator is built; a failure there disables decoding for the
/// comparator's whole lifetime instead of being rediscovered per file.
pub trait ImageCodec: Send + Sync {
    fn probe(&self) -> Result<(), CapabilityError>;

    fn decode(&self, path: &Path) -> Result<PixelArray, DecodeError>;
}

/// Decoder backed by the `image` crate. The format is sniffed from file contents, so gold files
/// with a misleading extension still decode.
#[derive(Debug, Clone)]
pub struct ImageCrateCodec {
    required: Vec<ImageFormat>,
}

impl Default for ImageCrateCodec {
    fn default() -> Self {
        Self {
            required: vec![ImageFormat::Png],
        }
    }
}

impl ImageCrateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats whose readers must be compiled in for `probe` to succeed.
    pub fn with_required_formats(mut self, formats: impl IntoIterator<Item = ImageFormat>) -> Self {
        self.required = formats.into_iter().collect();
        self
    }
}

impl ImageCodec for ImageCrateCodec {
    fn probe(&self) -> Result<(), CapabilityError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|f| !f.reading_enabled())
            .map(|f| f.extensions_str().first().copied().unwrap_or("?"))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CapabilityError::new(format!(
                "image reader not built with support for: {}",
                missing.join(", ")
            )))
        }
    }

    fn decode(&self, path: &Path) -> Result<PixelArray, DecodeError> {
        let io_err = |source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?;
        let image = reader.decode().map_err(|e| DecodeError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(PixelArray::from_dynamic(image))
    }
}
