//! Image import: validating picked files and placing them on the canvas.

use crate::entity::ImageSource;
use kurbo::{Point, Rect, Size};
use thiserror::Error;

/// A file handed over by the host's file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type reported by the picker, e.g. `image/png`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// A file that decoded as an image.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub source: ImageSource,
}

impl DecodedImage {
    /// Intrinsic size in pixels.
    pub fn size(&self) -> Size {
        Size::new(self.source.pixel_width as f64, self.source.pixel_height as f64)
    }
}

/// Import failures. The host surfaces these as a blocking alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid file {name}: {reason}")]
    InvalidFile { name: String, reason: String },
}

/// Check the MIME type and decode the file to learn its pixel size.
pub fn decode_file(file: &SelectedFile) -> Result<DecodedImage, ImportError> {
    if !file.mime.starts_with("image/") {
        return Err(ImportError::InvalidFile {
            name: file.name.clone(),
            reason: format!("not an image ({})", file.mime),
        });
    }
    let img = image::load_from_memory(&file.bytes).map_err(|e| ImportError::InvalidFile {
        name: file.name.clone(),
        reason: e.to_string(),
    })?;
    log::debug!("Decoded {} ({}x{})", file.name, img.width(), img.height());
    Ok(DecodedImage {
        source: ImageSource::new(&file.bytes, img.width(), img.height()),
    })
}

/// Centered, aspect-preserving placement for an image of `image` pixels.
///
/// The longer side is capped at `max_ratio` of the canvas's shorter side;
/// images already within the cap keep their intrinsic size.
pub fn fit_placement(canvas: Size, image: Size, max_ratio: f64) -> Rect {
    let limit = canvas.width.min(canvas.height) * max_ratio;
    let longest = image.width.max(image.height);
    let scale = if longest > limit && longest > 0.0 {
        limit / longest
    } else {
        1.0
    };
    let size = Size::new(image.width * scale, image.height * scale);
    let origin = Point::new(
        (canvas.width - size.width) / 2.0,
        (canvas.height - size.height) / 2.0,
    );
    Rect::from_origin_size(origin, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let file = SelectedFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = decode_file(&file).unwrap_err();
        assert_eq!(err.to_string(), "Invalid file notes.txt: not an image (text/plain)");
    }

    #[test]
    fn test_rejects_undecodable_bytes() {
        let file = SelectedFile::new("broken.png", "image/png", vec![1, 2, 3]);
        assert!(matches!(decode_file(&file), Err(ImportError::InvalidFile { .. })));
    }

    #[test]
    fn test_decodes_png() {
        let file = SelectedFile::new("dot.png", "image/png", png_bytes(4, 2));
        let decoded = decode_file(&file).unwrap();
        assert_eq!(decoded.size(), Size::new(4.0, 2.0));
        assert_eq!(decoded.source.bytes().unwrap(), file.bytes);
    }

    #[test]
    fn test_fit_caps_to_shorter_side() {
        let rect = fit_placement(Size::new(1000.0, 600.0), Size::new(1200.0, 600.0), 0.5);
        assert!((rect.width() - 300.0).abs() < 1e-9);
        assert!((rect.height() - 150.0).abs() < 1e-9);
        assert!((rect.center().x - 500.0).abs() < 1e-9);
        assert!((rect.center().y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_keeps_small_images() {
        let rect = fit_placement(Size::new(800.0, 600.0), Size::new(100.0, 50.0), 0.5);
        assert_eq!(rect, Rect::new(350.0, 275.0, 450.0, 325.0));
    }
}
