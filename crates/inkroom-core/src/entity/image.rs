//! Raster image entity.

use super::{Drawable, EntityId, EntityPatch, new_entity_id};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Encoding of the stored image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    /// Anything else the decoder understood (gif, bmp, ...).
    Other,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            ImageFormat::Png
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            ImageFormat::WebP
        } else {
            ImageFormat::Other
        }
    }
}

/// The decoded pixel source an image entity refers to.
///
/// Bytes are kept encoded (base64) so the entity serializes onto the relay
/// as-is; pixels are decoded on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub format: ImageFormat,
    /// Intrinsic width in pixels.
    pub pixel_width: u32,
    /// Intrinsic height in pixels.
    pub pixel_height: u32,
    pub data_base64: String,
}

impl ImageSource {
    pub fn new(data: &[u8], pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            format: ImageFormat::from_magic_bytes(data),
            pixel_width,
            pixel_height,
            data_base64: STANDARD.encode(data),
        }
    }

    pub fn bytes(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Decode to RGBA pixels.
    pub fn decode(&self) -> Option<image::RgbaImage> {
        let bytes = self.bytes()?;
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                log::warn!("Failed to decode image source: {}", e);
                None
            }
        }
    }
}

/// A placed image. Rotation is in degrees around the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: EntityId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    pub source: ImageSource,
}

impl Image {
    pub fn new(position: Point, width: f64, height: f64, source: ImageSource) -> Self {
        Self {
            id: new_entity_id(),
            position,
            width,
            height,
            rotation: 0.0,
            source,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn apply(&mut self, patch: &EntityPatch) {
        if let Some(p) = patch.position {
            self.position = p;
        }
        if let Some(w) = patch.width {
            self.width = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(r) = patch.rotation {
            self.rotation = r;
        }
    }

    fn local_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn placement(&self) -> kurbo::Affine {
        kurbo::Affine::translate(self.position.to_vec2())
            * kurbo::Affine::rotate(self.rotation.to_radians())
    }
}

impl Drawable for Image {
    fn bounds(&self) -> Rect {
        (self.placement() * self.local_rect().to_path(0.1)).bounding_box()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.placement().inverse() * point;
        self.local_rect().inflate(tolerance, tolerance).contains(local)
    }

    fn to_path(&self) -> BezPath {
        self.placement() * self.local_rect().to_path(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ImageSource {
        ImageSource::new(&[0x89, 0x50, 0x4E, 0x47, 0, 0], 200, 100)
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::WebP);
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Other);
        assert_eq!(source().format, ImageFormat::Png);
    }

    #[test]
    fn test_source_bytes_round_trip() {
        let src = source();
        assert_eq!(src.bytes().unwrap(), vec![0x89, 0x50, 0x4E, 0x47, 0, 0]);
        // Truncated PNG header does not decode.
        assert!(src.decode().is_none());
    }

    #[test]
    fn test_rotated_hit_test() {
        let mut img = Image::new(Point::new(100.0, 100.0), 50.0, 10.0, source());
        assert!(img.hit_test(Point::new(140.0, 105.0), 0.0));
        img.rotation = 90.0;
        // Rotated about the top-left corner, the image now extends downward.
        assert!(!img.hit_test(Point::new(140.0, 105.0), 0.0));
        assert!(img.hit_test(Point::new(95.0, 140.0), 0.0));
        let b = img.bounds();
        assert!((b.y1 - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_rotation_patch() {
        let mut img = Image::new(Point::ZERO, 50.0, 10.0, source());
        img.apply(&EntityPatch {
            rotation: Some(45.0),
            ..EntityPatch::default()
        });
        assert!((img.rotation - 45.0).abs() < f64::EPSILON);
        assert!((img.width - 50.0).abs() < f64::EPSILON);
    }
}
