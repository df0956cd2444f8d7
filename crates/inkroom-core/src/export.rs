//! PNG export of the whole board.
//!
//! Everything is painted into one transparent tiny-skia layer in stage order,
//! so eraser strokes (destination-out) only clear what was painted before
//! them. The layer is then composited over the background color.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::entity::{CompositeMode, Entity, Image, Rgba, Stroke, Text, TextAlign};
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::RgbaImage;
use kurbo::{Affine, BezPath, PathEl};
use thiserror::Error;
use tiny_skia::{
    BlendMode, Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder,
    Pixmap, PixmapPaint, Transform,
};

/// Horizontal shear used to fake italics with an upright font.
const ITALIC_SHEAR: f64 = 0.2;
/// Exports larger than this many pixels per side are refused.
const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No canvas surface to export")]
    NoSurface,
    #[error("Export of {0}x{1} pixels is too large")]
    TooLarge(u32, u32),
    #[error("Could not allocate a {0}x{1} pixmap")]
    Allocation(u32, u32),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Encoded export, ready to hand to the host as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Rasterize the document over the background color.
pub fn render(
    document: &Document,
    config: &EngineConfig,
    font: Option<&FontArc>,
) -> Result<RgbaImage, ExportError> {
    if !config.has_surface() {
        return Err(ExportError::NoSurface);
    }
    let ratio = config.export_pixel_ratio.max(f64::EPSILON);
    let width = (config.canvas_width * ratio).ceil() as u32;
    let height = (config.canvas_height * ratio).ceil() as u32;
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ExportError::TooLarge(width, height));
    }

    let mut layer = Layer::new(width, height, ratio)?;
    let mut skipped_text = 0usize;
    for entity in document.paint_order() {
        match entity {
            Entity::Stroke(stroke) => layer.draw_stroke(stroke, config.curve_tension),
            Entity::Circle(c) => {
                layer.draw_shape(&entity.to_path(), c.fill, c.border_color, c.border_width, LineJoin::Round)
            }
            Entity::Rectangle(r) => {
                layer.draw_shape(&entity.to_path(), r.fill, r.border_color, r.border_width, LineJoin::Miter)
            }
            Entity::Image(img) => layer.draw_image(img, entity.placement()),
            Entity::Text(text) => match font {
                Some(font) => layer.draw_text(text, entity.placement(), font),
                None => {
                    log::debug!("Skipping {} text {:?}", text.font_family.name(), text.content);
                    skipped_text += 1;
                }
            },
        }
    }
    if skipped_text > 0 {
        log::warn!("No font available; skipped {} text entities in export", skipped_text);
    }
    layer.flatten_onto(config.background)
}

/// Render and encode as PNG.
pub fn export_png(
    document: &Document,
    config: &EngineConfig,
    font: Option<&FontArc>,
) -> Result<Vec<u8>, ExportError> {
    let img = render(document, config, font)?;
    let png_data = encode_png(&img)?;
    log::info!(
        "PNG export complete: {}x{}, {} bytes",
        img.width(),
        img.height(),
        png_data.len()
    );
    Ok(png_data)
}

/// Encode RGBA pixels to PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, img.width(), img.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
    }
    Ok(png_data)
}

fn skia_color(color: Rgba) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn paint_for(color: Rgba, mode: CompositeMode) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    if mode == CompositeMode::Erase {
        paint.blend_mode = BlendMode::DestinationOut;
    }
    paint
}

/// The transparent drawing layer, in device pixels.
struct Layer {
    pixmap: Pixmap,
    ratio: f64,
    to_device: Transform,
}

impl Layer {
    fn new(width: u32, height: u32, ratio: f64) -> Result<Self, ExportError> {
        let pixmap = Pixmap::new(width, height).ok_or(ExportError::Allocation(width, height))?;
        Ok(Self {
            pixmap,
            ratio,
            to_device: Transform::from_scale(ratio as f32, ratio as f32),
        })
    }

    fn fill(&mut self, path: &BezPath, color: Rgba, mode: CompositeMode) {
        let Some(path) = skia_path(path) else {
            return;
        };
        let paint = paint_for(color, mode);
        self.pixmap.fill_path(&path, &paint, FillRule::Winding, self.to_device, None);
    }

    fn stroke_outline(&mut self, path: &BezPath, width: f64, join: LineJoin, color: Rgba, mode: CompositeMode) {
        // tiny-skia treats zero width as a hairline.
        if width <= 0.0 {
            return;
        }
        let Some(path) = skia_path(path) else {
            return;
        };
        let stroke = tiny_skia::Stroke {
            width: width as f32,
            line_cap: LineCap::Round,
            line_join: join,
            ..Default::default()
        };
        let paint = paint_for(color, mode);
        self.pixmap.stroke_path(&path, &paint, &stroke, self.to_device, None);
    }

    fn draw_stroke(&mut self, stroke: &Stroke, tension: f64) {
        match stroke.points.as_slice() {
            [] => {}
            [dot] => {
                let Some(path) = PathBuilder::from_circle(dot.x as f32, dot.y as f32, (stroke.width / 2.0) as f32)
                else {
                    return;
                };
                let paint = paint_for(stroke.color, stroke.mode);
                self.pixmap.fill_path(&path, &paint, FillRule::Winding, self.to_device, None);
            }
            _ => {
                let path = stroke.smoothed_path(tension);
                self.stroke_outline(&path, stroke.width, LineJoin::Round, stroke.color, stroke.mode);
            }
        }
    }

    fn draw_shape(&mut self, path: &BezPath, fill: Rgba, border: Rgba, border_width: f64, join: LineJoin) {
        self.fill(path, fill, CompositeMode::Normal);
        self.stroke_outline(path, border_width, join, border, CompositeMode::Normal);
    }

    /// Paint `source` through `source_to_canvas`.
    fn blit(&mut self, source: &Pixmap, source_to_canvas: Affine, quality: FilterQuality) {
        let paint = PixmapPaint {
            quality,
            ..PixmapPaint::default()
        };
        let transform = self.to_device.pre_concat(skia_transform(source_to_canvas));
        self.pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    fn draw_image(&mut self, img: &Image, placement: Affine) {
        let Some(pixels) = img.source.decode() else {
            return;
        };
        let (pw, ph) = pixels.dimensions();
        let Some(mut source) = Pixmap::new(pw, ph) else {
            return;
        };
        for (dst, p) in source.pixels_mut().iter_mut().zip(pixels.pixels()) {
            *dst = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
        }
        let fit = Affine::scale_non_uniform(img.width / pw as f64, img.height / ph as f64);
        self.blit(&source, placement * fit, FilterQuality::Nearest);
    }

    fn draw_text(&mut self, text: &Text, placement: Affine, font: &FontArc) {
        let mask = TextMask::render(text, font, self.ratio);
        let Some(source) = mask.to_pixmap(text.color) else {
            return;
        };
        let mut to_local = Affine::scale(1.0 / self.ratio);
        if text.italic {
            let shear = Affine::new([1.0, 0.0, -ITALIC_SHEAR, 1.0, ITALIC_SHEAR * mask.height as f64, 0.0]);
            to_local *= shear;
        }
        self.blit(&source, placement * to_local, FilterQuality::Bilinear);
    }

    /// Composite the drawing layer over an opaque background.
    fn flatten_onto(&self, background: Rgba) -> Result<RgbaImage, ExportError> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let mut canvas = Pixmap::new(width, height).ok_or(ExportError::Allocation(width, height))?;
        canvas.fill(skia_color(background));
        canvas.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        let mut out = RgbaImage::new(width, height);
        for (dst, src) in out.pixels_mut().zip(canvas.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(out)
    }
}

/// Glyph coverage of one text entity in local device pixels.
struct TextMask {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl TextMask {
    fn render(text: &Text, font: &FontArc, ratio: f64) -> Self {
        let (w, h) = text.measured_size();
        let width = (w * ratio).ceil().max(1.0) as u32;
        let height = (h * ratio).ceil().max(1.0) as u32;
        let mut mask = Self {
            width,
            height,
            coverage: vec![0.0; width as usize * height as usize],
        };

        let px = (text.font_size * ratio) as f32;
        let scale = PxScale::from(px);
        let scaled = font.as_scaled(scale);
        let bold_offset = if text.bold { (px / 24.0).max(1.0) } else { 0.0 };
        for (i, line) in text.content.split('\n').enumerate() {
            let (glyphs, line_width) = layout_line(font, scale, line);
            let slack = width as f32 - line_width;
            let offset = match text.align.unwrap_or_default() {
                TextAlign::Left => 0.0,
                TextAlign::Center => slack / 2.0,
                TextAlign::Right => slack,
            };
            let baseline = i as f32 * px + scaled.ascent();
            for (gid, x) in glyphs {
                mask.draw_glyph(font, gid.with_scale_and_position(scale, point(offset + x, baseline)));
                if bold_offset > 0.0 {
                    let shifted = point(offset + x + bold_offset, baseline);
                    mask.draw_glyph(font, gid.with_scale_and_position(scale, shifted));
                }
            }
            if text.underline {
                let thickness = (px / 16.0).max(1.0);
                let top = baseline + thickness;
                mask.fill_rect(offset, top, offset + line_width + bold_offset, top + thickness);
            }
        }
        mask
    }

    fn draw_glyph(&mut self, font: &FontArc, glyph: ab_glyph::Glyph) {
        let Some(outlined) = font.outline_glyph(glyph) else {
            return;
        };
        let bounds = outlined.px_bounds();
        let (ox, oy) = (bounds.min.x as i64, bounds.min.y as i64);
        outlined.draw(|gx, gy, c| {
            self.add(ox + gx as i64, oy + gy as i64, c);
        });
    }

    fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        for y in y0.floor() as i64..y1.ceil() as i64 {
            for x in x0.floor() as i64..x1.ceil() as i64 {
                self.add(x, y, 1.0);
            }
        }
    }

    fn add(&mut self, x: i64, y: i64, c: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let cell = &mut self.coverage[(y as u32 * self.width + x as u32) as usize];
        *cell = (*cell + c).min(1.0);
    }

    /// The mask as a pixmap of `color`, alpha scaled by coverage.
    fn to_pixmap(&self, color: Rgba) -> Option<Pixmap> {
        let mut pixmap = Pixmap::new(self.width, self.height)?;
        for (dst, &c) in pixmap.pixels_mut().iter_mut().zip(&self.coverage) {
            let alpha = (color.a as f32 * c).round() as u8;
            *dst = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
        }
        Some(pixmap)
    }
}

/// Glyph ids and pen positions for one line, plus its advance width.
fn layout_line(font: &FontArc, scale: PxScale, line: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(scale);
    let mut pen_x = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    let mut glyphs = Vec::with_capacity(line.len());
    for ch in line.chars() {
        let gid = font.glyph_id(ch);
        if let Some(prev) = prev {
            pen_x += scaled.kern(prev, gid);
        }
        glyphs.push((gid, pen_x));
        pen_x += scaled.h_advance(gid);
        prev = Some(gid);
    }
    (glyphs, pen_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use crate::entity::{Circle, ImageSource, Rectangle};
    use std::io::Cursor;

    fn config(w: f64, h: f64) -> EngineConfig {
        EngineConfig::default().with_canvas_size(w, h)
    }

    fn pixel(img: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
        img.get_pixel(x, y).0
    }

    fn line(from: Point, to: Point, color: Rgba, width: f64, mode: CompositeMode) -> Entity {
        let mut stroke = Stroke::starting_at(from, color, width, mode);
        stroke.add_point(to);
        Entity::Stroke(stroke)
    }

    #[test]
    fn test_no_surface() {
        let doc = Document::new();
        let result = render(&doc, &EngineConfig::default(), None);
        assert!(matches!(result, Err(ExportError::NoSurface)));
    }

    #[test]
    fn test_empty_board_is_white_at_pixel_ratio() {
        let img = render(&Document::new(), &config(40.0, 30.0), None).unwrap();
        assert_eq!(img.dimensions(), (80, 60));
        assert_eq!(pixel(&img, 0, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&img, 79, 59), [255, 255, 255, 255]);
    }

    #[test]
    fn test_rectangle_fill_and_border() {
        let mut doc = Document::new();
        doc.create(Entity::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 60.0, 60.0)));
        let img = render(&doc, &config(100.0, 100.0), None).unwrap();
        assert_eq!(pixel(&img, 80, 80), [135, 206, 235, 255]);
        // The 2-unit border is centered on the edge at x = 10.
        assert_eq!(pixel(&img, 20, 80), [0, 0, 128, 255]);
        assert_eq!(pixel(&img, 10, 80), [255, 255, 255, 255]);
    }

    #[test]
    fn test_pen_stroke_is_painted() {
        let mut doc = Document::new();
        doc.create(line(Point::new(10.0, 50.0), Point::new(90.0, 50.0), Rgba::BLACK, 4.0, CompositeMode::Normal));
        let img = render(&doc, &config(100.0, 100.0), None).unwrap();
        assert_eq!(pixel(&img, 100, 100), [0, 0, 0, 255]);
        assert_eq!(pixel(&img, 100, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn test_eraser_clears_earlier_strokes_only() {
        let mut doc = Document::new();
        doc.create(line(Point::new(10.0, 50.0), Point::new(90.0, 50.0), Rgba::BLACK, 4.0, CompositeMode::Normal));
        doc.create(Entity::Circle(Circle::new(Point::new(50.0, 20.0), 10.0)));
        doc.create(line(Point::new(50.0, 5.0), Point::new(50.0, 95.0), Rgba::WHITE, 9.0, CompositeMode::Erase));
        let img = render(&doc, &config(100.0, 100.0), None).unwrap();
        // Stroke pixel under the eraser is cleared back to the background.
        assert_eq!(pixel(&img, 100, 100), [255, 255, 255, 255]);
        // Stroke pixel away from the eraser survives.
        assert_eq!(pixel(&img, 40, 100), [0, 0, 0, 255]);
        // Shapes sit on a higher layer than every stroke.
        assert_eq!(pixel(&img, 100, 40), [135, 206, 235, 255]);
    }

    #[test]
    fn test_single_point_stroke_is_a_dot() {
        let mut doc = Document::new();
        doc.create(Entity::Stroke(Stroke::starting_at(
            Point::new(20.0, 20.0),
            Rgba::BLACK,
            6.0,
            CompositeMode::Normal,
        )));
        let img = render(&doc, &config(40.0, 40.0), None).unwrap();
        assert_eq!(pixel(&img, 40, 40), [0, 0, 0, 255]);
    }

    #[test]
    fn test_image_is_scaled_into_place() {
        let red = RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        red.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let source = ImageSource::new(bytes.get_ref(), 2, 2);
        let mut doc = Document::new();
        doc.create(Entity::Image(Image::new(Point::new(10.0, 10.0), 20.0, 20.0, source)));
        let img = render(&doc, &config(50.0, 50.0), None).unwrap();
        assert_eq!(pixel(&img, 40, 40), [255, 0, 0, 255]);
        assert_eq!(pixel(&img, 70, 70), [255, 255, 255, 255]);
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let mut doc = Document::new();
        doc.create(Entity::Text(Text::new(Point::new(5.0, 5.0), "Hello")));
        let img = render(&doc, &config(100.0, 50.0), None).unwrap();
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_png_encoding() {
        let mut doc = Document::new();
        doc.create(Entity::Circle(Circle::new(Point::new(10.0, 10.0), 5.0)));
        let bytes = export_png(&doc, &config(20.0, 20.0), None).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 40));
    }

    #[test]
    fn test_refuses_oversized_exports() {
        let huge = config(20_000.0, 10.0);
        assert!(matches!(
            render(&Document::new(), &huge, None),
            Err(ExportError::TooLarge(40_000, 20))
        ));
    }

    #[test]
    fn test_eraser_reveals_background_color() {
        let mut doc = Document::new();
        doc.create(line(Point::new(10.0, 50.0), Point::new(90.0, 50.0), Rgba::BLACK, 4.0, CompositeMode::Normal));
        doc.create(line(Point::new(50.0, 5.0), Point::new(50.0, 95.0), Rgba::BLACK, 9.0, CompositeMode::Erase));
        let mut cfg = config(100.0, 100.0);
        cfg.background = Rgba::rgb(10, 20, 30);
        let img = render(&doc, &cfg, None).unwrap();
        assert_eq!(pixel(&img, 100, 100), [10, 20, 30, 255]);
    }

    #[test]
    fn test_zero_border_draws_no_outline() {
        let mut doc = Document::new();
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 60.0, 60.0);
        rect.border_width = 0.0;
        doc.create(Entity::Rectangle(rect));
        let img = render(&doc, &config(100.0, 100.0), None).unwrap();
        assert_eq!(pixel(&img, 10, 80), [255, 255, 255, 255]);
        assert_eq!(pixel(&img, 30, 80), [135, 206, 235, 255]);
    }
}
