use std::{path::Path, sync::LazyLock};

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut},
    rect::Rect,
};
use crate::{
    config::AnnotationConfig,
    error::{Result, ShapeError},
    types::{BoundingRect, ClassifiedRegion, Contour, FrameDetections, ShapeLabel},
};

/// DejaVu Sans, see `assets/DejaVuSans-LICENSE.txt`
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

static DEFAULT_FONT: LazyLock<Option<FontArc>> =
    LazyLock::new(|| FontArc::try_from_slice(BUNDLED_FONT).ok());

/// The caption font used when no font file is configured
pub fn default_font() -> Result<FontArc> {
    DEFAULT_FONT
        .clone()
        .ok_or_else(|| ShapeError::Font("bundled DejaVu Sans could not be parsed".to_string()))
}

/// Load a TrueType/OpenType font from disk
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|e| ShapeError::Font(format!("{}: {}", path.display(), e)))
}

/// Draws contour outlines and `Shape: <label>` captions onto frames.
#[derive(Debug, Clone)]
pub struct Annotator {
    pub outline_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    /// Caption offset from the bottom-right corner of the bounding box
    pub label_offset: [i32; 2],
    pub scale: PxScale,
    font: Option<FontArc>,
}

impl Annotator {
    /// Default colours with the bundled caption font
    pub fn new() -> Self {
        Self::from_parts(&AnnotationConfig::default(), DEFAULT_FONT.clone())
    }

    /// Build from config: `font_path` replaces the bundled font, `show_captions = false` drops captions
    pub fn from_config(config: &AnnotationConfig) -> Result<Self> {
        let font = match (config.show_captions, &config.font_path) {
            (false, _) => None,
            (true, Some(path)) => Some(load_font(path)?),
            (true, None) => Some(default_font()?),
        };
        Ok(Self::from_parts(config, font))
    }

    fn from_parts(config: &AnnotationConfig, font: Option<FontArc>) -> Self {
        Self {
            outline_color: Rgb(config.outline_color),
            label_color: Rgb(config.label_color),
            background_color: Rgb(config.background_color),
            label_offset: config.label_offset,
            scale: PxScale::from(config.font_scale),
            font,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Outlines only
    pub fn without_captions(mut self) -> Self {
        self.font = None;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Caption text for a label
    pub fn caption(label: ShapeLabel) -> String {
        format!("Shape: {}", label)
    }

    /// Pen position of the caption for a region
    pub fn label_origin(&self, rect: &BoundingRect) -> (i32, i32) {
        (rect.right() + self.label_offset[0], rect.bottom() + self.label_offset[1])
    }

    /// Background box of a region's caption: every pixel the text can touch.
    /// `None` without a font or for text with no visible glyphs.
    pub fn caption_box(&self, region: &ClassifiedRegion) -> Option<Rect> {
        let font = self.font.as_ref()?;
        let (x, y) = self.label_origin(&region.bounding_rect);
        let (min_x, min_y, max_x, max_y) = ink_bounds(font, self.scale, &Self::caption(region.label))?;
        Some(Rect::at(x + min_x, y + min_y).of_size((max_x - min_x) as u32, (max_y - min_y) as u32))
    }

    /// Return an annotated copy, leaving the input frame untouched
    pub fn annotate(&self, frame: &RgbImage, detections: &FrameDetections) -> RgbImage {
        let mut annotated = frame.clone();
        self.annotate_mut(&mut annotated, detections);
        annotated
    }

    /// Draw all outlines, then all captions, directly into `frame`
    pub fn annotate_mut(&self, frame: &mut RgbImage, detections: &FrameDetections) {
        for region in &detections.regions {
            self.draw_outline(frame, &region.contour);
        }
        for region in &detections.regions {
            self.draw_caption(frame, region);
        }
    }

    fn draw_outline(&self, frame: &mut RgbImage, contour: &Contour) {
        let (width, height) = frame.dimensions();
        for &[x, y] in &contour.points {
            if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                frame.put_pixel(x as u32, y as u32, self.outline_color);
            }
        }
    }

    fn draw_caption(&self, frame: &mut RgbImage, region: &ClassifiedRegion) {
        let Some(font) = &self.font else {
            return;
        };
        let Some(background) = self.caption_box(region) else {
            return;
        };

        let (x, y) = self.label_origin(&region.bounding_rect);
        draw_filled_rect_mut(frame, background, self.background_color);
        draw_text_mut(frame, self.label_color, x, y, self.scale, font, &Self::caption(region.label));
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Union of glyph pixel bounds relative to the pen position, laid out the
/// way `draw_text_mut` places glyphs (baseline at `ascent`, kerning applied
/// after the advance). Returns `(min_x, min_y, max_x, max_y)`, max exclusive.
fn ink_bounds(font: &impl Font, scale: PxScale, text: &str) -> Option<(i32, i32, i32, i32)> {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut last: Option<GlyphId> = None;
    let mut bounds: Option<(i32, i32, i32, i32)> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        let Some(outlined) = scaled.outline_glyph(glyph) else {
            continue;
        };
        if let Some(last) = last {
            caret += scaled.kern(id, last);
        }
        last = Some(id);

        let px = outlined.px_bounds();
        let (x0, y0) = (px.min.x.round() as i32, px.min.y.round() as i32);
        let (x1, y1) = (x0 + px.width().round() as i32, y0 + px.height().round() as i32);
        bounds = Some(match bounds {
            None => (x0, y0, x1, y1),
            Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
        });
    }

    bounds.filter(|&(x0, y0, x1, y1)| x1 > x0 && y1 > y0)
}
