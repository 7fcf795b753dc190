//! Surface – the captured payslip as a scaled display list. This is the
//! frozen hand-off between capture and PDF encoding: every box is already
//! positioned in device pixels and every image is already loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A captured view, `scale` device pixels per CSS pixel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    /// Width in device pixels.
    pub width: f32,
    /// Height in device pixels.
    pub height: f32,
    pub scale: f32,
    pub background: [f32; 4],
    pub boxes: Vec<SurfaceBox>,
    /// Decoded images keyed by the `src` they were loaded from.
    #[serde(skip)]
    pub images: BTreeMap<String, EmbeddedImage>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceBox {
    /// Position relative to the surface's top-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<SurfaceBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
    /// Edges to stroke, in `[top, right, bottom, left]` order.
    pub sides: [bool; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    pub bold: bool,
    pub color: [f32; 4],
    /// Distance between consecutive baselines.
    pub line_height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the box (for alignment)
    pub x_offset: f32,
    /// Y offset from the top of the box
    pub y_offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

/// Encoded image bytes plus their intrinsic pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

impl Surface {
    pub fn new(width: f32, height: f32, scale: f32, background: [f32; 4]) -> Self {
        Self {
            width,
            height,
            scale,
            background,
            boxes: Vec::new(),
            images: BTreeMap::new(),
        }
    }

    /// Serialise the display list (images excluded) to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Every text line on the surface, depth-first.
    pub fn text_lines(&self) -> Vec<&str> {
        fn walk<'a>(b: &'a SurfaceBox, out: &mut Vec<&'a str>) {
            if let Some(text) = &b.text {
                out.extend(text.lines.iter().map(|l| l.text.as_str()));
            }
            for child in &b.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for b in &self.boxes {
            walk(b, &mut out);
        }
        out
    }

    /// Every image placement on the surface, depth-first.
    pub fn image_boxes(&self) -> Vec<&SurfaceBox> {
        fn walk<'a>(b: &'a SurfaceBox, out: &mut Vec<&'a SurfaceBox>) {
            if b.image.is_some() {
                out.push(b);
            }
            for child in &b.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for b in &self.boxes {
            walk(b, &mut out);
        }
        out
    }
}

impl SurfaceBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }
}
