//! PDF encoder – draws a captured [`Surface`] onto a single page using
//! `printpdf` (v0.8 ops-based API).

use std::collections::HashMap;

use printpdf::*;

use crate::error::ExportError;
use crate::export::{DocumentSettings, PdfFile};
use crate::fonts::{to_winlatin, ASCENDER};
use crate::surface::{Surface, SurfaceBox};

/// Builds a one-page PDF from captured surfaces.
pub trait PdfEncoder: Sized {
    /// Start an empty document with one page.
    fn create(settings: &DocumentSettings, title: &str) -> Self;

    /// Draw `surface` into the rectangle at (`x`, `y`) of size
    /// `width` × `height`, all in the document unit, origin top-left.
    fn add_image(
        &mut self,
        surface: &Surface,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ExportError>;

    /// Finish the document.
    fn save(self, filename: &str) -> Result<PdfFile, ExportError>;
}

/// The printpdf-backed encoder. Text is drawn with the builtin Helvetica
/// faces and stays selectable.
pub struct PrintPdfEncoder {
    doc: PdfDocument,
    ops: Vec<Op>,
    page_width_pt: f32,
    page_height_pt: f32,
    /// Points per document unit.
    unit_pt: f32,
}

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Maps surface pixels onto the page.
struct Transform {
    /// Points per surface pixel.
    k: f32,
    origin_x: f32,
    origin_y: f32,
    page_height: f32,
}

impl Transform {
    fn x(&self, px: f32) -> f32 {
        self.origin_x + px * self.k
    }

    /// PDF origin is bottom-left; surface origin is top-left.
    fn y(&self, px: f32) -> f32 {
        self.page_height - (self.origin_y + px * self.k)
    }

    fn len(&self, px: f32) -> f32 {
        px * self.k
    }
}

impl PdfEncoder for PrintPdfEncoder {
    fn create(settings: &DocumentSettings, title: &str) -> Self {
        let unit_pt = settings.unit.points();
        Self {
            doc: PdfDocument::new(title),
            ops: Vec::new(),
            page_width_pt: settings.page_width() * unit_pt,
            page_height_pt: settings.page_height() * unit_pt,
            unit_pt,
        }
    }

    fn add_image(
        &mut self,
        surface: &Surface,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ExportError> {
        if surface.width <= 0.0 || surface.height <= 0.0 {
            return Err(ExportError::Encode("surface is empty".to_string()));
        }
        let images = self.register_images(surface);
        let t = Transform {
            k: width * self.unit_pt / surface.width,
            origin_x: x * self.unit_pt,
            origin_y: y * self.unit_pt,
            page_height: self.page_height_pt,
        };

        if surface.background[3] > 0.001 {
            self.ops.push(fill_color(&surface.background));
            self.ops.push(rect_polygon(
                t.x(0.0),
                t.page_height - (t.origin_y + height * self.unit_pt),
                t.x(0.0) + width * self.unit_pt,
                t.y(0.0),
            ));
        }

        for b in &surface.boxes {
            render_box(&mut self.ops, b, &t, &images);
        }
        Ok(())
    }

    fn save(mut self, filename: &str) -> Result<PdfFile, ExportError> {
        const PT_TO_MM: f32 = 0.352778;
        let page = PdfPage::new(
            Mm(self.page_width_pt * PT_TO_MM),
            Mm(self.page_height_pt * PT_TO_MM),
            std::mem::take(&mut self.ops),
        );
        self.doc.with_pages(vec![page]);
        let mut warnings = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if bytes.is_empty() {
            return Err(ExportError::Encode("printpdf produced no output".to_string()));
        }
        log::debug!("Encoded {filename} ({} bytes)", bytes.len());
        Ok(PdfFile {
            filename: filename.to_string(),
            bytes,
        })
    }
}

impl PrintPdfEncoder {
    /// Register every image of the surface as a reusable XObject. Images
    /// printpdf cannot decode are skipped.
    fn register_images(&mut self, surface: &Surface) -> HashMap<String, ImageResource> {
        let mut resources = HashMap::new();
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        for (src, image) in &surface.images {
            let raw = match RawImage::decode_from_bytes(&image.bytes, &mut warnings) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping image in PDF: {e}");
                    continue;
                }
            };
            let xobj_id = self.doc.add_image(&raw);
            resources.insert(
                src.clone(),
                ImageResource {
                    xobj_id,
                    px_width: image.px_width,
                    px_height: image.px_height,
                },
            );
        }
        resources
    }
}

fn rgb(c: &[f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn fill_color(c: &[f32; 4]) -> Op {
    Op::SetFillColor { col: rgb(c) }
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Filled rectangle between two corners in page points.
fn rect_polygon(x1: f32, y1: f32, x2: f32, y2: f32) -> Op {
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    }
}

fn line(points: Vec<LinePoint>, is_closed: bool) -> Op {
    Op::DrawLine {
        line: Line { points, is_closed },
    }
}

/// Recursively render a surface box and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    b: &SurfaceBox,
    t: &Transform,
    images: &HashMap<String, ImageResource>,
) {
    let x1 = t.x(b.x);
    let x2 = t.x(b.x + b.width);
    let top = t.y(b.y);
    let bottom = t.y(b.y + b.height);

    // Background
    if let Some(bg) = &b.background {
        ops.push(fill_color(bg));
        ops.push(rect_polygon(x1, bottom, x2, top));
    }

    // Border
    if let Some(border) = &b.border {
        ops.push(Op::SetOutlineColor {
            col: rgb(&border.color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(t.len(border.width)),
        });

        let [s_top, s_right, s_bottom, s_left] = border.sides;
        if border.sides.iter().all(|s| *s) {
            ops.push(line(
                vec![
                    point(x1, top),
                    point(x2, top),
                    point(x2, bottom),
                    point(x1, bottom),
                ],
                true,
            ));
        } else {
            // Stroke each edge inside the box.
            let half = t.len(border.width) / 2.0;
            if s_top {
                ops.push(line(vec![point(x1, top - half), point(x2, top - half)], false));
            }
            if s_right {
                ops.push(line(vec![point(x2 - half, top), point(x2 - half, bottom)], false));
            }
            if s_bottom {
                ops.push(line(
                    vec![point(x1, bottom + half), point(x2, bottom + half)],
                    false,
                ));
            }
            if s_left {
                ops.push(line(vec![point(x1 + half, top), point(x1 + half, bottom)], false));
            }
        }
    }

    // Text
    if let Some(text) = &b.text {
        let font = if text.bold {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        };
        let size = t.len(text.font_size);
        // Half-leading above the glyphs, then the ascender.
        let baseline =
            (text.line_height - text.font_size) / 2.0 + text.font_size * ASCENDER / 1000.0;

        for tline in &text.lines {
            if tline.text.is_empty() {
                continue;
            }
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(t.x(b.x + tline.x_offset)),
                    y: Pt(t.y(b.y + tline.y_offset + baseline)),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(t.len(text.line_height)),
            });
            ops.push(fill_color(&text.color));
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(&tline.text))],
                font,
            });
            ops.push(Op::EndTextSection);
        }
    }

    // Image – embed from pre-registered XObject
    if let Some(img) = &b.image {
        if let Some(res) = images.get(&img.src) {
            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = t.len(img.width) / res.px_width.max(1) as f32;
            let scale_y = t.len(img.height) / res.px_height.max(1) as f32;
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(x1)),
                    translate_y: Some(Pt(t.y(b.y + img.height))),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    // Children
    for child in &b.children {
        render_box(ops, child, t, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{TextContent, TextLine};

    fn sample_surface() -> Surface {
        let mut surface = Surface::new(1588.0, 400.0, 2.0, [1.0, 1.0, 1.0, 1.0]);
        let mut b = SurfaceBox::new(64.0, 64.0, 400.0, 60.0);
        b.background = Some([0.9, 0.9, 0.9, 1.0]);
        b.text = Some(TextContent {
            lines: vec![TextLine {
                text: "\u{20B9}40,000.00".into(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_size: 28.0,
            bold: true,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 39.2,
        });
        surface.boxes.push(b);
        surface
    }

    #[test]
    fn encodes_single_page_pdf() {
        let mut encoder = PrintPdfEncoder::create(&DocumentSettings::default(), "Payslip");
        encoder
            .add_image(&sample_surface(), 0.0, 0.0, 210.0, 52.9)
            .unwrap();
        let file = encoder.save("a_b_payslip.pdf").unwrap();
        assert_eq!(file.filename, "a_b_payslip.pdf");
        assert!(file.bytes.len() > 100);
        assert_eq!(&file.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn empty_surface_is_an_encode_error() {
        let mut encoder = PrintPdfEncoder::create(&DocumentSettings::default(), "Payslip");
        let surface = Surface::new(0.0, 0.0, 2.0, [1.0; 4]);
        assert!(matches!(
            encoder.add_image(&surface, 0.0, 0.0, 210.0, 297.0),
            Err(ExportError::Encode(_))
        ));
    }
}
