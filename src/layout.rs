//! Capture – lays the rendered payslip out with Taffy and freezes the result
//! into a scaled [`Surface`].
//!
//! The markup tree is styled with [`crate::style`], every referenced image is
//! loaded up front (concurrently), and block/flex layout is delegated to
//! Taffy. Runs of inline content collapse into a single wrapped text leaf.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use taffy::prelude::{
    AlignSelf, AvailableSpace, Dimension, LengthPercentage, LengthPercentageAuto, NodeId, Rect,
    Size, Style, TaffyTree,
};

use crate::error::ExportError;
use crate::fonts::{line_height_px, measure_text_width, wrap_text};
use crate::images::load_image;
use crate::markup::{visit_elements, Tag};
use crate::style::{self as css, build_styled_tree, Color, ComputedStyle, FontWeight, StyledNode};
use crate::surface::{
    BorderStyle, EmbeddedImage, ImageContent, Surface, SurfaceBox, TextContent, TextLine,
};
use crate::template::RenderedPayslip;

/// Padding around the payslip inside the captured view, in CSS px.
pub const VIEW_PADDING: f32 = 32.0;

/// How the view is captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Device pixels per CSS pixel.
    pub scale: f32,
    /// Fetch cross-origin (http/https) images.
    pub use_cors: bool,
    /// Background colour as `#rrggbb`.
    pub background: String,
    /// Width of the view in CSS px.
    pub view_width: f32,
    /// Directory relative image references are resolved against.
    pub asset_root: PathBuf,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            use_cors: true,
            background: "#ffffff".to_string(),
            view_width: 794.0,
            asset_root: PathBuf::from("."),
        }
    }
}

impl CaptureOptions {
    fn background_color(&self) -> Color {
        Color::from_hex(&self.background).unwrap_or_else(|| {
            log::warn!(
                "Invalid capture background '{}', using white",
                self.background
            );
            Color::WHITE
        })
    }
}

/// Captures a rendered view into a surface.
#[allow(async_fn_in_trait)]
pub trait Rasterizer {
    async fn capture(
        &self,
        view: &RenderedPayslip,
        options: &CaptureOptions,
    ) -> Result<Surface, ExportError>;
}

/// The built-in rasterizer: image loading, Taffy layout, display list.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRasterizer;

impl Rasterizer for LayoutRasterizer {
    async fn capture(
        &self,
        view: &RenderedPayslip,
        options: &CaptureOptions,
    ) -> Result<Surface, ExportError> {
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(ExportError::Capture(format!(
                "scale must be positive, got {}",
                options.scale
            )));
        }
        if !(options.view_width.is_finite() && options.view_width > 2.0 * VIEW_PADDING) {
            return Err(ExportError::Capture(format!(
                "view width too small: {}",
                options.view_width
            )));
        }

        let images = load_images(view, options).await;
        let styled = build_styled_tree(view.nodes(), None);
        layout_surface(&styled, images, options)
    }
}

/// Load every distinct `<img src>` concurrently. Failures are logged and the
/// image is left out, which hides it in the capture.
async fn load_images(
    view: &RenderedPayslip,
    options: &CaptureOptions,
) -> BTreeMap<String, EmbeddedImage> {
    let mut srcs = BTreeSet::new();
    visit_elements(view.nodes(), &mut |e| {
        if e.tag == Tag::Img {
            if let Some(src) = e.src() {
                srcs.insert(src.to_string());
            }
        }
    });

    let loads = srcs.into_iter().map(|src| async move {
        let result = load_image(&src, &options.asset_root, options.use_cors).await;
        (src, result)
    });

    futures::future::join_all(loads)
        .await
        .into_iter()
        .filter_map(|(src, result)| match result {
            Ok(image) => Some((src, image)),
            Err(e) => {
                log::warn!("Hiding image '{}': {e}", preview(&src));
                None
            }
        })
        .collect()
}

/// Data URIs can be megabytes long; keep log lines readable.
fn preview(src: &str) -> &str {
    match src.char_indices().nth(60) {
        Some((i, _)) => &src[..i],
        None => src,
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Content {
    None,
    Text { lines: Vec<String>, width: f32 },
    Image { src: String },
}

struct NodeInfo {
    style: ComputedStyle,
    content: Content,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    info: HashMap<NodeId, NodeInfo>,
    images: &'a BTreeMap<String, EmbeddedImage>,
}

fn capture_err(e: taffy::TaffyError) -> ExportError {
    ExportError::Capture(format!("layout error: {e}"))
}

impl<'a> LayoutBuilder<'a> {
    fn new(images: &'a BTreeMap<String, EmbeddedImage>) -> Self {
        Self {
            taffy: TaffyTree::new(),
            info: HashMap::new(),
            images,
        }
    }

    /// Collect the text of an inline subtree; `<br>` is a hard break.
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { tag: Tag::Br, .. } => "\n".to_string(),
            StyledNode::Element { children, .. } => {
                children.iter().map(Self::collect_inline_text).collect()
            }
        }
    }

    /// True when there is no block-level child.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                tag,
                children: gc,
                ..
            } => tag.is_inline() && Self::all_inline(gc),
        })
    }

    /// Bold when the block is bold or all of its visible text sits in bold
    /// inline elements (`<td><strong>..</strong></td>`).
    fn inline_bold(style: &ComputedStyle, children: &[StyledNode]) -> bool {
        if style.font_weight == FontWeight::Bold {
            return true;
        }
        let mut any_element = false;
        let all_bold = children.iter().all(|c| match c {
            StyledNode::Text { text, .. } => text.trim().is_empty(),
            StyledNode::Element { tag: Tag::Br, .. } => true,
            StyledNode::Element { style, .. } => {
                any_element = true;
                style.font_weight == FontWeight::Bold
            }
        });
        any_element && all_bold
    }

    fn build_node(
        &mut self,
        styled: &StyledNode,
        available_width: f32,
        in_row: bool,
    ) -> Result<Option<NodeId>, ExportError> {
        match styled {
            StyledNode::Text { text, style } => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                let bold = style.font_weight == FontWeight::Bold;
                self.build_text_leaf(text, style, bold, available_width)
                    .map(Some)
            }
            StyledNode::Element {
                tag,
                style,
                src,
                children,
            } => self
                .build_element(*tag, style, src.as_deref(), children, available_width, in_row)
                .map(Some),
        }
    }

    fn build_text_leaf(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        bold: bool,
        available_width: f32,
    ) -> Result<NodeId, ExportError> {
        let normalized: String = text
            .split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = wrap_text(normalized.trim(), style.font_size, bold, available_width);
        let width = lines
            .iter()
            .map(|l| measure_text_width(l, style.font_size, bold))
            .fold(0.0f32, f32::max);
        let height = lines.len() as f32 * line_height_px(style.font_size, style.line_height);

        let align_self = match style.text_align {
            css::TextAlign::Left => AlignSelf::FlexStart,
            css::TextAlign::Center => AlignSelf::Center,
            css::TextAlign::Right => AlignSelf::FlexEnd,
        };
        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width: Dimension::Length(width),
                    height: Dimension::Length(height),
                },
                align_self: Some(align_self),
                flex_shrink: 0.0,
                ..Default::default()
            })
            .map_err(capture_err)?;

        let mut text_style = style.clone();
        text_style.font_weight = if bold {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        self.info.insert(
            node,
            NodeInfo {
                style: text_style,
                content: Content::Text { lines, width },
            },
        );
        Ok(node)
    }

    fn build_element(
        &mut self,
        tag: Tag,
        style: &ComputedStyle,
        src: Option<&str>,
        children: &[StyledNode],
        available_width: f32,
        in_row: bool,
    ) -> Result<NodeId, ExportError> {
        let taffy_style = computed_to_taffy(style, in_row);

        if tag == Tag::Img {
            return self.build_image(style, src, taffy_style, available_width);
        }

        let inner_width = (available_width
            - style.horizontal_padding()
            - 2.0 * style.border_width)
            .max(1.0);
        let is_row = style.display == css::Display::Flex
            && style.flex_direction == css::FlexDirection::Row;

        let mut child_nodes = Vec::new();
        if !is_row && !children.is_empty() && Self::all_inline(children) {
            let text: String = children.iter().map(Self::collect_inline_text).collect();
            if !text.trim().is_empty() {
                let bold = Self::inline_bold(style, children);
                child_nodes.push(self.build_text_leaf(&text, style, bold, inner_width)?);
            }
        } else {
            // Estimate per-child width for rows so that text wraps to the
            // column it ends up in.
            let child_width = if is_row {
                let n = children
                    .iter()
                    .filter(|c| matches!(c, StyledNode::Element { .. }))
                    .count()
                    .max(1);
                let gaps = style.gap * n.saturating_sub(1) as f32;
                ((inner_width - gaps) / n as f32).max(1.0)
            } else {
                inner_width
            };
            for child in children {
                if let Some(id) = self.build_node(child, child_width, is_row)? {
                    child_nodes.push(id);
                }
            }
        }

        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(capture_err)?;
        self.info.insert(
            node,
            NodeInfo {
                style: style.clone(),
                content: Content::None,
            },
        );
        Ok(node)
    }

    /// Size an image from its intrinsic aspect ratio. Images that did not
    /// load are hidden.
    fn build_image(
        &mut self,
        style: &ComputedStyle,
        src: Option<&str>,
        mut taffy_style: Style,
        available_width: f32,
    ) -> Result<NodeId, ExportError> {
        let loaded = src.and_then(|s| self.images.get(s).map(|img| (s, img)));
        let content = match loaded {
            Some((src, img)) => {
                let aspect = img.px_width as f32 / img.px_height as f32;
                let (mut w, mut h) = match (style.width, style.height) {
                    (css::Dimension::Px(w), css::Dimension::Px(h)) => (w, h),
                    (css::Dimension::Px(w), css::Dimension::Auto) => (w, w / aspect),
                    (css::Dimension::Auto, css::Dimension::Px(h)) => (h * aspect, h),
                    (css::Dimension::Auto, css::Dimension::Auto) => {
                        (img.px_width as f32, img.px_height as f32)
                    }
                };
                if w > available_width {
                    h *= available_width / w;
                    w = available_width;
                }
                taffy_style.size = Size {
                    width: Dimension::Length(w),
                    height: Dimension::Length(h),
                };
                if style.margin_x_auto {
                    taffy_style.align_self = Some(AlignSelf::Center);
                }
                Content::Image {
                    src: src.to_string(),
                }
            }
            None => {
                taffy_style.display = taffy::Display::None;
                Content::None
            }
        };

        let node = self.taffy.new_leaf(taffy_style).map_err(capture_err)?;
        self.info.insert(
            node,
            NodeInfo {
                style: style.clone(),
                content,
            },
        );
        Ok(node)
    }

    /// Convert the laid-out tree into surface boxes, scaled to device pixels.
    fn extract(
        &self,
        node: NodeId,
        offset_x: f32,
        offset_y: f32,
        scale: f32,
    ) -> Result<Option<SurfaceBox>, ExportError> {
        let Some(info) = self.info.get(&node) else {
            return Ok(None);
        };
        if self.taffy.style(node).map_err(capture_err)?.display == taffy::Display::None {
            return Ok(None);
        }
        let layout = self.taffy.layout(node).map_err(capture_err)?;
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let mut b = SurfaceBox::new(
            x * scale,
            y * scale,
            layout.size.width * scale,
            layout.size.height * scale,
        );
        let style = &info.style;

        match &info.content {
            Content::Text { lines, width } => {
                let bold = style.font_weight == FontWeight::Bold;
                let lh = line_height_px(style.font_size, style.line_height);
                let lines = lines
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        let line_width = measure_text_width(line, style.font_size, bold);
                        let x_offset = match style.text_align {
                            css::TextAlign::Left => 0.0,
                            css::TextAlign::Center => (width - line_width) / 2.0,
                            css::TextAlign::Right => width - line_width,
                        };
                        TextLine {
                            text: line.clone(),
                            x_offset: x_offset * scale,
                            y_offset: i as f32 * lh * scale,
                        }
                    })
                    .collect();
                b.text = Some(TextContent {
                    lines,
                    font_size: style.font_size * scale,
                    bold,
                    color: style.color.to_array(),
                    line_height: lh * scale,
                });
            }
            Content::Image { src } => {
                b.image = Some(ImageContent {
                    src: src.clone(),
                    width: layout.size.width * scale,
                    height: layout.size.height * scale,
                });
            }
            Content::None => {
                if !style.background_color.is_transparent() {
                    b.background = Some(style.background_color.to_array());
                }
                if style.border_width > 0.0 {
                    let s = style.border_sides;
                    b.border = Some(BorderStyle {
                        width: style.border_width * scale,
                        color: style.border_color.to_array(),
                        sides: [s.top, s.right, s.bottom, s.left],
                    });
                }
            }
        }

        for child in self.taffy.children(node).map_err(capture_err)? {
            if let Some(child_box) = self.extract(child, x, y, scale)? {
                b.children.push(child_box);
            }
        }
        Ok(Some(b))
    }
}

fn computed_to_taffy(s: &ComputedStyle, in_row: bool) -> Style {
    let mut ts = Style {
        display: taffy::Display::Flex,
        flex_direction: match (s.display, s.flex_direction) {
            (css::Display::Flex, css::FlexDirection::Row) => taffy::FlexDirection::Row,
            _ => taffy::FlexDirection::Column,
        },
        justify_content: Some(match s.justify_content {
            css::JustifyContent::Start => taffy::JustifyContent::FlexStart,
            css::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
        }),
        flex_grow: s.flex_grow,
        flex_shrink: 1.0,
        size: Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        },
        margin: Rect {
            top: LengthPercentageAuto::Length(s.margin_top),
            right: LengthPercentageAuto::Length(0.0),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(0.0),
        },
        padding: Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        },
        border: border_rect(s),
        gap: Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        },
        ..Default::default()
    };

    // Growing row items share the row equally.
    if in_row && s.flex_grow > 0.0 {
        ts.flex_basis = Dimension::Length(0.0);
        ts.min_size.width = Dimension::Length(0.0);
    }
    ts
}

fn border_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    let side = |on: bool| LengthPercentage::Length(if on { s.border_width } else { 0.0 });
    Rect {
        top: side(s.border_sides.top),
        right: side(s.border_sides.right),
        bottom: side(s.border_sides.bottom),
        left: side(s.border_sides.left),
    }
}

fn dim_to_taffy(d: css::Dimension) -> Dimension {
    match d {
        css::Dimension::Auto => Dimension::Auto,
        css::Dimension::Px(v) => Dimension::Length(v),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out a styled tree at `options.view_width` and freeze it into a
/// surface. Images missing from `images` are hidden.
pub fn layout_surface(
    styled_nodes: &[StyledNode],
    images: BTreeMap<String, EmbeddedImage>,
    options: &CaptureOptions,
) -> Result<Surface, ExportError> {
    let view_width = options.view_width;
    let content_width = view_width - 2.0 * VIEW_PADDING;
    let mut builder = LayoutBuilder::new(&images);

    let mut child_ids = Vec::new();
    for node in styled_nodes {
        if let Some(id) = builder.build_node(node, content_width, false)? {
            child_ids.push(id);
        }
    }

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: Dimension::Length(view_width),
            height: Dimension::Auto,
        },
        padding: Rect {
            top: LengthPercentage::Length(VIEW_PADDING),
            right: LengthPercentage::Length(VIEW_PADDING),
            bottom: LengthPercentage::Length(VIEW_PADDING),
            left: LengthPercentage::Length(VIEW_PADDING),
        },
        ..Default::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(capture_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(view_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(capture_err)?;

    let root_layout = builder.taffy.layout(root).map_err(capture_err)?;
    let scale = options.scale;
    let mut surface = Surface::new(
        root_layout.size.width * scale,
        root_layout.size.height * scale,
        scale,
        options.background_color().to_array(),
    );
    for id in child_ids {
        let origin = root_layout.location;
        if let Some(b) = builder.extract(id, origin.x, origin.y, scale)? {
            surface.boxes.push(b);
        }
    }
    log::debug!(
        "Captured surface {}x{} px ({} images)",
        surface.width,
        surface.height,
        images.len()
    );
    surface.images = images;
    Ok(surface)
}
