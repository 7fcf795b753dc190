//! Style resolver – maps the payslip's class names to a flat
//! [`ComputedStyle`] consumed by the capture layout.
//!
//! This is the Rust-side twin of [`crate::template::STYLESHEET`]; only the
//! properties the payslip uses are modelled.

use crate::markup::{Element, Node, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_grow: f32,
    pub justify_content: JustifyContent,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,

    // Spacing (px)
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// `margin-left/right: auto` – centres a block inside a column.
    pub margin_x_auto: bool,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border
    pub border_width: f32,
    pub border_sides: Sides,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,

    // Background
    pub background_color: Color,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Column,
            flex_grow: 0.0,
            justify_content: JustifyContent::Start,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_x_auto: false,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_width: 0.0,
            border_sides: Sides::ALL,
            border_color: Color::BLACK,
            font_size: 14.0,
            font_weight: FontWeight::Normal,
            color: GRAY_800,
            text_align: TextAlign::Left,
            line_height: 1.4,
            background_color: Color::TRANSPARENT,
        }
    }
}

impl ComputedStyle {
    pub fn horizontal_padding(&self) -> f32 {
        self.padding_left + self.padding_right
    }

    fn padding(&mut self, vertical: f32, horizontal: f32) {
        self.padding_top = vertical;
        self.padding_bottom = vertical;
        self.padding_left = horizontal;
        self.padding_right = horizontal;
    }

    fn border(&mut self, width: f32, sides: Sides, color: Color) {
        self.border_width = width;
        self.border_sides = sides;
        self.border_color = color;
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
}

/// Which edges of a box carry its border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sides {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Sides {
    pub const ALL: Self = Self {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };
    pub const TOP: Self = Self {
        top: true,
        right: false,
        bottom: false,
        left: false,
    };
    pub const BOTTOM: Self = Self {
        top: false,
        right: false,
        bottom: true,
        left: false,
    };
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

// Palette shared with the browser stylesheet.
const NAVY: Color = Color::rgb(0.118, 0.227, 0.541); // #1e3a8a
const GRAY_100: Color = Color::rgb(0.953, 0.957, 0.965); // #f3f4f6
const GRAY_200: Color = Color::rgb(0.898, 0.906, 0.922); // #e5e7eb
const GRAY_300: Color = Color::rgb(0.820, 0.835, 0.859); // #d1d5db
const GRAY_400: Color = Color::rgb(0.612, 0.639, 0.686); // #9ca3af
const GRAY_500: Color = Color::rgb(0.420, 0.447, 0.502); // #6b7280
const GRAY_600: Color = Color::rgb(0.294, 0.333, 0.388); // #4b5563
const GRAY_700: Color = Color::rgb(0.216, 0.255, 0.318); // #374151
const GRAY_800: Color = Color::rgb(0.122, 0.161, 0.216); // #1f2937
const BLUE_50: Color = Color::rgb(0.937, 0.965, 1.0); // #eff6ff

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &Element, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = base_style_for_tag(element.tag);

    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        if style.font_weight == FontWeight::Normal {
            style.font_weight = p.font_weight;
        }
    }

    // Header cells: white on navy.
    if element.tag == Tag::Th {
        style.background_color = NAVY;
        style.color = Color::WHITE;
    }

    for class in element.classes() {
        apply_payslip_class(&mut style, class);
    }

    style
}

/// Default styles based on tag semantics.
fn base_style_for_tag(tag: Tag) -> ComputedStyle {
    let mut s = ComputedStyle::default();
    match tag {
        Tag::Table => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Column;
            s.flex_grow = 1.0;
            s.border(1.0, Sides::ALL, GRAY_300);
        }
        Tag::Thead | Tag::Tbody => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Column;
        }
        Tag::Tr => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Row;
        }
        Tag::Td | Tag::Th => {
            s.flex_grow = 1.0;
            s.padding(6.0, 8.0);
            s.border(1.0, Sides::ALL, GRAY_300);
            if tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
            }
        }
        Tag::Strong => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Span | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Img | Tag::Div => {}
    }
    s
}

/// Apply one payslip class.
fn apply_payslip_class(s: &mut ComputedStyle, class: &str) {
    match class {
        "payslip-header" => {
            s.text_align = TextAlign::Center;
            s.padding_bottom = 16.0;
            s.margin_bottom = 20.0;
            s.border(2.0, Sides::BOTTOM, NAVY);
        }
        "company-logo" => {
            s.height = Dimension::Px(60.0);
            s.margin_x_auto = true;
            s.margin_bottom = 8.0;
        }
        "company-name" => {
            s.font_size = 24.0;
            s.font_weight = FontWeight::Bold;
            s.color = NAVY;
        }
        "company-address" => {
            s.font_size = 12.0;
            s.color = GRAY_500;
            s.margin_top = 4.0;
        }
        "payslip-title" => {
            s.font_size = 18.0;
            s.font_weight = FontWeight::Bold;
            s.margin_top = 12.0;
        }
        "payslip-month" => {
            s.font_size = 14.0;
            s.color = GRAY_700;
        }
        "section-title" => {
            s.font_size = 14.0;
            s.font_weight = FontWeight::Bold;
            s.background_color = GRAY_200;
            s.padding(6.0, 8.0);
            s.margin_bottom = 8.0;
        }
        "employee-section" | "attendance-section" => {
            s.margin_bottom = 16.0;
        }
        "detail-item" => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Row;
            s.justify_content = JustifyContent::SpaceBetween;
            s.font_size = 12.0;
            s.padding(3.0, 8.0);
        }
        "detail-label" => {
            s.font_weight = FontWeight::Bold;
            s.color = GRAY_600;
        }
        "salary-breakdown" => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Row;
            s.gap = 16.0;
            s.margin_bottom = 16.0;
        }
        "earnings-table" | "deductions-table" => s.font_size = 12.0,
        "amount" => s.text_align = TextAlign::Right,
        "total-row" => s.background_color = GRAY_100,
        "salary-summary" => {
            s.background_color = BLUE_50;
            s.padding(12.0, 16.0);
            s.margin_bottom = 32.0;
        }
        "summary-row" => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Row;
            s.justify_content = JustifyContent::SpaceBetween;
            s.font_size = 13.0;
            s.padding(3.0, 0.0);
        }
        "summary-label" | "summary-value" => s.font_weight = FontWeight::Bold,
        "signatures-section" => {
            s.display = Display::Flex;
            s.flex_direction = FlexDirection::Row;
            s.justify_content = JustifyContent::SpaceBetween;
            s.gap = 48.0;
            s.margin_top = 40.0;
        }
        "signature-box" => {
            s.flex_grow = 1.0;
            s.text_align = TextAlign::Center;
        }
        "signature-image" => {
            s.height = Dimension::Px(50.0);
            s.margin_x_auto = true;
            s.margin_bottom = 6.0;
        }
        "signature-label" => {
            s.border(1.0, Sides::TOP, GRAY_700);
            s.padding_top = 6.0;
            s.font_size = 11.0;
            s.color = GRAY_600;
        }
        "payslip-placeholder" => {
            s.text_align = TextAlign::Center;
            s.color = GRAY_400;
            s.padding(48.0, 48.0);
        }
        _ => {
            log::debug!("No capture style for class '{class}'");
        }
    }
}

// ---------------------------------------------------------------------------
// Styled tree
// ---------------------------------------------------------------------------

/// A markup node paired with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        src: Option<String>,
        children: Vec<StyledNode>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from markup nodes.
pub fn build_styled_tree(nodes: &[Node], parent: Option<&ComputedStyle>) -> Vec<StyledNode> {
    let inherited = parent.cloned().unwrap_or_default();
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(text) => StyledNode::Text {
                text: text.clone(),
                style: inherited.clone(),
            },
            Node::Element(element) => {
                let style = resolve_style(element, parent);
                let children = build_styled_tree(&element.children, Some(&style));
                StyledNode::Element {
                    tag: element.tag,
                    src: element.src().map(str::to_string),
                    style,
                    children,
                }
            }
        })
        .collect()
}
