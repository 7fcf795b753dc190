//! Markup tree – the rendered payslip as element and text nodes.
//!
//! The renderer never concatenates user data into markup strings. It builds
//! a tree, and the serializer escapes every text node and every attribute
//! value, so free text can only ever come out as inert character data.
//!
//! We support the controlled subset the payslip uses:
//! - Structural: div, table, thead, tbody, tr, th, td
//! - Inline: span, strong, br
//! - Replaced: img

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    Span,
    Strong,
    Br,
    Img,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Div => "div",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tr => "tr",
            Tag::Th => "th",
            Tag::Td => "td",
        }
    }

    /// Elements serialized without a closing tag.
    pub fn is_void(self) -> bool {
        matches!(self, Tag::Br | Tag::Img)
    }

    /// Elements that flow as part of a line of text.
    pub fn is_inline(self) -> bool {
        matches!(self, Tag::Span | Tag::Strong | Tag::Br)
    }
}

/// A node in the markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element node carrying tag, ordered attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_class(self, class: &str) -> Self {
        self.with_attr("class", class)
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append a text node.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Shorthand for an element with a single class.
pub fn el(tag: Tag, class: &str) -> Element {
    Element::new(tag).with_class(class)
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Escape character data. Quotes are escaped too so the same routine is
/// safe inside attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serialize a list of nodes.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_html(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.tag.name());
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(value));
                out.push('"');
            }
            out.push('>');
            if element.tag.is_void() {
                return;
            }
            for child in &element.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(element.tag.name());
            out.push('>');
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Concatenated text of a subtree; `<br>` becomes a newline.
pub fn text_content(node: &Node) -> String {
    match node {
        Node::Text(text) => text.clone(),
        Node::Element(e) if e.tag == Tag::Br => "\n".to_string(),
        Node::Element(e) => e.children.iter().map(text_content).collect(),
    }
}

/// Depth-first visit of every element in `nodes`.
pub fn visit_elements<'a>(nodes: &'a [Node], f: &mut dyn FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(e) = node {
            f(e);
            visit_elements(&e.children, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_escaped() {
        let node: Node = Element::new(Tag::Div)
            .with_text("<script>alert('x')</script> & \"more\"")
            .into();
        assert_eq!(
            to_html(&[node]),
            "<div>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;more&quot;</div>"
        );
    }

    #[test]
    fn attribute_values_cannot_break_out() {
        let node: Node = Element::new(Tag::Img)
            .with_attr("src", "x\" onerror=\"alert(1)")
            .into();
        let html = to_html(&[node]);
        assert_eq!(html, "<img src=\"x&quot; onerror=&quot;alert(1)\">");
        assert!(!html.contains("onerror=\""));
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let node: Node = Element::new(Tag::Div)
            .with_text("a")
            .with_child(Element::new(Tag::Br))
            .with_text("b")
            .into();
        assert_eq!(to_html(&[node.clone()]), "<div>a<br>b</div>");
        assert_eq!(text_content(&node), "a\nb");
    }

    #[test]
    fn class_helpers() {
        let e = Element::new(Tag::Td).with_class("amount total");
        assert_eq!(e.classes(), vec!["amount", "total"]);
        assert!(e.has_class("total"));
        assert!(!e.has_class("amo"));
    }
}
