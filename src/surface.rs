//! In-memory SVG element tree that the chart draws into.
//!
//! The tree is an arena: elements are addressed by [`ElementId`] and only ever appended
//! below the root, so clearing the surface is a truncation back to the root element.

use std::fmt;
use std::sync::Arc;

/// Optional text measurement capability of a surface.
pub trait TextMeasure: fmt::Debug + Send + Sync {
    /// Advance width in px, or `None` when the host cannot measure text.
    fn text_width(&self, text: &str, font_size: f64, font_family: &str) -> Option<f64>;
}

/// Measurement backend for headless rendering; every query reports unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeasure;

impl TextMeasure for NoMeasure {
    fn text_width(&self, _text: &str, _font_size: f64, _font_family: &str) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    styles: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<ElementId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            styles: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    nodes: Vec<Element>,
    measure: Arc<dyn TextMeasure>,
    hit_regions: Vec<ElementId>,
}

impl Surface {
    pub fn new(tag: &str, measure: Arc<dyn TextMeasure>) -> Self {
        Self {
            nodes: vec![Element::new(tag)],
            measure,
            hit_regions: Vec::new(),
        }
    }

    /// Headless `<svg>` surface.
    pub fn svg() -> Self {
        Self::new("svg", Arc::new(NoMeasure))
    }

    pub fn svg_with_measure(measure: Arc<dyn TextMeasure>) -> Self {
        Self::new("svg", measure)
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn is_svg(&self) -> bool {
        self.nodes[0].tag.eq_ignore_ascii_case("svg")
    }

    pub fn tag(&self, id: ElementId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn append(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(Element::new(tag));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn attr(&mut self, id: ElementId, name: &str, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.nodes[id.0].attrs, name, value.into());
        self
    }

    pub fn attr_num(&mut self, id: ElementId, name: &str, value: f64) -> &mut Self {
        self.attr(id, name, fmt_num(value))
    }

    pub fn style(&mut self, id: ElementId, name: &str, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.nodes[id.0].styles, name, value.into());
        self
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) -> &mut Self {
        self.nodes[id.0].text = Some(text.into());
        self
    }

    pub fn attr_value(&self, id: ElementId, name: &str) -> Option<&str> {
        get_pair(&self.nodes[id.0].attrs, name)
    }

    pub fn style_value(&self, id: ElementId, name: &str) -> Option<&str> {
        get_pair(&self.nodes[id.0].styles, name)
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.nodes[id.0].children
    }

    /// Every element below the root whose `class` attribute contains `class`, in document order.
    pub fn find_by_class(&self, class: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.walk(self.root(), &mut |id| {
            let matches = self
                .attr_value(id, "class")
                .is_some_and(|value| value.split_whitespace().any(|c| c == class));
            if matches {
                found.push(id);
            }
        });
        found
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.walk(self.root(), &mut |id| {
            if self.nodes[id.0].tag == tag {
                found.push(id);
            }
        });
        found
    }

    fn walk(&self, id: ElementId, visit: &mut impl FnMut(ElementId)) {
        for child in &self.nodes[id.0].children {
            visit(*child);
            self.walk(*child, visit);
        }
    }

    /// Number of elements below the root.
    pub fn descendant_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Detaches everything below the root. Root attributes survive.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.hit_regions.clear();
    }

    pub fn measure_text(&self, text: &str, font_size: f64, font_family: &str) -> Option<f64> {
        self.measure.text_width(text, font_size, font_family)
    }

    /// Bounding box of a `text` element, or `None` when it cannot be measured.
    pub fn bbox(&self, id: ElementId) -> Option<BBox> {
        let element = &self.nodes[id.0];
        if element.tag != "text" {
            return None;
        }
        let font_size = self
            .attr_value(id, "font-size")
            .and_then(parse_px)
            .unwrap_or(crate::style::DEFAULT_FONT_SIZE);
        let family = self
            .attr_value(id, "font-family")
            .unwrap_or(crate::style::DEFAULT_FONT_FAMILY);
        let text = element.text.as_deref().unwrap_or("");
        let width = self.measure_text(text, font_size, family)?;
        let x = self.attr_value(id, "x").and_then(parse_px).unwrap_or(0.0);
        let y = self.attr_value(id, "y").and_then(parse_px).unwrap_or(0.0);
        let left = match self.style_value(id, "text-anchor") {
            Some("middle") => x - width / 2.0,
            Some("end") => x - width,
            _ => x,
        };
        Some(BBox {
            x: left,
            y: y - font_size,
            width,
            height: font_size,
        })
    }

    /// Registers `id` as a region that receives pointer move/out events.
    pub fn listen(&mut self, id: ElementId) {
        if !self.hit_regions.contains(&id) {
            self.hit_regions.push(id);
        }
    }

    pub fn hit_regions(&self) -> &[ElementId] {
        &self.hit_regions
    }

    /// Serialized markup of the whole surface, root included.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_element(self.root(), &mut out);
        out
    }

    fn write_element(&self, id: ElementId, out: &mut String) {
        let element = &self.nodes[id.0];
        out.push('<');
        out.push_str(&element.tag);
        for (name, value) in &element.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape_xml(value)));
        }
        if !element.styles.is_empty() {
            let style = element
                .styles
                .iter()
                .map(|(name, value)| format!("{name}: {value};"))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!(" style=\"{}\"", escape_xml(&style)));
        }
        if element.children.is_empty() && element.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &element.text {
            out.push_str(&escape_xml(text));
        }
        for child in &element.children {
            self.write_element(*child, out);
        }
        out.push_str(&format!("</{}>", element.tag));
    }
}

fn set_pair(pairs: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(pair) = pairs.iter_mut().find(|(key, _)| key == name) {
        pair.1 = value;
    } else {
        pairs.push((name.to_string(), value));
    }
}

fn get_pair<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}

/// Formats a coordinate with at most three decimals and no trailing zeros.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
