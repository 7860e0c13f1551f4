//! The main document part and formatting property setters.
//!
//! WordprocessingML keeps run, paragraph and cell properties in a child
//! container (`w:rPr`, `w:pPr`, `w:tcPr`) that must come first and whose
//! children follow a fixed schema order. The setters here upsert into that
//! order so edited documents stay valid for strict consumers.

use super::xml::{self, local_name, XmlElement, XmlNode};
use super::DocxError;

/// Parsed `word/document.xml`.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    root: XmlElement,
}

impl DocxDocument {
    /// Parses the main document part. Fails when the XML is broken or the
    /// root element is not `w:document`, which is what rejects non-DOCX
    /// bytes served from a misconfigured template URL.
    pub fn parse(xml: &[u8]) -> Result<Self, DocxError> {
        let root = xml::parse(xml)?;
        if !root.is_named("document") {
            return Err(DocxError::Malformed(format!(
                "expected a w:document root, found <{}>",
                root.name
            )));
        }
        Ok(Self { root })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, DocxError> {
        xml::serialize(&self.root)
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn body(&self) -> Option<&XmlElement> {
        self.root.first_child("body")
    }

    pub fn body_mut(&mut self) -> Option<&mut XmlElement> {
        self.root.first_child_mut("body")
    }
}

/// Calls `visit` for every paragraph under `scope`, including paragraphs
/// inside table cells. Does not descend into drawings, so text boxes keep
/// their content untouched.
pub fn visit_paragraphs_mut(scope: &mut XmlElement, visit: &mut dyn FnMut(&mut XmlElement)) {
    for child in scope.child_elements_mut() {
        if child.is_named("p") {
            visit(child);
        } else if child.is_named("pPr") || child.is_named("rPr") || child.is_named("drawing") {
            continue;
        } else {
            visit_paragraphs_mut(child, visit);
        }
    }
}

/// Calls `visit` for every run under `scope` without descending into the
/// runs themselves.
pub fn visit_runs_mut(scope: &mut XmlElement, visit: &mut dyn FnMut(&mut XmlElement)) {
    for child in scope.child_elements_mut() {
        if child.is_named("r") {
            visit(child);
        } else if child.is_named("pPr") || child.is_named("drawing") {
            continue;
        } else {
            visit_runs_mut(child, visit);
        }
    }
}

/// Inserts `paragraph` at the end of the body but before the trailing
/// section properties, which Word requires to stay last.
pub fn append_body_paragraph(body: &mut XmlElement, paragraph: XmlElement) {
    let index = body
        .children
        .iter()
        .position(|node| matches!(node, XmlNode::Element(el) if el.is_named("sectPr")))
        .unwrap_or(body.children.len());
    body.children.insert(index, XmlNode::Element(paragraph));
}

// Schema order for the property children this module touches. Properties not
// listed sort after the listed ones, which holds for everything Word emits
// at those positions.
const RUN_PROP_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "strike", "color", "spacing", "kern",
    "position", "sz", "szCs", "highlight", "u", "bdr", "shd", "vertAlign", "lang",
];
const PARA_PROP_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "widowControl", "numPr", "pBdr", "shd",
    "tabs", "spacing", "ind", "jc", "outlineLvl", "rPr", "sectPr",
];
const CELL_PROP_ORDER: &[&str] = &[
    "cnfStyle", "tcW", "gridSpan", "hMerge", "vMerge", "tcBorders", "shd", "noWrap", "tcMar",
    "textDirection", "tcFitText", "vAlign", "hideMark",
];

/// Sets every font slot of the run to `font`, creating `w:rPr` when absent.
pub fn set_run_font(run: &mut XmlElement, font: &str) {
    let fonts = XmlElement::new("w:rFonts")
        .with_attr("w:ascii", font)
        .with_attr("w:hAnsi", font)
        .with_attr("w:eastAsia", font)
        .with_attr("w:cs", font);
    if let Some(props) = ensure_props(run, "w:rPr") {
        upsert_ordered(props, RUN_PROP_ORDER, "w:rFonts", fonts);
    }
}

/// Font size in half points (`20` renders as 10pt).
pub fn set_run_size(run: &mut XmlElement, half_points: u32) {
    let value = half_points.to_string();
    if let Some(props) = ensure_props(run, "w:rPr") {
        let size = XmlElement::new("w:sz").with_attr("w:val", &value);
        upsert_ordered(props, RUN_PROP_ORDER, "w:sz", size);
        let size_cs = XmlElement::new("w:szCs").with_attr("w:val", &value);
        upsert_ordered(props, RUN_PROP_ORDER, "w:szCs", size_cs);
    }
}

/// Text color as an RRGGBB hex string without the leading `#`.
pub fn set_run_color(run: &mut XmlElement, rgb: &str) {
    let color = XmlElement::new("w:color").with_attr("w:val", rgb);
    if let Some(props) = ensure_props(run, "w:rPr") {
        upsert_ordered(props, RUN_PROP_ORDER, "w:color", color);
    }
}

/// `alignment` is the raw `w:jc` value: `left`, `right`, `center`, `both`.
pub fn set_paragraph_alignment(paragraph: &mut XmlElement, alignment: &str) {
    let jc = XmlElement::new("w:jc").with_attr("w:val", alignment);
    if let Some(props) = ensure_props(paragraph, "w:pPr") {
        upsert_ordered(props, PARA_PROP_ORDER, "w:jc", jc);
    }
}

/// Single borders on all four sides of a cell. `size` is in eighths of a
/// point, matching the `w:sz` unit.
pub fn set_cell_borders(cell: &mut XmlElement, color: &str, size: u32) {
    let mut borders = XmlElement::new("w:tcBorders");
    for side in ["top", "left", "bottom", "right"] {
        borders.push_element(
            XmlElement::new(&format!("w:{side}"))
                .with_attr("w:val", "single")
                .with_attr("w:sz", &size.to_string())
                .with_attr("w:space", "0")
                .with_attr("w:color", color),
        );
    }
    if let Some(props) = ensure_props(cell, "w:tcPr") {
        upsert_ordered(props, CELL_PROP_ORDER, "w:tcBorders", borders);
    }
}

/// Solid background fill for a cell, as an RRGGBB hex string.
pub fn set_cell_shading(cell: &mut XmlElement, fill: &str) {
    let shading = XmlElement::new("w:shd")
        .with_attr("w:val", "clear")
        .with_attr("w:color", "auto")
        .with_attr("w:fill", fill);
    if let Some(props) = ensure_props(cell, "w:tcPr") {
        upsert_ordered(props, CELL_PROP_ORDER, "w:shd", shading);
    }
}

/// First `name` child, inserted at the front when absent. Property
/// containers must be the first child of their parent.
fn ensure_props<'a>(parent: &'a mut XmlElement, name: &'a str) -> Option<&'a mut XmlElement> {
    if parent.first_child(name).is_none() {
        parent
            .children
            .insert(0, XmlNode::Element(XmlElement::new(name)));
    }
    parent.first_child_mut(name)
}

fn upsert_ordered(props: &mut XmlElement, order: &[&str], name: &str, element: XmlElement) {
    if let Some(existing) = props.first_child_mut(name) {
        *existing = element;
        return;
    }
    let rank_of = |n: &str| {
        order
            .iter()
            .position(|entry| *entry == local_name(n))
            .unwrap_or(order.len())
    };
    let rank = rank_of(name);
    let index = props
        .children
        .iter()
        .position(|node| matches!(node, XmlNode::Element(el) if rank_of(&el.name) > rank))
        .unwrap_or(props.children.len());
    props.children.insert(index, XmlNode::Element(element));
}
