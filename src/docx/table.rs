//! Line-items table rebuild and financial summary styling.

use super::document::{
    set_cell_borders, set_cell_shading, set_paragraph_alignment, set_run_color, set_run_font,
    set_run_size, visit_runs_mut,
};
use super::text::paragraph_text;
use super::xml::{XmlElement, XmlNode};

/// Every piece of generated text renders in this face.
pub const CELL_FONT: &str = "Courier New";

const BORDER_WHITE: &str = "FFFFFF";
const ITEM_ROW_SHADE: &str = "ddefd5";
const LATE_FEE_COLOR: &str = "D95132";

/// Item cell size, in half points (10pt).
const CELL_SIZE: u32 = 20;

pub fn table_count(body: &XmlElement) -> usize {
    body.children_named("tbl").count()
}

/// `index`-th top-level table of the body. Tables nested inside cells do
/// not count.
pub fn nth_table_mut(body: &mut XmlElement, index: usize) -> Option<&mut XmlElement> {
    body.children_named_mut("tbl").nth(index)
}

/// Replaces the sample row region with one rendered row per line item.
///
/// The table is expected to hold a header row followed by a placeholder
/// row. Extra rows are dropped, item rows are appended in input order, and
/// the placeholder row is removed last. Rendered rows follow the table's
/// own column count so templates with unusual grids keep their geometry.
pub fn rebuild_items_table(table: &mut XmlElement, rows: &[[String; 4]]) {
    for row in table.children_named_mut("tr") {
        for cell in row.children_named_mut("tc") {
            set_cell_borders(cell, BORDER_WHITE, 6);
        }
    }

    let columns = column_count(table);
    let original_rows = table.children_named("tr").count();
    retain_leading_rows(table, 2);
    for values in rows {
        table
            .children
            .push(XmlNode::Element(item_row(values, columns)));
    }
    if original_rows >= 2 {
        remove_nth_row(table, 1);
    }
}

/// White borders and the body font across the financial summary, with the
/// value column right-aligned. When `late_fee_label` is set, the label cell
/// in the fourth row is recolored to flag the charge.
pub fn style_financial_table(table: &mut XmlElement, late_fee_label: Option<&str>) {
    for row in table.children_named_mut("tr") {
        for (index, cell) in row.children_named_mut("tc").enumerate() {
            set_cell_borders(cell, BORDER_WHITE, 4);
            visit_runs_mut(cell, &mut |run| {
                set_run_font(run, CELL_FONT);
                set_run_size(run, CELL_SIZE);
            });
            if index == 1 {
                for paragraph in cell.children_named_mut("p") {
                    set_paragraph_alignment(paragraph, "right");
                }
            }
        }
    }

    let Some(label) = late_fee_label else { return };
    let cell = table
        .children_named_mut("tr")
        .nth(3)
        .and_then(|row| row.children_named_mut("tc").next());
    if let Some(cell) = cell {
        if cell_text(cell).contains(label) {
            visit_runs_mut(cell, &mut |run| {
                set_run_color(run, LATE_FEE_COLOR);
                set_run_font(run, CELL_FONT);
            });
        }
    }
}

fn cell_text(cell: &XmlElement) -> String {
    cell.children_named("p").map(paragraph_text).collect()
}

fn column_count(table: &XmlElement) -> usize {
    let grid = table
        .first_child("tblGrid")
        .map(|grid| grid.children_named("gridCol").count())
        .unwrap_or(0);
    if grid > 0 {
        return grid;
    }
    table
        .children_named("tr")
        .next()
        .map(|row| row.children_named("tc").count())
        .unwrap_or(4)
        .max(1)
}

fn retain_leading_rows(table: &mut XmlElement, keep: usize) {
    let mut seen = 0;
    table.children.retain(|node| {
        if !matches!(node, XmlNode::Element(el) if el.is_named("tr")) {
            return true;
        }
        seen += 1;
        seen <= keep
    });
}

fn remove_nth_row(table: &mut XmlElement, index: usize) {
    let mut seen = 0;
    table.children.retain(|node| {
        if !matches!(node, XmlNode::Element(el) if el.is_named("tr")) {
            return true;
        }
        seen += 1;
        seen != index + 1
    });
}

fn item_row(values: &[String; 4], columns: usize) -> XmlElement {
    const ALIGNMENTS: [&str; 4] = ["left", "right", "center", "right"];
    let mut row = XmlElement::new("w:tr");
    for column in 0..columns {
        let text = values.get(column).map(String::as_str).unwrap_or("");
        let alignment = ALIGNMENTS.get(column).copied().unwrap_or("left");
        row.push_element(item_cell(text, alignment));
    }
    row
}

fn item_cell(text: &str, alignment: &str) -> XmlElement {
    let mut text_el = XmlElement::new("w:t");
    if !text.is_empty() {
        text_el = text_el.with_text(text);
    }
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        text_el.set_attr("xml:space", "preserve");
    }

    let mut run = XmlElement::new("w:r");
    set_run_font(&mut run, CELL_FONT);
    set_run_size(&mut run, CELL_SIZE);
    run.push_element(text_el);

    let mut paragraph = XmlElement::new("w:p");
    set_paragraph_alignment(&mut paragraph, alignment);
    paragraph.push_element(run);

    let mut cell = XmlElement::new("w:tc");
    cell.push_element(paragraph);
    set_cell_borders(&mut cell, BORDER_WHITE, 6);
    set_cell_shading(&mut cell, ITEM_ROW_SHADE);
    cell
}
