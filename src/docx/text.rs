//! Placeholder substitution over a paragraph's logical text.
//!
//! Word splits visually continuous text into separate runs whenever
//! formatting, spell-check state or revision history changes, so a token
//! like `{{invoice_number}}` routinely arrives as `{{invoice_` in one run
//! and `number}}` in the next. Matching therefore happens on the
//! concatenation of every `w:t` in the paragraph; each `w:t` is then
//! rebuilt against the matched byte ranges. The replacement text is
//! written into the run where the match starts, later runs covered by the
//! match lose only the matched characters, and every run keeps its own
//! formatting properties.
//!
//! Tabs and line breaks count as one character in the logical text, the
//! same way Word displays them. A token interrupted by a visible break is
//! genuinely interrupted and stays literal.

use super::xml::{XmlElement, XmlNode};

/// Concatenated visible text of the paragraph: every `w:t` in document
/// order, with `\t` for tabs and `\n` for breaks.
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut out = String::new();
    collect_text(paragraph, &mut out);
    out
}

/// Replaces every occurrence of `token` in the paragraph's logical text.
/// Returns how many occurrences were replaced.
pub fn replace_in_paragraph(paragraph: &mut XmlElement, token: &str, replacement: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    let full = paragraph_text(paragraph);
    let mut matches = Vec::new();
    let mut from = 0;
    while let Some(offset) = full[from..].find(token) {
        let start = from + offset;
        matches.push((start, start + token.len()));
        from = start + token.len();
    }
    if matches.is_empty() {
        return 0;
    }
    let mut cursor = 0;
    rewrite_text_nodes(paragraph, &mut cursor, &matches, replacement);
    matches.len()
}

/// Applies `replacements` in order. Callers sort longer tokens first so a
/// token that is a prefix of another can never steal its match.
pub fn substitute_paragraph(paragraph: &mut XmlElement, replacements: &[(String, String)]) {
    for (token, value) in replacements {
        replace_in_paragraph(paragraph, token, value);
    }
}

/// First paragraph under `scope` whose logical text contains `token`.
/// Paragraphs nested inside drawings are not searched.
pub fn find_paragraph_with_token_mut<'a>(
    scope: &'a mut XmlElement,
    token: &str,
) -> Option<&'a mut XmlElement> {
    for child in scope.children.iter_mut() {
        let XmlNode::Element(el) = child else { continue };
        if el.is_named("pPr") || el.is_named("rPr") || el.is_named("drawing") {
            continue;
        }
        if el.is_named("p") {
            if paragraph_text(el).contains(token) {
                return Some(el);
            }
            continue;
        }
        if let Some(found) = find_paragraph_with_token_mut(el, token) {
            return Some(found);
        }
    }
    None
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in element.child_elements() {
        if child.is_named("t") {
            out.push_str(&child.text_content());
        } else if child.is_named("tab") {
            out.push('\t');
        } else if child.is_named("br") || child.is_named("cr") {
            out.push('\n');
        } else if child.is_named("pPr") || child.is_named("rPr") || child.is_named("drawing") {
            continue;
        } else {
            collect_text(child, out);
        }
    }
}

// Walks the same elements as `collect_text` so byte offsets line up with
// the logical text the matches were found in.
fn rewrite_text_nodes(
    element: &mut XmlElement,
    cursor: &mut usize,
    edits: &[(usize, usize)],
    replacement: &str,
) {
    for child in element.child_elements_mut() {
        if child.is_named("t") {
            rewrite_segment(child, cursor, edits, replacement);
        } else if child.is_named("tab") || child.is_named("br") || child.is_named("cr") {
            *cursor += 1;
        } else if child.is_named("pPr") || child.is_named("rPr") || child.is_named("drawing") {
            continue;
        } else {
            rewrite_text_nodes(child, cursor, edits, replacement);
        }
    }
}

fn rewrite_segment(
    text_el: &mut XmlElement,
    cursor: &mut usize,
    edits: &[(usize, usize)],
    replacement: &str,
) {
    let original = text_el.text_content();
    let start = *cursor;
    let end = start + original.len();
    *cursor = end;

    let touched = edits.iter().any(|&(ms, me)| ms < end && me > start);
    if !touched {
        return;
    }

    let mut rebuilt = String::new();
    let mut position = start;
    while position < end {
        if let Some(&(ms, me)) = edits.iter().find(|&&(ms, me)| ms <= position && position < me) {
            // The replacement belongs to the segment where the match starts;
            // segments further along only drop the matched characters.
            if position == ms {
                rebuilt.push_str(replacement);
            }
            position = me.min(end);
            continue;
        }
        let next_edit = edits
            .iter()
            .map(|&(ms, _)| ms)
            .filter(|&ms| ms > position)
            .min()
            .unwrap_or(end)
            .min(end);
        rebuilt.push_str(&original[position - start..next_edit - start]);
        position = next_edit;
    }
    set_text(text_el, &rebuilt);
}

fn set_text(text_el: &mut XmlElement, text: &str) {
    text_el.children.clear();
    if !text.is_empty() {
        text_el.children.push(XmlNode::Text(text.to_string()));
    }
    // Word drops leading and trailing whitespace unless told not to.
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        text_el.set_attr("xml:space", "preserve");
    }
}
