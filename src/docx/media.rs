//! Inline image insertion.
//!
//! Word needs three things for a picture: the bytes under `word/media/`, a
//! relationship from the document part to that file, and an inline drawing
//! element in the body sized in EMUs. Dimensions are read straight from the
//! PNG IHDR chunk or the JPEG SOF segment; bytes that are neither are
//! reported back so the caller can skip the image instead of producing a
//! document Word refuses to open.

use super::document::{append_body_paragraph, DocxDocument};
use super::package::DocxPackage;
use super::text::{find_paragraph_with_token_mut, replace_in_paragraph};
use super::xml::XmlElement;
use super::DocxError;

/// EMUs per pixel at the 96 DPI Word assumes for screen images.
pub const EMU_PER_PIXEL: u64 = 9525;

const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// Identifies the image format from its magic bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageKind::Png);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageKind::Jpeg);
    }
    None
}

/// Pixel dimensions, or `None` when the header is truncated or corrupt.
pub fn image_dimensions(kind: ImageKind, bytes: &[u8]) -> Option<(u32, u32)> {
    match kind {
        ImageKind::Png => png_dimensions(bytes),
        ImageKind::Jpeg => jpeg_dimensions(bytes),
    }
}

/// Registers the image in the package and places an inline drawing where
/// `anchor_token` sits in the body, scaled down to `max_width_emu` when the
/// natural size is wider. Without an anchor the image goes at the end of
/// the body. Returns `Ok(false)` when the bytes are not a usable image, in
/// which case nothing was modified.
pub fn insert_image_at_anchor(
    package: &mut DocxPackage,
    document: &mut DocxDocument,
    bytes: &[u8],
    anchor_token: &str,
    display_name: &str,
    max_width_emu: u64,
) -> Result<bool, DocxError> {
    let Some(kind) = sniff_image(bytes) else {
        return Ok(false);
    };
    let Some((width_px, height_px)) = image_dimensions(kind, bytes) else {
        return Ok(false);
    };
    if width_px == 0 || height_px == 0 || document.body().is_none() {
        return Ok(false);
    }

    let natural_cx = width_px as u64 * EMU_PER_PIXEL;
    let cx = natural_cx.min(max_width_emu);
    // height * EMU_PER_PIXEL * cx / natural_cx with the EMU factor
    // cancelled; the full product can exceed u64 for header-declared sizes.
    let cy = height_px as u64 * cx / width_px as u64;

    let rel_id = package.add_image(bytes.to_vec(), kind.extension(), kind.content_type())?;
    let drawing_id = next_drawing_id(document.root());
    let run = drawing_run(&rel_id, display_name, drawing_id, cx, cy);

    if let Some(body) = document.body_mut() {
        match find_paragraph_with_token_mut(body, anchor_token) {
            Some(paragraph) => {
                replace_in_paragraph(paragraph, anchor_token, "");
                paragraph.push_element(run);
            }
            None => {
                append_body_paragraph(body, XmlElement::new("w:p").with_child(run));
            }
        }
    }
    Ok(true)
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[12..16] != *b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((width, height))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut index = 2;
    while index + 9 <= bytes.len() {
        if bytes[index] != 0xFF {
            return None;
        }
        match bytes[index + 1] {
            0xFF => index += 1,
            0x01 | 0xD0..=0xD8 => index += 2,
            // Any SOF marker carries the frame size.
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                let height = u16::from_be_bytes([bytes[index + 5], bytes[index + 6]]);
                let width = u16::from_be_bytes([bytes[index + 7], bytes[index + 8]]);
                return Some((width as u32, height as u32));
            }
            0xD9 | 0xDA => return None,
            _ => {
                let length = u16::from_be_bytes([bytes[index + 2], bytes[index + 3]]) as usize;
                if length < 2 {
                    return None;
                }
                index += 2 + length;
            }
        }
    }
    None
}

fn next_drawing_id(root: &XmlElement) -> u32 {
    let mut max_id = 0;
    visit_elements(root, &mut |el| {
        if el.is_named("docPr") {
            if let Some(id) = el.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                max_id = max_id.max(id);
            }
        }
    });
    max_id + 1
}

fn visit_elements(element: &XmlElement, visit: &mut dyn FnMut(&XmlElement)) {
    visit(element);
    for child in element.child_elements() {
        visit_elements(child, visit);
    }
}

fn drawing_run(rel_id: &str, name: &str, id: u32, cx: u64, cy: u64) -> XmlElement {
    let cx = cx.to_string();
    let cy = cy.to_string();
    let id_value = id.to_string();

    let picture = XmlElement::new("pic:pic")
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attr("id", &id_value)
                        .with_attr("name", name),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attr("r:embed", rel_id))
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(
                            XmlElement::new("a:ext")
                                .with_attr("cx", &cx)
                                .with_attr("cy", &cy),
                        ),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );

    let inline = XmlElement::new("wp:inline")
        .with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
        .with_attr("xmlns:wp", WP_NS)
        .with_attr("xmlns:a", A_NS)
        .with_attr("xmlns:pic", PIC_NS)
        .with_attr("xmlns:r", R_NS)
        .with_child(
            XmlElement::new("wp:extent")
                .with_attr("cx", &cx)
                .with_attr("cy", &cy),
        )
        .with_child(
            XmlElement::new("wp:effectExtent")
                .with_attr("l", "0")
                .with_attr("t", "0")
                .with_attr("r", "0")
                .with_attr("b", "0"),
        )
        .with_child(
            XmlElement::new("wp:docPr")
                .with_attr("id", &id_value)
                .with_attr("name", name),
        )
        .with_child(
            XmlElement::new("wp:cNvGraphicFramePr")
                .with_child(XmlElement::new("a:graphicFrameLocks").with_attr("noChangeAspect", "1")),
        )
        .with_child(
            XmlElement::new("a:graphic").with_child(
                XmlElement::new("a:graphicData")
                    .with_attr("uri", PIC_NS)
                    .with_child(picture),
            ),
        );

    XmlElement::new("w:r").with_child(XmlElement::new("w:drawing").with_child(inline))
}
