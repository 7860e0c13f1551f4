//! Embedded fallback template.
//!
//! Used whenever no template URL is configured or the remote template cannot
//! be fetched or parsed, so invoice generation keeps working while the
//! template host is down. The layout mirrors the hosted Marketix Lab
//! template: contact block, items table with a placeholder row, financial
//! summary, bank details and the stamp and signature anchors.

use super::package::DocxPackage;
use super::DocxError;

const DOCUMENT_XML: &str = include_str!("../../static/fallback_document.xml");

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

/// Builds the fallback template as a ready-to-edit package.
pub fn embedded_template() -> Result<DocxPackage, DocxError> {
    DocxPackage::from_parts(vec![
        part("[Content_Types].xml", CONTENT_TYPES_XML),
        part("_rels/.rels", ROOT_RELS_XML),
        part("word/document.xml", DOCUMENT_XML),
        part("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
    ])
}

fn part(name: &str, xml: &str) -> (String, Vec<u8>) {
    (name.to_string(), xml.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::table::table_count;
    use crate::docx::text::paragraph_text;
    use crate::docx::{document::visit_paragraphs_mut, DocxDocument};

    #[test]
    fn test_embedded_template_parses() {
        let package = embedded_template().unwrap();
        let document = DocxDocument::parse(package.document_xml()).unwrap();
        assert!(document.body().is_some());
    }

    #[test]
    fn test_embedded_template_has_both_tables() {
        let package = embedded_template().unwrap();
        let document = DocxDocument::parse(package.document_xml()).unwrap();
        assert_eq!(table_count(document.body().unwrap()), 2);
    }

    #[test]
    fn test_embedded_template_carries_every_token() {
        let package = embedded_template().unwrap();
        let mut document = DocxDocument::parse(package.document_xml()).unwrap();
        let mut text = String::new();
        if let Some(body) = document.body_mut() {
            visit_paragraphs_mut(body, &mut |p| text.push_str(&paragraph_text(p)));
        }
        for token in [
            "{{client_name}}",
            "{{client_phone}}",
            "{{client_email}}",
            "{{client_address}}",
            "{{invoice_number}}",
            "{{invoice_date}}",
            "{{due_date}}",
            "{{service_description}}",
            "{{LATE FEE:}}",
            "[subtotal]",
            "[tax]",
            "[discount]",
            "[latefee]",
            "[grandtotal]",
            "{{paid_stamp}}",
            "{{signature}}",
        ] {
            assert!(text.contains(token), "template is missing {token}");
        }
    }

    #[test]
    fn test_embedded_template_round_trips_as_zip() {
        let package = embedded_template().unwrap();
        let bytes = package.to_bytes().unwrap();
        let reloaded = DocxPackage::from_bytes(&bytes).unwrap();
        assert!(reloaded.has_part("word/document.xml"));
        assert!(reloaded.has_part("_rels/.rels"));
    }
}
