//! OPC package handling.
//!
//! Loads every ZIP entry into memory keyed by part name. Only parts the
//! assembler touches are rewritten; everything else (styles, fonts, headers,
//! theme) is written back byte for byte so remote templates keep their look.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::{self, XmlElement};
use super::DocxError;

/// Part name of the main document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl DocxPackage {
    /// Reads a `.docx` ZIP container. Fails when the bytes are not a ZIP
    /// archive or the archive has no main document part.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.insert(entry.name().to_string(), data);
        }
        Self::from_parts(parts)
    }

    pub fn from_parts<I>(parts: I) -> Result<Self, DocxError>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let package = Self {
            parts: parts.into_iter().collect(),
        };
        if !package.parts.contains_key(DOCUMENT_PART) {
            return Err(DocxError::MissingPart(DOCUMENT_PART.to_string()));
        }
        Ok(package)
    }

    /// Serializes the package back into `.docx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn document_xml(&self) -> &[u8] {
        self.parts
            .get(DOCUMENT_PART)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set_document_xml(&mut self, xml: Vec<u8>) {
        self.parts.insert(DOCUMENT_PART.to_string(), xml);
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Stores image bytes under `word/media/` and wires up the content type
    /// and document relationship. Returns the relationship id the drawing
    /// must reference.
    pub fn add_image(
        &mut self,
        bytes: Vec<u8>,
        extension: &str,
        content_type: &str,
    ) -> Result<String, DocxError> {
        let index = self.next_media_index();
        let file_name = format!("image{index}.{extension}");
        self.register_default_content_type(extension, content_type)?;
        let rel_id = self.add_document_relationship(IMAGE_REL_TYPE, &format!("media/{file_name}"))?;
        self.parts.insert(format!("word/media/{file_name}"), bytes);
        Ok(rel_id)
    }

    fn next_media_index(&self) -> u32 {
        self.parts
            .keys()
            .filter_map(|name| name.strip_prefix("word/media/image"))
            .filter_map(|rest| rest.split('.').next())
            .filter_map(|digits| digits.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }

    fn add_document_relationship(
        &mut self,
        rel_type: &str,
        target: &str,
    ) -> Result<String, DocxError> {
        let mut rels = match self.parts.get(DOCUMENT_RELS_PART) {
            Some(existing) => xml::parse(existing)?,
            None => XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS),
        };
        let next = rels
            .children_named("Relationship")
            .filter_map(|rel| rel.attr("Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|digits| digits.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let rel_id = format!("rId{next}");
        rels.push_element(
            XmlElement::new("Relationship")
                .with_attr("Id", &rel_id)
                .with_attr("Type", rel_type)
                .with_attr("Target", target),
        );
        self.parts
            .insert(DOCUMENT_RELS_PART.to_string(), xml::serialize(&rels)?);
        Ok(rel_id)
    }

    fn register_default_content_type(
        &mut self,
        extension: &str,
        content_type: &str,
    ) -> Result<(), DocxError> {
        let mut types = match self.parts.get(CONTENT_TYPES_PART) {
            Some(existing) => xml::parse(existing)?,
            None => XmlElement::new("Types").with_attr("xmlns", CONTENT_TYPES_NS),
        };
        let already_declared = types.children_named("Default").any(|default| {
            default
                .attr("Extension")
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        });
        if !already_declared {
            types.push_element(
                XmlElement::new("Default")
                    .with_attr("Extension", extension)
                    .with_attr("ContentType", content_type),
            );
            self.parts
                .insert(CONTENT_TYPES_PART.to_string(), xml::serialize(&types)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_parts() -> Vec<(String, Vec<u8>)> {
        vec![
            (
                CONTENT_TYPES_PART.to_string(),
                br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_vec(),
            ),
            (
                DOCUMENT_PART.to_string(),
                br#"<w:document><w:body><w:p/></w:body></w:document>"#.to_vec(),
            ),
        ]
    }

    #[test]
    fn test_round_trip_preserves_unknown_parts() {
        let mut parts = minimal_parts();
        parts.push(("word/styles.xml".to_string(), b"<styles/>".to_vec()));
        let package = DocxPackage::from_parts(parts).unwrap();

        let bytes = package.to_bytes().unwrap();
        let reloaded = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.part("word/styles.xml"), Some(b"<styles/>".as_ref()));
        assert_eq!(reloaded.document_xml(), package.document_xml());
    }

    #[test]
    fn test_rejects_archive_without_document_part() {
        let result = DocxPackage::from_parts(vec![("other.xml".to_string(), b"<x/>".to_vec())]);
        assert!(matches!(result, Err(DocxError::MissingPart(_))));
    }

    #[test]
    fn test_rejects_bytes_that_are_not_a_zip() {
        assert!(DocxPackage::from_bytes(b"definitely not a zip").is_err());
    }

    #[test]
    fn test_add_image_registers_part_rel_and_content_type() {
        let mut package = DocxPackage::from_parts(minimal_parts()).unwrap();
        let rel_id = package
            .add_image(vec![1, 2, 3], "png", "image/png")
            .unwrap();
        assert_eq!(rel_id, "rId1");
        assert_eq!(package.part("word/media/image1.png"), Some([1u8, 2, 3].as_ref()));

        let rels = String::from_utf8(package.part(DOCUMENT_RELS_PART).unwrap().to_vec()).unwrap();
        assert!(rels.contains("media/image1.png"));
        assert!(rels.contains("rId1"));

        let types = String::from_utf8(package.part(CONTENT_TYPES_PART).unwrap().to_vec()).unwrap();
        assert!(types.contains("image/png"));
    }

    #[test]
    fn test_add_image_skips_taken_rel_ids_and_names() {
        let mut parts = minimal_parts();
        parts.push((
            DOCUMENT_RELS_PART.to_string(),
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="t" Target="styles.xml"/></Relationships>"#.to_vec(),
        ));
        parts.push(("word/media/image2.png".to_string(), vec![0]));
        let mut package = DocxPackage::from_parts(parts).unwrap();

        let rel_id = package
            .add_image(vec![9, 9], "png", "image/png")
            .unwrap();
        assert_eq!(rel_id, "rId4");
        assert!(package.has_part("word/media/image3.png"));
    }

    #[test]
    fn test_content_type_not_duplicated() {
        let mut package = DocxPackage::from_parts(minimal_parts()).unwrap();
        package.add_image(vec![1], "png", "image/png").unwrap();
        package.add_image(vec![2], "png", "image/png").unwrap();
        let types = String::from_utf8(package.part(CONTENT_TYPES_PART).unwrap().to_vec()).unwrap();
        assert_eq!(types.matches("image/png").count(), 1);
    }
}
