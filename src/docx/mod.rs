//! Minimal WordprocessingML toolkit.
//!
//! A `.docx` file is a ZIP package of XML parts. [`package`] handles the ZIP
//! container and the package-level bookkeeping parts (content types and
//! relationships), [`xml`] provides the owned element tree every other module
//! works on, and [`document`], [`text`], [`table`] and [`media`] operate on
//! the main `word/document.xml` part. Parts that are never touched survive a
//! load/save cycle byte for byte, so arbitrary third-party templates keep
//! their styling, headers and numbering intact.

pub mod document;
pub mod media;
pub mod package;
pub mod table;
pub mod template;
pub mod text;
pub mod xml;

pub use document::DocxDocument;
pub use package::DocxPackage;

use thiserror::Error;

/// MIME type of a rendered `.docx` file.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("ZIP container error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("part is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("package is missing required part {0}")]
    MissingPart(String),
    #[error("malformed document: {0}")]
    Malformed(String),
}
