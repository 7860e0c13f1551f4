//! Invoice service - business logic for turning request payloads into
//! finished DOCX documents.
//!
//! The flow is: resolve a template (remote download or the embedded
//! layout), substitute placeholders, rebuild the items table, style the
//! financial summary, add the paid artwork when requested, and hand the
//! bytes back with a download filename.

pub mod common;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod validation;

pub use generator::InvoiceGenerator;
pub use models::{InvoiceRequest, LineItem};

use thiserror::Error;

use crate::docx::DocxError;
use crate::fetch::TemplateSource;

/// Errors that can occur during invoice generation.
///
/// Download problems never show up here: a failed template fetch falls
/// back to the embedded layout and a failed image fetch skips the artwork.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("failed to load document template: {0}")]
    Template(#[source] DocxError),
    #[error("failed to assemble document: {0}")]
    Assemble(#[source] DocxError),
}

/// Result of a successful invoice generation.
#[derive(Debug)]
pub struct GeneratedInvoice {
    pub filename: String,
    pub docx: Vec<u8>,
    pub template_source: TemplateSource,
}
