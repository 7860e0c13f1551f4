//! Invoice assembly engine.
//!
//! Handles the full pipeline: template resolution, placeholder
//! substitution, table work, paid artwork and final serialization. The
//! remote template and both images are best effort; only a broken
//! embedded layout or a failed serialization abort a request.

use std::sync::Arc;

use crate::config::GeneratorConfig;
use crate::docx::document::{set_run_font, visit_paragraphs_mut};
use crate::docx::media::insert_image_at_anchor;
use crate::docx::table::{nth_table_mut, rebuild_items_table, style_financial_table, CELL_FONT};
use crate::docx::template::embedded_template;
use crate::docx::text::{replace_in_paragraph, substitute_paragraph};
use crate::docx::{DocxDocument, DocxError, DocxPackage};
use crate::fetch::{ResourceFetcher, TemplateSource};

use super::common::invoice_filename;
use super::models::{LineItem, LATE_FEE_LABEL};
use super::{GeneratedInvoice, InvoiceError, InvoiceRequest};

// 914400 EMU per inch; the stamp renders at 1.5", the signature at 2".
const STAMP_WIDTH_EMU: u64 = 1_371_600;
const SIGNATURE_WIDTH_EMU: u64 = 1_828_800;

const STAMP_ANCHOR: &str = "{{paid_stamp}}";
const SIGNATURE_ANCHOR: &str = "{{signature}}";

/// Turns validated requests into finished documents.
pub struct InvoiceGenerator {
    config: GeneratorConfig,
    fetcher: Arc<dyn ResourceFetcher + Send + Sync>,
}

impl InvoiceGenerator {
    pub fn new(config: GeneratorConfig, fetcher: Arc<dyn ResourceFetcher + Send + Sync>) -> Self {
        Self { config, fetcher }
    }

    /// Renders one invoice. The request is expected to have passed
    /// [`InvoiceRequest::validate`](super::InvoiceRequest::validate).
    pub async fn generate(
        &self,
        request: &InvoiceRequest,
    ) -> Result<GeneratedInvoice, InvoiceError> {
        let (mut package, mut document, template_source) = self.resolve_template().await?;

        let replacements = request.replacements();
        if let Some(body) = document.body_mut() {
            visit_paragraphs_mut(body, &mut |paragraph| {
                substitute_paragraph(paragraph, &replacements);
            });
        }

        let rows: Vec<[String; 4]> = request
            .items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(LineItem::table_row)
            .collect();
        if let Some(body) = document.body_mut() {
            match nth_table_mut(body, 0) {
                Some(table) => rebuild_items_table(table, &rows),
                None => log::warn!(
                    "Template has no items table, skipping {} line items",
                    rows.len()
                ),
            }
        }

        let late_fee_label = request.apply_late_fee.then_some(LATE_FEE_LABEL);
        if let Some(body) = document.body_mut() {
            match nth_table_mut(body, 1) {
                Some(table) => style_financial_table(table, late_fee_label),
                None => log::warn!("Template has no financial summary table, skipping styling"),
            }
        }

        if request.mark_as_paid {
            self.insert_artwork(
                &mut package,
                &mut document,
                self.config.paid_stamp_url.as_deref(),
                STAMP_ANCHOR,
                "Paid stamp",
                STAMP_WIDTH_EMU,
            )
            .await;
            self.insert_artwork(
                &mut package,
                &mut document,
                self.config.signature_url.as_deref(),
                SIGNATURE_ANCHOR,
                "Signature",
                SIGNATURE_WIDTH_EMU,
            )
            .await;
        }
        // Anchors must never survive into the output, paid or not.
        clear_anchor(&mut document, STAMP_ANCHOR);
        clear_anchor(&mut document, SIGNATURE_ANCHOR);

        apply_body_font(&mut document);

        let xml = document.to_xml().map_err(InvoiceError::Assemble)?;
        package.set_document_xml(xml);
        let docx = package.to_bytes().map_err(InvoiceError::Assemble)?;

        let filename = invoice_filename(
            &request.invoice_number(),
            &request.client_name(),
            request.mark_as_paid,
        );
        log::info!(
            "Generated {} ({} bytes, {} template)",
            filename,
            docx.len(),
            template_source.as_str()
        );

        Ok(GeneratedInvoice {
            filename,
            docx,
            template_source,
        })
    }

    /// Downloads the configured template, falling back to the embedded
    /// layout when there is no URL, the download fails, or the bytes are
    /// not a usable document.
    async fn resolve_template(
        &self,
    ) -> Result<(DocxPackage, DocxDocument, TemplateSource), InvoiceError> {
        if let Some(url) = &self.config.template_url {
            match self.fetcher.fetch(url).await {
                Ok(bytes) => match open_package(&bytes) {
                    Ok((package, document)) => {
                        log::info!("Using downloaded template ({} bytes)", bytes.len());
                        return Ok((package, document, TemplateSource::Remote));
                    }
                    Err(e) => log::warn!(
                        "Downloaded template is unusable, falling back to embedded layout: {e}"
                    ),
                },
                Err(e) => {
                    log::warn!("Template download failed, falling back to embedded layout: {e}")
                }
            }
        }
        let package = embedded_template().map_err(InvoiceError::Template)?;
        let document =
            DocxDocument::parse(package.document_xml()).map_err(InvoiceError::Template)?;
        Ok((package, document, TemplateSource::Embedded))
    }

    async fn insert_artwork(
        &self,
        package: &mut DocxPackage,
        document: &mut DocxDocument,
        url: Option<&str>,
        anchor: &str,
        name: &str,
        max_width_emu: u64,
    ) {
        let Some(url) = url else {
            log::debug!("No URL configured for {name}, skipping");
            return;
        };
        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Could not download {name}, continuing without it: {e}");
                return;
            }
        };
        match insert_image_at_anchor(package, document, &bytes, anchor, name, max_width_emu) {
            Ok(true) => log::info!("Inserted {name} ({} bytes)", bytes.len()),
            Ok(false) => {
                log::warn!("Downloaded {name} is not a usable PNG or JPEG, continuing without it")
            }
            Err(e) => log::warn!("Could not place {name} in the document: {e}"),
        }
    }
}

fn open_package(bytes: &[u8]) -> Result<(DocxPackage, DocxDocument), DocxError> {
    let package = DocxPackage::from_bytes(bytes)?;
    let document = DocxDocument::parse(package.document_xml())?;
    Ok((package, document))
}

fn clear_anchor(document: &mut DocxDocument, anchor: &str) {
    if let Some(body) = document.body_mut() {
        visit_paragraphs_mut(body, &mut |paragraph| {
            replace_in_paragraph(paragraph, anchor, "");
        });
    }
}

// Body-level paragraphs only; table cells already carry the face from the
// table passes.
fn apply_body_font(document: &mut DocxDocument) {
    if let Some(body) = document.body_mut() {
        for paragraph in body.children_named_mut("p") {
            for run in paragraph.children_named_mut("r") {
                set_run_font(run, CELL_FONT);
            }
        }
    }
}
