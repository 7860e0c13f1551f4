//! Environment-driven configuration.

use std::env;

/// Resource URLs used during generation. Every field is optional: without
/// a template URL the embedded layout is used, and without an image URL
/// the corresponding paid artwork is skipped.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// DOCX template to download, `INVOICE_TEMPLATE_URL`
    pub template_url: Option<String>,
    /// PAID stamp image, `PAID_STAMP_URL`
    pub paid_stamp_url: Option<String>,
    /// Signature image, `SIGNATURE_URL`
    pub signature_url: Option<String>,
}

impl GeneratorConfig {
    /// Blank or whitespace-only values count as unset.
    pub fn from_env() -> Self {
        Self {
            template_url: env_url("INVOICE_TEMPLATE_URL"),
            paid_stamp_url: env_url("PAID_STAMP_URL"),
            signature_url: env_url("SIGNATURE_URL"),
        }
    }
}

fn env_url(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Listen port from `PORT`, defaulting to 8080.
pub fn server_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080)
}
