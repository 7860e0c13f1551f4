//! Request payload for the invoice endpoint.
//!
//! The payload is deliberately loose: `client_info`, `invoice_details` and
//! `financials` are open maps whose keys are the literal placeholder tokens
//! of the template (`{{client_name}}`, `[subtotal]`). Values are substituted
//! as-is, so the caller decides the currency formatting of the financial
//! fields. Only the presence of the four top-level sections is validated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::common::{format_currency, format_quantity};
use super::validation::{ValidationError, ValidationErrors};

/// Placeholder for the late fee row label in the financial summary.
pub const LATE_FEE_LABEL_TOKEN: &str = "{{LATE FEE:}}";
/// Placeholder for the late fee amount in the financial summary.
pub const LATE_FEE_VALUE_TOKEN: &str = "[latefee]";
/// Text shown in place of the label token when the late fee applies.
pub const LATE_FEE_LABEL: &str = "LATE FEE";

/// Token under `client_info` whose value names the client in the download
/// filename.
const CLIENT_NAME_TOKEN: &str = "{{client_name}}";

/// A single billed line in the items table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    /// What was delivered
    #[serde(default)]
    #[schema(example = "Landing page design")]
    pub description: String,
    /// Price per unit, in rupiah
    #[serde(default)]
    #[schema(example = 2_500_000.0)]
    pub unit_price: f64,
    /// Number of units
    #[serde(default)]
    #[schema(example = 1.0)]
    pub quantity: f64,
    /// Line total, in rupiah
    #[serde(default)]
    #[schema(example = 2_500_000.0)]
    pub total: f64,
}

impl LineItem {
    /// Cell texts in table column order: description, unit price,
    /// quantity, total.
    pub fn table_row(&self) -> [String; 4] {
        [
            self.description.clone(),
            format_currency(self.unit_price),
            format_quantity(self.quantity),
            format_currency(self.total),
        ]
    }
}

/// Request body for invoice generation.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct InvoiceRequest {
    /// Client fields, keyed by the `{{...}}` tokens of the template
    #[schema(value_type = Object, example = json!({"{{client_name}}": "PT Maju Jaya", "{{client_email}}": "billing@majujaya.co.id"}))]
    pub client_info: Option<BTreeMap<String, Value>>,
    /// Invoice metadata, keyed by the `{{...}}` tokens of the template
    #[schema(value_type = Object, example = json!({"{{invoice_number}}": "INV-042", "{{invoice_date}}": "24 August 2026"}))]
    pub invoice_details: Option<BTreeMap<String, Value>>,
    /// Monetary fields, keyed by the `[...]` tokens of the template, with
    /// pre-formatted currency strings as values
    #[schema(value_type = Object, example = json!({"[subtotal]": "Rp 2.500.000", "[grandtotal]": "Rp 2.750.000"}))]
    pub financials: Option<BTreeMap<String, Value>>,
    /// Billed lines for the items table
    pub items: Option<Vec<LineItem>>,
    /// Show the late fee row in the financial summary
    #[serde(default)]
    pub apply_late_fee: bool,
    /// Stamp the document as paid and attach the signature image
    #[serde(default)]
    pub mark_as_paid: bool,
    /// Invoice number for the download filename
    #[schema(example = "INV-042")]
    pub invoice_number: Option<String>,
}

impl InvoiceRequest {
    /// Requires the four top-level sections. Content inside them is free
    /// form, so an empty object or list still passes.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();
        if self.client_info.is_none() {
            errors.add(ValidationError::missing_field("client_info"));
        }
        if self.invoice_details.is_none() {
            errors.add(ValidationError::missing_field("invoice_details"));
        }
        if self.items.is_none() {
            errors.add(ValidationError::missing_field("items"));
        }
        if self.financials.is_none() {
            errors.add(ValidationError::missing_field("financials"));
        }
        errors.into_result()
    }

    /// Client name for the download filename, `Client` when absent.
    pub fn client_name(&self) -> String {
        self.client_info
            .as_ref()
            .and_then(|info| info.get(CLIENT_NAME_TOKEN))
            .map(value_to_text)
            .unwrap_or_else(|| "Client".to_string())
    }

    /// Invoice number for the download filename, `INV` when absent.
    pub fn invoice_number(&self) -> String {
        self.invoice_number
            .clone()
            .unwrap_or_else(|| "INV".to_string())
    }

    /// Builds the placeholder substitution list.
    ///
    /// The three sections merge into one map, later sections winning on key
    /// collisions, and the late fee toggle overrides both late fee tokens
    /// last. The list is ordered longest token first so a token that
    /// contains a shorter one is never clipped by it.
    pub fn replacements(&self) -> Vec<(String, String)> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for section in [&self.client_info, &self.invoice_details, &self.financials] {
            if let Some(fields) = section {
                for (token, value) in fields {
                    map.insert(token.clone(), value_to_text(value));
                }
            }
        }
        if self.apply_late_fee {
            map.insert(LATE_FEE_LABEL_TOKEN.to_string(), LATE_FEE_LABEL.to_string());
        } else {
            map.insert(LATE_FEE_LABEL_TOKEN.to_string(), String::new());
            map.insert(LATE_FEE_VALUE_TOKEN.to_string(), String::new());
        }
        let mut pairs: Vec<(String, String)> = map.into_iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        pairs
    }
}

/// Text form of an arbitrary JSON value, with null as empty string.
/// Replacement values are never interpreted beyond this, so financial
/// strings arrive in the document exactly as the caller formatted them.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_from(value: Value) -> InvoiceRequest {
        serde_json::from_value(value).unwrap()
    }

    fn find(pairs: &[(String, String)], token: &str) -> Option<String> {
        pairs
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.clone())
    }

    #[test]
    fn test_empty_payload_deserializes_with_defaults() {
        let request = request_from(json!({}));
        assert!(request.client_info.is_none());
        assert!(request.items.is_none());
        assert!(request.invoice_number.is_none());
        assert!(!request.apply_late_fee);
        assert!(!request.mark_as_paid);
    }

    #[test]
    fn test_validate_reports_each_missing_section() {
        let request = request_from(json!({ "items": [] }));
        let message = request.validate().unwrap_err();
        assert_eq!(
            message,
            "Missing required field: client_info; Missing required field: invoice_details; Missing required field: financials"
        );
    }

    #[test]
    fn test_validate_accepts_empty_sections() {
        let request = request_from(json!({
            "client_info": {},
            "invoice_details": {},
            "financials": {},
            "items": []
        }));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_name_and_number_defaults() {
        let request = request_from(json!({}));
        assert_eq!(request.client_name(), "Client");
        assert_eq!(request.invoice_number(), "INV");

        let request = request_from(json!({
            "client_info": { "{{client_name}}": "PT Maju Jaya" },
            "invoice_number": "INV-042"
        }));
        assert_eq!(request.client_name(), "PT Maju Jaya");
        assert_eq!(request.invoice_number(), "INV-042");
    }

    #[test]
    fn test_replacements_use_payload_keys_verbatim() {
        let request = request_from(json!({
            "client_info": { "{{client_name}}": "PT Maju Jaya" },
            "invoice_details": { "{{invoice_number}}": "INV-042" },
            "financials": { "[subtotal]": "Rp 2.500.000" }
        }));
        let pairs = request.replacements();
        assert_eq!(find(&pairs, "{{client_name}}").unwrap(), "PT Maju Jaya");
        assert_eq!(find(&pairs, "{{invoice_number}}").unwrap(), "INV-042");
        assert_eq!(find(&pairs, "[subtotal]").unwrap(), "Rp 2.500.000");
    }

    #[test]
    fn test_replacement_values_stay_opaque() {
        // Financial strings are never reformatted and non-string scalars
        // coerce to their plain text form.
        let request = request_from(json!({
            "client_info": { "{{client_address}}": null },
            "financials": { "[tax]": "Rp 275.000", "[discount]": 50_000, "[note]": "waived" }
        }));
        let pairs = request.replacements();
        assert_eq!(find(&pairs, "{{client_address}}").unwrap(), "");
        assert_eq!(find(&pairs, "[tax]").unwrap(), "Rp 275.000");
        assert_eq!(find(&pairs, "[discount]").unwrap(), "50000");
        assert_eq!(find(&pairs, "[note]").unwrap(), "waived");
    }

    #[test]
    fn test_late_fee_disabled_blanks_both_tokens() {
        let request = request_from(json!({
            "financials": { "[latefee]": "Rp 100.000" }
        }));
        let pairs = request.replacements();
        assert_eq!(find(&pairs, LATE_FEE_LABEL_TOKEN).unwrap(), "");
        assert_eq!(find(&pairs, LATE_FEE_VALUE_TOKEN).unwrap(), "");
    }

    #[test]
    fn test_late_fee_enabled_keeps_amount_and_sets_label() {
        let request = request_from(json!({
            "financials": { "[latefee]": "Rp 100.000" },
            "apply_late_fee": true
        }));
        let pairs = request.replacements();
        assert_eq!(find(&pairs, LATE_FEE_LABEL_TOKEN).unwrap(), LATE_FEE_LABEL);
        assert_eq!(find(&pairs, LATE_FEE_VALUE_TOKEN).unwrap(), "Rp 100.000");
    }

    #[test]
    fn test_replacements_sorted_longest_first() {
        let request = request_from(json!({
            "client_info": { "{{client}}": "short", "{{client_name_full}}": "long" },
            "financials": { "[x]": "1" }
        }));
        let pairs = request.replacements();
        for window in pairs.windows(2) {
            assert!(window[0].0.len() >= window[1].0.len());
        }
    }

    #[test]
    fn test_line_item_row_formatting() {
        let item = LineItem {
            description: "Design".to_string(),
            unit_price: 2_500_000.0,
            quantity: 2.0,
            total: 5_000_000.0,
        };
        assert_eq!(
            item.table_row(),
            [
                "Design".to_string(),
                "Rp 2.500.000".to_string(),
                "2".to_string(),
                "Rp 5.000.000".to_string()
            ]
        );
    }

    #[test]
    fn test_line_item_missing_fields_default() {
        let item: LineItem = serde_json::from_value(json!({ "description": "X" })).unwrap();
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.table_row(), ["X", "", "0", ""]);
    }
}
