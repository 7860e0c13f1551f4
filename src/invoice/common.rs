//! Shared formatting helpers for invoice rendering.

/// Formats a monetary amount in Indonesian style: `Rp 2.500.000` for whole
/// amounts, `Rp 1.234.567,89` when cents are present.
///
/// Zero renders as an empty string so unused rows in the financial summary
/// stay blank instead of showing `Rp 0`.
pub fn format_currency(value: f64) -> String {
    if value == 0.0 {
        return String::new();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if magnitude == magnitude.trunc() {
        return format!("Rp {sign}{}", thousands(magnitude as i64));
    }
    let cents = (magnitude * 100.0).round() as i64;
    format!("Rp {sign}{},{:02}", thousands(cents / 100), cents % 100)
}

/// Formats a quantity without a trailing `.0` for whole numbers.
pub fn format_quantity(value: f64) -> String {
    if value == value.trunc() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Replaces characters that are unsafe in download filenames with
/// underscores. Spaces are replaced too, so header values need no quoting.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Builds the download filename for a generated invoice.
pub fn invoice_filename(invoice_number: &str, client_name: &str, paid: bool) -> String {
    let prefix = if paid { "Paid_Invoice" } else { "Invoice" };
    format!(
        "{prefix}_{}_{}.docx",
        sanitize_filename(invoice_number),
        sanitize_filename(client_name)
    )
}

fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}
