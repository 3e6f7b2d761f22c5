//! Pattern-based entity extraction.
//!
//! Every extractor is independent and looks only at the raw (original case)
//! text. A pattern that does not match yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ExtractedEntities;

// The second branch covers identifiers glued to the keyword, e.g. `INV12345`.
static INVOICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:invoice|inv)\b\s*(?:no\.?|#|number)?\s*[:#]?\s*([a-z0-9\-]{4,})|inv(\d[a-z0-9\-]{3,}))",
    )
    .expect("valid invoice regex")
});

static PO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:purchase\s*order|po)\b\s*[:#]?\s*([a-z0-9\-]{4,})")
        .expect("valid purchase order regex")
});

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9.\-])(?:usd\s*)?\$?(\d{1,3}(?:,\d{3})*(?:\.\d{2})?|\d+(?:\.\d{2})?)\b",
    )
    .expect("valid amount regex")
});

static DUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:net\s*\d+|due\s*(?:by|on)?\s*(?:[a-z]{3,9}\s*\d{1,2}|\d{1,2}/\d{1,2}/\d{2,4}))",
    )
    .expect("valid due terms regex")
});

static PRIORITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:sev\s*-?\d|p\d)\b").expect("valid priority regex"));

pub fn extract_entities(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        invoice_number: extract_invoice_number(text),
        po_number: extract_po_number(text),
        amount: extract_amount(text),
        terms_or_due: extract_terms_or_due(text),
        declared_priority: extract_declared_priority(text),
    }
}

pub fn extract_invoice_number(text: &str) -> Option<String> {
    let captures = INVOICE_RE.captures(text)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|found| found.as_str().to_string())
}

pub fn extract_po_number(text: &str) -> Option<String> {
    first_capture(&PO_RE, text)
}

/// First standalone amount, with thousands separators removed.
///
/// Digits glued to a hyphenated identifier (`INV-2024-001`) are skipped.
pub fn extract_amount(text: &str) -> Option<String> {
    let stripped = text.replace(',', "");
    AMOUNT_RE.captures_iter(&stripped).find_map(|captures| {
        let number = captures.get(1)?;
        let followed_by_hyphen = stripped[number.end()..].starts_with('-');
        (!followed_by_hyphen).then(|| number.as_str().to_string())
    })
}

pub fn extract_terms_or_due(text: &str) -> Option<String> {
    DUE_RE.find(text).map(|found| found.as_str().to_string())
}

pub fn extract_declared_priority(text: &str) -> Option<String> {
    PRIORITY_RE.find(text).map(|found| found.as_str().to_string())
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_prefers_full_keyword() {
        assert_eq!(
            extract_invoice_number("Invoice #INV-2024-001 attached").as_deref(),
            Some("INV-2024-001")
        );
        assert_eq!(
            extract_invoice_number("invoice number: 77812").as_deref(),
            Some("77812")
        );
        assert_eq!(
            extract_invoice_number("see inv no. A-1009").as_deref(),
            Some("A-1009")
        );
    }

    #[test]
    fn invoice_number_glued_to_keyword() {
        assert_eq!(
            extract_invoice_number("Please pay INV12345 today").as_deref(),
            Some("12345")
        );
        assert_eq!(extract_invoice_number("your invoices are attached"), None);
        assert_eq!(extract_invoice_number("inventory report"), None);
    }

    #[test]
    fn invoice_token_must_be_four_chars() {
        assert_eq!(extract_invoice_number("invoice #12"), None);
        assert_eq!(extract_invoice_number("no billing words here"), None);
    }

    #[test]
    fn purchase_order_variants() {
        assert_eq!(extract_po_number("PO: PO-4471").as_deref(), Some("PO-4471"));
        assert_eq!(
            extract_po_number("Purchase Order #88231 approved").as_deref(),
            Some("88231")
        );
        assert_eq!(extract_po_number("per our policy 12345"), None);
    }

    #[test]
    fn amount_strips_commas_and_keeps_cents() {
        assert_eq!(extract_amount("total $1,234.56 due").as_deref(), Some("1234.56"));
        assert_eq!(extract_amount("USD 900 please").as_deref(), Some("900"));
        assert_eq!(extract_amount("nothing to pay"), None);
    }

    #[test]
    fn amount_skips_identifier_digits() {
        let text = "Invoice #INV-2024-001 for $1,234.56";
        assert_eq!(extract_amount(text).as_deref(), Some("1234.56"));
        assert_eq!(extract_amount("ref 2024-05 only"), None);
        assert_eq!(extract_amount("ticket sev1"), None);
    }

    #[test]
    fn terms_keep_whole_match() {
        assert_eq!(extract_terms_or_due("payable net 30").as_deref(), Some("net 30"));
        assert_eq!(
            extract_terms_or_due("Due by March 15, thanks").as_deref(),
            Some("Due by March 15")
        );
        assert_eq!(
            extract_terms_or_due("due on 4/1/2025").as_deref(),
            Some("due on 4/1/2025")
        );
        assert_eq!(extract_terms_or_due("the internet 5 is fine"), None);
    }

    #[test]
    fn declared_priority_forms() {
        assert_eq!(extract_declared_priority("sev1 issue").as_deref(), Some("sev1"));
        assert_eq!(extract_declared_priority("This is SEV-2").as_deref(), Some("SEV-2"));
        assert_eq!(extract_declared_priority("raised as P1 today").as_deref(), Some("P1"));
        assert_eq!(extract_declared_priority("severity unknown, p12"), None);
    }

    #[test]
    fn fields_are_independent() {
        let entities = extract_entities("Please pay $500.00, net 30");
        assert_eq!(entities.amount.as_deref(), Some("500.00"));
        assert_eq!(entities.terms_or_due.as_deref(), Some("net 30"));
        assert!(entities.invoice_number.is_none());
        assert!(entities.po_number.is_none());
        assert!(entities.declared_priority.is_none());
    }
}
