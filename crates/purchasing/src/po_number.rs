//! PO number format: `PO-{year}-{4-digit sequence within year}`.

/// Render a PO number for the given year and within-year sequence.
pub fn format_po_number(year: i32, sequence: u32) -> String {
    format!("PO-{year}-{sequence:04}")
}

/// Parse a PO number back into (year, sequence). Returns `None` for anything
/// that does not match the generated format. Sequences past 9999 render with
/// five or more digits and must still parse, or year sequencing would wrap.
pub fn parse_po_number(po_number: &str) -> Option<(i32, u32)> {
    let rest = po_number.strip_prefix("PO-")?;
    let (year, seq) = rest.split_once('-')?;
    if seq.len() < 4 {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padded_sequence() {
        assert_eq!(format_po_number(2026, 7), "PO-2026-0007");
        assert_eq!(format_po_number(2026, 1234), "PO-2026-1234");
    }

    #[test]
    fn parses_generated_numbers() {
        assert_eq!(parse_po_number("PO-2026-0042"), Some((2026, 42)));
    }

    #[test]
    fn sequences_past_9999_round_trip() {
        assert_eq!(format_po_number(2026, 10_000), "PO-2026-10000");
        assert_eq!(parse_po_number("PO-2026-10000"), Some((2026, 10_000)));
        assert_eq!(parse_po_number(&format_po_number(2026, 123_456)), Some((2026, 123_456)));
    }

    #[test]
    fn rejects_foreign_formats() {
        assert_eq!(parse_po_number("PO-2026-42"), None);
        assert_eq!(parse_po_number("INV-2026-0042"), None);
        assert_eq!(parse_po_number("PO-2026-00x2"), None);
    }
}
