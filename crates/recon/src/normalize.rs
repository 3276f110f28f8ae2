//! Identity-key normalization for CPF/CNPJ document numbers.

use crate::model::Cell;

/// Canonicalize a raw document value into a digits-only key.
///
/// Total and idempotent: anything that is not a digit is dropped, after one
/// trailing `.0` (a float that went through a spreadsheet) is removed.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    trimmed.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a loaded cell. Numbers render without a fractional part first.
pub fn normalize_cell(cell: &Cell) -> String {
    match cell {
        Cell::Empty | Cell::DateTime(_) => String::new(),
        Cell::Number(n) if !n.is_finite() => String::new(),
        other => normalize(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_cpf() {
        assert_eq!(normalize("123.456.789-00"), "12345678900");
    }

    #[test]
    fn formatted_cnpj() {
        assert_eq!(normalize("12.345.678/0001-90"), "12345678000190");
    }

    #[test]
    fn float_artifact_stripped() {
        assert_eq!(normalize("12345678900.0"), "12345678900");
        assert_eq!(normalize(" 12345678900.0 "), "12345678900");
    }

    #[test]
    fn same_document_same_key() {
        let variants = ["123.456.789-00", "12345678900", "12345678900.0", " 123 456 789 00 ", "123456789-00"];
        for v in variants {
            assert_eq!(normalize(v), "12345678900", "variant {v:?}");
        }
    }

    #[test]
    fn idempotent() {
        for raw in ["123.456.789-00", "abc", "", "nan", "1.0", "0.0", "12.345.678/0001-90", "7.0.0"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "raw {raw:?}");
        }
    }

    #[test]
    fn garbage_yields_empty() {
        assert_eq!(normalize("nan"), "");
        assert_eq!(normalize("-"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn cells() {
        assert_eq!(normalize_cell(&Cell::Number(12345678900.0)), "12345678900");
        assert_eq!(normalize_cell(&Cell::text("123.456.789-00")), "12345678900");
        assert_eq!(normalize_cell(&Cell::Empty), "");
        assert_eq!(normalize_cell(&Cell::Number(f64::NAN)), "");
    }
}
