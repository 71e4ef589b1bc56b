//! Value coercion between raw engine cells and domain values.
//!
//! Three spellings of "nothing" exist on the engine side (an empty cell, an
//! empty string and a lone dash); all of them collapse to [`DomainValue::Absent`].

use crate::value::{CellValue, DomainValue, Keyword};

/// Placeholder the calculator prints into cells that have no value.
pub const ABSENT_DASH: &str = "-";

/// What to do with a single cell when writing a domain value into it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellWrite {
    /// Write null, emptying the cell.
    Clear,
    Set(CellValue),
}

impl CellWrite {
    pub fn is_clear(&self) -> bool {
        matches!(self, CellWrite::Clear)
    }

    /// The value to hand to the engine; `Clear` becomes an empty cell.
    pub fn into_cell_value(self) -> CellValue {
        match self {
            CellWrite::Clear => CellValue::Empty,
            CellWrite::Set(value) => value,
        }
    }
}

/// Engine cell content to a domain value.
pub fn normalize_inbound(raw: &CellValue) -> DomainValue {
    match raw {
        CellValue::Empty => DomainValue::Absent,
        CellValue::Bool(b) => DomainValue::Bool(*b),
        CellValue::Number(n) => DomainValue::Real(*n),
        CellValue::Text(text) => normalize_text(text),
    }
}

fn normalize_text(text: &str) -> DomainValue {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == ABSENT_DASH {
        return DomainValue::Absent;
    }
    if let Some(keyword) = Keyword::parse(trimmed) {
        return DomainValue::Keyword(keyword);
    }

    let candidate = trimmed.replace(',', ".");
    let parsed = if candidate.contains('.') {
        candidate.parse::<f64>().ok().map(DomainValue::Real)
    } else {
        candidate.parse::<i64>().ok().map(DomainValue::Int)
    };
    parsed.unwrap_or_else(|| DomainValue::Text(trimmed.to_string()))
}

/// Domain value to the cell operation that stores it.
pub fn normalize_outbound(value: &DomainValue) -> CellWrite {
    match value {
        DomainValue::Absent => CellWrite::Clear,
        DomainValue::Text(text) if text.is_empty() => CellWrite::Clear,
        DomainValue::Text(text) => CellWrite::Set(CellValue::Text(text.clone())),
        DomainValue::Keyword(keyword) => CellWrite::Set(CellValue::text(keyword.as_str())),
        DomainValue::Bool(b) => CellWrite::Set(CellValue::Bool(*b)),
        DomainValue::Int(i) => CellWrite::Set(CellValue::Number(*i as f64)),
        DomainValue::Real(r) => CellWrite::Set(CellValue::Number(*r)),
    }
}

/// Path every request value takes before it is written into the workbook.
pub fn coerce_payload(raw: &CellValue) -> CellWrite {
    normalize_outbound(&normalize_inbound(raw))
}
