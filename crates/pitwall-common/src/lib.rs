//! Shared building blocks for the pitwall bridge: workbook addresses, raw engine
//! cell values, domain values and the coercion rules between them.

pub mod address;
pub mod coerce;
pub mod value;

pub use address::{AddressError, CellAddress, RangeAddress, Sheet, col_to_a1, parse_a1};
pub use coerce::{ABSENT_DASH, CellWrite, coerce_payload, normalize_inbound, normalize_outbound};
pub use value::{CellValue, DomainValue, Keyword};
