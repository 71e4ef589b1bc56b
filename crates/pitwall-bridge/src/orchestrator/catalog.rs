use pitwall_schema::{Layout, TYRE_SUPPLIERS};

use crate::connection::Session;
use crate::error::BridgeError;

/// Track names from the workbook's track catalogue, blanks skipped.
pub fn list_tracks(session: &mut Session<'_>, layout: &Layout) -> Result<Vec<String>, BridgeError> {
    let rows = session.read_range(layout.tracks)?;
    Ok(rows
        .into_iter()
        .flatten()
        .filter(|value| !value.is_absent())
        .map(|value| value.to_string())
        .collect())
}

/// Fixed supplier list; does not touch the engine.
pub fn tyre_suppliers() -> Vec<&'static str> {
    TYRE_SUPPLIERS.to_vec()
}
