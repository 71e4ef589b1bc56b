//! Write → recalculate → read use cases.
//!
//! Every use case is a plain function over a [`Session`]; the caller owns
//! connection acquisition and serialization (see [`crate::Bridge`]).

mod catalog;
mod driver;
mod setup;
mod state;
mod strategy;
mod weather;

pub use catalog::{list_tracks, tyre_suppliers};
pub use driver::update_driver_car;
pub use setup::calculate_setup;
pub use state::read_state;
pub use strategy::calculate_strategy;
pub use weather::update_setup_weather;

use pitwall_common::{CellValue, normalize_inbound};
use pitwall_schema::{Field, Layout, TRACK_PLACEHOLDER};

use crate::batch::WriteBatch;
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::{FieldValues, Fields, field};

/// Queue the track selection unless it is empty or the "nothing selected" entry.
fn queue_track(batch: &mut WriteBatch, layout: &Layout, pista: &CellValue) {
    let track = normalize_inbound(pista);
    if track.is_absent() {
        return;
    }
    if track.as_str() == Some(TRACK_PLACEHOLDER) {
        tracing::debug!("track placeholder selected; keeping stored track");
        return;
    }
    batch.set(layout.current_track.key, layout.current_track.cell, pista);
}

/// Queue one write per field, taking values by field key.
fn queue_fields(batch: &mut WriteBatch, fields: &[Field], values: &FieldValues) {
    for f in fields {
        batch.set(f.key, f.cell, field(values, f.key));
    }
}

fn read_fields(session: &mut Session<'_>, fields: &[Field]) -> Result<Fields, BridgeError> {
    fields
        .iter()
        .map(|f| Ok((f.key, session.read_field(f)?)))
        .collect()
}
