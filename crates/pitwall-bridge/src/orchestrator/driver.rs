use pitwall_schema::Layout;

use super::queue_fields;
use crate::batch::{WriteBatch, WritePolicy};
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::{DriverCarResult, DriverCarUpdate};

/// Store driver attributes, car parts (by position) and test points, then
/// recalculate and report the overall rating.
pub fn update_driver_car(
    session: &mut Session<'_>,
    layout: &Layout,
    policy: WritePolicy,
    update: &DriverCarUpdate,
) -> Result<DriverCarResult, BridgeError> {
    let mut batch = WriteBatch::new();
    queue_fields(&mut batch, &layout.driver, &update.driver);

    if update.car.len() > layout.car_parts.len() {
        tracing::warn!(
            received = update.car.len(),
            stored = layout.car_parts.len(),
            "ignoring extra car parts"
        );
    }
    for (part, input) in layout.car_parts.iter().zip(&update.car) {
        batch.set(format!("{}.lvl", part.name), part.level.cell, &input.lvl);
        batch.set(format!("{}.wear", part.name), part.wear.cell, &input.wear);
    }

    queue_fields(&mut batch, &layout.test_points, &update.test_points);

    batch.apply(session).enforce(policy)?;
    session.calculate()?;

    Ok(DriverCarResult {
        oa: session.read(layout.driver_total.cell)?,
    })
}
