use pitwall_schema::Layout;

use super::queue_fields;
use crate::batch::{WriteBatch, WritePolicy};
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::SetupWeatherUpdate;

/// Store weather and temperature windows. No recalculation; the setup page
/// triggers that separately.
pub fn update_setup_weather(
    session: &mut Session<'_>,
    layout: &Layout,
    policy: WritePolicy,
    update: &SetupWeatherUpdate,
) -> Result<(), BridgeError> {
    let mut batch = WriteBatch::new();
    queue_fields(&mut batch, &layout.weather, &update.values);
    queue_fields(&mut batch, &layout.temperature_bounds, &update.values);
    batch.apply(session).enforce(policy)
}
