use pitwall_schema::Layout;

use super::{queue_fields, queue_track};
use crate::batch::{WriteBatch, WritePolicy};
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::{SessionSetup, SetupPartResult, SetupRequest, SetupResult, WearPair};

/// Ideal setup per session and part wear for the given track and weather.
pub fn calculate_setup(
    session: &mut Session<'_>,
    layout: &Layout,
    policy: WritePolicy,
    request: &SetupRequest,
) -> Result<SetupResult, BridgeError> {
    let mut batch = WriteBatch::new();
    queue_track(&mut batch, layout, &request.pista);
    queue_fields(&mut batch, &layout.weather, &request.weather);
    batch.apply(session).enforce(policy)?;

    session.calculate()?;

    let mut sessions = Vec::with_capacity(layout.setup_results.len());
    for row in &layout.setup_results {
        let [q1, q2, race] = row.sessions;
        sessions.push(SessionSetup {
            q1: session.read(q1)?,
            q2: session.read(q2)?,
            race: session.read(race)?,
        });
    }

    let mut wear = Vec::with_capacity(layout.car_parts.len());
    for part in &layout.car_parts {
        wear.push(WearPair {
            start: session.read(part.wear.cell)?,
            end: session.read(part.wear_end)?,
        });
    }

    let mut result = SetupResult::new();
    for part in &layout.setup_parts {
        let setup = part.setup_row.and_then(|row| sessions.get(row).cloned());
        let Some(wear) = wear.get(part.wear_part).cloned() else {
            continue;
        };
        result.insert(part.key, SetupPartResult { setup, wear });
    }
    Ok(result)
}
