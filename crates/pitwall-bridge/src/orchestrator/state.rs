use pitwall_schema::Layout;

use super::read_fields;
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::{CarPartState, Fields, StateSnapshot};

/// Snapshot of every input the front-end pages show. Reads only.
pub fn read_state(session: &mut Session<'_>, layout: &Layout) -> Result<StateSnapshot, BridgeError> {
    let current_track = session.read(layout.current_track.cell)?;

    let mut driver = read_fields(session, &layout.driver)?;
    driver.insert(layout.driver_total.key, session.read(layout.driver_total.cell)?);

    let car = layout
        .car_parts
        .iter()
        .map(|part| {
            Ok(CarPartState {
                name: part.name,
                lvl: session.read_field(&part.level)?,
                wear: session.read_field(&part.wear)?,
            })
        })
        .collect::<Result<Vec<_>, BridgeError>>()?;

    let mut weather = read_fields(session, &layout.weather)?;
    weather.extend(read_fields(session, &layout.temperature_bounds)?);

    let test_points = read_fields(session, &layout.test_points)?;

    // Raw reads: the race page shows blanks rather than fallbacks here.
    let mut race_options = Fields::new();
    race_options.insert("avg_temp", session.read(layout.avg_temp().cell)?);
    let wear_percent = &layout.race_options[0]; // desgaste_pneu_percent
    race_options.insert(wear_percent.key, session.read(wear_percent.cell)?);

    Ok(StateSnapshot {
        current_track,
        driver,
        car,
        weather,
        test_points,
        race_options,
    })
}
