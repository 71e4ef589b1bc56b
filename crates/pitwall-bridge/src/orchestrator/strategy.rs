use std::collections::BTreeMap;

use pitwall_common::CellValue;
use pitwall_schema::{COMPOUND_COLUMNS, Layout, STINT_COUNT, STINT_METRICS, StintTable, stint_key};

use super::{queue_fields, queue_track, read_fields};
use crate::batch::{WriteBatch, WritePolicy};
use crate::connection::Session;
use crate::error::BridgeError;
use crate::payload::{
    BoostOutput, Fields, MiniStintOutput, StintTableOutput, StrategyOutputs, StrategyRequest,
    field,
};

/// Tyre, fuel, stint and boost plan for the given race options.
pub fn calculate_strategy(
    session: &mut Session<'_>,
    layout: &Layout,
    policy: WritePolicy,
    request: &StrategyRequest,
) -> Result<StrategyOutputs, BridgeError> {
    let mut batch = WriteBatch::new();
    queue_track(&mut batch, layout, &request.pista);
    queue_fields(&mut batch, &layout.race_options, &request.race_options);
    batch.set(
        "avg_temp",
        layout.avg_temp().cell,
        field(&request.race_options, "avg_temp"),
    );

    // Manual laps replace the whole row, or nothing at all.
    if !request.personal_stint_voltas.is_empty() {
        for index in 1..=STINT_COUNT {
            let (Some(key), Some(cell)) = (stint_key(index), layout.stints_personal.laps(index))
            else {
                continue;
            };
            batch.set(key, cell, field(&request.personal_stint_voltas, key));
        }
    }

    for slot in &layout.boosts {
        let volta: CellValue = request
            .boost_laps
            .get(slot.key)
            .map(|boost| boost.volta.clone())
            .unwrap_or_default();
        batch.set(format!("{}.volta", slot.key), slot.volta, &volta);
    }

    batch.apply(session).enforce(policy)?;
    session.calculate()?;

    let race_calculated_data = read_fields(session, &layout.race_summary)?;

    let mut compound_details_outputs = BTreeMap::new();
    for compound in &layout.compounds {
        let mut outputs = Fields::new();
        for ((name, _), cell) in COMPOUND_COLUMNS.iter().zip(compound.outputs) {
            outputs.insert(*name, session.read(cell)?);
        }
        compound_details_outputs.insert(compound.name, outputs);
    }

    let stints_predefined = read_stint_table(session, &layout.stints_predefined)?;
    let stints_personal = read_stint_table(session, &layout.stints_personal)?;

    let mut boost_laps_outputs = BTreeMap::new();
    for slot in &layout.boosts {
        boost_laps_outputs.insert(
            slot.key,
            BoostOutput {
                stint: session.read(slot.stint)?,
                voltas_list: session.read(slot.voltas_list)?,
            },
        );
    }

    let mut boost_mini_stints_outputs = BTreeMap::new();
    for mini in &layout.boost_mini_stints {
        boost_mini_stints_outputs.insert(
            mini.key,
            MiniStintOutput {
                val1: session.read(mini.val1)?,
                val2: session.read(mini.val2)?,
            },
        );
    }

    Ok(StrategyOutputs {
        race_calculated_data,
        compound_details_outputs,
        stints_predefined,
        stints_personal,
        boost_laps_outputs,
        boost_mini_stints_outputs,
    })
}

fn read_stint_table(
    session: &mut Session<'_>,
    table: &StintTable,
) -> Result<StintTableOutput, BridgeError> {
    let mut output = StintTableOutput::new();
    for (metric_idx, metric) in STINT_METRICS.iter().enumerate() {
        let mut row = Fields::new();
        for index in 1..=STINT_COUNT {
            if let (Some(key), Some(cell)) = (stint_key(index), table.cell(metric_idx, index)) {
                row.insert(key, session.read(cell)?);
            }
        }
        if let Some(cell) = table.total(metric_idx) {
            row.insert("total", session.read(cell)?);
        }
        output.insert(*metric, row);
    }
    Ok(output)
}
