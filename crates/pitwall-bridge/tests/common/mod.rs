#![allow(dead_code)]

use pitwall_bridge::{Bridge, ConnectionManager, MemoryEngine, MemoryWorkbook, WritePolicy};
use pitwall_common::{CellAddress, Sheet};
use pitwall_schema::Layout;

pub const WORKBOOK_PATH: &str = "data/calculadora.xlsx";
pub const WORKBOOK: &str = "calculadora.xlsx";

pub fn s(a1: &str) -> CellAddress {
    CellAddress::try_a1(Sheet::Setup, a1).expect("valid reference")
}

pub fn tf(a1: &str) -> CellAddress {
    CellAddress::try_a1(Sheet::TyreFuel, a1).expect("valid reference")
}

pub fn engine() -> MemoryEngine {
    MemoryEngine::calculator(WORKBOOK_PATH)
}

pub fn manager(engine: &MemoryEngine) -> ConnectionManager {
    ConnectionManager::new(
        Box::new(engine.backend()),
        WORKBOOK_PATH,
        Layout::standard().required_sheets(),
    )
}

pub fn bridge(engine: &MemoryEngine, policy: WritePolicy) -> Bridge {
    Bridge::new(manager(engine), Layout::standard(), policy)
}

/// An engine that is already running with the calculator open.
pub fn running_engine() -> MemoryEngine {
    let engine = engine();
    engine.start_instance(vec![MemoryWorkbook::calculator(WORKBOOK)]);
    engine
}
