use std::path::Path;

use pitwall_common::{CellAddress, CellValue, RangeAddress};

use crate::error::EngineError;

#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    /// Show the engine's window. The bridge always launches hidden.
    pub visible: bool,
}

/// Entry point of an engine implementation: finds or starts application instances.
pub trait EngineBackend: Send {
    /// Short backend name for logs (`process`, `memory`).
    fn name(&self) -> &'static str;

    /// An already-running application, if one is reachable.
    fn find_running(&mut self) -> Result<Option<Box<dyn EngineApp>>, EngineError>;

    /// Start a fresh application instance.
    fn launch(&mut self, options: &LaunchOptions) -> Result<Box<dyn EngineApp>, EngineError>;
}

/// A handle to one live engine application.
///
/// Workbooks are addressed by the name the engine reported when they were
/// opened (or listed); cells by their sheet-scoped address.
pub trait EngineApp: Send {
    /// Cheap no-op used as the liveness probe.
    fn workbook_count(&mut self) -> Result<usize, EngineError>;

    fn workbooks(&mut self) -> Result<Vec<String>, EngineError>;

    fn set_display_alerts(&mut self, enabled: bool) -> Result<(), EngineError>;

    /// Recalculate every open workbook.
    fn calculate(&mut self) -> Result<(), EngineError>;

    /// Open a workbook file and return its name inside the engine.
    fn open_workbook(&mut self, path: &Path) -> Result<String, EngineError>;

    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>, EngineError>;

    fn read_cell(&mut self, workbook: &str, cell: CellAddress) -> Result<CellValue, EngineError>;

    /// `CellValue::Empty` clears the cell.
    fn write_cell(
        &mut self,
        workbook: &str,
        cell: CellAddress,
        value: CellValue,
    ) -> Result<(), EngineError>;

    /// Row-major block read.
    fn read_range(
        &mut self,
        workbook: &str,
        range: RangeAddress,
    ) -> Result<Vec<Vec<CellValue>>, EngineError> {
        // Default: one round trip per cell
        let mut rows = Vec::with_capacity(range.height() as usize);
        for row in range.start.0..=range.end.0 {
            let mut values = Vec::with_capacity(range.width() as usize);
            for col in range.start.1..=range.end.1 {
                values.push(self.read_cell(workbook, CellAddress::new(range.sheet, row, col))?);
            }
            rows.push(values);
        }
        Ok(rows)
    }
}

/// Name of a workbook open inside the connected application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkbookHandle {
    name: String,
}

impl WorkbookHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
