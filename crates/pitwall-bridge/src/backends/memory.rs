//! In-process engine double.
//!
//! Holds a registry of "running" application instances with their open
//! workbooks. Tests use it to start, kill and inspect instances, reject
//! individual writes, and emulate formulas with a recalculation hook. The
//! server uses it as the `memory` engine kind.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use pitwall_common::{CellAddress, CellValue, Sheet};

use crate::error::EngineError;
use crate::traits::{EngineApp, EngineBackend, LaunchOptions};

/// Formula stand-in invoked on every workbook of an instance by `calculate`.
pub type RecalcHook = Arc<dyn Fn(&mut MemoryWorkbook) + Send + Sync>;

/// A workbook held by the in-memory engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryWorkbook {
    name: String,
    sheets: BTreeMap<String, BTreeMap<(u32, u32), CellValue>>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: BTreeMap::new(),
        }
    }

    /// Workbook with empty `Setup&WS`, `Tyre&Fuel` and `Tracks` sheets.
    pub fn calculator(name: impl Into<String>) -> Self {
        Sheet::ALL
            .into_iter()
            .fold(Self::new(name), |book, sheet| book.with_sheet(sheet.name()))
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheets.entry(sheet.into()).or_default();
        self
    }

    pub fn with_cell(mut self, cell: CellAddress, value: impl Into<CellValue>) -> Self {
        self.set(cell, value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets.contains_key(sheet)
    }

    pub fn get(&self, cell: CellAddress) -> CellValue {
        self.sheets
            .get(cell.sheet.name())
            .and_then(|cells| cells.get(&(cell.row, cell.col)))
            .cloned()
            .unwrap_or_default()
    }

    /// Store a value; `Empty` removes the cell. Creates the sheet when missing.
    pub fn set(&mut self, cell: CellAddress, value: CellValue) {
        let cells = self.sheets.entry(cell.sheet.name().to_string()).or_default();
        if value.is_empty() {
            cells.remove(&(cell.row, cell.col));
        } else {
            cells.insert((cell.row, cell.col), value);
        }
    }

    fn sheet_mut(&mut self, sheet: Sheet) -> Option<&mut BTreeMap<(u32, u32), CellValue>> {
        self.sheets.get_mut(sheet.name())
    }
}

#[derive(Default)]
struct Instance {
    alive: bool,
    visible: bool,
    display_alerts: bool,
    workbooks: Vec<MemoryWorkbook>,
    recalculations: usize,
}

#[derive(Default)]
struct EngineState {
    instances: Vec<Instance>,
    /// Workbook files `open_workbook` can load, by path.
    files: BTreeMap<PathBuf, MemoryWorkbook>,
    rejected: HashSet<CellAddress>,
    recalc: Option<RecalcHook>,
    launches: usize,
    launch_failure: Option<String>,
}

/// Shared handle to the in-memory engine; clones observe the same state.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that can open an empty calculator workbook at `path`.
    pub fn calculator(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let engine = Self::new();
        engine.add_file(path, MemoryWorkbook::calculator(file_name(path)));
        engine
    }

    /// Make a workbook file available to `open_workbook`.
    pub fn add_file(&self, path: impl Into<PathBuf>, workbook: MemoryWorkbook) {
        self.state.lock().files.insert(path.into(), workbook);
    }

    /// Register an already-running instance with the given open workbooks and
    /// return its index.
    pub fn start_instance(&self, workbooks: Vec<MemoryWorkbook>) -> usize {
        let mut state = self.state.lock();
        state.instances.push(Instance {
            alive: true,
            display_alerts: true,
            workbooks,
            ..Instance::default()
        });
        state.instances.len() - 1
    }

    pub fn kill(&self, instance: usize) {
        if let Some(instance) = self.state.lock().instances.get_mut(instance) {
            instance.alive = false;
        }
    }

    pub fn kill_all(&self) {
        for instance in self.state.lock().instances.iter_mut() {
            instance.alive = false;
        }
    }

    /// Make every write to `cell` fail.
    pub fn reject_writes(&self, cell: CellAddress) {
        self.state.lock().rejected.insert(cell);
    }

    pub fn fail_launches(&self, message: impl Into<String>) {
        self.state.lock().launch_failure = Some(message.into());
    }

    pub fn on_recalculate(&self, hook: impl Fn(&mut MemoryWorkbook) + Send + Sync + 'static) {
        self.state.lock().recalc = Some(Arc::new(hook));
    }

    pub fn launches(&self) -> usize {
        self.state.lock().launches
    }

    pub fn running(&self) -> usize {
        self.state.lock().instances.iter().filter(|i| i.alive).count()
    }

    pub fn recalculations(&self) -> usize {
        self.state.lock().instances.iter().map(|i| i.recalculations).sum()
    }

    /// Whether any launched instance was started visible or with alerts on.
    pub fn any_launched_interactive(&self) -> bool {
        self.state
            .lock()
            .instances
            .iter()
            .any(|i| i.alive && (i.visible || i.display_alerts))
    }

    /// Current content of `cell` in the first live instance holding `workbook`.
    pub fn cell(&self, workbook: &str, cell: CellAddress) -> Option<CellValue> {
        let state = self.state.lock();
        state
            .instances
            .iter()
            .filter(|i| i.alive)
            .flat_map(|i| i.workbooks.iter())
            .find(|book| book.name == workbook)
            .map(|book| book.get(cell))
    }

    /// Seed `cell` in every live copy of `workbook`.
    pub fn set_cell(&self, workbook: &str, cell: CellAddress, value: impl Into<CellValue>) {
        let value = value.into();
        let mut state = self.state.lock();
        for book in state
            .instances
            .iter_mut()
            .filter(|i| i.alive)
            .flat_map(|i| i.workbooks.iter_mut())
            .filter(|book| book.name == workbook)
        {
            book.set(cell, value.clone());
        }
    }

    pub fn backend(&self) -> MemoryBackend {
        MemoryBackend {
            engine: self.clone(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct MemoryBackend {
    engine: MemoryEngine,
}

impl EngineBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn find_running(&mut self) -> Result<Option<Box<dyn EngineApp>>, EngineError> {
        let state = self.engine.state.lock();
        Ok(state.instances.iter().position(|i| i.alive).map(|index| {
            Box::new(MemoryApp {
                engine: self.engine.clone(),
                index,
            }) as Box<dyn EngineApp>
        }))
    }

    fn launch(&mut self, options: &LaunchOptions) -> Result<Box<dyn EngineApp>, EngineError> {
        let mut state = self.engine.state.lock();
        if let Some(message) = &state.launch_failure {
            return Err(EngineError::Spawn {
                command: "memory".into(),
                source: std::io::Error::other(message.clone()),
            });
        }
        state.launches += 1;
        state.instances.push(Instance {
            alive: true,
            visible: options.visible,
            display_alerts: true,
            ..Instance::default()
        });
        Ok(Box::new(MemoryApp {
            engine: self.engine.clone(),
            index: state.instances.len() - 1,
        }))
    }
}

/// Handle to one instance of the in-memory engine.
pub struct MemoryApp {
    engine: MemoryEngine,
    index: usize,
}

impl MemoryApp {
    fn with_instance<T>(
        &self,
        f: impl FnOnce(&mut Instance, &mut EngineState) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = self.engine.state.lock();
        let mut instance = match guard.instances.get_mut(self.index) {
            Some(instance) if instance.alive => std::mem::take(instance),
            _ => return Err(EngineError::Closed),
        };
        let result = f(&mut instance, &mut guard);
        guard.instances[self.index] = instance;
        result
    }
}

fn workbook<'a>(
    instance: &'a mut Instance,
    name: &str,
    method: &str,
) -> Result<&'a mut MemoryWorkbook, EngineError> {
    instance
        .workbooks
        .iter_mut()
        .find(|book| book.name == name)
        .ok_or_else(|| EngineError::remote(method, format!("workbook `{name}` is not open")))
}

impl EngineApp for MemoryApp {
    fn workbook_count(&mut self) -> Result<usize, EngineError> {
        self.with_instance(|instance, _| Ok(instance.workbooks.len()))
    }

    fn workbooks(&mut self) -> Result<Vec<String>, EngineError> {
        self.with_instance(|instance, _| {
            Ok(instance.workbooks.iter().map(|b| b.name.clone()).collect())
        })
    }

    fn set_display_alerts(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.with_instance(|instance, _| {
            instance.display_alerts = enabled;
            Ok(())
        })
    }

    fn calculate(&mut self) -> Result<(), EngineError> {
        self.with_instance(|instance, state| {
            if let Some(hook) = &state.recalc {
                for book in instance.workbooks.iter_mut() {
                    hook(book);
                }
            }
            instance.recalculations += 1;
            Ok(())
        })
    }

    fn open_workbook(&mut self, path: &Path) -> Result<String, EngineError> {
        self.with_instance(|instance, state| {
            let template = state.files.get(path).ok_or_else(|| {
                EngineError::remote("workbook.open", format!("{} not found", path.display()))
            })?;
            let name = template.name.clone();
            if !instance.workbooks.iter().any(|book| book.name == name) {
                instance.workbooks.push(template.clone());
            }
            Ok(name)
        })
    }

    fn sheet_names(&mut self, name: &str) -> Result<Vec<String>, EngineError> {
        self.with_instance(|instance, _| Ok(workbook(instance, name, "workbook.sheets")?.sheet_names()))
    }

    fn read_cell(&mut self, name: &str, cell: CellAddress) -> Result<CellValue, EngineError> {
        self.with_instance(|instance, _| {
            let book = workbook(instance, name, "cell.read")?;
            if !book.has_sheet(cell.sheet.name()) {
                return Err(EngineError::remote("cell.read", format!("no sheet `{}`", cell.sheet)));
            }
            Ok(book.get(cell))
        })
    }

    fn write_cell(
        &mut self,
        name: &str,
        cell: CellAddress,
        value: CellValue,
    ) -> Result<(), EngineError> {
        self.with_instance(|instance, state| {
            if state.rejected.contains(&cell) {
                return Err(EngineError::remote("cell.write", format!("{cell} is locked")));
            }
            let book = workbook(instance, name, "cell.write")?;
            if book.sheet_mut(cell.sheet).is_none() {
                return Err(EngineError::remote("cell.write", format!("no sheet `{}`", cell.sheet)));
            }
            book.set(cell, value);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killed_instances_report_closed() {
        let engine = MemoryEngine::new();
        let index = engine.start_instance(vec![MemoryWorkbook::calculator("book.xlsx")]);
        let mut app = engine
            .backend()
            .find_running()
            .expect("lookup")
            .expect("running instance");
        assert_eq!(app.workbook_count().expect("probe"), 1);

        engine.kill(index);
        match app.workbook_count() {
            Err(EngineError::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
        assert!(engine.backend().find_running().expect("lookup").is_none());
    }

    #[test]
    fn empty_writes_remove_cells() {
        let cell = CellAddress::a1(Sheet::Setup, "E6");
        let mut book = MemoryWorkbook::calculator("book.xlsx").with_cell(cell, 12.0);
        assert_eq!(book.get(cell), CellValue::Number(12.0));
        book.set(cell, CellValue::Empty);
        assert_eq!(book.get(cell), CellValue::Empty);
        assert_eq!(book, MemoryWorkbook::calculator("book.xlsx"));
    }
}
