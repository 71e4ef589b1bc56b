//! Lifecycle of the single engine connection.
//!
//! The manager is lazy: nothing is probed or launched until [`ConnectionManager::acquire`]
//! runs. A cached application is probed on every acquire and dropped when the
//! probe fails; the next step reattaches to a running engine or launches a new one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use pitwall_common::{CellAddress, CellValue, DomainValue, RangeAddress, Sheet, normalize_inbound};
use pitwall_schema::Field;

use crate::error::{BridgeError, EngineError};
use crate::traits::{EngineApp, EngineBackend, LaunchOptions, WorkbookHandle};

pub enum ConnectionState {
    Disconnected,
    /// Transient while the cached application is being probed.
    Probing,
    Connected {
        app: Box<dyn EngineApp>,
        workbook: WorkbookHandle,
    },
}

const DISCONNECTED: u8 = 0;
const PROBING: u8 = 1;
const CONNECTED: u8 = 2;

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        status_name(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            ConnectionState::Disconnected => DISCONNECTED,
            ConnectionState::Probing => PROBING,
            ConnectionState::Connected { .. } => CONNECTED,
        }
    }
}

fn status_name(code: u8) -> &'static str {
    match code {
        PROBING => "probing",
        CONNECTED => "connected",
        _ => "disconnected",
    }
}

/// Shared view of the manager's state that can be read without taking the
/// lock held for the length of an engine call.
#[derive(Clone, Debug, Default)]
pub struct StatusHandle(Arc<AtomicU8>);

impl StatusHandle {
    pub fn get(&self) -> &'static str {
        status_name(self.0.load(Ordering::Acquire))
    }

    fn publish(&self, state: &ConnectionState) {
        self.0.store(state.code(), Ordering::Release);
    }
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connected { workbook, .. } => f
                .debug_struct("Connected")
                .field("workbook", &workbook.name())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

pub struct ConnectionManager {
    backend: Box<dyn EngineBackend>,
    workbook_path: PathBuf,
    required_sheets: Vec<Sheet>,
    state: ConnectionState,
    status: StatusHandle,
}

impl ConnectionManager {
    pub fn new(
        backend: Box<dyn EngineBackend>,
        workbook_path: impl Into<PathBuf>,
        required_sheets: Vec<Sheet>,
    ) -> Self {
        Self {
            backend,
            workbook_path: workbook_path.into(),
            required_sheets,
            state: ConnectionState::Disconnected,
            status: StatusHandle::default(),
        }
    }

    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }

    pub fn status(&self) -> &'static str {
        self.state.name()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Handle that keeps tracking this manager's state after it moves behind a lock.
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Every transition goes through here so the handle never goes stale.
    fn set_state(&mut self, state: ConnectionState) -> ConnectionState {
        self.status.publish(&state);
        std::mem::replace(&mut self.state, state)
    }

    /// Forget the cached application; the next acquire reconnects.
    pub fn invalidate(&mut self) {
        if matches!(self.state, ConnectionState::Connected { .. }) {
            tracing::info!("dropping cached engine connection");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// A live session on the target workbook, reconnecting if needed.
    pub fn acquire(&mut self) -> Result<Session<'_>, BridgeError> {
        self.probe();

        if matches!(self.state, ConnectionState::Disconnected) {
            if let Some((app, workbook)) = self.adopt_running() {
                self.set_state(ConnectionState::Connected { app, workbook });
            }
        }
        if matches!(self.state, ConnectionState::Disconnected) {
            let (app, workbook) = self.launch_fresh()?;
            self.set_state(ConnectionState::Connected { app, workbook });
        }

        match &mut self.state {
            ConnectionState::Connected { app, workbook } => Ok(Session::new(app.as_mut(), workbook)),
            _ => Err(BridgeError::ConnectionUnavailable {
                message: "no engine connection after reconnect".into(),
                source: None,
            }),
        }
    }

    fn probe(&mut self) {
        let ConnectionState::Connected { mut app, workbook } =
            self.set_state(ConnectionState::Probing)
        else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        match app.workbook_count() {
            Ok(_) => {
                self.set_state(ConnectionState::Connected { app, workbook });
            }
            Err(err) => {
                tracing::warn!(error = %err, "engine liveness probe failed");
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }

    fn target_name(&self) -> String {
        self.workbook_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn adopt_running(&mut self) -> Option<(Box<dyn EngineApp>, WorkbookHandle)> {
        let mut app = match self.backend.find_running() {
            Ok(Some(app)) => app,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(error = %err, "looking for a running engine failed");
                return None;
            }
        };
        let books = match app.workbooks() {
            Ok(books) => books,
            Err(err) => {
                tracing::warn!(error = %err, "could not list workbooks of running engine");
                return None;
            }
        };
        let target = self.target_name();
        let name = books.into_iter().find(|name| name.contains(&target))?;
        let workbook = WorkbookHandle::new(name);
        if let Err(err) = self.check_sheets(app.as_mut(), &workbook) {
            tracing::warn!(error = %err, "running engine has an unusable workbook");
            return None;
        }
        tracing::info!(workbook = workbook.name(), "attached to running engine");
        Some((app, workbook))
    }

    fn launch_fresh(&mut self) -> Result<(Box<dyn EngineApp>, WorkbookHandle), BridgeError> {
        tracing::info!(
            backend = self.backend.name(),
            path = %self.workbook_path.display(),
            "launching engine"
        );
        let mut app = self
            .backend
            .launch(&LaunchOptions { visible: false })
            .map_err(|e| BridgeError::unavailable("could not launch the engine", e))?;
        app.set_display_alerts(false)
            .map_err(|e| BridgeError::unavailable("could not configure the engine", e))?;
        let name = app.open_workbook(&self.workbook_path).map_err(|e| {
            BridgeError::unavailable(
                format!("could not open {}", self.workbook_path.display()),
                e,
            )
        })?;
        let workbook = WorkbookHandle::new(name);
        self.check_sheets(app.as_mut(), &workbook)?;
        tracing::info!(workbook = workbook.name(), "workbook opened");
        Ok((app, workbook))
    }

    fn check_sheets(
        &self,
        app: &mut dyn EngineApp,
        workbook: &WorkbookHandle,
    ) -> Result<(), BridgeError> {
        let present = app
            .sheet_names(workbook.name())
            .map_err(|e| BridgeError::unavailable("could not list sheets", e))?;
        match self
            .required_sheets
            .iter()
            .find(|sheet| !present.iter().any(|name| name == sheet.name()))
        {
            Some(sheet) => Err(BridgeError::MissingSheet {
                workbook: workbook.name().to_string(),
                sheet: *sheet,
            }),
            None => Ok(()),
        }
    }
}

/// Borrowed application and workbook for the duration of one request.
pub struct Session<'a> {
    app: &'a mut dyn EngineApp,
    workbook: &'a WorkbookHandle,
}

impl<'a> Session<'a> {
    pub fn new(app: &'a mut dyn EngineApp, workbook: &'a WorkbookHandle) -> Self {
        Self { app, workbook }
    }

    pub fn workbook(&self) -> &str {
        self.workbook.name()
    }

    /// Raw write, used by batches that collect per-cell outcomes.
    pub fn write_raw(&mut self, cell: CellAddress, value: CellValue) -> Result<(), EngineError> {
        self.app.write_cell(self.workbook.name(), cell, value)
    }

    pub fn read(&mut self, cell: CellAddress) -> Result<DomainValue, BridgeError> {
        let raw = self
            .app
            .read_cell(self.workbook.name(), cell)
            .map_err(|e| BridgeError::engine(format!("reading {cell}"), e))?;
        Ok(normalize_inbound(&raw))
    }

    /// Read a field and apply its fallback when the cell is absent.
    pub fn read_field(&mut self, field: &Field) -> Result<DomainValue, BridgeError> {
        Ok(field.fallback.apply(self.read(field.cell)?))
    }

    pub fn read_range(&mut self, range: RangeAddress) -> Result<Vec<Vec<DomainValue>>, BridgeError> {
        let rows = self
            .app
            .read_range(self.workbook.name(), range)
            .map_err(|e| BridgeError::engine(format!("reading {range}"), e))?;
        Ok(rows
            .iter()
            .map(|row| row.iter().map(normalize_inbound).collect())
            .collect())
    }

    pub fn calculate(&mut self) -> Result<(), BridgeError> {
        tracing::debug!(workbook = self.workbook.name(), "recalculating");
        self.app
            .calculate()
            .map_err(|e| BridgeError::engine("recalculation", e))
    }
}
