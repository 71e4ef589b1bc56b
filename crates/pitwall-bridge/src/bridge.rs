use parking_lot::Mutex;
use pitwall_schema::Layout;

use crate::batch::WritePolicy;
use crate::connection::{ConnectionManager, Session, StatusHandle};
use crate::error::BridgeError;
use crate::orchestrator;
use crate::payload::{
    DriverCarResult, DriverCarUpdate, SetupRequest, SetupResult, SetupWeatherUpdate,
    StateSnapshot, StrategyOutputs, StrategyRequest,
};

/// The process-wide gate in front of the engine.
///
/// One lock covers acquire, writes, recalculation and reads, so requests never
/// observe each other's intermediate workbook state. The connection status
/// is published separately so health checks never wait on that lock.
pub struct Bridge {
    manager: Mutex<ConnectionManager>,
    status: StatusHandle,
    layout: &'static Layout,
    policy: WritePolicy,
}

impl Bridge {
    pub fn new(manager: ConnectionManager, layout: &'static Layout, policy: WritePolicy) -> Self {
        Self {
            status: manager.status_handle(),
            manager: Mutex::new(manager),
            layout,
            policy,
        }
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Connection state name; never probes the engine or waits for a request.
    pub fn status(&self) -> &'static str {
        self.status.get()
    }

    pub fn invalidate(&self) {
        self.manager.lock().invalidate();
    }

    /// Run `op` against a live session while holding the gate.
    pub fn with_session<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut Session<'_>, &Layout, WritePolicy) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let _span = tracing::debug_span!("engine", operation).entered();
        let mut manager = self.manager.lock();
        let result = {
            let mut session = manager.acquire()?;
            op(&mut session, self.layout, self.policy)
        };
        if let Err(err) = &result {
            if err.is_disconnect() {
                manager.invalidate();
            }
            tracing::debug!(error = %err, "operation failed");
        }
        result
    }

    pub fn read_state(&self) -> Result<StateSnapshot, BridgeError> {
        self.with_session("read_state", |session, layout, _| {
            orchestrator::read_state(session, layout)
        })
    }

    pub fn update_driver_car(&self, update: &DriverCarUpdate) -> Result<DriverCarResult, BridgeError> {
        self.with_session("update_driver_car", |session, layout, policy| {
            orchestrator::update_driver_car(session, layout, policy, update)
        })
    }

    pub fn update_setup_weather(&self, update: &SetupWeatherUpdate) -> Result<(), BridgeError> {
        self.with_session("update_setup_weather", |session, layout, policy| {
            orchestrator::update_setup_weather(session, layout, policy, update)
        })
    }

    pub fn calculate_setup(&self, request: &SetupRequest) -> Result<SetupResult, BridgeError> {
        self.with_session("calculate_setup", |session, layout, policy| {
            orchestrator::calculate_setup(session, layout, policy, request)
        })
    }

    pub fn calculate_strategy(
        &self,
        request: &StrategyRequest,
    ) -> Result<StrategyOutputs, BridgeError> {
        self.with_session("calculate_strategy", |session, layout, policy| {
            orchestrator::calculate_strategy(session, layout, policy, request)
        })
    }

    pub fn list_tracks(&self) -> Result<Vec<String>, BridgeError> {
        self.with_session("list_tracks", |session, layout, _| {
            orchestrator::list_tracks(session, layout)
        })
    }
}
