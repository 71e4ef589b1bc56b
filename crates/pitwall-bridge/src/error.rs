use std::time::Duration;

use pitwall_common::{CellAddress, Sheet};
use thiserror::Error;

/// Failures reported by an engine backend.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine protocol violation: {0}")]
    Protocol(String),

    #[error("engine rejected `{method}`: {message}")]
    Remote { method: String, message: String },

    #[error("failed to start engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine did not accept connections within {0:?}")]
    StartupTimeout(Duration),

    #[error("engine connection closed")]
    Closed,
}

impl EngineError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn remote(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            method: method.into(),
            message: message.into(),
        }
    }

    /// The application behind the handle is gone; the cached connection is stale.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, EngineError::Io(_) | EngineError::Closed)
    }
}

/// Request-level failures. Every variant is reported to the caller as
/// `{success: false, message}`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("calculation engine unavailable: {message}")]
    ConnectionUnavailable {
        message: String,
        #[source]
        source: Option<EngineError>,
    },

    #[error("workbook `{workbook}` has no sheet `{sheet}`")]
    MissingSheet { workbook: String, sheet: Sheet },

    #[error("{failed} cell write(s) failed, first at {cell} ({field}): {source}")]
    CellWrite {
        cell: CellAddress,
        field: String,
        failed: usize,
        #[source]
        source: EngineError,
    },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("engine failed during {operation}: {source}")]
    UnexpectedEngineState {
        operation: String,
        #[source]
        source: EngineError,
    },
}

impl BridgeError {
    pub fn unavailable(message: impl Into<String>, source: EngineError) -> Self {
        Self::ConnectionUnavailable {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn engine(operation: impl Into<String>, source: EngineError) -> Self {
        Self::UnexpectedEngineState {
            operation: operation.into(),
            source,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// True when the failure means the engine went away mid-request.
    pub fn is_disconnect(&self) -> bool {
        match self {
            BridgeError::UnexpectedEngineState { source, .. }
            | BridgeError::CellWrite { source, .. } => source.is_disconnect(),
            BridgeError::ConnectionUnavailable {
                source: Some(source),
                ..
            } => source.is_disconnect(),
            _ => false,
        }
    }
}
