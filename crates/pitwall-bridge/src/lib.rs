//! Bridge between the race calculator's domain model and an external,
//! stateful calculation engine holding the calculator workbook.
//!
//! [`Bridge`] owns the single [`ConnectionManager`]; the [`orchestrator`]
//! functions implement the write → recalculate → read use cases on top of it.

pub mod backends;
pub mod batch;
pub mod bridge;
pub mod connection;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod traits;

pub use backends::{MemoryBackend, MemoryEngine, MemoryWorkbook, ProcessBackend, ProcessConfig};
pub use batch::{WriteBatch, WriteOutcome, WritePolicy, WriteReport};
pub use bridge::Bridge;
pub use connection::{ConnectionManager, ConnectionState, Session, StatusHandle};
pub use error::{BridgeError, EngineError};
pub use traits::{EngineApp, EngineBackend, LaunchOptions, WorkbookHandle};

// Re-export for convenience
pub use pitwall_common::{CellAddress, CellValue, DomainValue, Sheet};
pub use pitwall_schema::Layout;
