pub mod memory;
pub mod process;

pub use memory::{MemoryApp, MemoryBackend, MemoryEngine, MemoryWorkbook, RecalcHook};
pub use process::{ProcessApp, ProcessBackend, ProcessConfig};
