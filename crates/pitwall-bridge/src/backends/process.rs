//! External engine process reached over TCP.
//!
//! Wire format: one JSON object per line in each direction.
//!
//! ```text
//! -> {"id":7,"method":"cell.read","params":{"workbook":"calculadora.xlsx","sheet":"Setup&WS","cell":"E6"}}
//! <- {"id":7,"result":42}
//! <- {"id":7,"error":{"message":"no such sheet"}}
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pitwall_common::{CellAddress, CellValue, RangeAddress};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::EngineError;
use crate::traits::{EngineApp, EngineBackend, LaunchOptions};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);
const STARTUP_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Executable started by `launch`; `None` disables launching.
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    pub address: SocketAddr,
    pub startup_timeout: Duration,
    /// Per-call read/write timeout; `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl ProcessConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            command: None,
            args: Vec::new(),
            address,
            startup_timeout: Duration::from_millis(15_000),
            call_timeout: None,
        }
    }
}

pub struct ProcessBackend {
    config: ProcessConfig,
    children: Vec<Child>,
}

impl ProcessBackend {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            children: Vec::new(),
        }
    }

    fn connect(&self, timeout: Duration) -> std::io::Result<ProcessApp> {
        let stream = TcpStream::connect_timeout(&self.config.address, timeout)?;
        ProcessApp::new(stream, self.config.call_timeout)
    }

    /// Drop handles of launched engines that have since exited.
    fn reap(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl EngineBackend for ProcessBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    fn find_running(&mut self) -> Result<Option<Box<dyn EngineApp>>, EngineError> {
        match self.connect(CONNECT_TIMEOUT) {
            Ok(app) => Ok(Some(Box::new(app))),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::ConnectionRefused | ErrorKind::TimedOut | ErrorKind::NotFound
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn launch(&mut self, options: &LaunchOptions) -> Result<Box<dyn EngineApp>, EngineError> {
        self.reap();
        let command = self
            .config
            .command
            .clone()
            .ok_or_else(|| EngineError::protocol("no engine command configured"))?;

        let mut cmd = Command::new(&command);
        cmd.args(&self.config.args)
            .arg("--listen")
            .arg(self.config.address.to_string());
        if !options.visible {
            cmd.arg("--hidden");
        }
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: command.display().to_string(),
                source,
            })?;
        tracing::info!(pid = child.id(), command = %command.display(), "engine process started");
        self.children.push(child);

        let deadline = Instant::now() + self.config.startup_timeout;
        loop {
            match self.connect(CONNECT_TIMEOUT) {
                Ok(app) => return Ok(Box::new(app)),
                Err(err) if Instant::now() < deadline => {
                    tracing::trace!(error = %err, "engine not listening yet");
                    thread::sleep(STARTUP_POLL);
                }
                Err(_) => return Err(EngineError::StartupTimeout(self.config.startup_timeout)),
            }
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteError>,
}

#[derive(Deserialize)]
struct RemoteError {
    message: String,
}

/// One TCP session with the engine.
pub struct ProcessApp {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    next_id: u64,
}

impl ProcessApp {
    fn new(stream: TcpStream, call_timeout: Option<Duration>) -> std::io::Result<Self> {
        stream.set_read_timeout(call_timeout)?;
        stream.set_write_timeout(call_timeout)?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            next_id: 1,
        })
    }

    fn call(&mut self, method: &str, params: Value) -> Result<Value, EngineError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Request { id, method, params })
            .map_err(|e| EngineError::protocol(format!("encoding `{method}`: {e}")))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(EngineError::Closed);
        }
        let response: Response = serde_json::from_str(&reply)
            .map_err(|e| EngineError::protocol(format!("decoding `{method}` reply: {e}")))?;
        if response.id != id {
            return Err(EngineError::protocol(format!(
                "reply id {} does not match request id {id}",
                response.id
            )));
        }
        match response.error {
            Some(err) => Err(EngineError::remote(method, err.message)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }

    fn call_as<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> Result<T, EngineError> {
        let value = self.call(method, params)?;
        serde_json::from_value(value)
            .map_err(|e| EngineError::protocol(format!("unexpected `{method}` result: {e}")))
    }
}

impl EngineApp for ProcessApp {
    fn workbook_count(&mut self) -> Result<usize, EngineError> {
        self.call_as("app.workbook_count", Value::Null)
    }

    fn workbooks(&mut self) -> Result<Vec<String>, EngineError> {
        self.call_as("app.workbooks", Value::Null)
    }

    fn set_display_alerts(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.call("app.set_display_alerts", json!({ "enabled": enabled }))?;
        Ok(())
    }

    fn calculate(&mut self) -> Result<(), EngineError> {
        self.call("app.calculate", Value::Null)?;
        Ok(())
    }

    fn open_workbook(&mut self, path: &Path) -> Result<String, EngineError> {
        self.call_as("workbook.open", json!({ "path": path.display().to_string() }))
    }

    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>, EngineError> {
        self.call_as("workbook.sheets", json!({ "workbook": workbook }))
    }

    fn read_cell(&mut self, workbook: &str, cell: CellAddress) -> Result<CellValue, EngineError> {
        self.call_as(
            "cell.read",
            json!({ "workbook": workbook, "sheet": cell.sheet.name(), "cell": cell.reference() }),
        )
    }

    fn write_cell(
        &mut self,
        workbook: &str,
        cell: CellAddress,
        value: CellValue,
    ) -> Result<(), EngineError> {
        self.call(
            "cell.write",
            json!({
                "workbook": workbook,
                "sheet": cell.sheet.name(),
                "cell": cell.reference(),
                "value": value,
            }),
        )?;
        Ok(())
    }

    fn read_range(
        &mut self,
        workbook: &str,
        range: RangeAddress,
    ) -> Result<Vec<Vec<CellValue>>, EngineError> {
        self.call_as(
            "range.read",
            json!({ "workbook": workbook, "sheet": range.sheet.name(), "range": range.reference() }),
        )
    }
}
