//! Command line and YAML configuration.
//!
//! Precedence: command-line flags, then the config file, then built-in defaults.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use pitwall_bridge::{
    Bridge, ConnectionManager, EngineBackend, MemoryEngine, ProcessBackend, ProcessConfig,
    WritePolicy,
};
use pitwall_schema::Layout;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_PREFIX;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_ENGINE_ADDRESS: &str = "127.0.0.1:7781";
pub const DEFAULT_WORKBOOK: &str = "data/calculadora.xlsx";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 15_000;

/// Race calculator HTTP bridge
#[derive(Parser, Debug, Default)]
#[command(name = "pitwall")]
#[command(about = "Serve the race calculator workbook over HTTP")]
#[command(version)]
pub struct Args {
    /// YAML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server listens on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Calculator workbook, relative paths resolve next to the executable
    #[arg(long, value_name = "PATH")]
    pub workbook: Option<PathBuf>,

    /// Engine backend
    #[arg(long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Executable launched when no engine is running
    #[arg(long, value_name = "CMD")]
    pub engine_command: Option<PathBuf>,

    /// Address the engine listens on
    #[arg(long)]
    pub engine_address: Option<SocketAddr>,

    /// What a request does when some cell writes fail: `permissive` or `strict`
    #[arg(long)]
    pub write_policy: Option<WritePolicy>,

    /// Log filter used when RUST_LOG is unset (e.g. `info`, `pitwall_bridge=debug`)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Validate the cell layout, print the result and exit
    #[arg(long)]
    pub check_schema: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// External engine process over TCP
    #[default]
    Process,
    /// In-memory workbook without formulas
    Memory,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<SocketAddr>,
    pub prefix: Option<String>,
    pub log_level: Option<String>,
    pub write_policy: Option<WritePolicy>,
    pub workbook: Option<PathBuf>,
    pub engine: EngineFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineFileConfig {
    pub kind: Option<EngineKind>,
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    pub address: Option<SocketAddr>,
    pub startup_timeout_ms: Option<u64>,
    pub call_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub kind: EngineKind,
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    pub address: SocketAddr,
    pub startup_timeout: Duration,
    pub call_timeout: Option<Duration>,
}

/// Fully merged runtime settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub bind: SocketAddr,
    pub prefix: String,
    pub log_level: String,
    pub write_policy: WritePolicy,
    /// As configured; see [`resolve_workbook`] for the path actually opened.
    pub workbook: PathBuf,
    pub engine: EngineSettings,
}

fn default_addr(text: &str) -> SocketAddr {
    text.parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 0)))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_addr(DEFAULT_BIND),
            prefix: DEFAULT_PREFIX.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            write_policy: WritePolicy::default(),
            workbook: PathBuf::from(DEFAULT_WORKBOOK),
            engine: EngineSettings {
                kind: EngineKind::default(),
                command: None,
                args: Vec::new(),
                address: default_addr(DEFAULT_ENGINE_ADDRESS),
                startup_timeout: Duration::from_millis(DEFAULT_STARTUP_TIMEOUT_MS),
                call_timeout: None,
            },
        }
    }
}

impl Settings {
    /// Load the config file named by `args` (if any) and merge.
    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Result<Self> {
        let defaults = Settings::default();
        let prefix = file.prefix.unwrap_or(defaults.prefix);
        if !prefix.is_empty() && !prefix.starts_with('/') {
            bail!("route prefix `{prefix}` must start with `/`");
        }
        let engine = file.engine;
        Ok(Settings {
            bind: args.bind.or(file.bind).unwrap_or(defaults.bind),
            prefix,
            log_level: args
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            write_policy: args
                .write_policy
                .or(file.write_policy)
                .unwrap_or(defaults.write_policy),
            workbook: args
                .workbook
                .clone()
                .or(file.workbook)
                .unwrap_or(defaults.workbook),
            engine: EngineSettings {
                kind: args.engine.or(engine.kind).unwrap_or(defaults.engine.kind),
                command: args.engine_command.clone().or(engine.command),
                args: engine.args,
                address: args
                    .engine_address
                    .or(engine.address)
                    .unwrap_or(defaults.engine.address),
                startup_timeout: engine
                    .startup_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.engine.startup_timeout),
                call_timeout: engine.call_timeout_ms.map(Duration::from_millis),
            },
        })
    }

    pub fn backend(&self, workbook: &Path) -> Box<dyn EngineBackend> {
        match self.engine.kind {
            EngineKind::Process => {
                let mut config = ProcessConfig::new(self.engine.address);
                config.command = self.engine.command.clone();
                config.args = self.engine.args.clone();
                config.startup_timeout = self.engine.startup_timeout;
                config.call_timeout = self.engine.call_timeout;
                Box::new(ProcessBackend::new(config))
            }
            EngineKind::Memory => Box::new(MemoryEngine::calculator(workbook).backend()),
        }
    }

    /// The bridge for these settings. Nothing is probed or launched yet.
    pub fn bridge(&self, layout: &'static Layout) -> Bridge {
        let workbook = resolve_workbook(&self.workbook);
        tracing::info!(
            engine = ?self.engine.kind,
            workbook = %workbook.display(),
            policy = %self.write_policy,
            "bridge configured"
        );
        let manager =
            ConnectionManager::new(self.backend(&workbook), workbook, layout.required_sheets());
        Bridge::new(manager, layout, self.write_policy)
    }
}

/// Directory the binary is installed under: the parent of the directory
/// holding the executable (`<install>/bin/pitwall` → `<install>`).
fn install_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().and_then(Path::parent).map(Path::to_path_buf)
}

/// Relative workbook paths are looked up under the install directory first,
/// then in the working directory.
pub fn resolve_workbook(path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().ok();
    resolve_against(path, install_dir().as_deref(), cwd.as_deref())
}

fn resolve_against(path: &Path, install: Option<&Path>, cwd: Option<&Path>) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    if let Some(candidate) = install.map(|dir| dir.join(path)).filter(|c| c.exists()) {
        return candidate;
    }
    cwd.map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}
