//! Rolling Logger
//!
//! File logger for the todo-forest engine.
//! - Writes `<dir>/<app>.log`, rotating to `<app>.log.1` .. `<app>.log.N` by size
//! - Keeps the most recent lines in a circular buffer for diagnostics
//! - Installs a `tracing` subscriber that also receives `log` records

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 5;
const DEFAULT_BUFFER_LINES: usize = 200;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

/// Logger set-up errors
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Log file error: {0}")]
    Io(#[from] io::Error),

    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Logger not initialized")]
    NotInitialized,

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Logger settings
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Directory holding the log files
    pub dir: PathBuf,
    /// File stem and default log target
    pub app_name: String,
    pub level: log::LevelFilter,
    /// Size at which the active file is rotated
    pub max_file_bytes: u64,
    /// Number of rotated files kept next to the active one
    pub max_files: usize,
    /// Lines kept in memory for `recent_lines`
    pub buffer_lines: usize,
}

impl LoggerConfig {
    pub fn new(dir: impl Into<PathBuf>, app_name: &str) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.to_string(),
            level: log::LevelFilter::Info,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }

    /// Path of the active log file
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }
}

/// Size-bounded log file with numbered backups
struct RollingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    max_files: usize,
}

impl RollingFile {
    fn open(path: PathBuf, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            max_bytes,
            max_files,
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = backup_path(&self.path, self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = backup_path(&self.path, n);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, n + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    PathBuf::from(format!("{}.{}", path.display(), n))
}

/// Circular buffer of complete lines
struct RecentLines {
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl RecentLines {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            partial: String::new(),
        }
    }

    fn push_bytes(&mut self, buf: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            self.push_line(line.trim_end_matches(['\n', '\r']).to_string());
        }
    }

    fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

struct Shared {
    file: RollingFile,
    recent: RecentLines,
}

/// Cloneable handle writing into the rolling file and the recent-lines buffer
#[derive(Clone)]
pub struct RollingWriter {
    app_name: Arc<str>,
    shared: Arc<Mutex<Shared>>,
}

impl RollingWriter {
    /// Open (or continue) the log file described by `config`
    pub fn open(config: &LoggerConfig) -> Result<Self, LoggerError> {
        let file = RollingFile::open(config.log_path(), config.max_file_bytes, config.max_files)?;
        Ok(Self {
            app_name: Arc::from(config.app_name.as_str()),
            shared: Arc::new(Mutex::new(Shared {
                file,
                recent: RecentLines::new(config.buffer_lines),
            })),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Snapshot of the buffered lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        match self.shared.lock() {
            Ok(shared) => shared.recent.lines.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| io::Error::other("log writer poisoned"))?;
        shared.file.write_all(buf)?;
        shared.recent.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| io::Error::other("log writer poisoned"))?;
        shared.file.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn to_tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

/// Initialize the global logger with default limits
pub fn init_logger(dir: impl Into<PathBuf>, app_name: &str) -> Result<(), LoggerError> {
    init_with_config(LoggerConfig::new(dir, app_name))
}

/// Initialize the global logger
///
/// Installs a `tracing` fmt subscriber writing to the rolling file. The subscriber
/// also forwards `log` records, so library code may use either facade.
pub fn init_with_config(config: LoggerConfig) -> Result<(), LoggerError> {
    if LOGGER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let writer = RollingWriter::open(&config)?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_max_level(to_tracing_level(config.level))
        .try_init()
        .map_err(|e| LoggerError::Subscriber(e.to_string()))?;

    LOGGER
        .set(writer)
        .map_err(|_| LoggerError::AlreadyInitialized)
}

fn installed() -> Result<&'static RollingWriter, LoggerError> {
    LOGGER.get().ok_or(LoggerError::NotInitialized)
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    let writer = installed()?;
    log::info!(target: writer.app_name(), "{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), LoggerError> {
    let writer = installed()?;
    log::warn!(target: writer.app_name(), "{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    let writer = installed()?;
    log::error!(target: writer.app_name(), "{}", msg);
    Ok(())
}

/// Recent log lines of the global logger (empty before initialization)
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(RollingWriter::recent_lines).unwrap_or_default()
}
