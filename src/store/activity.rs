//! Append-only activity record.
//!
//! One line per event: `<timestamp> [<LEVEL>] <message>`. The analytics engine reads
//! this file back, so the encoding here and [`ActivityRecord::parse`] must agree.

use std::{
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::base::error::EngineError;

/// Timestamp layout of every record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Separates the trigger from the identity in a `Match:` payload.
pub const MATCH_SEPARATOR: &str = "' by ";

/// Severity of an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payloads the bot writes and the analytics engine recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent<'a> {
    /// An automated reply was dispatched.
    Match { trigger: &'a str, by: &'a str },
    /// An administrative command ran.
    Command { name: &'a str, by: &'a str },
    /// The record was truncated.
    Reset { by: &'a str },
}

impl<'a> ActivityEvent<'a> {
    /// Recognizes a structured payload; free-form messages yield `None`.
    pub fn decode(message: &'a str) -> Option<Self> {
        if let Some(rest) = message.strip_prefix("Match: '") {
            // Triggers never contain the separator; identities may.
            let (trigger, by) = rest.split_once(MATCH_SEPARATOR)?;
            return Some(ActivityEvent::Match { trigger, by });
        }

        if let Some(rest) = message.strip_prefix("Command: ") {
            let (name, by) = rest.split_once(" by ")?;
            return Some(ActivityEvent::Command { name, by });
        }

        message.strip_prefix("Log reset by ").map(|by| ActivityEvent::Reset { by })
    }
}

impl fmt::Display for ActivityEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityEvent::Match { trigger, by } => write!(f, "Match: '{trigger}' by {by}"),
            ActivityEvent::Command { name, by } => write!(f, "Command: {name} by {by}"),
            ActivityEvent::Reset { by } => write!(f, "Log reset by {by}"),
        }
    }
}

/// A parsed activity line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord<'a> {
    pub date: NaiveDate,
    pub level: Level,
    pub message: &'a str,
}

impl<'a> ActivityRecord<'a> {
    /// Parses one line; returns `None` for anything that is not a well-formed record.
    pub fn parse(line: &'a str) -> Option<Self> {
        let (stamp, rest) = line.split_once(" [")?;
        let (level, message) = rest.split_once(']')?;

        let date = NaiveDate::parse_from_str(stamp.split_whitespace().next()?, "%Y-%m-%d").ok()?;
        let level = level.parse().ok()?;

        Some(Self {
            date,
            level,
            message: message.strip_prefix(' ').unwrap_or(message),
        })
    }

    pub fn event(&self) -> Option<ActivityEvent<'a>> {
        ActivityEvent::decode(self.message)
    }
}

struct ActivityLogInner {
    path: PathBuf,
    // Serializes appends against each other and against reset.
    lock: Mutex<()>,
}

/// File-backed activity record.
///
/// This is trivially cloneable; clones append to the same file.
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<ActivityLogInner>,
}

impl ActivityLog {
    /// Opens (or creates) the record at `path` without truncating it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::from_io(parent, e))?;
        }

        OpenOptions::new().create(true).append(true).open(&path).map_err(|e| EngineError::from_io(&path, e))?;

        Ok(Self {
            inner: Arc::new(ActivityLogInner { path, lock: Mutex::new(()) }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Appends one record and mirrors it to the process log.
    pub fn append(&self, level: Level, message: impl fmt::Display) -> Result<(), EngineError> {
        let message = message.to_string().replace('\n', " ");
        let line = format!("{} [{}] {}", Local::now().format(TIMESTAMP_FORMAT), level, message);

        {
            let _guard = self.inner.lock.lock();
            let mut file = OpenOptions::new().create(true).append(true).open(&self.inner.path).map_err(|e| EngineError::from_io(&self.inner.path, e))?;
            writeln!(file, "{line}").map_err(|e| EngineError::from_io(&self.inner.path, e))?;
        }

        match level {
            Level::Debug => debug!(target: "activity", "{}", message),
            Level::Info => info!(target: "activity", "{}", message),
            Level::Warning => warn!(target: "activity", "{}", message),
            Level::Error | Level::Critical => error!(target: "activity", "{}", message),
        }

        Ok(())
    }

    pub fn info(&self, message: impl fmt::Display) -> Result<(), EngineError> {
        self.append(Level::Info, message)
    }

    pub fn warning(&self, message: impl fmt::Display) -> Result<(), EngineError> {
        self.append(Level::Warning, message)
    }

    pub fn error(&self, message: impl fmt::Display) -> Result<(), EngineError> {
        self.append(Level::Error, message)
    }

    /// Truncates the record and writes a single reset marker.
    pub fn reset(&self, by: &str) -> Result<(), EngineError> {
        let line = format!("{} [{}] {}", Local::now().format(TIMESTAMP_FORMAT), Level::Info, ActivityEvent::Reset { by });

        let _guard = self.inner.lock.lock();
        fs::write(&self.inner.path, format!("{line}\n")).map_err(|e| EngineError::from_io(&self.inner.path, e))?;

        info!(target: "activity", "Log reset by {}", by);

        Ok(())
    }

    /// All lines currently in the record, oldest first.
    pub fn read_lines(&self) -> Result<Vec<String>, EngineError> {
        let _guard = self.inner.lock.lock();

        match fs::read_to_string(&self.inner.path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(EngineError::from_io(&self.inner.path, e)),
        }
    }

    /// The last `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Result<Vec<String>, EngineError> {
        let mut lines = self.read_lines()?;
        let skip = lines.len().saturating_sub(count);
        lines.drain(..skip);

        Ok(lines)
    }
}
