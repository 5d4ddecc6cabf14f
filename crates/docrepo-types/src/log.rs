use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::TypeError;

/// Document field holding the severity rank of a [`LogEntry`].
pub const LEVEL_FIELD: &str = "level";

/// Ordered log severity.
///
/// Persisted as its integer rank so stores can apply range filters
/// (`level >= Warning`) without knowing the enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Integer rank used in stored documents.
    pub fn rank(self) -> i64 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }

    /// Inverse of [`LogLevel::rank`].
    pub fn from_rank(rank: i64) -> Result<Self, TypeError> {
        match rank {
            0 => Ok(LogLevel::Debug),
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Warning),
            3 => Ok(LogLevel::Error),
            other => Err(TypeError::InvalidLogLevel(other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.rank())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rank = i64::deserialize(deserializer)?;
        LogLevel::from_rank(rank).map_err(serde::de::Error::custom)
    }
}

/// A record of the capped log collection. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl LogEntry {
    /// A new entry dated now.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Attach an arbitrary structured payload.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            date: Utc::now(),
            level: LogLevel::default(),
            source: None,
            message: None,
            stack_trace: None,
            parameters: None,
        }
    }
}
