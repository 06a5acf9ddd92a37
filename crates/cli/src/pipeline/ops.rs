//! Producer operations read from the JSON-lines input.

use contracts::{EntryKind, LogEntry};
use serde::Deserialize;

/// One producer operation
///
/// ```json
/// {"op":"entry","logger":"net","kind":"info","message":"up","level":2}
/// {"op":"group","logger":"net","name":"handshake"}
/// {"op":"group_end","logger":"net"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Entry {
        logger: String,
        #[serde(default = "default_kind")]
        kind: EntryKind,
        message: String,
        #[serde(default)]
        level: Option<i64>,
    },
    Group {
        logger: String,
        name: String,
    },
    GroupEnd {
        logger: String,
    },
}

fn default_kind() -> EntryKind {
    EntryKind::Log
}

impl Op {
    /// Parse one input line; blank lines and `#` comments yield `None`
    pub fn parse_line(line: &str) -> Option<serde_json::Result<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        Some(serde_json::from_str(trimmed))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Entry { .. } => "entry",
            Self::Group { .. } => "group",
            Self::GroupEnd { .. } => "group_end",
        }
    }

    pub fn logger(&self) -> &str {
        match self {
            Self::Entry { logger, .. } | Self::Group { logger, .. } | Self::GroupEnd { logger } => {
                logger
            }
        }
    }

    /// Build the entry for an `entry` op; level 0 or absent means 0
    pub fn to_entry(&self) -> Option<LogEntry> {
        match self {
            Self::Entry {
                logger,
                kind,
                message,
                level,
            } => Some(LogEntry::new(
                logger,
                kind.clone(),
                message,
                level.unwrap_or_default(),
            )),
            _ => None,
        }
    }
}
