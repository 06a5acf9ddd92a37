//! Logger - named producer handle bound to a manager

use contracts::{ContractError, EntryKind, LogEntry, Namespace};

use crate::manager::Manager;

/// Producer front end; entries it builds carry its name as origin logger
///
/// Clones share the manager but not the default level.
#[derive(Debug, Clone)]
pub struct Logger {
    manager: Manager,
    name: String,
    default_level: i64,
}

impl Logger {
    pub fn new(manager: &Manager, name: impl Into<String>) -> Self {
        Self {
            manager: manager.clone(),
            name: name.into(),
            default_level: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Namespace {
        Namespace {
            app: self.manager.name().to_string(),
            logger: self.name.clone(),
        }
    }

    pub fn default_level(&self) -> i64 {
        self.default_level
    }

    pub fn set_default_level(&mut self, level: i64) {
        self.default_level = level;
    }

    pub fn log(&self, message: impl Into<String>, level: Option<i64>) -> Result<(), ContractError> {
        self.emit(EntryKind::Log, message.into(), level)
    }

    pub fn info(&self, message: impl Into<String>, level: Option<i64>) -> Result<(), ContractError> {
        self.emit(EntryKind::Info, message.into(), level)
    }

    pub fn warn(&self, message: impl Into<String>, level: Option<i64>) -> Result<(), ContractError> {
        self.emit(EntryKind::Warn, message.into(), level)
    }

    pub fn error(&self, message: impl Into<String>, level: Option<i64>) -> Result<(), ContractError> {
        self.emit(EntryKind::Error, message.into(), level)
    }

    pub fn group(&self, name: impl Into<String>) {
        self.manager.open_group(&self.name, name);
    }

    pub fn group_end(&self) -> Result<(), ContractError> {
        self.manager.close_group(&self.name)
    }

    fn emit(&self, kind: EntryKind, message: String, level: Option<i64>) -> Result<(), ContractError> {
        // Level 0 counts as unset
        let level = level.filter(|l| *l != 0).unwrap_or(self.default_level);
        let env = self.manager.environment();

        let mut entry = LogEntry::new(&self.name, kind, message, level).with_timestamp(env.timestamp());
        entry.trace = env.trace();
        self.manager.submit(entry)
    }
}
