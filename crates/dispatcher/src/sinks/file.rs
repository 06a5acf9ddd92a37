//! FileSink - appends delivery units to a text file

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contracts::{AsyncSink, ContractError, LogEntry, Unit};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use super::render_body;

/// File used when no `path` param is configured
pub const DEFAULT_LOG_FILE: &str = "logrelay.txt";

const DEPTH_MARKER: &str = "| ";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Target file, created if missing and appended to otherwise
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        Self { path }
    }
}

/// Sink appending `[app:logger@kind:level] timestamp: message` lines
///
/// Each open group prefixes lines with `"| "`; a group opening is written as
/// `GROUP (name)` at the enclosing depth.
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    depth: usize,
}

impl FileSink {
    /// Open (or create) the target file in append mode
    pub async fn open(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: Some(BufWriter::new(file)),
            depth: 0,
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::open(name, FileSinkConfig::from_params(params)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn prefix(&self) -> String {
        DEPTH_MARKER.repeat(self.depth)
    }

    fn render_entry(&self, entry: &LogEntry) -> String {
        format!(
            "{}[{}@{}:{}]{}\n",
            self.prefix(),
            entry.namespace(),
            entry.kind,
            entry.level,
            render_body(entry, true)
        )
    }

    fn write_error(&self, err: std::io::Error) -> ContractError {
        ContractError::sink_write(&self.name, format!("{}: {err}", self.path.display()))
    }
}

impl AsyncSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, unit),
        fields(sink = %self.name, unit = unit.label())
    )]
    async fn write(&mut self, unit: &Unit) -> Result<(), ContractError> {
        let text = match unit {
            Unit::Entry(entry) => Some(self.render_entry(entry)),
            Unit::GroupOpen { name } => {
                let header = format!("{}GROUP ({name})\n", self.prefix());
                self.depth += 1;
                Some(header)
            }
            Unit::GroupEnd => {
                self.depth = self.depth.saturating_sub(1);
                None
            }
        };

        let Some(text) = text else {
            return Ok(());
        };
        let Some(writer) = self.writer.as_mut() else {
            return Err(ContractError::sink_write(&self.name, "file sink is closed"));
        };
        let result = match writer.write_all(text.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        result.map_err(|e| self.write_error(e))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            let result = writer.flush().await;
            result.map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            let result = writer.shutdown().await;
            result.map_err(|e| self.write_error(e))?;
        }
        debug!(sink = %self.name, depth = self.depth, "File closed");
        info!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EntryKind;
    use tempfile::TempDir;

    async fn sink_in(dir: &TempDir) -> FileSink {
        let config = FileSinkConfig {
            path: dir.path().join("out.txt"),
        };
        FileSink::open("file", config).await.unwrap()
    }

    fn entry(message: &str) -> Unit {
        Unit::entry(LogEntry::new("L", EntryKind::Info, message, 2).with_app("APP"))
    }

    #[test]
    fn test_config_defaults_path() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.path, PathBuf::from(DEFAULT_LOG_FILE));

        let mut params = HashMap::new();
        params.insert("path".to_string(), "/tmp/x.log".to_string());
        assert_eq!(FileSinkConfig::from_params(&params).path, PathBuf::from("/tmp/x.log"));
    }

    #[tokio::test]
    async fn test_file_sink_writes_entry_line() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir).await;

        let unit = Unit::entry(
            LogEntry::new("db", EntryKind::Warn, "slow", 3)
                .with_app("svc")
                .with_timestamp("2024-01-01T00:00:00.000Z")
                .with_trace("at query"),
        );
        sink.write(&unit).await.unwrap();
        sink.close().await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            text,
            "[svc:db@warn:3] 2024-01-01T00:00:00.000Z: slow\nat query\n"
        );
    }

    #[tokio::test]
    async fn test_file_sink_omits_empty_message() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir).await;

        let bare = LogEntry::new("db", EntryKind::Log, "", 0).with_app("svc");
        let stamped = bare.clone().with_timestamp("2024-01-01T00:00:00.000Z");
        sink.write(&Unit::entry(bare)).await.unwrap();
        sink.write(&Unit::entry(stamped)).await.unwrap();
        sink.close().await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            text,
            "[svc:db@log:0]\n[svc:db@log:0] 2024-01-01T00:00:00.000Z\n"
        );
    }

    #[tokio::test]
    async fn test_file_sink_marks_group_depth() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir).await;

        sink.write(&Unit::group_open("outer")).await.unwrap();
        sink.write(&entry("a")).await.unwrap();
        sink.write(&Unit::group_open("inner")).await.unwrap();
        sink.write(&entry("b")).await.unwrap();
        sink.write(&Unit::GroupEnd).await.unwrap();
        sink.write(&Unit::GroupEnd).await.unwrap();
        sink.write(&entry("c")).await.unwrap();
        sink.close().await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            text,
            "GROUP (outer)\n\
             | [APP:L@info:2]: a\n\
             | GROUP (inner)\n\
             | | [APP:L@info:2]: b\n\
             [APP:L@info:2]: c\n"
        );
        assert_eq!(sink.depth(), 0);
    }

    #[tokio::test]
    async fn test_file_sink_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut sink = sink_in(&dir).await;
        sink.write(&entry("later")).await.unwrap();
        sink.close().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "earlier\n[APP:L@info:2]: later\n");
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir).await;
        sink.close().await.unwrap();

        let err = sink.write(&entry("late")).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkWrite { .. }));
    }
}
