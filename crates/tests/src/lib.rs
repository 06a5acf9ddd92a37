//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 路由 -> 文件后端的 e2e 测试
//! - 多生产者并发下的分组连续性

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EntryKind, LogEntry};

    #[test]
    fn test_blueprint_json_snapshot() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
app_name = "svc"

[scheduler]
kind = "tokio"
delay_ms = 5

[[backends]]
name = "out"
backend_type = "file"
params = { path = "out.txt" }
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": "V1",
                "app_name": "svc",
                "scheduler": { "kind": "tokio", "delay_ms": 5 },
                "backends": [{
                    "name": "out",
                    "backend_type": "file",
                    "queue_capacity": 100,
                    "params": { "path": "out.txt" }
                }]
            })
        );

        // JSON output loads back to the same blueprint
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(ConfigLoader::to_json(&reloaded).unwrap(), json);
    }

    #[test]
    fn test_entry_json_snapshot() {
        let entry = LogEntry::new("L", EntryKind::Info, "hello", 2).with_app("APP");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"origin_app":"APP","origin_logger":"L","kind":"info","message":"hello","level":2}"#
        );

        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EntryKind, LogEntry};
    use dispatcher::{create_manager, Logger, ManagerPhase};
    use observability::RoutingMetricsAggregator;
    use tempfile::TempDir;

    fn config(path: &Path, scheduler: &str) -> String {
        format!(
            r#"
app_name = "APP"
scheduler = {scheduler}

[[backends]]
name = "trace"
backend_type = "tracing"

[[backends]]
name = "file"
backend_type = "file"
queue_capacity = 4
params = {{ path = "{}" }}
"#,
            path.display()
        )
    }

    /// File lines with the timestamp between `]` and `:` removed
    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| match (l.find("] "), l.find(": ")) {
                (Some(a), Some(b)) if a < b => format!("{}{}", &l[..=a], &l[b..]),
                _ => l.to_string(),
            })
            .collect()
    }

    /// End-to-end test: config -> create_manager -> file backend
    ///
    /// 验证完整的数据流：
    /// 1. 从 TOML 加载 RouterBlueprint
    /// 2. 分组在最外层关闭前不会投递
    /// 3. 文件后端按深度输出分组
    #[tokio::test]
    async fn test_e2e_config_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.txt");
        let blueprint =
            ConfigLoader::load_from_str(&config(&path, "{ kind = \"inline\" }"), ConfigFormat::Toml)
                .unwrap();

        let router = create_manager(&blueprint).await.unwrap();
        assert_eq!(router.manager().backend_names(), vec!["trace", "file"]);

        let manager = router.manager().clone();
        manager.open_group("db", "tx");
        manager
            .submit(LogEntry::new("db", EntryKind::Info, "begin", 1))
            .unwrap();
        manager.open_group("db", "savepoint");
        manager
            .submit(LogEntry::new("db", EntryKind::Warn, "retry", 2))
            .unwrap();
        manager.close_group("db").unwrap();
        manager
            .submit(LogEntry::new("net", EntryKind::Log, "ping", 0))
            .unwrap();
        manager.close_group("db").unwrap();

        router.settle().await;
        let stats = router.manager().metrics();
        router.shutdown().await;

        assert_eq!(
            read_lines(&path),
            vec![
                "[APP:net@log:0]: ping",
                "GROUP (tx)",
                "| [APP:db@info:1]: begin",
                "| GROUP (savepoint)",
                "| | [APP:db@warn:2]: retry",
            ]
        );
        assert_eq!(stats.units_delivered, 7);
        assert_eq!(stats.groups_closed, 1);
        assert_eq!(stats.queued_items, 0);
    }

    #[tokio::test]
    async fn test_e2e_logger_front_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.txt");
        let blueprint =
            ConfigLoader::load_from_str(&config(&path, "{ kind = \"inline\" }"), ConfigFormat::Toml)
                .unwrap();
        let router = create_manager(&blueprint).await.unwrap();

        let mut logger = Logger::new(router.manager(), "svc");
        logger.set_default_level(3);
        logger.group("startup");
        logger.info("listening", None).unwrap();
        logger.group_end().unwrap();

        router.settle().await;
        router.shutdown().await;

        let lines = read_lines(&path);
        assert_eq!(lines[0], "GROUP (startup)");
        assert_eq!(lines[1], "| [APP:svc@info:3]: listening");
    }

    /// Concurrent producers on a multi-threaded runtime with the tokio scheduler
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrent_producers_keep_groups_contiguous() {
        const PRODUCERS: usize = 4;
        const PER_GROUP: usize = 10;
        const BARE: usize = 5;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.txt");
        let blueprint =
            ConfigLoader::load_from_str(&config(&path, "{ kind = \"tokio\" }"), ConfigFormat::Toml)
                .unwrap();
        let router = create_manager(&blueprint).await.unwrap();

        let mut tasks = Vec::new();
        for p in 0..PRODUCERS {
            let manager = router.manager().clone();
            tasks.push(tokio::spawn(async move {
                let producer = format!("P{p}");
                manager.open_group(&producer, format!("batch-{p}"));
                for i in 0..PER_GROUP {
                    manager
                        .submit(LogEntry::new(&producer, EntryKind::Log, format!("g{i}"), 0))
                        .unwrap();
                    tokio::task::yield_now().await;
                }
                manager.close_group(&producer).unwrap();
                for i in 0..BARE {
                    manager
                        .submit(LogEntry::new(&producer, EntryKind::Log, format!("b{i}"), 0))
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        router.settle().await;
        let mut aggregator = RoutingMetricsAggregator::new();
        aggregator.update(&router.manager().metrics());
        for (name, snapshot) in router.sink_metrics() {
            aggregator.record_sink_failures(&name, snapshot.failure_count);
        }
        router.shutdown().await;

        let lines = read_lines(&path);
        assert_eq!(lines.len(), PRODUCERS * (1 + PER_GROUP + BARE));

        // Each group header is followed by exactly its own producer's entries
        for (idx, line) in lines.iter().enumerate() {
            if let Some(rest) = line.strip_prefix("GROUP (batch-") {
                let p = rest.trim_end_matches(')');
                for (i, member) in lines[idx + 1..=idx + PER_GROUP].iter().enumerate() {
                    assert_eq!(member, &format!("| [APP:P{p}@log:0]: g{i}"));
                }
            }
        }

        // Per-producer submission order survives
        let mut seen: HashMap<String, Vec<String>> = HashMap::new();
        for line in lines.iter().filter(|l| l.starts_with("[APP:")) {
            let producer = line[5..line.find('@').unwrap()].to_string();
            let message = line[line.find("]: ").unwrap() + 3..].to_string();
            seen.entry(producer).or_default().push(message);
        }
        for p in 0..PRODUCERS {
            let expected: Vec<String> = (0..BARE).map(|i| format!("b{i}")).collect();
            assert_eq!(seen[&format!("P{p}")], expected);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.entries_submitted, (PRODUCERS * (PER_GROUP + BARE)) as u64);
        assert_eq!(summary.backend_failures, 0);
        assert!(summary.sink_failure_counts.is_empty());
        assert_eq!(summary.queued_items, 0);
    }

    #[tokio::test]
    async fn test_e2e_shutdown_waits_for_idle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.txt");
        let toml = config(&path, "{ kind = \"tokio\", delay_ms = 1 }");
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let router = create_manager(&blueprint).await.unwrap();

        for i in 0..3 {
            router
                .manager()
                .submit(LogEntry::new("L", EntryKind::Log, format!("m{i}"), 0))
                .unwrap();
        }
        assert_eq!(router.manager().status().phase, ManagerPhase::Draining);

        router.shutdown().await;
        assert_eq!(
            read_lines(&path),
            vec!["[APP:L@log:0]: m0", "[APP:L@log:0]: m1", "[APP:L@log:0]: m2"]
        );
    }
}
