//! 路由指标收集模块
//!
//! 基于 DispatchStats 快照收集和统计日志路由的运行指标。

use std::collections::HashMap;

use contracts::DispatchStats;
use metrics::{counter, gauge, histogram};

/// 从 DispatchStats 快照记录指标
///
/// 快照中的计数是自创建以来的累计值，因此使用 `absolute` 写入。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch_stats;
///
/// manager.submit(entry)?;
/// record_dispatch_stats(&manager.metrics());
/// ```
pub fn record_dispatch_stats(stats: &DispatchStats) {
    counter!("logrelay_entries_submitted_total").absolute(stats.entries_submitted);
    counter!("logrelay_units_delivered_total").absolute(stats.units_delivered);
    counter!("logrelay_groups_closed_total").absolute(stats.groups_closed);
    counter!("logrelay_drain_cycles_total").absolute(stats.cycles_completed);
    counter!("logrelay_backend_failures_total").absolute(stats.backend_failures);

    // 当前队列与打开的分组
    gauge!("logrelay_queued_items").set(stats.queued_items as f64);
    gauge!("logrelay_open_groups").set(stats.open_groups as f64);
}

/// 记录收到的生产者操作 (entry / group / group_end)
pub fn record_op_received(op: &str) {
    counter!("logrelay_ops_received_total", "op" => op.to_string()).increment(1);
}

/// 记录 submit 调用耗时 (内联调度时包含投递)
pub fn record_submit_latency_ms(latency_ms: f64) {
    histogram!("logrelay_submit_latency_ms").record(latency_ms);
}

/// 记录异步 sink 的写入计数
pub fn record_sink_snapshot(sink_name: &str, writes: u64, failures: u64, queue_len: usize) {
    counter!("logrelay_sink_writes_total", "sink" => sink_name.to_string()).absolute(writes);
    counter!("logrelay_sink_failures_total", "sink" => sink_name.to_string()).absolute(failures);
    gauge!("logrelay_sink_queue_len", "sink" => sink_name.to_string()).set(queue_len as f64);
}

/// 路由指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RoutingMetricsAggregator {
    /// 最近一次快照
    pub latest: DispatchStats,

    /// 快照次数
    pub samples: u64,

    /// 队列深度统计
    pub queue_depth: RunningStats,

    /// submit 耗时统计 (毫秒)
    pub submit_latency: RunningStats,

    /// 各 sink 写入失败次数
    pub sink_failures: HashMap<String, u64>,
}

impl RoutingMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, stats: &DispatchStats) {
        self.latest = *stats;
        self.samples += 1;
        self.queue_depth.push(stats.queued_items as f64);
    }

    pub fn record_submit_latency_ms(&mut self, latency_ms: f64) {
        self.submit_latency.push(latency_ms);
    }

    pub fn record_sink_failures(&mut self, sink_name: &str, failures: u64) {
        if failures > 0 {
            self.sink_failures.insert(sink_name.to_string(), failures);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let stats = &self.latest;
        MetricsSummary {
            entries_submitted: stats.entries_submitted,
            units_delivered: stats.units_delivered,
            groups_closed: stats.groups_closed,
            cycles_completed: stats.cycles_completed,
            backend_failures: stats.backend_failures,
            queued_items: stats.queued_items,
            open_groups: stats.open_groups,
            units_per_cycle: if stats.cycles_completed > 0 {
                stats.units_delivered as f64 / stats.cycles_completed as f64
            } else {
                0.0
            },
            queue_depth: StatsSummary::from(&self.queue_depth),
            submit_latency_ms: StatsSummary::from(&self.submit_latency),
            sink_failure_counts: self.sink_failures.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub entries_submitted: u64,
    pub units_delivered: u64,
    pub groups_closed: u64,
    pub cycles_completed: u64,
    pub backend_failures: u64,
    pub queued_items: usize,
    pub open_groups: usize,
    pub units_per_cycle: f64,
    pub queue_depth: StatsSummary,
    pub submit_latency_ms: StatsSummary,
    pub sink_failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Routing Metrics Summary ===")?;
        writeln!(f, "Entries submitted: {}", self.entries_submitted)?;
        writeln!(f, "Units delivered: {}", self.units_delivered)?;
        writeln!(f, "Groups closed: {}", self.groups_closed)?;
        writeln!(
            f,
            "Drain cycles: {} ({:.2} units/cycle)",
            self.cycles_completed, self.units_per_cycle
        )?;
        writeln!(f, "Backend failures: {}", self.backend_failures)?;
        writeln!(
            f,
            "Still queued: {} items, {} open groups",
            self.queued_items, self.open_groups
        )?;
        writeln!(f, "Queue depth: {}", self.queue_depth)?;
        writeln!(f, "Submit latency (ms): {}", self.submit_latency_ms)?;

        if !self.sink_failure_counts.is_empty() {
            writeln!(f, "Sink write failures:")?;
            for (sink, count) in &self.sink_failure_counts {
                writeln!(f, "  {}: {}", sink, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
