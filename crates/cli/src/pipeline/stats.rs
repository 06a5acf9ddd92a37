//! Relay statistics and metrics.

use std::time::Duration;

use observability::RoutingMetricsAggregator;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Operations applied to the router, failed ones included
    pub ops_applied: u64,

    /// Entries submitted
    pub entries: u64,

    /// Groups opened
    pub groups_opened: u64,

    /// Groups closed without underflow
    pub groups_closed: u64,

    /// Lines that could not be parsed
    pub malformed: u64,

    /// Operations the router rejected
    pub routing_errors: u64,

    /// Total duration of the relay run
    pub duration: Duration,

    /// Number of configured backends
    pub active_backends: usize,

    /// Routing metrics aggregator
    pub metrics: RoutingMetricsAggregator,
}

impl RelayStats {
    /// Operations per second throughput
    pub fn ops_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ops_applied as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Operations: {}", self.ops_applied);
        println!("   ├─ Ops/s: {:.2}", self.ops_per_sec());
        println!("   ├─ Entries: {}", self.entries);
        println!(
            "   ├─ Groups opened/closed: {}/{}",
            self.groups_opened, self.groups_closed
        );
        println!("   ├─ Malformed lines: {}", self.malformed);
        println!("   ├─ Routing errors: {}", self.routing_errors);
        println!("   └─ Active backends: {}", self.active_backends);

        let summary = self.metrics.summary();

        println!("\n📈 Routing Metrics");
        println!("   ├─ Units delivered: {}", summary.units_delivered);
        println!(
            "   ├─ Drain cycles: {} ({:.2} units/cycle)",
            summary.cycles_completed, summary.units_per_cycle
        );
        println!("   ├─ Backend failures: {}", summary.backend_failures);
        println!(
            "   ├─ Left queued: {} items, {} open groups",
            summary.queued_items, summary.open_groups
        );
        println!("   ├─ Queue depth: {}", summary.queue_depth);
        println!("   └─ Submit latency (ms): {}", summary.submit_latency_ms);

        if !summary.sink_failure_counts.is_empty() {
            println!("\n⚠️  Sink Write Failures");
            for (sink, count) in &summary.sink_failure_counts {
                println!("   ├─ {}: {}", sink, count);
            }
        }

        println!();
    }
}
