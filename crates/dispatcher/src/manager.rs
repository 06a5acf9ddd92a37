//! Manager - producer-facing facade of the router
//!
//! Producers submit entries and open or close groups through the manager. The
//! manager owns the group tracker, the delivery queue and the drain cycle
//! state, and starts a drain cycle whenever work arrives while idle.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, instrument};

use contracts::{Backend, ContractError, DispatchStats, Environment, LogEntry, Scheduler};

use crate::dispatcher::{Dispatcher, DrainCycle, Phase};
use crate::environment::EnvironmentOverrides;
use crate::error::DispatcherError;
use crate::group::{GroupTracker, Routing};
use crate::metrics::DispatchMetrics;
use crate::queue::DeliveryQueue;
use crate::scheduler::InlineScheduler;

/// A backend registered under a name
pub struct BackendRegistration {
    name: String,
    handle: Box<dyn Backend>,
}

impl BackendRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &dyn Backend {
        self.handle.as_ref()
    }
}

/// Mutable router state, guarded by one lock
#[derive(Debug)]
pub(crate) struct ManagerState {
    pub(crate) queue: DeliveryQueue,
    pub(crate) groups: GroupTracker,
    pub(crate) phase: Phase,
    epoch: u64,
    /// Mirrors `phase`: true while idle
    idle: watch::Sender<bool>,
}

impl Default for ManagerState {
    fn default() -> Self {
        Self {
            queue: DeliveryQueue::default(),
            groups: GroupTracker::default(),
            phase: Phase::Idle,
            epoch: 0,
            idle: watch::Sender::new(true),
        }
    }
}

impl ManagerState {
    /// Enter Draining if idle and return the new cycle's epoch
    fn begin_drain(&mut self) -> Option<u64> {
        if self.phase.is_draining() || self.queue.is_empty() {
            return None;
        }
        self.epoch += 1;
        self.phase = Phase::Draining(DrainCycle::new(self.epoch));
        self.idle.send_replace(false);
        Some(self.epoch)
    }

    /// Leave Draining; wakes everyone in [`Manager::wait_idle`]
    pub(crate) fn end_drain(&mut self) {
        self.phase = Phase::Idle;
        self.idle.send_replace(true);
    }
}

pub(crate) struct Shared {
    pub(crate) app_name: String,
    pub(crate) backends: Vec<BackendRegistration>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) environment: Environment,
    pub(crate) state: Mutex<ManagerState>,
    pub(crate) metrics: DispatchMetrics,
}

/// Coarse phase reported by [`Manager::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    Idle,
    Draining,
}

/// Point-in-time view of the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStatus {
    pub phase: ManagerPhase,
    /// Top-level items not yet resolved; a partially delivered group counts as one
    pub queued_items: usize,
    pub open_groups: usize,
}

/// Builder for creating a Manager
pub struct ManagerBuilder {
    app_name: String,
    backends: Vec<BackendRegistration>,
    scheduler: Option<Arc<dyn Scheduler>>,
    environment: EnvironmentOverrides,
}

impl ManagerBuilder {
    /// Create a new ManagerBuilder for the named application
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            backends: Vec::new(),
            scheduler: None,
            environment: EnvironmentOverrides::default(),
        }
    }

    /// Register a backend; delivery follows registration order
    pub fn backend(self, name: impl Into<String>, backend: impl Backend + 'static) -> Self {
        self.boxed_backend(name, Box::new(backend))
    }

    pub fn boxed_backend(mut self, name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        self.backends.push(BackendRegistration {
            name: name.into(),
            handle: backend,
        });
        self
    }

    /// Scheduler that runs drain continuations (default: [`InlineScheduler`])
    pub fn scheduler(self, scheduler: impl Scheduler + 'static) -> Self {
        self.shared_scheduler(Arc::new(scheduler))
    }

    pub fn shared_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn timestamp(mut self, provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.environment.timestamp = Some(Arc::new(provider));
        self
    }

    pub fn timer(mut self, provider: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.environment.timer = Some(Arc::new(provider));
        self
    }

    pub fn tracer(mut self, provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.environment.tracer = Some(Arc::new(provider));
        self
    }

    /// Build the manager
    #[instrument(
        name = "manager_builder_build",
        skip(self),
        fields(app = %self.app_name, backend_count = self.backends.len())
    )]
    pub fn build(self) -> Result<Manager, DispatcherError> {
        let mut seen = HashSet::new();
        for registration in &self.backends {
            if !seen.insert(registration.name.as_str()) {
                return Err(DispatcherError::DuplicateBackend {
                    name: registration.name.clone(),
                });
            }
        }

        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(InlineScheduler));

        debug!("Manager built");
        Ok(Manager {
            shared: Arc::new(Shared {
                app_name: self.app_name,
                backends: self.backends,
                scheduler,
                environment: self.environment.resolve(),
                state: Mutex::new(ManagerState::default()),
                metrics: DispatchMetrics::new(),
            }),
        })
    }
}

/// Router facade shared by all producers; clones refer to the same router
#[derive(Clone)]
pub struct Manager {
    shared: Arc<Shared>,
}

impl Manager {
    pub fn builder(app_name: impl Into<String>) -> ManagerBuilder {
        ManagerBuilder::new(app_name)
    }

    /// Application name this router was created for
    pub fn name(&self) -> &str {
        &self.shared.app_name
    }

    /// Timestamp, timer and tracer providers for producers
    pub fn environment(&self) -> Environment {
        self.shared.environment.clone()
    }

    /// Accept an entry for delivery
    ///
    /// The entry is stamped with this router's application name. If its
    /// producer has an open group it is buffered, otherwise it is queued and
    /// a drain cycle starts when the router is idle.
    ///
    /// # Errors
    /// With an inline scheduler, a backend failure during the resulting drain
    /// cycle surfaces here.
    pub fn submit(&self, mut entry: LogEntry) -> Result<(), ContractError> {
        entry.origin_app = self.shared.app_name.clone();
        self.shared.metrics.inc_entries_submitted();

        let epoch = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            match state.groups.route(Arc::new(entry)) {
                Routing::Buffered => return Ok(()),
                Routing::PassThrough(entry) => state.queue.push_entry(entry),
            }
            state.begin_drain()
        };
        self.start(epoch)
    }

    /// Open a (possibly nested) group for `producer`
    pub fn open_group(&self, producer: &str, name: impl Into<String>) {
        self.shared.state.lock().groups.open(producer, name);
    }

    /// Close the innermost open group of `producer`
    ///
    /// When the outermost group closes, the whole run is queued as one item.
    ///
    /// # Errors
    /// [`ContractError::GroupUnderflow`] when `producer` has no open group.
    /// Backend failures surface as in [`Manager::submit`].
    pub fn close_group(&self, producer: &str) -> Result<(), ContractError> {
        let epoch = {
            let mut state = self.shared.state.lock();
            let Some(run) = state.groups.close(producer)? else {
                return Ok(());
            };
            state.queue.push_run(run);
            self.shared.metrics.inc_groups_closed();
            state.begin_drain()
        };
        self.start(epoch)
    }

    /// Start a drain cycle if there is queued work and none is running
    ///
    /// Needed after a cycle was aborted by a backend failure, since the
    /// remaining items stay queued until the next submit or close.
    pub fn resume(&self) -> Result<(), ContractError> {
        let epoch = self.shared.state.lock().begin_drain();
        self.start(epoch)
    }

    fn start(&self, epoch: Option<u64>) -> Result<(), ContractError> {
        match epoch {
            Some(epoch) => Dispatcher::start(&self.shared, epoch),
            None => Ok(()),
        }
    }

    /// Resolve once no drain cycle is running
    ///
    /// Deferred backends complete on other tasks, so the router may still be
    /// draining after the last `submit` returned.
    pub async fn wait_idle(&self) {
        let mut idle = self.shared.state.lock().idle.subscribe();
        // The sender lives in `self`, so this cannot fail
        let _ = idle.wait_for(|idle| *idle).await;
    }

    pub fn status(&self) -> ManagerStatus {
        let state = self.shared.state.lock();
        ManagerStatus {
            phase: if state.phase.is_draining() {
                ManagerPhase::Draining
            } else {
                ManagerPhase::Idle
            },
            queued_items: state.queue.len(),
            open_groups: state.groups.open_runs(),
        }
    }

    /// Counters since creation
    pub fn metrics(&self) -> DispatchStats {
        let status = self.status();
        self.shared
            .metrics
            .snapshot(status.queued_items, status.open_groups)
    }

    /// Backend names in delivery order
    pub fn backend_names(&self) -> Vec<String> {
        self.shared
            .backends
            .iter()
            .map(|b| b.name.clone())
            .collect()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("app_name", &self.shared.app_name)
            .field("backends", &self.backend_names())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::QueuedScheduler;
    use crate::test_support::{Deferred, Failing, Recorder};
    use contracts::{Completion, EntryKind};

    fn entry(logger: &str, message: &str) -> LogEntry {
        LogEntry::new(logger, EntryKind::Log, message, 0)
    }

    fn single(recorder: &Recorder) -> Manager {
        Manager::builder("APP")
            .backend("rec", recorder.clone())
            .build()
            .unwrap()
    }

    /// Appends `tag:unit` to a log shared between several backends
    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Backend for Tagged {
        fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
            self.log.lock().push(format!("{}:{}", self.tag, entry.message));
            done.complete()
        }

        fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
            self.log.lock().push(format!("{}:group({name})", self.tag));
            done.complete()
        }

        fn group_end(&self, done: Completion) -> Result<(), ContractError> {
            self.log.lock().push(format!("{}:group_end", self.tag));
            done.complete()
        }
    }

    #[test]
    fn test_entries_delivered_in_submission_order() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        for i in 1..=5 {
            manager.submit(entry("L", &format!("E{i}"))).unwrap();
        }

        assert_eq!(
            recorder.events(),
            vec![
                "push(APP:L:E1)",
                "push(APP:L:E2)",
                "push(APP:L:E3)",
                "push(APP:L:E4)",
                "push(APP:L:E5)",
            ]
        );
        let status = manager.status();
        assert_eq!(status.phase, ManagerPhase::Idle);
        assert_eq!(status.queued_items, 0);
    }

    #[test]
    fn test_each_unit_reaches_every_backend_before_the_next() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = Manager::builder("APP")
            .backend("a", Tagged { tag: "a", log: Arc::clone(&log) })
            .backend("b", Tagged { tag: "b", log: Arc::clone(&log) })
            .build()
            .unwrap();

        manager.submit(entry("L", "E1")).unwrap();
        manager.submit(entry("L", "E2")).unwrap();

        assert_eq!(*log.lock(), vec!["a:E1", "b:E1", "a:E2", "b:E2"]);
        assert_eq!(manager.backend_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_submit_stamps_app_without_adding_fields() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager.submit(LogEntry::new("L", "log", "hi", 10)).unwrap();

        assert_eq!(
            recorder.entries(),
            vec![LogEntry {
                origin_app: "APP".to_string(),
                origin_logger: "L".to_string(),
                kind: EntryKind::Log,
                message: "hi".to_string(),
                level: 10,
                trace: None,
                timestamp: None,
            }]
        );
    }

    #[test]
    fn test_submit_overrides_foreign_app_name() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager
            .submit(LogEntry::new("L", EntryKind::Info, "hello", 2).with_app("OTHER"))
            .unwrap();

        assert_eq!(recorder.entries()[0].origin_app, "APP");
    }

    #[test]
    fn test_empty_group_delivers_brackets() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager.open_group("L", "X");
        manager.close_group("L").unwrap();

        assert_eq!(recorder.events(), vec!["group(X)", "group_end"]);
    }

    #[test]
    fn test_nested_groups_released_on_outermost_close() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager.open_group("L", "g1");
        manager.open_group("L", "g2");
        manager.submit(entry("L", "E")).unwrap();
        manager.close_group("L").unwrap();
        assert!(recorder.events().is_empty());
        assert_eq!(manager.status().open_groups, 1);

        manager.close_group("L").unwrap();
        assert_eq!(
            recorder.events(),
            vec!["group(g1)", "group(g2)", "push(APP:L:E)", "group_end", "group_end"]
        );
        assert_eq!(manager.status().open_groups, 0);
    }

    #[test]
    fn test_open_group_does_not_hold_back_other_producers() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager.open_group("L1", "g");
        manager.submit(entry("L1", "a")).unwrap();
        manager.submit(entry("L2", "b")).unwrap();
        assert_eq!(recorder.events(), vec!["push(APP:L2:b)"]);

        manager.close_group("L1").unwrap();
        assert_eq!(
            recorder.events(),
            vec!["push(APP:L2:b)", "group(g)", "push(APP:L1:a)", "group_end"]
        );
    }

    #[test]
    fn test_close_without_open_is_underflow() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        let err = manager.close_group("L").unwrap_err();
        assert!(matches!(err, ContractError::GroupUnderflow { ref producer } if producer == "L"));
        assert!(recorder.events().is_empty());
        assert_eq!(manager.status().phase, ManagerPhase::Idle);
    }

    #[test]
    fn test_queued_scheduler_suspends_between_steps() {
        let recorder = Recorder::default();
        let scheduler = QueuedScheduler::new();
        let manager = Manager::builder("APP")
            .backend("rec", recorder.clone())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "E1")).unwrap();
        assert!(recorder.events().is_empty());
        assert_eq!(manager.status().phase, ManagerPhase::Draining);
        assert_eq!(scheduler.pending(), 1);

        // Resolve, then deliver
        scheduler.run_next().unwrap().unwrap();
        assert!(recorder.events().is_empty());
        scheduler.run_next().unwrap().unwrap();
        assert_eq!(recorder.events(), vec!["push(APP:L:E1)"]);

        // Accepted mid-cycle, picked up by the same cycle
        manager.submit(entry("L", "E2")).unwrap();
        scheduler.run_until_idle().unwrap();

        assert_eq!(recorder.events(), vec!["push(APP:L:E1)", "push(APP:L:E2)"]);
        assert_eq!(manager.status().phase, ManagerPhase::Idle);
        assert_eq!(manager.metrics().cycles_completed, 1);
    }

    #[test]
    fn test_delivered_items_are_released_during_a_long_cycle() {
        let recorder = Recorder::default();
        let scheduler = QueuedScheduler::new();
        let manager = Manager::builder("APP")
            .backend("rec", recorder.clone())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "0")).unwrap();
        for i in 1..=1000 {
            // Resolve, then deliver
            scheduler.run_next().unwrap().unwrap();
            scheduler.run_next().unwrap().unwrap();
            manager.submit(entry("L", &i.to_string())).unwrap();

            let status = manager.status();
            assert_eq!(status.phase, ManagerPhase::Draining);
            assert_eq!(status.queued_items, 1, "after {i} deliveries");
        }

        scheduler.run_until_idle().unwrap();
        assert_eq!(recorder.events().len(), 1001);
        assert_eq!(manager.status().queued_items, 0);
        assert_eq!(manager.metrics().cycles_completed, 1);
    }

    #[test]
    fn test_partially_delivered_group_counts_as_one_item() {
        let recorder = Recorder::default();
        let scheduler = QueuedScheduler::new();
        let manager = Manager::builder("APP")
            .backend("rec", recorder.clone())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        manager.submit(entry("A", "before")).unwrap();
        manager.open_group("B", "g");
        manager.submit(entry("B", "inside")).unwrap();
        manager.close_group("B").unwrap();
        assert_eq!(manager.status().queued_items, 2);

        // "before", then the group header
        for _ in 0..4 {
            scheduler.run_next().unwrap().unwrap();
        }
        assert_eq!(recorder.events(), vec!["push(APP:A:before)", "group(g)"]);
        assert_eq!(manager.status().queued_items, 1);

        scheduler.run_until_idle().unwrap();
        assert_eq!(manager.status().queued_items, 0);
    }

    #[tokio::test]
    async fn test_wait_idle_resolves_when_cycle_ends() {
        let deferred = Deferred::default();
        let manager = Manager::builder("APP")
            .backend("deferred", deferred.clone())
            .build()
            .unwrap();

        // Idle already
        manager.wait_idle().await;

        manager.submit(entry("L", "a")).unwrap();
        manager.submit(entry("L", "b")).unwrap();
        assert_eq!(manager.status().phase, ManagerPhase::Draining);

        let waiter = tokio::spawn({
            let manager = manager.clone();
            async move { manager.wait_idle().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        deferred.release().unwrap();
        assert_eq!(manager.status().phase, ManagerPhase::Draining);
        deferred.release().unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manager.status().phase, ManagerPhase::Idle);
    }

    #[test]
    fn test_next_backend_waits_for_deferred_completion() {
        let deferred = Deferred::default();
        let after = Recorder::default();
        let manager = Manager::builder("APP")
            .backend("deferred", deferred.clone())
            .backend("after", after.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "E1")).unwrap();
        manager.submit(entry("L", "E2")).unwrap();
        assert_eq!(deferred.recorder.events(), vec!["push(APP:L:E1)"]);
        assert!(after.events().is_empty());
        assert_eq!(manager.status().phase, ManagerPhase::Draining);

        deferred.release().unwrap();
        assert_eq!(after.events(), vec!["push(APP:L:E1)"]);
        assert_eq!(
            deferred.recorder.events(),
            vec!["push(APP:L:E1)", "push(APP:L:E2)"]
        );

        deferred.release().unwrap();
        assert_eq!(after.events(), vec!["push(APP:L:E1)", "push(APP:L:E2)"]);
        assert_eq!(deferred.pending(), 0);
        assert_eq!(manager.status().phase, ManagerPhase::Idle);
    }

    #[test]
    fn test_unsignalled_completion_stalls_delivery() {
        let deferred = Deferred::default();
        let manager = Manager::builder("APP")
            .backend("deferred", deferred.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "E1")).unwrap();
        manager.submit(entry("L", "E2")).unwrap();
        manager.submit(entry("L", "E3")).unwrap();

        assert_eq!(deferred.recorder.events().len(), 1);
        let status = manager.status();
        assert_eq!(status.phase, ManagerPhase::Draining);
        assert_eq!(status.queued_items, 3);
    }

    #[test]
    fn test_backend_failure_aborts_cycle() {
        let failing = Failing::new("bad");
        let scheduler = QueuedScheduler::new();
        let manager = Manager::builder("APP")
            .backend("failing", failing.clone())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "a")).unwrap();
        manager.submit(entry("L", "bad")).unwrap();
        manager.submit(entry("L", "c")).unwrap();

        let err = scheduler.run_until_idle().unwrap_err();
        assert!(matches!(err, ContractError::BackendFailure { .. }));
        assert_eq!(failing.recorder.events(), vec!["push(APP:L:a)"]);

        // The failing unit is consumed, the rest stays queued
        let status = manager.status();
        assert_eq!(status.phase, ManagerPhase::Idle);
        assert_eq!(status.queued_items, 1);
        assert_eq!(manager.metrics().backend_failures, 1);

        manager.resume().unwrap();
        scheduler.run_until_idle().unwrap();
        assert_eq!(failing.recorder.events(), vec!["push(APP:L:a)", "push(APP:L:c)"]);
        assert_eq!(manager.status().queued_items, 0);
    }

    #[test]
    fn test_inline_failure_surfaces_from_submit() {
        let failing = Failing::new("bad");
        let manager = Manager::builder("APP")
            .backend("failing", failing.clone())
            .build()
            .unwrap();

        manager.submit(entry("L", "ok")).unwrap();
        let err = manager.submit(entry("L", "bad")).unwrap_err();
        assert!(matches!(err, ContractError::BackendFailure { ref backend, .. } if backend == "failing"));

        manager.submit(entry("L", "after")).unwrap();
        assert_eq!(
            failing.recorder.events(),
            vec!["push(APP:L:ok)", "push(APP:L:after)"]
        );
    }

    #[test]
    fn test_zero_backends_consume_units() {
        let manager = Manager::builder("APP").build().unwrap();

        manager.submit(entry("L", "E")).unwrap();
        manager.open_group("L", "g");
        manager.close_group("L").unwrap();

        let stats = manager.metrics();
        assert_eq!(stats.entries_submitted, 1);
        assert_eq!(stats.groups_closed, 1);
        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.queued_items, 0);
        assert_eq!(manager.status().phase, ManagerPhase::Idle);
    }

    #[test]
    fn test_metrics_count_deliveries() {
        let recorder = Recorder::default();
        let manager = single(&recorder);

        manager.submit(entry("L", "a")).unwrap();
        manager.open_group("L", "g");
        manager.submit(entry("L", "b")).unwrap();
        manager.close_group("L").unwrap();

        let stats = manager.metrics();
        assert_eq!(stats.entries_submitted, 2);
        assert_eq!(stats.units_delivered, 4);
        assert_eq!(stats.groups_closed, 1);
        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.backend_failures, 0);
    }

    #[test]
    fn test_duplicate_backend_rejected() {
        let result = Manager::builder("APP")
            .backend("x", Recorder::default())
            .backend("x", Recorder::default())
            .build();

        assert!(matches!(result, Err(DispatcherError::DuplicateBackend { ref name }) if name == "x"));
    }

    #[test]
    fn test_environment_overrides() {
        let manager = Manager::builder("APP")
            .timestamp(|| "T0".to_string())
            .timer(|| 42)
            .tracer(|| "here".to_string())
            .build()
            .unwrap();

        let env = manager.environment();
        assert_eq!(manager.name(), "APP");
        assert_eq!(env.timestamp(), "T0");
        assert_eq!(env.now_ms(), 42);
        assert_eq!(env.trace().as_deref(), Some("here"));
    }
}
