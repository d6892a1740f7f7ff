//! DependencyService - 依存関係の追加・削除と解析
//!
//! ストアからスナップショットを読み込み、`graph` の純粋なアルゴリズムに渡します。
//! 循環チェックだけは、追加する依存先から到達できるタスクのみを読み込みます。
//!
//! # 直列化
//! 依存関係を変更する操作（add / remove）は write gate を取ってから
//! 「読み込み → 循環チェック → 保存」を行います。
//! 同時に来た 2 つの追加がそれぞれ単独では安全でも、
//! 合わせると閉路になるケースを防ぐためです。読み取り系は gate を取りません。

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::config::{ConfigError, ServiceConfig};
use crate::domain::{
    BlockedReport, CriticalPath, DependencyEdge, DependencyType, DomainEvent, GraphError,
    GraphNode, ProjectId, Task, TaskFilter, TaskId,
};
use crate::graph::{blocked_by, find_cycle, find_longest_duration_path};
use crate::impls::NoopEventSink;
use crate::ports::{Clock, EventSink, SystemClock, TaskStore};

/// Builder for [`DependencyService`].
///
/// ```ignore
/// let service = DependencyService::builder(store)
///     .events(TracingEventSink)
///     .config(config)
///     .build()?;
/// ```
///
/// `build()` validates the config (fail-fast).
pub struct DependencyServiceBuilder<S, E = NoopEventSink, C = SystemClock> {
    store: S,
    events: E,
    clock: C,
    config: ServiceConfig,
}

impl<S, E, C> DependencyServiceBuilder<S, E, C> {
    pub fn events<E2: EventSink>(self, events: E2) -> DependencyServiceBuilder<S, E2, C> {
        DependencyServiceBuilder {
            store: self.store,
            events,
            clock: self.clock,
            config: self.config,
        }
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> DependencyServiceBuilder<S, E, C2> {
        DependencyServiceBuilder {
            store: self.store,
            events: self.events,
            clock,
            config: self.config,
        }
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<DependencyService<S, E, C>, ConfigError> {
        self.config.validate()?;
        Ok(DependencyService {
            store: self.store,
            events: self.events,
            clock: self.clock,
            config: self.config,
            write_gate: Mutex::new(()),
        })
    }
}

/// The five operations the surrounding CRUD layer calls.
pub struct DependencyService<S, E = NoopEventSink, C = SystemClock> {
    store: S,
    events: E,
    clock: C,
    config: ServiceConfig,
    write_gate: Mutex<()>,
}

impl<S: TaskStore> DependencyService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            events: NoopEventSink,
            clock: SystemClock,
            config: ServiceConfig::default(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn builder(store: S) -> DependencyServiceBuilder<S> {
        DependencyServiceBuilder {
            store,
            events: NoopEventSink,
            clock: SystemClock,
            config: ServiceConfig::default(),
        }
    }
}

impl<S, E, C> DependencyService<S, E, C>
where
    S: TaskStore,
    E: EventSink,
    C: Clock,
{
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Make `task_id` depend on `depends_on`.
    ///
    /// - either task missing → not found (the task itself is checked first)
    /// - the edge would close a cycle (self-loops included) → rejected, nothing written
    /// - an edge to `depends_on` already exists → no write, task returned as is
    #[instrument(skip_all, fields(task = %task_id, depends_on = %depends_on))]
    pub async fn add_dependency(
        &self,
        task_id: TaskId,
        depends_on: TaskId,
        dependency_type: Option<DependencyType>,
    ) -> Result<Task, GraphError> {
        let _gate = self.write_gate.lock().await;

        let mut task = self
            .store
            .get(task_id)
            .await?
            .ok_or(GraphError::TaskNotFound(task_id))?;
        let prerequisite = self
            .store
            .get(depends_on)
            .await?
            .ok_or(GraphError::DependencyNotFound(depends_on))?;

        let reachable = self.reachable_from(prerequisite, task_id).await?;
        if let Some(cycle) = find_cycle(&reachable, task_id, depends_on) {
            warn!(len = cycle.len(), "rejected dependency: circular");
            return Err(GraphError::CircularDependency {
                task: task_id,
                depends_on,
                cycle,
            });
        }

        let dependency_type = dependency_type.unwrap_or(self.config.default_dependency_type);
        if !task.add_edge(DependencyEdge::new(depends_on, dependency_type)) {
            debug!("dependency already present");
            return Ok(task);
        }
        self.store
            .save_dependencies(task_id, task.dependencies.clone())
            .await?;
        info!(%dependency_type, "dependency added");

        self.publish(DomainEvent::DependencyAdded {
            task_id,
            depends_on,
            dependency_type,
            at: self.clock.now(),
        })
        .await;
        Ok(task)
    }

    /// Drop the edge `task_id -> dependency_id`. Never cycle-checked.
    ///
    /// Removing an edge that does not exist succeeds without a write.
    #[instrument(skip_all, fields(task = %task_id, dependency = %dependency_id))]
    pub async fn remove_dependency(
        &self,
        task_id: TaskId,
        dependency_id: TaskId,
    ) -> Result<Task, GraphError> {
        let _gate = self.write_gate.lock().await;

        let mut task = self
            .store
            .get(task_id)
            .await?
            .ok_or(GraphError::TaskNotFound(task_id))?;
        if !task.remove_edge(dependency_id) {
            debug!("no such dependency");
            return Ok(task);
        }
        self.store
            .save_dependencies(task_id, task.dependencies.clone())
            .await?;
        info!("dependency removed");

        self.publish(DomainEvent::DependencyRemoved {
            task_id,
            dependency_id,
            at: self.clock.now(),
        })
        .await;
        Ok(task)
    }

    /// Flat adjacency list of every task in scope.
    #[instrument(skip_all, fields(project = ?project))]
    pub async fn dependency_graph(
        &self,
        project: Option<ProjectId>,
    ) -> Result<Vec<GraphNode>, GraphError> {
        let tasks = self.store.find(&self.scope(project)).await?;
        debug!(tasks = tasks.len(), "dependency graph");
        Ok(tasks.iter().map(GraphNode::from).collect())
    }

    /// Longest-duration chain within one project.
    #[instrument(skip_all, fields(project = %project))]
    pub async fn critical_path(&self, project: ProjectId) -> Result<CriticalPath, GraphError> {
        let tasks = self.store.find(&self.scope(Some(project))).await?;
        if let Some(limit) = self.config.max_path_tasks
            && tasks.len() > limit
        {
            warn!(tasks = tasks.len(), limit, "critical path scope too large");
            return Err(GraphError::ScopeTooLarge {
                tasks: tasks.len(),
                limit,
            });
        }
        Ok(find_longest_duration_path(&tasks))
    }

    /// Is `task_id` waiting on any prerequisite that is not completed?
    #[instrument(skip_all, fields(task = %task_id))]
    pub async fn check_blocked(&self, task_id: TaskId) -> Result<BlockedReport, GraphError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(GraphError::TaskNotFound(task_id))?;

        let mut prerequisites = HashMap::with_capacity(task.dependencies.len());
        for dep in task.prerequisites() {
            if let Some(found) = self.store.get(dep).await? {
                prerequisites.insert(dep, found);
            }
        }
        Ok(blocked_by(&task, &prerequisites))
    }

    /// Load `start` and everything it transitively depends on, one record
    /// at a time. The walk stops early once `target` is reached, since the
    /// loaded records then already hold a path back to `start`.
    async fn reachable_from(
        &self,
        start: Task,
        target: TaskId,
    ) -> Result<HashMap<TaskId, Task>, GraphError> {
        let mut seen: HashSet<TaskId> = HashSet::from([start.id]);
        let mut stack: Vec<TaskId> = start.prerequisites().collect();
        let mut reached = HashMap::from([(start.id, start)]);

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if id == target {
                break;
            }
            let Some(task) = self.store.get(id).await? else {
                continue;
            };
            stack.extend(task.prerequisites().filter(|p| !seen.contains(p)));
            reached.insert(id, task);
        }
        debug!(loaded = reached.len(), "reachable prerequisites");
        Ok(reached)
    }

    fn scope(&self, project: Option<ProjectId>) -> TaskFilter {
        TaskFilter {
            project,
            include_templates: self.config.include_templates,
        }
    }

    async fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if let Err(e) = self.events.emit(event).await {
            warn!(event = name, error = %e, "event delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventSinkError, StoreError, TaskStatus};
    use crate::impls::{InMemoryEventSink, InMemoryTaskStore};
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ulid::Ulid;

    fn tid(n: u128) -> TaskId {
        TaskId::from_ulid(Ulid::from(n))
    }

    fn store_with(ids: &[u128]) -> InMemoryTaskStore {
        InMemoryTaskStore::from_tasks(ids.iter().map(|&n| Task::new(tid(n), format!("t{n}"))))
    }

    /// Remembers every `get` and counts full scans.
    #[derive(Clone, Default)]
    struct RecordingStore {
        inner: InMemoryTaskStore,
        fetched: Arc<std::sync::Mutex<Vec<TaskId>>>,
        scans: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskStore for RecordingStore {
        async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
            self.fetched.lock().unwrap().push(id);
            self.inner.get(id).await
        }

        async fn find(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.find(filter).await
        }

        async fn save_dependencies(
            &self,
            id: TaskId,
            dependencies: Vec<DependencyEdge>,
        ) -> Result<(), StoreError> {
            self.inner.save_dependencies(id, dependencies).await
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl EventSink for BrokenSink {
        async fn emit(&self, _event: DomainEvent) -> Result<(), EventSinkError> {
            Err(EventSinkError::Rejected("socket closed".into()))
        }
    }

    #[tokio::test]
    async fn chain_then_back_edge_is_rejected() {
        let service = DependencyService::new(store_with(&[1, 2, 3]));
        service.add_dependency(tid(1), tid(2), None).await.unwrap();
        service.add_dependency(tid(2), tid(3), None).await.unwrap();

        let err = service.add_dependency(tid(3), tid(1), None).await.unwrap_err();
        match err {
            GraphError::CircularDependency { task, depends_on, cycle } => {
                assert_eq!(task, tid(3));
                assert_eq!(depends_on, tid(1));
                assert_eq!(cycle, vec![tid(3), tid(1), tid(2), tid(3)]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        let c = service.store().get(tid(3)).await.unwrap().unwrap();
        assert!(c.dependencies.is_empty());
    }

    #[tokio::test]
    async fn cycle_check_loads_only_reachable_tasks() {
        let store = RecordingStore {
            inner: InMemoryTaskStore::from_tasks([
                Task::new(tid(1), "a"),
                Task::new(tid(2), "b").depending_on(tid(3)),
                Task::new(tid(3), "c"),
                Task::new(tid(4), "d").depending_on(tid(5)),
                Task::new(tid(5), "e"),
            ]),
            ..RecordingStore::default()
        };
        let service = DependencyService::new(store.clone());

        service.add_dependency(tid(1), tid(2), None).await.unwrap();

        let fetched = store.fetched.lock().unwrap().clone();
        assert_eq!(fetched, vec![tid(1), tid(2), tid(3)]);
        assert_eq!(store.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cycle_through_a_dangling_edge_is_still_found() {
        // 2 also points at a task that no longer exists
        let store = InMemoryTaskStore::from_tasks([
            Task::new(tid(1), "a").depending_on(tid(2)),
            Task::new(tid(2), "b").depending_on(tid(99)).depending_on(tid(3)),
            Task::new(tid(3), "c"),
        ]);
        let service = DependencyService::new(store);

        let err = service.add_dependency(tid(3), tid(1), None).await.unwrap_err();
        match err {
            GraphError::CircularDependency { cycle, .. } => {
                assert_eq!(cycle, vec![tid(3), tid(1), tid(2), tid(3)]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn self_loop_is_rejected() {
        let service = DependencyService::new(store_with(&[1]));
        let err = service.add_dependency(tid(1), tid(1), None).await.unwrap_err();
        assert!(matches!(err, GraphError::CircularDependency { .. }));
    }

    #[tokio::test]
    async fn duplicate_add_keeps_one_edge_and_one_event() {
        let sink = InMemoryEventSink::new();
        let service = DependencyService::builder(store_with(&[1, 2]))
            .events(sink.clone())
            .build()
            .unwrap();

        service.add_dependency(tid(1), tid(2), None).await.unwrap();
        let task = service
            .add_dependency(tid(1), tid(2), Some(DependencyType::StartToStart))
            .await
            .unwrap();

        assert_eq!(task.dependencies.len(), 1);
        assert_eq!(task.dependencies[0].dependency_type, DependencyType::FinishToStart);
        assert_eq!(sink.events().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_tasks_are_not_found() {
        let service = DependencyService::new(store_with(&[1]));

        let err = service.add_dependency(tid(9), tid(1), None).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskNotFound(id) if id == tid(9)));

        let err = service.add_dependency(tid(1), tid(9), None).await.unwrap_err();
        assert!(matches!(err, GraphError::DependencyNotFound(id) if id == tid(9)));

        let err = service.remove_dependency(tid(9), tid(1)).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskNotFound(_)));

        let err = service.check_blocked(tid(9)).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn default_type_comes_from_config() {
        let service = DependencyService::builder(store_with(&[1, 2]))
            .config(
                ServiceConfig::default().with_default_dependency_type(DependencyType::FinishToFinish),
            )
            .build()
            .unwrap();
        let task = service.add_dependency(tid(1), tid(2), None).await.unwrap();
        assert_eq!(task.dependencies[0].dependency_type, DependencyType::FinishToFinish);
    }

    #[tokio::test]
    async fn remove_then_reverse_edge_is_allowed() {
        let service = DependencyService::new(store_with(&[1, 2]));
        service.add_dependency(tid(1), tid(2), None).await.unwrap();

        let task = service.remove_dependency(tid(1), tid(2)).await.unwrap();
        assert!(task.dependencies.is_empty());

        // removing again is not an error
        service.remove_dependency(tid(1), tid(2)).await.unwrap();
        service.add_dependency(tid(2), tid(1), None).await.unwrap();
    }

    #[tokio::test]
    async fn events_carry_clock_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let sink = InMemoryEventSink::new();
        let service = DependencyService::builder(store_with(&[1, 2]))
            .events(sink.clone())
            .clock(FixedClock::new(at))
            .build()
            .unwrap();

        service
            .add_dependency(tid(1), tid(2), Some(DependencyType::StartToStart))
            .await
            .unwrap();
        service.remove_dependency(tid(1), tid(2)).await.unwrap();
        service.remove_dependency(tid(1), tid(2)).await.unwrap();

        let events = sink.events().await;
        assert_eq!(
            events,
            vec![
                DomainEvent::DependencyAdded {
                    task_id: tid(1),
                    depends_on: tid(2),
                    dependency_type: DependencyType::StartToStart,
                    at,
                },
                DomainEvent::DependencyRemoved {
                    task_id: tid(1),
                    dependency_id: tid(2),
                    at,
                },
            ]
        );
    }

    #[tokio::test]
    async fn failing_sink_does_not_fail_the_mutation() {
        let service = DependencyService::builder(store_with(&[1, 2]))
            .events(BrokenSink)
            .build()
            .unwrap();
        let task = service.add_dependency(tid(1), tid(2), None).await.unwrap();
        assert!(task.depends_on(tid(2)));
        let stored = service.store().get(tid(1)).await.unwrap().unwrap();
        assert!(stored.depends_on(tid(2)));
    }

    #[tokio::test]
    async fn check_blocked_follows_prerequisite_status() {
        let store = InMemoryTaskStore::from_tasks([
            Task::new(tid(1), "t").depending_on(tid(2)),
            Task::new(tid(2), "d").with_status(TaskStatus::InProgress),
        ]);
        let service = DependencyService::new(store.clone());

        let report = service.check_blocked(tid(1)).await.unwrap();
        assert!(report.is_blocked);
        assert_eq!(report.blocked_by[0].id, tid(2));
        assert_eq!(report.blocked_by[0].status, TaskStatus::InProgress);

        store
            .insert(Task::new(tid(2), "d").with_status(TaskStatus::Completed))
            .await;
        let report = service.check_blocked(tid(1)).await.unwrap();
        assert!(!report.is_blocked);
        assert!(report.blocked_by.is_empty());
    }

    #[tokio::test]
    async fn graph_and_critical_path_are_project_scoped() {
        let (p, other) = (ProjectId::generate(), ProjectId::generate());
        let in_p = |n: u128, title: &str, hours: f64| {
            Task::new(tid(n), title)
                .with_project(p)
                .with_estimated_hours(hours)
        };
        let store = InMemoryTaskStore::from_tasks([
            in_p(1, "x", 3.0),
            in_p(2, "y", 5.0).depending_on(tid(1)),
            in_p(3, "z", 2.0).depending_on(tid(2)),
            in_p(4, "w", 10.0).depending_on(tid(1)),
            in_p(5, "tpl", 99.0).as_template(),
            Task::new(tid(6), "elsewhere")
                .with_project(other)
                .with_estimated_hours(50.0),
        ]);
        let service = DependencyService::new(store);

        let graph = service.dependency_graph(Some(p)).await.unwrap();
        let ids: Vec<TaskId> = graph.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![tid(1), tid(2), tid(3), tid(4)]);
        assert_eq!(graph[1].dependencies[0].dependency_id, tid(1));

        assert_eq!(service.dependency_graph(None).await.unwrap().len(), 5);

        let path = service.critical_path(p).await.unwrap();
        assert_eq!(path.ids(), vec![tid(1), tid(4)]);
        assert_eq!(path.total_duration, 13.0);
    }

    #[tokio::test]
    async fn templates_are_included_when_configured() {
        let p = ProjectId::generate();
        let store = InMemoryTaskStore::from_tasks([
            Task::new(tid(1), "tpl").with_project(p).as_template(),
        ]);
        let service = DependencyService::builder(store)
            .config(ServiceConfig::default().with_include_templates(true))
            .build()
            .unwrap();
        assert_eq!(service.dependency_graph(Some(p)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn critical_path_respects_scope_limit() {
        let p = ProjectId::generate();
        let store = InMemoryTaskStore::from_tasks(
            (1..=3).map(|n| Task::new(tid(n), "t").with_project(p)),
        );
        let service = DependencyService::builder(store)
            .config(ServiceConfig::default().with_max_path_tasks(2))
            .build()
            .unwrap();

        let err = service.critical_path(p).await.unwrap_err();
        assert!(matches!(err, GraphError::ScopeTooLarge { tasks: 3, limit: 2 }));
    }

    #[tokio::test]
    async fn empty_project_has_empty_path() {
        let service = DependencyService::new(InMemoryTaskStore::new());
        let path = service.critical_path(ProjectId::generate()).await.unwrap();
        assert!(path.is_empty());
        assert_eq!(path.total_duration, 0.0);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = ServiceConfig {
            max_path_tasks: Some(0),
            ..ServiceConfig::default()
        };
        let result = DependencyService::builder(InMemoryTaskStore::new())
            .config(config)
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_opposite_edges_cannot_both_land() {
        for _ in 0..20 {
            let service = Arc::new(DependencyService::new(store_with(&[1, 2])));
            let a = tokio::spawn({
                let service = Arc::clone(&service);
                async move { service.add_dependency(tid(1), tid(2), None).await }
            });
            let b = tokio::spawn({
                let service = Arc::clone(&service);
                async move { service.add_dependency(tid(2), tid(1), None).await }
            });
            let (a, b) = (a.await.unwrap(), b.await.unwrap());
            assert!(a.is_ok() ^ b.is_ok(), "exactly one edge must be accepted");

            let snapshot = service.store().snapshot().await;
            let graph = crate::graph::DependencyGraph::from_tasks(&snapshot);
            assert!(graph.detect_cycle().is_none());
        }
    }
}
