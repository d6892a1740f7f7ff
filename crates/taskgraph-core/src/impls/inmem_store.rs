//! InMemoryTaskStore - 開発用・テスト用のタスクストア
//!
//! - BTreeMap<TaskId, Task> で保持（id 昇順 = ULID の生成順）
//! - tokio::sync::Mutex で排他制御

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DependencyEdge, StoreError, Task, TaskFilter, TaskId};
use crate::ports::TaskStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<BTreeMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. A later task with the same id replaces an earlier one.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let map = tasks.into_iter().map(|t| (t.id, t)).collect();
        Self {
            tasks: Arc::new(Mutex::new(map)),
        }
    }

    pub async fn insert(&self, task: Task) {
        self.tasks.lock().await.insert(task.id, task);
    }

    /// Every task, ascending by id.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().await.get(&id).cloned())
    }

    async fn find(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.values().filter(|t| filter.matches(t)).cloned().collect())
    }

    async fn save_dependencies(
        &self,
        id: TaskId,
        dependencies: Vec<DependencyEdge>,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        task.dependencies = dependencies;
        Ok(())
    }
}
