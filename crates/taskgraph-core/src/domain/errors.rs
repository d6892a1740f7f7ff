//! Errors - エラー型と分類
//!
//! - `GraphError`: サービス操作の結果（not found / cycle / scope）
//! - `StoreError`, `EventSinkError`: ports 側の障害

use thiserror::Error;

use super::TaskId;

/// ErrorKind は呼び出し側（HTTP 層など）向けの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 対象タスクが存在しない（404 相当）
    NotFound,
    /// 変更が拒否された（循環依存など、400 相当）
    Rejected,
    /// インフラ障害（ストアが使えない）
    Infrastructure,
}

/// Failure reported by a `TaskStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("task {0} does not exist in the store")]
    TaskNotFound(TaskId),

    #[error("task record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by an `EventSink` implementation.
#[derive(Debug, Error)]
pub enum EventSinkError {
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Outcome of a rejected dependency-service operation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("dependency task {0} not found")]
    DependencyNotFound(TaskId),

    #[error("circular dependency detected: {task} -> {depends_on} would close {}", format_cycle(.cycle))]
    CircularDependency {
        task: TaskId,
        depends_on: TaskId,
        cycle: Vec<TaskId>,
    },

    #[error("scope holds {tasks} tasks, more than the configured limit of {limit}")]
    ScopeTooLarge { tasks: usize, limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::TaskNotFound(_) | GraphError::DependencyNotFound(_) => ErrorKind::NotFound,
            GraphError::CircularDependency { .. } | GraphError::ScopeTooLarge { .. } => {
                ErrorKind::Rejected
            }
            GraphError::Store(StoreError::TaskNotFound(_)) => ErrorKind::NotFound,
            GraphError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
