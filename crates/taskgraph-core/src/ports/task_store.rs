//! TaskStore port - タスクの正本（source of truth）
//!
//! グラフサービスはタスクを読み、`dependencies` フィールドだけを書き換えます。
//! タスクの作成・削除は周辺アプリケーション（CRUD 層）の責務です。

use async_trait::async_trait;

use crate::domain::{DependencyEdge, StoreError, Task, TaskFilter, TaskId};

/// TaskStore は依存関係サービスが使うタスクリポジトリ
///
/// # 設計原則
/// - 読み込みはスナップショット単位（`find`）で、走査はメモリ上で行う
/// - 書き込みは `dependencies` の置き換えのみ
/// - check-then-insert の直列化はサービス側で行う
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// All tasks matching `filter`.
    async fn find(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Replace the dependency list of `id`.
    ///
    /// Returns `StoreError::TaskNotFound` if the task vanished.
    async fn save_dependencies(
        &self,
        id: TaskId,
        dependencies: Vec<DependencyEdge>,
    ) -> Result<(), StoreError>;
}
