//! Events - ドメインイベント
//!
//! 依存関係の追加・削除が確定した後に EventSink へ送られます。
//! 名前はクライアントが購読しているチャネル名と揃えています。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DependencyType, TaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DomainEvent {
    #[serde(rename = "task:dependency:added", rename_all = "camelCase")]
    DependencyAdded {
        task_id: TaskId,
        depends_on: TaskId,
        dependency_type: DependencyType,
        at: DateTime<Utc>,
    },

    #[serde(rename = "task:dependency:removed", rename_all = "camelCase")]
    DependencyRemoved {
        task_id: TaskId,
        dependency_id: TaskId,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::DependencyAdded { .. } => "task:dependency:added",
            DomainEvent::DependencyRemoved { .. } => "task:dependency:removed",
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            DomainEvent::DependencyAdded { task_id, .. }
            | DomainEvent::DependencyRemoved { task_id, .. } => *task_id,
        }
    }
}
