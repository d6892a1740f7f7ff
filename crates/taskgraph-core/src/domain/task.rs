//! Task record and dependency edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProjectId, TaskId};

/// Lifecycle state of a task.
///
/// Only `Completed` carries meaning for the graph (it unblocks dependents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// How a dependent relates to its prerequisite.
///
/// Descriptive metadata: neither the cycle checker nor the path ranker
/// interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::FinishToStart => "finish-to-start",
            DependencyType::StartToStart => "start-to-start",
            DependencyType::FinishToFinish => "finish-to-finish",
            DependencyType::StartToFinish => "start-to-finish",
        };
        f.write_str(s)
    }
}

/// "This task depends on `depends_on`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub depends_on: TaskId,
    #[serde(rename = "type", default)]
    pub dependency_type: DependencyType,
}

impl DependencyEdge {
    pub fn new(depends_on: TaskId, dependency_type: DependencyType) -> Self {
        Self {
            depends_on,
            dependency_type,
        }
    }
}

/// A task as the graph service sees it.
///
/// The record is owned by the surrounding application; the service only
/// rewrites `dependencies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            project: None,
            status: TaskStatus::default(),
            estimated_hours: None,
            due_date: None,
            is_template: false,
            dependencies: Vec::new(),
        }
    }

    pub fn with_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_estimated_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn as_template(mut self) -> Self {
        self.is_template = true;
        self
    }

    pub fn depending_on(mut self, depends_on: TaskId) -> Self {
        self.add_edge(DependencyEdge::new(depends_on, DependencyType::default()));
        self
    }

    /// Duration weight used by the path ranker.
    ///
    /// Absent, negative and non-finite estimates all count as zero.
    pub fn duration(&self) -> f64 {
        match self.estimated_hours {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => 0.0,
        }
    }

    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.iter().any(|d| d.depends_on == other)
    }

    pub fn prerequisites(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.dependencies.iter().map(|d| d.depends_on)
    }

    /// Append an edge unless one to the same prerequisite exists.
    ///
    /// Returns `true` when the edge was appended.
    pub fn add_edge(&mut self, edge: DependencyEdge) -> bool {
        if self.depends_on(edge.depends_on) {
            return false;
        }
        self.dependencies.push(edge);
        true
    }

    /// Drop every edge to `depends_on`. Returns `true` if anything was removed.
    pub fn remove_edge(&mut self, depends_on: TaskId) -> bool {
        let before = self.dependencies.len();
        self.dependencies.retain(|d| d.depends_on != depends_on);
        self.dependencies.len() != before
    }
}
