//! Read models returned by the dependency service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DependencyType, ProjectId, Task, TaskId, TaskStatus};

/// Scope of a graph query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub project: Option<ProjectId>,
    pub include_templates: bool,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self {
            project: None,
            include_templates: true,
        }
    }

    pub fn project(project: ProjectId) -> Self {
        Self {
            project: Some(project),
            include_templates: false,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.include_templates && task.is_template {
            return false;
        }
        match self.project {
            Some(project) => task.project == Some(project),
            None => true,
        }
    }
}

/// One outgoing edge in the adjacency-list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub dependency_id: TaskId,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
}

/// A task in the flat adjacency-list graph handed to clients for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<GraphEdge>,
}

impl From<&Task> for GraphNode {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            due_date: task.due_date,
            dependencies: task
                .dependencies
                .iter()
                .map(|d| GraphEdge {
                    dependency_id: d.depends_on,
                    dependency_type: d.dependency_type,
                })
                .collect(),
        }
    }
}

/// One hop of the longest-duration path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub id: TaskId,
    pub title: String,
    pub duration: f64,
}

impl From<&Task> for PathStep {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            duration: task.duration(),
        }
    }
}

/// Result of the "critical path" query: the chain with the greatest summed
/// duration, ordered from source to sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    pub path: Vec<PathStep>,
    pub total_duration: f64,
}

impl CriticalPath {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.path.iter().map(|s| s.id).collect()
    }
}

/// A prerequisite that is not completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingTask {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedReport {
    pub is_blocked: bool,
    pub blocked_by: Vec<BlockingTask>,
}

impl BlockedReport {
    pub fn from_blockers(blocked_by: Vec<BlockingTask>) -> Self {
        Self {
            is_blocked: !blocked_by.is_empty(),
            blocked_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_excludes_templates_unless_asked() {
        let project = ProjectId::generate();
        let task = Task::new(TaskId::generate(), "tpl")
            .with_project(project)
            .as_template();

        assert!(!TaskFilter::project(project).matches(&task));
        assert!(TaskFilter::all().matches(&task));
        assert!(
            TaskFilter {
                project: Some(project),
                include_templates: true,
            }
            .matches(&task)
        );
    }

    #[test]
    fn filter_scopes_by_project() {
        let (p1, p2) = (ProjectId::generate(), ProjectId::generate());
        let task = Task::new(TaskId::generate(), "t").with_project(p1);
        let loose = Task::new(TaskId::generate(), "no project");

        assert!(TaskFilter::project(p1).matches(&task));
        assert!(!TaskFilter::project(p2).matches(&task));
        assert!(!TaskFilter::project(p1).matches(&loose));
        assert!(TaskFilter::default().matches(&loose));
    }

    #[test]
    fn graph_node_keeps_edge_order_and_type() {
        let (a, b) = (TaskId::generate(), TaskId::generate());
        let mut task = Task::new(TaskId::generate(), "t").depending_on(a);
        task.add_edge(crate::domain::DependencyEdge::new(
            b,
            DependencyType::StartToStart,
        ));

        let node = GraphNode::from(&task);
        assert_eq!(node.dependencies.len(), 2);
        assert_eq!(node.dependencies[0].dependency_id, a);
        assert_eq!(node.dependencies[1].dependency_type, DependencyType::StartToStart);
    }

    #[test]
    fn blocked_report_flag_follows_blockers() {
        assert!(!BlockedReport::from_blockers(vec![]).is_blocked);
        let report = BlockedReport::from_blockers(vec![BlockingTask {
            id: TaskId::generate(),
            title: "d".into(),
            status: TaskStatus::Todo,
            dependency_type: DependencyType::FinishToStart,
        }]);
        assert!(report.is_blocked);
    }
}
