//! Dependency graph snapshot.
//!
//! Design:
//! - Forward edges: task -> tasks it depends on (prerequisites)
//! - Reverse edges: task -> tasks that depend on it (dependents)
//! - Invariant: edges and reverse_edges must be kept in sync
//!
//! Sets are ordered (`BTreeSet`) so every traversal visits neighbours in
//! ascending `TaskId` order. The path ranker's tie-break relies on this.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::domain::{Task, TaskId};

/// Read access to "which tasks does this task depend on?".
///
/// `None` means the task is unknown to the lookup, which traversals treat
/// the same as a task without prerequisites.
pub trait DependencyLookup {
    fn prerequisites_of(&self, task: TaskId) -> Option<Vec<TaskId>>;
}

impl DependencyLookup for HashMap<TaskId, Task> {
    fn prerequisites_of(&self, task: TaskId) -> Option<Vec<TaskId>> {
        self.get(&task).map(|t| t.prerequisites().collect())
    }
}

/// Dependency graph materialized from a set of tasks.
///
/// - `nodes`: every task id the snapshot was built from
/// - `edges`: TaskId -> Set of TaskIds it depends on
/// - `reverse_edges`: TaskId -> Set of TaskIds waiting for it
///
/// Edges may point at ids that are not nodes (tasks outside the snapshot).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<TaskId>,
    edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
    reverse_edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from task records.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut graph = Self::new();
        for task in tasks {
            graph.add_node(task.id);
            for dep in task.prerequisites() {
                graph.add_dependency(task.id, dep);
            }
        }
        graph
    }

    pub fn add_node(&mut self, task: TaskId) {
        self.nodes.insert(task);
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.nodes.contains(&task)
    }

    pub fn nodes(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a dependency: `task` depends on `depends_on`.
    ///
    /// Example: add_dependency(task_b, task_a) means "B waits for A"
    ///
    /// Updates both:
    /// - edges: B -> {A}
    /// - reverse_edges: A -> {B}
    pub fn add_dependency(&mut self, task: TaskId, depends_on: TaskId) {
        self.edges.entry(task).or_default().insert(depends_on);
        self.reverse_edges
            .entry(depends_on)
            .or_default()
            .insert(task);
    }

    /// Tasks that list `task` as a prerequisite, ascending.
    pub fn dependents(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.reverse_edges
            .get(&task)
            .into_iter()
            .flat_map(|waiting| waiting.iter().copied())
    }

    pub fn has_dependencies(&self, task: TaskId) -> bool {
        self.edges
            .get(&task)
            .map(|deps| !deps.is_empty())
            .unwrap_or(false)
    }

    /// Prerequisites of `task`, ascending.
    pub fn dependencies(&self, task: TaskId) -> Vec<TaskId> {
        self.edges
            .get(&task)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nodes without prerequisites, ascending.
    pub fn sources(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes
            .iter()
            .copied()
            .filter(|&n| !self.has_dependencies(n))
    }
}

impl DependencyGraph {
    /// Nodes ordered so that every prerequisite precedes its dependents
    /// (Kahn's algorithm). Edges to ids outside the node set are ignored.
    ///
    /// Returns `None` if the nodes contain a cycle.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        let mut in_degree: HashMap<TaskId, usize> = self
            .nodes()
            .map(|n| {
                let inside = self.dependencies(n).into_iter().filter(|&d| self.contains(d));
                (n, inside.count())
            })
            .collect();

        let mut queue: VecDeque<TaskId> = self
            .nodes()
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for dependent in self.dependents(node) {
                if let Some(deg) = in_degree.get_mut(&dependent) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        (order.len() == self.len()).then_some(order)
    }
}

impl DependencyLookup for DependencyGraph {
    fn prerequisites_of(&self, task: TaskId) -> Option<Vec<TaskId>> {
        if !self.contains(task) && !self.edges.contains_key(&task) {
            return None;
        }
        Some(self.dependencies(task))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// on the current DFS path
    Gray,
    /// fully explored
    Black,
}

impl DependencyGraph {
    /// Detect a cycle anywhere in the snapshot.
    ///
    /// Returns the first cycle found as `[x, .., x]` (edges read left to
    /// right as "depends on"), or `None` if the graph is a DAG.
    ///
    /// Three-color DFS with an explicit stack: O(V + E).
    pub fn detect_cycle(&self) -> Option<Vec<TaskId>> {
        let mut color: HashMap<TaskId, Color> = HashMap::new();

        let starts: BTreeSet<TaskId> = self
            .nodes
            .iter()
            .chain(self.edges.keys())
            .copied()
            .collect();
        for start in starts {
            if color.contains_key(&start) {
                continue;
            }
            // (node, prerequisites, next index)
            let mut stack: Vec<(TaskId, Vec<TaskId>, usize)> =
                vec![(start, self.dependencies(start), 0)];
            color.insert(start, Color::Gray);

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let next = top.1.get(top.2).copied();
                top.2 += 1;
                let Some(dep) = next else {
                    color.insert(node, Color::Black);
                    stack.pop();
                    continue;
                };

                match color.get(&dep) {
                    Some(Color::Gray) => {
                        let from = stack.iter().position(|(n, _, _)| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<TaskId> =
                            stack[from..].iter().map(|(n, _, _)| *n).collect();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    Some(Color::Black) => {}
                    None => {
                        color.insert(dep, Color::Gray);
                        let next = self.dependencies(dep);
                        stack.push((dep, next, 0));
                    }
                }
            }
        }
        None
    }
}
