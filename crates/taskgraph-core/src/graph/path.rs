//! Longest-duration path ("critical path").
//!
//! This is not the Critical Path Method: there is no earliest-start /
//! latest-finish scheduling and no float. It is the chain of dependency
//! edges, from a task without prerequisites forward through its dependents,
//! whose summed `estimated_hours` is greatest.
//!
//! The best chain starts out empty with total 0 and is replaced only by a
//! chain whose total is strictly greater, so a scope where every duration
//! is zero yields an empty path. Sources and dependents are explored in
//! ascending `TaskId` order; among equal totals the first chain found wins.
//!
//! 再帰は使いません。非巡回なら逆トポロジカル順のボトムアップ、
//! 閉路を含むデータなら明示的スタックの DFS で全チェーンを辿ります。

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::DependencyGraph;
use crate::domain::{CriticalPath, PathStep, Task, TaskId};

/// Best continuation from a node: the next hop towards a sink and the
/// summed duration from the node through that sink.
#[derive(Debug, Clone, Copy)]
struct Link {
    next: Option<TaskId>,
    total: f64,
}

/// One level of the exhaustive walk.
struct Frame {
    node: TaskId,
    /// Duration of the prefix up to and including `node`.
    total: f64,
    dependents: Vec<TaskId>,
    cursor: usize,
}

struct Ranker<'a> {
    graph: DependencyGraph,
    tasks: HashMap<TaskId, &'a Task>,
}

impl<'a> Ranker<'a> {
    fn new(tasks: &'a [Task]) -> Self {
        Self {
            graph: DependencyGraph::from_tasks(tasks),
            tasks: tasks.iter().map(|t| (t.id, t)).collect(),
        }
    }

    fn duration(&self, id: TaskId) -> f64 {
        self.tasks.get(&id).map(|t| t.duration()).unwrap_or(0.0)
    }

    fn dependents(&self, node: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.graph
            .dependents(node)
            .filter(|d| self.tasks.contains_key(d))
    }

    /// Fill the best link of every node sink-first, then pick the best source.
    fn rank_acyclic(&self, order: &[TaskId], sources: &[TaskId]) -> Vec<TaskId> {
        let mut best: HashMap<TaskId, Link> = HashMap::with_capacity(order.len());
        for &node in order.iter().rev() {
            let mut chosen: Option<(TaskId, f64)> = None;
            for dependent in self.dependents(node) {
                let Some(below) = best.get(&dependent) else {
                    continue;
                };
                if chosen.is_none_or(|(_, total)| below.total > total) {
                    chosen = Some((dependent, below.total));
                }
            }
            best.insert(
                node,
                Link {
                    next: chosen.map(|(d, _)| d),
                    total: self.duration(node) + chosen.map_or(0.0, |(_, t)| t),
                },
            );
        }

        let mut winner: Option<TaskId> = None;
        let mut winner_total = 0.0;
        for source in sources {
            if let Some(link) = best.get(source)
                && link.total > winner_total
            {
                winner = Some(*source);
                winner_total = link.total;
            }
        }

        let mut chain = Vec::new();
        let mut cursor = winner;
        while let Some(node) = cursor {
            chain.push(node);
            cursor = best.get(&node).and_then(|link| link.next);
        }
        chain
    }

    /// Walk every chain from every source with an explicit stack, never
    /// revisiting a task already on the current prefix.
    fn rank_exhaustive(&self, sources: &[TaskId]) -> Vec<TaskId> {
        let mut best: Vec<TaskId> = Vec::new();
        let mut best_total = 0.0;

        for &source in sources {
            let mut on_path: HashSet<TaskId> = HashSet::from([source]);
            let mut frames = vec![self.frame(source, self.duration(source), &on_path)];

            while let Some(top) = frames.last_mut() {
                let next = top.dependents.get(top.cursor).copied();
                top.cursor += 1;

                if let Some(dependent) = next {
                    let total = top.total + self.duration(dependent);
                    on_path.insert(dependent);
                    frames.push(self.frame(dependent, total, &on_path));
                    continue;
                }

                let at_chain_end = top.dependents.is_empty();
                let total = top.total;
                if at_chain_end && total > best_total {
                    best_total = total;
                    best = frames.iter().map(|f| f.node).collect();
                }
                if let Some(done) = frames.pop() {
                    on_path.remove(&done.node);
                }
            }
        }
        best
    }

    fn frame(&self, node: TaskId, total: f64, on_path: &HashSet<TaskId>) -> Frame {
        Frame {
            node,
            total,
            dependents: self
                .dependents(node)
                .filter(|d| !on_path.contains(d))
                .collect(),
            cursor: 0,
        }
    }
}

/// Find the source-to-sink chain with the greatest summed duration.
///
/// Sources are tasks whose `dependencies` list is empty. Edges to tasks
/// outside `tasks` are kept for source detection but cannot be walked.
/// No sources, no tasks, or no chain with a positive total yields an empty
/// path with total 0.
pub fn find_longest_duration_path(tasks: &[Task]) -> CriticalPath {
    let ranker = Ranker::new(tasks);
    let sources: Vec<TaskId> = ranker.graph.sources().collect();
    if sources.is_empty() {
        debug!(tasks = tasks.len(), "no source tasks; empty path");
        return CriticalPath::default();
    }

    let chain = match ranker.graph.topological_order() {
        Some(order) => ranker.rank_acyclic(&order, &sources),
        None => {
            warn!(
                tasks = tasks.len(),
                "task set contains a dependency cycle; walking every chain"
            );
            ranker.rank_exhaustive(&sources)
        }
    };

    let path: Vec<PathStep> = chain
        .iter()
        .filter_map(|id| ranker.tasks.get(id).map(|t| PathStep::from(*t)))
        .collect();
    let total_duration: f64 = path.iter().map(|s| s.duration).sum();

    debug!(len = path.len(), total_duration, "longest-duration path");
    CriticalPath {
        path,
        total_duration,
    }
}
