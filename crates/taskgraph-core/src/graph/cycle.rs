//! Cycle check for a candidate edge `dependent -> prerequisite`.
//!
//! 追加しようとしている辺が閉路を作るかどうかは、
//! `prerequisite` から依存方向に辿って `dependent` に到達できるかで決まります。
//!
//! - 明示的なスタック + visited set（再帰なし、O(V + E)）
//! - lookup が知らないタスクは「依存なし」として扱う（permissive）

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::DependencyLookup;
use crate::domain::TaskId;

/// Would inserting `dependent -> prerequisite` close a cycle?
pub fn would_create_cycle(
    lookup: &impl DependencyLookup,
    dependent: TaskId,
    prerequisite: TaskId,
) -> bool {
    find_cycle(lookup, dependent, prerequisite).is_some()
}

/// Like [`would_create_cycle`], but returns the loop the new edge would
/// close, as `[dependent, prerequisite, .., dependent]`.
pub fn find_cycle(
    lookup: &impl DependencyLookup,
    dependent: TaskId,
    prerequisite: TaskId,
) -> Option<Vec<TaskId>> {
    if dependent == prerequisite {
        return Some(vec![dependent, dependent]);
    }

    let mut stack = vec![prerequisite];
    let mut visited: HashSet<TaskId> = HashSet::from([prerequisite]);
    let mut prev: HashMap<TaskId, TaskId> = HashMap::new();

    while let Some(node) = stack.pop() {
        if node == dependent {
            let cycle = follow_back(dependent, prerequisite, &prev);
            debug!(%dependent, %prerequisite, len = cycle.len(), "edge would close a cycle");
            return Some(cycle);
        }
        let Some(deps) = lookup.prerequisites_of(node) else {
            continue;
        };
        for dep in deps {
            if visited.insert(dep) {
                prev.insert(dep, node);
                stack.push(dep);
            }
        }
    }

    debug!(%dependent, %prerequisite, visited = visited.len(), "no cycle");
    None
}

/// Rebuild `[dependent, prerequisite, .., dependent]` from the predecessor
/// map of a search that started at `prerequisite` and reached `dependent`.
fn follow_back(
    dependent: TaskId,
    prerequisite: TaskId,
    prev: &HashMap<TaskId, TaskId>,
) -> Vec<TaskId> {
    let mut chain = vec![dependent];
    let mut current = dependent;
    while current != prerequisite {
        match prev.get(&current) {
            Some(&p) => {
                chain.push(p);
                current = p;
            }
            None => break,
        }
    }
    chain.push(dependent);
    chain.reverse();
    chain
}
