//! Graph algorithms over in-memory snapshots.
//!
//! ここには I/O がありません。ストアからの読み込みは `app` 側で行い、
//! スナップショット（`DependencyGraph` / タスクの map）を渡します。

pub mod blocked;
pub mod cycle;
pub mod dependency;
pub mod path;

pub use self::blocked::blocked_by;
pub use self::cycle::{find_cycle, would_create_cycle};
pub use self::dependency::{DependencyGraph, DependencyLookup};
pub use self::path::find_longest_duration_path;
