//! Domain model (IDs, task records, read views, events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod task;
pub mod views;

pub use self::errors::{ErrorKind, EventSinkError, GraphError, StoreError};
pub use self::events::DomainEvent;
pub use self::ids::{IdParseError, ProjectId, TaskId};
pub use self::task::{DependencyEdge, DependencyType, Task, TaskStatus};
pub use self::views::{
    BlockedReport, BlockingTask, CriticalPath, GraphEdge, GraphNode, PathStep, TaskFilter,
};
