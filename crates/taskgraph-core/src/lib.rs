//! taskgraph-core
//!
//! Task dependency graph: cycle-safe edge insertion, blocked checks and
//! duration-weighted longest path ("critical path") over a task store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, views, events, errors）
//! - **graph**: I/O を持たないグラフアルゴリズム（循環チェック、最長経路、ブロック判定）
//! - **ports**: 抽象化レイヤー（TaskStore, EventSink, Clock）
//! - **impls**: 実装（InMemoryTaskStore, event sinks）
//! - **app**: DependencyService と設定

pub mod app;
pub mod domain;
pub mod graph;
pub mod impls;
pub mod ports;

pub use app::{DependencyService, ServiceConfig};
pub use domain::{GraphError, Task, TaskId};
