//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: プロセス内のタスクストア
//! - **NoopEventSink / TracingEventSink / InMemoryEventSink**
//!
//! ドキュメント DB 向けの実装は別クレートに置く想定です。

pub mod event_sinks;
pub mod inmem_store;

pub use self::event_sinks::{InMemoryEventSink, NoopEventSink, TracingEventSink};
pub use self::inmem_store::InMemoryTaskStore;
