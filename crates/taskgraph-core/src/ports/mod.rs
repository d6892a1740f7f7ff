//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部システム
//! （ドキュメント DB、リアルタイム配信、時刻）へのインターフェースです。

pub mod clock;
pub mod event_sink;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::task_store::TaskStore;
