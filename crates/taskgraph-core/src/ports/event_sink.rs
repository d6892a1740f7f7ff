//! EventSink port - イベント記録の抽象化
//!
//! 依存関係の変更を購読者（WebSocket 配信など）へ伝えます。
//! 配信はベストエフォートで、失敗しても変更自体は取り消しません。

use async_trait::async_trait;

use crate::domain::{DomainEvent, EventSinkError};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: DomainEvent) -> Result<(), EventSinkError>;
}
