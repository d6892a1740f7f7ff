//! EventSink の実装
//!
//! - NoopEventSink: 何もしない
//! - TracingEventSink: tracing にイベントを書き出す
//! - InMemoryEventSink: 送られたイベントを保持（テスト用）

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{DomainEvent, EventSinkError};
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _event: DomainEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: DomainEvent) -> Result<(), EventSinkError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| EventSinkError::Rejected(format!("json encode: {e}")))?;
        info!(event = event.name(), task = %event.task_id(), %payload, "domain event");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn emit(&self, event: DomainEvent) -> Result<(), EventSinkError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
