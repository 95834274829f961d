//! 不依赖外部系统的输出端

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Sink, SinkError};
use crate::event::Event;

/// 演练模式：事件以 JSON 写入 debug 日志
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn publish(&self, event: &Event) -> Result<(), SinkError> {
        let json = serde_json::to_string(event)?;
        debug!(target: "clickstream::events", event = %json);
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), SinkError> {
        Ok(())
    }
}

/// 只计数不输出，用于压测生成端本身
#[derive(Debug, Default)]
pub struct DiscardSink {
    published: AtomicU64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Sink for DiscardSink {
    async fn publish(&self, _event: &Event) -> Result<(), SinkError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), SinkError> {
        Ok(())
    }
}
