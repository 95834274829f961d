//! 事件输出端
//!
//! sink worker 从输出队列取事件交给具体的 [`Sink`]。发布失败不致命：
//! 计入错误指标后继续处理下一条。

mod kafka;
mod log;
mod worker;

use std::time::Duration;

use async_trait::async_trait;
use clickstream_shared::error::ClickstreamError;
use thiserror::Error;

use crate::event::Event;

pub use kafka::KafkaSink;
pub use log::{DiscardSink, LogSink};
pub use worker::{SharedReceiver, SinkWorker};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("事件序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("事件发布失败: {0}")]
    Publish(String),
}

impl SinkError {
    /// 错误指标的分类键
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Publish(_) => "publish",
        }
    }
}

impl From<ClickstreamError> for SinkError {
    fn from(err: ClickstreamError) -> Self {
        match err {
            ClickstreamError::Serialization(e) => Self::Serialization(e),
            other => Self::Publish(other.to_string()),
        }
    }
}

/// 事件发布目标
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sink: Send + Sync {
    /// 序列化并发布一条事件
    async fn publish(&self, event: &Event) -> Result<(), SinkError>;

    /// 把客户端缓冲中的事件推出去，关闭前调用
    async fn flush(&self, timeout: Duration) -> Result<(), SinkError>;
}
