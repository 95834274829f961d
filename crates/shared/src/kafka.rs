//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer 抽象，
//! 统一消息序列化、错误映射和关闭前刷新语义。

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::KafkaConfig;
use crate::error::ClickstreamError;

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// 集中管理默认 topic 名称，防止字符串散落在各处导致拼写不一致
pub mod topics {
    pub const USER_EVENTS: &str = "user_events";
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// 封装 `FutureProducer` 并提供类型安全的 JSON 发送方法，
/// 内部已派生 Clone（`FutureProducer` 本身是 Arc 包装的），多个 sink worker 可共享同一连接。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    ///
    /// `linger.ms` 让 librdkafka 在客户端侧攒批，高速率下显著减少请求数。
    pub fn new(config: &KafkaConfig) -> Result<Self, ClickstreamError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .set("linger.ms", config.linger_ms.to_string())
            .create()
            .map_err(|e| ClickstreamError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, topic = %config.topic, "Kafka 生产者已初始化");
        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }

    /// 发送原始字节消息
    pub async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(i32, i64), ClickstreamError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        // rdkafka 0.39+ 返回 Delivery 结构体而非元组
        let delivery = self
            .producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| ClickstreamError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }

    /// 将值序列化为 JSON 后发送
    ///
    /// 序列化与网络发送拆分为两步，便于独立定位故障原因。
    pub async fn send_json<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        value: &T,
    ) -> Result<(i32, i64), ClickstreamError> {
        let payload = serde_json::to_vec(value)?;
        self.send(topic, key, &payload).await
    }

    /// 刷新客户端缓冲区中尚未投递的消息
    pub fn flush(&self, timeout: Duration) -> Result<(), ClickstreamError> {
        self.producer.flush(timeout).map_err(|e| {
            warn!(error = %e, "刷新 Kafka 生产者失败");
            ClickstreamError::Kafka(format!("刷新失败: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_constants() {
        assert_eq!(topics::USER_EVENTS, "user_events");
        assert_eq!(KafkaConfig::default().topic, topics::USER_EVENTS);
    }

    #[test]
    fn test_producer_creation_is_lazy() {
        // librdkafka 创建客户端时不会连接 broker，地址不可达也能创建成功
        let config = KafkaConfig {
            brokers: "127.0.0.1:1".to_string(),
            ..Default::default()
        };
        assert!(KafkaProducer::new(&config).is_ok());
    }
}
