//! Kafka 辅助工具
//!
//! 从事件 topic 读回生成器发布的消息。

use anyhow::Result;
use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use serde_json::Value;
use std::time::Duration;

/// 一条读回的消息
#[derive(Debug, Clone)]
pub struct Received {
    pub key: Option<String>,
    pub body: Value,
}

pub struct KafkaHelper {
    brokers: String,
}

impl KafkaHelper {
    pub fn new(brokers: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
        }
    }

    /// 从 topic 开头读取，直到读满 `limit` 条或超时
    pub async fn consume(&self, topic: &str, limit: usize, timeout: Duration) -> Result<Vec<Received>> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set(
                "group.id",
                format!("e2e-{}-{}", topic, chrono::Utc::now().timestamp_millis()),
            )
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[topic])?;

        let mut messages = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;

        while messages.len() < limit {
            tokio::select! {
                msg = consumer.recv() => {
                    let m = msg?;
                    let Some(payload) = m.payload() else { continue };
                    let Ok(body) = serde_json::from_slice(payload) else { continue };
                    let key = m.key().map(|k| String::from_utf8_lossy(k).into_owned());
                    messages.push(Received { key, body });
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        Ok(messages)
    }
}
