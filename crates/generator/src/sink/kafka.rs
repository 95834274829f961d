//! 发布到 Kafka

use std::time::Duration;

use async_trait::async_trait;
use clickstream_shared::config::KafkaConfig;
use clickstream_shared::kafka::KafkaProducer;

use super::{Sink, SinkError};
use crate::event::Event;

/// 以 JSON 写入 Kafka，用户 id 作为消息 key，同一用户的事件落在同一分区
pub struct KafkaSink {
    producer: KafkaProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig) -> Result<Self, SinkError> {
        Ok(Self {
            producer: KafkaProducer::new(config)?,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Sink for KafkaSink {
    async fn publish(&self, event: &Event) -> Result<(), SinkError> {
        self.producer
            .send_json(&self.topic, &event.user_id, event)
            .await?;
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), SinkError> {
        // librdkafka 的 flush 会阻塞线程
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| SinkError::Publish(format!("flush 任务失败: {e}")))??;
        Ok(())
    }
}
