//! Kafka 发布全链路

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use clickstream_generator::pipeline::Pipeline;
    use clickstream_generator::sink::KafkaSink;
    use clickstream_shared::config::{GeneratorConfig, KafkaConfig};

    use crate::helpers::{KafkaHelper, brokers};

    fn kafka_config(topic: &str) -> KafkaConfig {
        KafkaConfig {
            brokers: brokers(),
            topic: topic.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    #[ignore = "需要运行 Kafka"]
    async fn test_events_land_on_topic_keyed_by_user() {
        let topic = format!("user_events_e2e_{}", chrono::Utc::now().timestamp_millis());
        let sink = Arc::new(KafkaSink::new(&kafka_config(&topic)).unwrap());

        let config = GeneratorConfig {
            target_rate: 200,
            workers: Some(2),
            initial_users: 20,
            queue_capacity: 1_000,
            sink_workers: 2,
            seed: Some(1),
            ..Default::default()
        };
        let mut pipeline = Pipeline::build(&config, sink).unwrap();
        pipeline.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let report = pipeline.shutdown().await;

        assert!(report.drained);
        assert!(report.metrics.total_events > 0);

        let received = KafkaHelper::new(&brokers())
            .consume(&topic, report.metrics.total_events as usize, Duration::from_secs(15))
            .await
            .unwrap();
        assert_eq!(received.len() as u64, report.metrics.total_events);

        for msg in &received {
            assert_eq!(msg.key.as_deref(), msg.body["user_id"].as_str());
            assert!(msg.body["event_id"].as_str().unwrap().starts_with("evt-"));
            assert!(msg.body["attributes"]["state"].is_string());
            assert!(msg.body["attributes"]["prev_state"].is_string());
        }
    }

    #[tokio::test]
    #[ignore = "需要运行 Kafka"]
    async fn test_unreachable_broker_counts_publish_errors() {
        let config = KafkaConfig {
            brokers: "127.0.0.1:1".to_string(),
            message_timeout_ms: 200,
            ..kafka_config("user_events_unreachable")
        };
        let sink = Arc::new(KafkaSink::new(&config).unwrap());

        let generator = GeneratorConfig {
            target_rate: 100,
            workers: Some(1),
            initial_users: 5,
            queue_capacity: 100,
            sink_workers: 1,
            drain_timeout_secs: 2,
            seed: Some(2),
            ..Default::default()
        };
        let mut pipeline = Pipeline::build(&generator, sink).unwrap();
        pipeline.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        let report = pipeline.shutdown().await;

        assert_eq!(report.metrics.total_events, 0);
        assert!(report.metrics.errors.get("publish").copied().unwrap_or(0) > 0);
    }
}
