pub mod kafka_helper;

pub use kafka_helper::KafkaHelper;

/// 测试使用的 broker 地址
pub fn brokers() -> String {
    std::env::var("E2E_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string())
}
