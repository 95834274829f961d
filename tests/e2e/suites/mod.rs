pub mod kafka_publish;
