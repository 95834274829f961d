//! 点击流生成器端到端测试
//!
//! 需要本地 Kafka（默认 `localhost:9092`，可用 `E2E_KAFKA_BROKERS` 覆盖）：
//!
//! ```bash
//! cargo test --test e2e -- --ignored
//! ```

pub mod helpers;
pub mod suites;
