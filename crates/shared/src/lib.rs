//! 共享库
//!
//! 包含流量生成器共用的配置、错误处理、Kafka 与可观测性等基础设施代码。

pub mod config;
pub mod error;
pub mod kafka;
pub mod observability;
