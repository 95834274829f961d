//! Clickstream Generator
//!
//! 合成点击流流量生成器：大量模拟会话在概率行为模型中游走
//! （浏览 → 搜索 → 点击 → 加购 → 购买 → 离开），每次迁移产生一条事件，
//! 经有界输出队列由 sink worker 按受控速率发布到 Kafka。
//!
//! # 主要模块
//!
//! - `fsm`: 行为状态机与迁移表
//! - `session`: 会话模型与带过期清理的注册表
//! - `user_pool`: 模拟用户池
//! - `driver`: 单步模拟编排
//! - `scheduler`: tick 驱动的速率控制与 worker 池
//! - `sink`: 输出端与 sink worker
//! - `pipeline`: 组装、启动与优雅关闭
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clickstream_generator::pipeline::Pipeline;
//! use clickstream_generator::sink::DiscardSink;
//! use clickstream_shared::config::GeneratorConfig;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = GeneratorConfig {
//!     target_rate: 1_000,
//!     ..Default::default()
//! };
//! let mut pipeline = Pipeline::build(&config, Arc::new(DiscardSink::new()))?;
//! pipeline.start()?;
//! tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//! let report = pipeline.shutdown().await;
//! println!("{}", report.metrics);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod driver;
pub mod event;
pub mod fsm;
pub mod metrics;
pub mod payload;
pub mod pipeline;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod user_pool;

/// 当前毫秒时间戳
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
