//! CLI 模块
//!
//! - `run` - 启动流量生成，直到 Ctrl+C / SIGTERM 或到达指定时长
//! - `table` - 打印行为模型的迁移表和 exit 可达性检查
//!
//! # 使用示例
//!
//! ```bash
//! # 以 5000 step/s 写入本地 Kafka
//! clickstream-generator run --target-rate 5000
//!
//! # 演练：事件只写日志，运行 30 秒
//! clickstream-generator --log-level debug run --sink log --duration 30
//!
//! # 查看迁移表
//! clickstream-generator table
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands, RunArgs};
pub use runner::CommandRunner;
