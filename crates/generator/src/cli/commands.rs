//! CLI 命令定义

use clap::{Args, Parser, Subcommand};
use clickstream_shared::config::{AppConfig, SinkKind};

/// 合成点击流流量生成器
///
/// 命令行参数覆盖配置文件和环境变量中的同名项。
#[derive(Parser, Debug)]
#[command(name = "clickstream-generator")]
#[command(version, about = "合成点击流流量生成器")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Kafka brokers 地址
    #[arg(long)]
    pub kafka_brokers: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 启动流量生成
    Run(RunArgs),

    /// 打印迁移表和 exit 可达性检查
    Table,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// 目标速率（每秒 step 数）
    #[arg(short = 'r', long)]
    pub target_rate: Option<u64>,

    /// 模拟 worker 数量，默认取 CPU 核数
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// 输出目标：kafka, log, discard
    #[arg(short, long)]
    pub sink: Option<SinkKind>,

    /// 运行时长（秒），不指定则运行到收到关闭信号
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// 随机种子
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// 把全局参数合并进配置
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(brokers) = &self.kafka_brokers {
            config.kafka.brokers = brokers.clone();
        }
    }
}

impl RunArgs {
    pub fn apply_to(&self, config: &mut AppConfig) {
        let generator = &mut config.generator;
        if let Some(rate) = self.target_rate {
            generator.target_rate = rate;
        }
        if self.workers.is_some() {
            generator.workers = self.workers;
        }
        if let Some(sink) = self.sink {
            generator.sink = sink;
        }
        if self.seed.is_some() {
            generator.seed = self.seed;
        }
    }
}
