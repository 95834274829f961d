//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ClickstreamError;

/// 事件输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// 发送到 Kafka
    Kafka,
    /// 仅写日志（演练模式）
    Log,
    /// 直接丢弃，用于压测生成端本身
    Discard,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kafka" => Ok(Self::Kafka),
            "log" => Ok(Self::Log),
            "discard" => Ok(Self::Discard),
            other => Err(format!("未知的 sink 类型: {other}（可选 kafka, log, discard）")),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Kafka => "kafka",
            Self::Log => "log",
            Self::Discard => "discard",
        };
        write!(f, "{s}")
    }
}

/// 流量生成器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 目标速率（每秒 step 数）
    pub target_rate: u64,
    /// 调度 tick 间隔（毫秒）
    pub tick_interval_ms: u64,
    /// 模拟 worker 数量，未设置时使用 CPU 核数
    pub workers: Option<usize>,
    /// 启动时预先创建的用户数
    pub initial_users: usize,
    /// 会话滑动过期时间（秒）
    pub session_ttl_secs: u64,
    /// 过期会话清理间隔（秒）
    pub sweep_interval_secs: u64,
    /// 输出队列容量
    pub queue_capacity: usize,
    /// 消费输出队列的 sink worker 数量
    pub sink_workers: usize,
    pub sink: SinkKind,
    /// 关闭时等待输出队列排空的最长时间（秒）
    pub drain_timeout_secs: u64,
    /// 指标快照日志间隔（秒）
    pub report_interval_secs: u64,
    /// 随机种子，设置后整个运行可复现
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_rate: 20_000,
            tick_interval_ms: 10,
            workers: None,
            initial_users: 40_000,
            session_ttl_secs: 30 * 60,
            sweep_interval_secs: 2,
            queue_capacity: 100_000,
            sink_workers: 4,
            sink: SinkKind::Kafka,
            drain_timeout_secs: 5,
            report_interval_secs: 1,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// 实际使用的 worker 数量
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// 校验配置
    ///
    /// 速率、间隔和容量为 0 会让调度器空转或死锁，启动前直接拒绝。
    pub fn validate(&self) -> Result<(), ClickstreamError> {
        if self.target_rate == 0 {
            return Err(ClickstreamError::invalid_config(
                "generator.target_rate",
                "必须大于 0",
            ));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > 1000 {
            return Err(ClickstreamError::invalid_config(
                "generator.tick_interval_ms",
                "必须在 1..=1000 之间",
            ));
        }
        if self.workers == Some(0) {
            return Err(ClickstreamError::invalid_config(
                "generator.workers",
                "必须大于 0",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ClickstreamError::invalid_config(
                "generator.queue_capacity",
                "必须大于 0",
            ));
        }
        if self.sink_workers == 0 {
            return Err(ClickstreamError::invalid_config(
                "generator.sink_workers",
                "必须大于 0",
            ));
        }
        if self.session_ttl_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(ClickstreamError::invalid_config(
                "generator.session_ttl_secs",
                "会话 TTL 与清理间隔必须大于 0",
            ));
        }
        if self.report_interval_secs == 0 {
            return Err(ClickstreamError::invalid_config(
                "generator.report_interval_secs",
                "必须大于 0",
            ));
        }
        Ok(())
    }
}

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    /// 单条消息投递超时（毫秒）
    pub message_timeout_ms: u64,
    /// 生产者攒批等待时间（毫秒）
    pub linger_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "user_events".to_string(),
            message_timeout_ms: 5000,
            linger_ms: 5,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub generator: GeneratorConfig,
    pub kafka: KafkaConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "clickstream-generator".to_string(),
            environment: "development".to_string(),
            generator: GeneratorConfig::default(),
            kafka: KafkaConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（CLICKSTREAM_ 前缀，段与键之间用双下划线，
    ///    如 CLICKSTREAM_GENERATOR__TARGET_RATE -> generator.target_rate）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("CLICKSTREAM_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("CLICKSTREAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generator.target_rate, 20_000);
        assert_eq!(config.generator.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.generator.queue_capacity, 100_000);
        assert_eq!(config.kafka.topic, "user_events");
        assert!(config.generator.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = GeneratorConfig {
            target_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_count_fallback() {
        let config = GeneratorConfig {
            workers: Some(3),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 3);

        let config = GeneratorConfig::default();
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("kafka".parse::<SinkKind>().unwrap(), SinkKind::Kafka);
        assert_eq!("LOG".parse::<SinkKind>().unwrap(), SinkKind::Log);
        assert_eq!("discard".parse::<SinkKind>().unwrap(), SinkKind::Discard);
        assert!("stdout".parse::<SinkKind>().is_err());
        assert_eq!(SinkKind::Log.to_string(), "log");
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        // SAFETY: 测试中只设置本测试独占的变量
        unsafe {
            std::env::set_var("CONFIG_DIR", "/nonexistent-clickstream-config");
        }
        let config = AppConfig::load("clickstream-generator").unwrap();
        assert_eq!(config.service_name, "clickstream-generator");
        assert_eq!(config.kafka.brokers, "localhost:9092");
    }
}
