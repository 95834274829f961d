//! 命令执行器
//!
//! 把命令行参数转化为流水线的组装、启动和关闭。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clickstream_shared::config::{AppConfig, SinkKind};
use tracing::{info, warn};

use super::commands::RunArgs;
use crate::fsm::TransitionTable;
use crate::pipeline::Pipeline;
use crate::sink::{DiscardSink, KafkaSink, LogSink, Sink};

pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 执行 run 命令
    ///
    /// 运行到收到关闭信号或到达 `duration`，然后优雅关闭。
    pub async fn run_generate(&self, args: &RunArgs) -> Result<()> {
        let generator = &self.config.generator;
        let sink = self.build_sink(generator.sink)?;

        let mut pipeline = Pipeline::build(generator, sink).context("组装流水线失败")?;
        let plan = pipeline.start().context("启动调度器失败")?;

        info!(
            environment = %self.config.environment,
            sink = %generator.sink,
            target_rate = plan.target_rate,
            effective_rate = plan.effective_rate(),
            duration_secs = ?args.duration,
            "流量生成已启动，按 Ctrl+C 停止"
        );

        match args.duration {
            Some(secs) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        info!(secs, "到达运行时长");
                    }
                    _ = shutdown_signal() => {}
                }
            }
            None => shutdown_signal().await,
        }

        let report = pipeline.shutdown().await;
        println!("{}", serde_json::to_string_pretty(&report.metrics)?);

        if !report.drained {
            warn!(dropped = report.dropped, "关闭时输出队列未能排空");
        }
        Ok(())
    }

    /// 执行 table 命令
    pub fn run_table(&self) -> Result<()> {
        let table = TransitionTable::standard();

        println!("\n{:<14} {:<20} {:<14} {:>6}", "from", "event", "next", "weight");
        println!("{}", "-".repeat(58));
        for (state, transitions) in table.rows() {
            if transitions.is_empty() {
                println!("{:<14} {:<20} {:<14} {:>6}", state.as_str(), "-", "-", "-");
                continue;
            }
            for t in transitions {
                let next = t.next_state.map_or("(prev)", |s| s.as_str());
                println!(
                    "{:<14} {:<20} {:<14} {:>6.2}",
                    state.as_str(),
                    t.event.as_str(),
                    next,
                    t.weight
                );
            }
        }
        println!("{}", "-".repeat(58));

        let stuck = table.states_without_exit();
        if !stuck.is_empty() {
            bail!("以下状态无法到达 exit: {stuck:?}");
        }
        println!("所有状态均可到达 exit\n");
        Ok(())
    }

    fn build_sink(&self, kind: SinkKind) -> Result<Arc<dyn Sink>> {
        let sink: Arc<dyn Sink> = match kind {
            SinkKind::Kafka => {
                Arc::new(KafkaSink::new(&self.config.kafka).context("创建 Kafka sink 失败")?)
            }
            SinkKind::Log => Arc::new(LogSink),
            SinkKind::Discard => Arc::new(DiscardSink::new()),
        };
        Ok(sink)
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "安装 Ctrl+C 信号处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "安装 SIGTERM 信号处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("收到关闭信号，正在停止...");
}
