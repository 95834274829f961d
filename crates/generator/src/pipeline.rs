//! 组装并托管整条生成流水线
//!
//! 调度器 → 模拟 worker → 输出队列 → sink worker，外加会话清理和指标报告。

use std::sync::Arc;
use std::time::Duration;

use clickstream_shared::config::GeneratorConfig;
use clickstream_shared::error::ClickstreamError;
use clickstream_shared::observability::metrics as prom;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::driver::SimulationDriver;
use crate::event::Event;
use crate::fsm::{BehaviorEngine, TransitionTable};
use crate::metrics::{InMemoryMetrics, Metrics, MetricsSnapshot};
use crate::payload::CatalogPayloadGenerator;
use crate::rng::SharedRng;
use crate::scheduler::{LoadScheduler, SchedulerError, TickPlan};
use crate::session::SessionRegistry;
use crate::sink::{SharedReceiver, Sink, SinkWorker};
use crate::user_pool::UserPool;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// 取消后等待 sink worker 完成手上那条发布的时间
const SINK_STOP_GRACE: Duration = Duration::from_secs(1);

/// 关闭结果
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    /// 输出队列在超时前排空
    pub drained: bool,
    /// 超时后丢弃的事件数
    pub dropped: usize,
    pub steps: u64,
    pub metrics: MetricsSnapshot,
}

pub struct Pipeline {
    config: GeneratorConfig,
    metrics: Arc<dyn Metrics>,
    users: Arc<UserPool>,
    registry: Arc<SessionRegistry>,
    scheduler: LoadScheduler,
    sink: Arc<dyn Sink>,
    queue_tx: mpsc::Sender<Event>,
    queue_rx: SharedReceiver,
    sink_cancel: CancellationToken,
    background_cancel: CancellationToken,
    sink_tasks: Vec<JoinHandle<u64>>,
    background_tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// 按配置组装所有组件，不启动任何任务
    pub fn build(config: &GeneratorConfig, sink: Arc<dyn Sink>) -> Result<Self, ClickstreamError> {
        Self::build_with_table(config, sink, TransitionTable::standard())
    }

    pub fn build_with_table(
        config: &GeneratorConfig,
        sink: Arc<dyn Sink>,
        table: TransitionTable,
    ) -> Result<Self, ClickstreamError> {
        config.validate()?;

        let rng = SharedRng::from_seed_option(config.seed);
        let metrics: Arc<dyn Metrics> = Arc::new(InMemoryMetrics::new());

        let users = Arc::new(UserPool::new(rng.fork()));
        users.ensure(config.initial_users);

        let registry = Arc::new(SessionRegistry::new(config.session_ttl(), Arc::clone(&metrics)));
        let engine = Arc::new(BehaviorEngine::new(Arc::new(table), rng.fork()));
        let payloads = Arc::new(CatalogPayloadGenerator::new(rng.fork()));

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let driver = Arc::new(SimulationDriver::new(
            Arc::clone(&users),
            Arc::clone(&registry),
            engine,
            payloads,
            Arc::clone(&metrics),
            queue_tx.clone(),
        ));
        let scheduler = LoadScheduler::new(driver, config.tick_interval(), config.worker_count());

        Ok(Self {
            config: config.clone(),
            metrics,
            users,
            registry,
            scheduler,
            sink,
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            sink_cancel: CancellationToken::new(),
            background_cancel: CancellationToken::new(),
            sink_tasks: Vec::new(),
            background_tasks: Vec::new(),
        })
    }

    /// 先启动调度器，成功后再启动会话清理、sink worker 和指标报告
    ///
    /// 重复调用返回错误且不会再派生任何任务。
    pub fn start(&mut self) -> Result<TickPlan, SchedulerError> {
        let plan = self.scheduler.start(self.config.target_rate)?;

        self.background_tasks.push(
            self.registry
                .spawn_sweeper(self.config.sweep_interval(), self.background_cancel.clone()),
        );

        for id in 0..self.config.sink_workers {
            let worker = SinkWorker::new(
                id,
                Arc::clone(&self.sink),
                Arc::clone(&self.queue_rx),
                Arc::clone(&self.metrics),
            );
            self.sink_tasks
                .push(tokio::spawn(worker.run(self.sink_cancel.clone())));
        }

        self.background_tasks.push(self.spawn_reporter());

        info!(
            sink_workers = self.config.sink_workers,
            queue_capacity = self.config.queue_capacity,
            initial_users = self.users.len(),
            "流水线已启动"
        );
        Ok(plan)
    }

    fn spawn_reporter(&self) -> JoinHandle<()> {
        let interval = self.config.report_interval();
        let metrics = Arc::clone(&self.metrics);
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(self.scheduler.stats());
        let queue = self.queue_tx.clone();
        let cancel = self.background_cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let snapshot = metrics.snapshot();
                let len = queue_len(&queue);
                let cap = queue.max_capacity();
                let active_sessions = registry.len();
                prom::set_queue_depth(len);
                prom::set_active_sessions(active_sessions);

                info!(
                    events = snapshot.total_events,
                    sessions_started = snapshot.sessions_started,
                    sessions_completed = snapshot.sessions_completed,
                    errors = snapshot.total_errors(),
                    steps = stats.steps(),
                    active_sessions,
                    queue_lag = %format!("{len}/{cap}"),
                    lag_pct = %format!("{:.1}", len as f64 * 100.0 / cap as f64),
                    "运行指标"
                );
            }
        })
    }

    /// 当前排队的事件数
    pub fn queue_len(&self) -> usize {
        queue_len(&self.queue_tx)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_tx.max_capacity()
    }

    pub fn metrics(&self) -> &Arc<dyn Metrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn users(&self) -> &Arc<UserPool> {
        &self.users
    }

    pub fn scheduler(&self) -> &LoadScheduler {
        &self.scheduler
    }

    /// 优雅关闭
    ///
    /// 先停调度器并等待在途票据完成，再在 `drain_timeout` 内等待输出队列
    /// 排空；超时后关闭队列，剩余事件丢弃并记录日志。
    pub async fn shutdown(mut self) -> ShutdownReport {
        let drain_timeout = self.config.drain_timeout();
        let deadline = Instant::now() + drain_timeout;

        self.scheduler.stop();
        let workers_done = tokio::time::timeout_at(deadline, self.scheduler.join())
            .await
            .is_ok();
        if !workers_done {
            warn!("模拟 worker 未在排空超时内结束，输出队列可能已满");
        }

        let drained = loop {
            if self.queue_len() == 0 {
                break true;
            }
            let now = Instant::now();
            if now >= deadline {
                break false;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL.min(deadline - now)).await;
        };

        self.sink_cancel.cancel();
        for mut task in self.sink_tasks.drain(..) {
            match tokio::time::timeout(SINK_STOP_GRACE, &mut task).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(error = %e, "sink worker 异常退出"),
                Err(_) => {
                    warn!("sink worker 卡在发布中，强制终止");
                    task.abort();
                }
            }
        }

        // 关闭接收端：仍阻塞在发送处的 worker 会立即返回
        let dropped = {
            let mut rx = self.queue_rx.lock().await;
            rx.close();
            let mut dropped = 0;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            dropped
        };
        if dropped > 0 {
            warn!(
                dropped,
                timeout_ms = drain_timeout.as_millis() as u64,
                "排空超时，丢弃剩余事件"
            );
        }

        if !workers_done {
            self.scheduler.join().await;
        }

        if let Err(e) = self.sink.flush(drain_timeout).await {
            warn!(error = %e, "刷新 sink 失败");
        }

        self.background_cancel.cancel();
        for task in self.background_tasks.drain(..) {
            let _ = task.await;
        }

        let metrics = self.metrics.snapshot();
        let steps = self.scheduler.stats().steps();
        info!(
            drained,
            dropped,
            steps,
            summary = %metrics,
            "流水线已关闭"
        );

        ShutdownReport {
            drained,
            dropped,
            steps,
            metrics,
        }
    }
}

fn queue_len(tx: &mpsc::Sender<Event>) -> usize {
    tx.max_capacity() - tx.capacity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DiscardSink;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            target_rate: 1_000,
            workers: Some(2),
            initial_users: 10,
            queue_capacity: 64,
            sink_workers: 2,
            drain_timeout_secs: 1,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = GeneratorConfig {
            queue_capacity: 0,
            ..small_config()
        };
        assert!(Pipeline::build(&config, Arc::new(DiscardSink::new())).is_err());
    }

    #[test]
    fn test_build_prefills_users() {
        let pipeline = Pipeline::build(&small_config(), Arc::new(DiscardSink::new())).unwrap();
        assert_eq!(pipeline.users().len(), 10);
        assert_eq!(pipeline.queue_len(), 0);
        assert_eq!(pipeline.queue_capacity(), 64);
    }

    #[tokio::test]
    async fn test_second_start_spawns_nothing() {
        let mut pipeline = Pipeline::build(&small_config(), Arc::new(DiscardSink::new())).unwrap();
        pipeline.start().unwrap();
        assert_eq!(pipeline.sink_tasks.len(), 2);
        assert_eq!(pipeline.background_tasks.len(), 2);

        assert_eq!(pipeline.start().unwrap_err(), SchedulerError::AlreadyStarted);
        assert_eq!(pipeline.sink_tasks.len(), 2);
        assert_eq!(pipeline.background_tasks.len(), 2);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let sink = Arc::new(DiscardSink::new());
        let mut pipeline = Pipeline::build(&small_config(), sink.clone()).unwrap();
        let plan = pipeline.start().unwrap();
        assert_eq!(plan.ticket_batch, 5);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let report = pipeline.shutdown().await;

        assert!(report.drained);
        assert_eq!(report.dropped, 0);
        assert!(report.steps > 0);
        assert_eq!(report.metrics.total_events, sink.published());
    }
}
