//! 负载调度器
//!
//! 固定间隔 tick，每个 tick 给常驻 worker 池各派发一张批量票据。
//! worker 在启动时一次性创建，不随 tick 创建任务。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use clickstream_shared::observability::metrics as prom;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::{SimulationDriver, StepOutcome};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("调度器已启动")]
    AlreadyStarted,

    #[error("调度器已停止，不能再次启动")]
    Stopped,

    #[error("目标速率必须大于 0")]
    ZeroRate,
}

/// 由目标速率推导出的每 tick 工作量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub target_rate: u64,
    pub tick_interval: Duration,
    pub workers: usize,
    pub ticks_per_second: u64,
    /// 每个 tick 应执行的 step 数，向下取整，至少为 1
    pub steps_per_tick: u64,
    /// 每张票据的 step 数，向下取整，至少为 1
    pub ticket_batch: u64,
}

impl TickPlan {
    pub fn new(target_rate: u64, tick_interval: Duration, workers: usize) -> Self {
        let tick_ms = tick_interval.as_millis().max(1) as u64;
        let ticks_per_second = (1000 / tick_ms).max(1);
        let steps_per_tick = (target_rate / ticks_per_second).max(1);
        let workers = workers.max(1);
        let ticket_batch = (steps_per_tick / workers as u64).max(1);

        Self {
            target_rate,
            tick_interval,
            workers,
            ticks_per_second,
            steps_per_tick,
            ticket_batch,
        }
    }

    /// 实际派发的速率
    ///
    /// 两次向下取整后可能低于目标，批量下限为 1 时也可能高于目标。
    pub fn effective_rate(&self) -> u64 {
        self.ticket_batch * self.workers as u64 * self.ticks_per_second
    }

    /// 用户池下限：目标速率的两倍，降低同一窗口内抽到同一用户的概率
    pub fn user_floor(&self) -> usize {
        usize::try_from(self.target_rate.saturating_mul(2)).unwrap_or(usize::MAX)
    }
}

/// 调度器运行计数
#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks: AtomicU64,
    tickets: AtomicU64,
    steps: AtomicU64,
    emitted: AtomicU64,
}

impl SchedulerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn tickets(&self) -> u64 {
        self.tickets.load(Ordering::Relaxed)
    }

    /// 已执行的 step 数（含无事件的 step）
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// 成功写入输出队列的事件数
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

pub struct LoadScheduler {
    driver: Arc<SimulationDriver>,
    tick_interval: Duration,
    workers: usize,
    cancel: CancellationToken,
    stats: Arc<SchedulerStats>,
    started: AtomicBool,
    plan: Mutex<Option<TickPlan>>,
    /// join 可能被超时打断，未结束的句柄留在这里供下次 join
    tasks: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl LoadScheduler {
    pub fn new(driver: Arc<SimulationDriver>, tick_interval: Duration, workers: usize) -> Self {
        Self {
            driver,
            tick_interval,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
            stats: Arc::new(SchedulerStats::default()),
            started: AtomicBool::new(false),
            plan: Mutex::new(None),
            tasks: AsyncMutex::new(Vec::new()),
        }
    }

    pub fn stats(&self) -> &Arc<SchedulerStats> {
        &self.stats
    }

    pub fn plan(&self) -> Option<TickPlan> {
        *self.plan.lock()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    /// 启动 worker 池和 tick 循环
    ///
    /// 每个调度器只能启动一次。必须在 tokio 运行时内调用。
    pub fn start(&self, target_rate: u64) -> Result<TickPlan, SchedulerError> {
        if target_rate == 0 {
            return Err(SchedulerError::ZeroRate);
        }
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Stopped);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyStarted);
        }

        let plan = TickPlan::new(target_rate, self.tick_interval, self.workers);
        *self.plan.lock() = Some(plan);

        // 容量等于 worker 数：worker 全忙时 tick 循环在发送处等待
        let (ticket_tx, ticket_rx) = mpsc::channel::<u64>(plan.workers);
        let ticket_rx = Arc::new(AsyncMutex::new(ticket_rx));

        let Ok(mut tasks) = self.tasks.try_lock() else {
            return Err(SchedulerError::AlreadyStarted);
        };
        for worker_id in 0..plan.workers {
            tasks.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&self.driver),
                Arc::clone(&ticket_rx),
                Arc::clone(&self.stats),
                self.cancel.clone(),
            )));
        }
        tasks.push(tokio::spawn(run_ticker(
            plan,
            Arc::clone(&self.driver),
            ticket_tx,
            Arc::clone(&self.stats),
            self.cancel.clone(),
        )));
        drop(tasks);

        info!(
            target_rate,
            workers = plan.workers,
            tick_ms = plan.tick_interval.as_millis() as u64,
            steps_per_tick = plan.steps_per_tick,
            ticket_batch = plan.ticket_batch,
            effective_rate = plan.effective_rate(),
            "负载调度器已启动"
        );
        if plan.effective_rate() != target_rate {
            debug!(
                target_rate,
                effective_rate = plan.effective_rate(),
                "取整后的实际速率与目标不同"
            );
        }
        Ok(plan)
    }

    /// 通知 tick 循环和 worker 退出
    ///
    /// 不打断正在执行的票据，已领取的批量会跑完。
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!("负载调度器停止中");
            self.cancel.cancel();
        }
    }

    /// 等待所有任务结束
    ///
    /// 可以放在超时里调用：被打断时尚未结束的任务不会丢失。
    pub async fn join(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(task) = tasks.last_mut() {
            if let Err(e) = task.await {
                warn!(error = %e, "调度任务异常退出");
            }
            tasks.pop();
        }
    }
}

async fn run_ticker(
    plan: TickPlan,
    driver: Arc<SimulationDriver>,
    tickets: mpsc::Sender<u64>,
    stats: Arc<SchedulerStats>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(plan.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let user_floor = plan.user_floor();

    'ticks: loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        driver.users().ensure(user_floor);
        stats.ticks.fetch_add(1, Ordering::Relaxed);

        for _ in 0..plan.workers {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'ticks,
                sent = tickets.send(plan.ticket_batch) => {
                    if sent.is_err() {
                        break 'ticks;
                    }
                    stats.tickets.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
    debug!(ticks = stats.ticks(), "tick 循环已退出");
}

async fn run_worker(
    worker_id: usize,
    driver: Arc<SimulationDriver>,
    tickets: Arc<AsyncMutex<mpsc::Receiver<u64>>>,
    stats: Arc<SchedulerStats>,
    cancel: CancellationToken,
) {
    loop {
        let batch = {
            let mut rx = tickets.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                batch = rx.recv() => batch,
            }
        };
        let Some(batch) = batch else {
            break;
        };

        let mut executed = 0;
        for _ in 0..batch {
            let outcome = driver.step().await;
            executed += 1;
            match outcome {
                StepOutcome::Emitted => {
                    stats.emitted.fetch_add(1, Ordering::Relaxed);
                }
                // 队列已关闭，剩下的 step 没有去处
                StepOutcome::QueueClosed => break,
                StepOutcome::NoUser | StepOutcome::NoTransition => {}
            }
        }
        stats.steps.fetch_add(executed, Ordering::Relaxed);
        prom::record_steps(executed);
    }
    debug!(worker_id, "调度 worker 已退出");
}
