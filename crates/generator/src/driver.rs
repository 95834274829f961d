//! 单步模拟编排
//!
//! 一次 step：抽用户 → 取会话 → 状态机推进 → 生成负载 → 写入输出队列。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::event::Event;
use crate::fsm::BehaviorEngine;
use crate::metrics::Metrics;
use crate::payload::PayloadGenerator;
use crate::session::SessionRegistry;
use crate::user_pool::UserPool;

/// 一次 step 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 用户池为空
    NoUser,
    /// 会话没有可用迁移
    NoTransition,
    /// 事件已写入输出队列
    Emitted,
    /// 输出队列已关闭，事件被丢弃
    QueueClosed,
}

pub struct SimulationDriver {
    users: Arc<UserPool>,
    registry: Arc<SessionRegistry>,
    engine: Arc<BehaviorEngine>,
    payloads: Arc<dyn PayloadGenerator>,
    metrics: Arc<dyn Metrics>,
    output: mpsc::Sender<Event>,
}

impl SimulationDriver {
    pub fn new(
        users: Arc<UserPool>,
        registry: Arc<SessionRegistry>,
        engine: Arc<BehaviorEngine>,
        payloads: Arc<dyn PayloadGenerator>,
        metrics: Arc<dyn Metrics>,
        output: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            users,
            registry,
            engine,
            payloads,
            metrics,
            output,
        }
    }

    pub fn users(&self) -> &Arc<UserPool> {
        &self.users
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 执行一步
    ///
    /// 输出队列满时在发送处等待，下游变慢会一直反压到这里。
    /// 会话锁在发送前释放。
    pub async fn step(&self) -> StepOutcome {
        let Some(user) = self.users.random() else {
            return StepOutcome::NoUser;
        };

        let now = crate::now_millis();
        let handle = self.registry.get_or_create(&user.id, now);

        let event = {
            let mut session = handle.lock();
            let Some(event) = self.engine.step(&mut *session, now) else {
                if session.state.is_terminal() {
                    let session_id = session.id.clone();
                    drop(session);
                    self.registry.delete(&user.id, &session_id);
                }
                return StepOutcome::NoTransition;
            };
            let payload = self.payloads.generate(event.event_type, &mut *session);
            event.with_extra(payload)
        };

        let prev = event.attributes.prev_state;
        let next = event.attributes.state;
        if prev != next {
            self.metrics.inc_transition(prev, next);
        }
        // 注册表创建会话时已计过一次，这里按事件类型再计一次
        if event.event_type.signals_session_start() {
            self.metrics.inc_session_started();
        }

        let ends_session = event.event_type.signals_session_end();
        let session_id = event.session_id.clone();

        trace!(
            user_id = %event.user_id,
            event_type = %event.event_type,
            from = %prev,
            to = %next,
            "生成事件"
        );

        let outcome = match self.output.send(event).await {
            Ok(()) => StepOutcome::Emitted,
            Err(_) => {
                self.metrics.inc_error("queue_closed");
                StepOutcome::QueueClosed
            }
        };

        if ends_session {
            self.registry.delete(&user.id, &session_id);
            self.metrics.inc_session_completed();
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{EventType, State, Transition, TransitionTable};
    use crate::metrics::InMemoryMetrics;
    use crate::payload::CatalogPayloadGenerator;
    use crate::rng::SharedRng;
    use std::time::Duration;

    struct Fixture {
        driver: SimulationDriver,
        metrics: Arc<InMemoryMetrics>,
        rx: mpsc::Receiver<Event>,
    }

    fn fixture(table: TransitionTable, users: usize, capacity: usize) -> Fixture {
        let rng = SharedRng::seeded(21);
        let metrics = Arc::new(InMemoryMetrics::new());
        let pool = Arc::new(UserPool::new(rng.fork()));
        pool.ensure(users);
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60), metrics.clone()));
        let engine = Arc::new(BehaviorEngine::new(Arc::new(table), rng.fork()));
        let payloads = Arc::new(CatalogPayloadGenerator::new(rng.fork()));
        let (tx, rx) = mpsc::channel(capacity);

        Fixture {
            driver: SimulationDriver::new(pool, registry, engine, payloads, metrics.clone(), tx),
            metrics,
            rx,
        }
    }

    fn only(state: State, transition: Transition) -> TransitionTable {
        TransitionTable::from_rows([(state, vec![transition])])
    }

    #[tokio::test]
    async fn test_empty_pool_is_noop() {
        let f = fixture(TransitionTable::standard(), 0, 8);
        assert_eq!(f.driver.step().await, StepOutcome::NoUser);
        assert!(f.driver.registry().is_empty());
    }

    #[tokio::test]
    async fn test_emits_event_with_payload() {
        let mut f = fixture(TransitionTable::standard(), 1, 8);
        assert_eq!(f.driver.step().await, StepOutcome::Emitted);

        let event = f.rx.recv().await.unwrap();
        assert_eq!(event.user_id, "user_1");
        assert_eq!(event.attributes.prev_state, State::Browsing);
        assert_eq!(event.attributes.extra["user_id"], "user_1");
        assert_eq!(event.attributes.extra["session_id"], event.session_id.as_str());
    }

    #[tokio::test]
    async fn test_session_start_counted_twice() {
        let mut f = fixture(
            only(
                State::Browsing,
                Transition::to(EventType::SearchSubmitted, State::Search, 1.0),
            ),
            1,
            8,
        );
        f.driver.step().await;
        let event = f.rx.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::SearchSubmitted);

        let snap = f.metrics.snapshot();
        assert_eq!(snap.sessions_started, 2);
        assert_eq!(snap.transition_count(State::Browsing, State::Search), 1);
    }

    #[tokio::test]
    async fn test_self_loop_not_counted_as_transition() {
        let f = fixture(
            only(
                State::Browsing,
                Transition::to(EventType::PageViewed, State::Browsing, 1.0),
            ),
            1,
            8,
        );
        f.driver.step().await;
        assert!(f.metrics.snapshot().transitions.is_empty());
    }

    #[tokio::test]
    async fn test_exit_deletes_session() {
        let mut f = fixture(
            only(State::Browsing, Transition::to(EventType::Exit, State::Exit, 1.0)),
            1,
            8,
        );
        assert_eq!(f.driver.step().await, StepOutcome::Emitted);
        assert!(f.driver.registry().is_empty());
        assert_eq!(f.metrics.snapshot().sessions_completed, 1);
        assert_eq!(f.rx.recv().await.unwrap().event_type, EventType::Exit);
    }

    #[tokio::test]
    async fn test_no_transition() {
        let f = fixture(TransitionTable::from_rows(Vec::new()), 1, 8);
        assert_eq!(f.driver.step().await, StepOutcome::NoTransition);
    }

    #[tokio::test]
    async fn test_closed_queue_counted() {
        let f = fixture(TransitionTable::standard(), 1, 8);
        drop(f.rx);
        assert_eq!(f.driver.step().await, StepOutcome::QueueClosed);
        assert_eq!(f.metrics.snapshot().errors["queue_closed"], 1);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_step() {
        let mut f = fixture(
            only(
                State::Browsing,
                Transition::to(EventType::PageViewed, State::Browsing, 1.0),
            ),
            1,
            1,
        );
        assert_eq!(f.driver.step().await, StepOutcome::Emitted);

        let mut blocked = tokio_test::task::spawn(f.driver.step());
        tokio_test::assert_pending!(blocked.poll());

        f.rx.recv().await.unwrap();
        assert!(blocked.is_woken());
        assert_eq!(tokio_test::assert_ready!(blocked.poll()), StepOutcome::Emitted);
    }
}
