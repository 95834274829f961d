//! 端到端行为场景
//!
//! 直接驱动 SimulationDriver，从输出队列读取事件并检查其内容。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clickstream_generator::driver::{SimulationDriver, StepOutcome};
use clickstream_generator::event::Event;
use clickstream_generator::fsm::{BehaviorEngine, EventType, State, Transition, TransitionTable};
use clickstream_generator::metrics::{InMemoryMetrics, Metrics};
use clickstream_generator::payload::CatalogPayloadGenerator;
use clickstream_generator::rng::SharedRng;
use clickstream_generator::scheduler::TickPlan;
use clickstream_generator::session::{Session, SessionRegistry};
use clickstream_generator::user_pool::UserPool;
use tokio::sync::mpsc;

struct Harness {
    driver: SimulationDriver,
    metrics: Arc<InMemoryMetrics>,
    rx: mpsc::Receiver<Event>,
}

fn harness(table: TransitionTable, users: usize, seed: u64) -> Harness {
    let rng = SharedRng::seeded(seed);
    let metrics = Arc::new(InMemoryMetrics::new());
    let pool = Arc::new(UserPool::new(rng.fork()));
    pool.ensure(users);
    let registry = Arc::new(SessionRegistry::new(Duration::from_secs(600), metrics.clone()));
    let engine = Arc::new(BehaviorEngine::new(Arc::new(table), rng.fork()));
    let payloads = Arc::new(CatalogPayloadGenerator::new(rng.fork()));
    let (tx, rx) = mpsc::channel(1_024);

    Harness {
        driver: SimulationDriver::new(pool, registry, engine, payloads, metrics.clone(), tx),
        metrics,
        rx,
    }
}

#[test]
fn test_low_rate_tick_plan() {
    let plan = TickPlan::new(100, Duration::from_millis(20), 4);
    assert_eq!(plan.steps_per_tick, 2);
    assert_eq!(plan.ticket_batch, 1);
}

#[tokio::test]
async fn test_click_then_add_to_cart() {
    let table = TransitionTable::from_rows([
        (
            State::Browsing,
            vec![Transition::to(EventType::ProductClicked, State::Click, 1.0)],
        ),
        (
            State::Click,
            vec![Transition::to(EventType::AddToCart, State::AddToCart, 1.0)],
        ),
    ]);
    let mut h = harness(table, 1, 11);

    assert_eq!(h.driver.step().await, StepOutcome::Emitted);
    assert_eq!(h.driver.step().await, StepOutcome::Emitted);

    let clicked = h.rx.recv().await.unwrap();
    let added = h.rx.recv().await.unwrap();

    assert_eq!(clicked.event_type, EventType::ProductClicked);
    assert_eq!(added.event_type, EventType::AddToCart);
    assert_eq!(added.attributes.state, State::AddToCart);
    assert_eq!(added.attributes.prev_state, State::Click);
    assert_eq!(added.session_id, clicked.session_id);

    let quantity = added.attributes.extra["quantity"].as_u64().unwrap();
    assert!((1..=5).contains(&quantity));
    assert_eq!(
        added.attributes.extra["product_id"],
        clicked.attributes.extra["product_id"]
    );

    let wire = serde_json::to_value(&added).unwrap();
    assert_eq!(wire["event_type"], "add_to_cart");
    assert_eq!(wire["attributes"]["state"], "addtocart");
    assert_eq!(wire["attributes"]["prev_state"], "click");
    assert_eq!(wire["attributes"]["quantity"], quantity);

    assert_eq!(h.metrics.snapshot().transition_count(State::Click, State::AddToCart), 1);
}

#[tokio::test]
async fn test_full_session_until_exit() {
    let table = TransitionTable::from_rows([
        (
            State::Browsing,
            vec![Transition::to(EventType::SearchSubmitted, State::Search, 1.0)],
        ),
        (
            State::Search,
            vec![Transition::to(EventType::ProductClicked, State::Click, 1.0)],
        ),
        (
            State::Click,
            vec![Transition::to(EventType::Purchased, State::Purchase, 1.0)],
        ),
        (
            State::Purchase,
            vec![Transition::to(EventType::Exit, State::Exit, 1.0)],
        ),
    ]);
    let mut h = harness(table, 1, 12);

    for _ in 0..4 {
        assert_eq!(h.driver.step().await, StepOutcome::Emitted);
    }
    let mut types = Vec::new();
    while let Ok(event) = h.rx.try_recv() {
        types.push(event.event_type);
    }
    assert_eq!(
        types,
        [
            EventType::SearchSubmitted,
            EventType::ProductClicked,
            EventType::Purchased,
            EventType::Exit,
        ]
    );

    assert!(h.driver.registry().is_empty());
    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.sessions_completed, 1);
    // 创建会话一次，search_submitted 再计一次
    assert_eq!(snapshot.sessions_started, 2);

    // 下一步为同一用户开启新会话
    assert_eq!(h.driver.step().await, StepOutcome::Emitted);
    assert_eq!(h.driver.registry().len(), 1);
}

#[tokio::test]
async fn test_many_users_every_event_well_formed() {
    let mut h = harness(TransitionTable::standard(), 50, 13);
    for _ in 0..2_000 {
        h.driver.step().await;
        while let Ok(event) = h.rx.try_recv() {
            assert!(event.event_id.starts_with("evt-"));
            assert!(!event.attributes.state.is_none());
            assert!(!event.attributes.prev_state.is_none());
            assert_eq!(event.attributes.extra["user_id"], event.user_id.as_str());
            assert_eq!(
                event.attributes.extra["current_state"],
                event.attributes.state.as_str()
            );
        }
    }
    assert!(h.driver.registry().is_consistent());
    assert!(h.metrics.snapshot().sessions_completed > 0);
}

/// 自由度 5，显著性 0.001 的卡方临界值
const CHI_SQUARE_CRITICAL_DF5: f64 = 20.515;

#[test]
fn test_browsing_weights_chi_square() {
    let table = Arc::new(TransitionTable::standard());
    let engine = BehaviorEngine::new(Arc::clone(&table), SharedRng::seeded(2024));

    let samples = 19_000;
    let mut observed: HashMap<EventType, u64> = HashMap::new();
    for i in 0..samples {
        let mut session = Session::new(format!("s{i}"), "u".into(), 0, 60_000);
        let event = engine.step(&mut session, 1).unwrap();
        *observed.entry(event.event_type).or_default() += 1;
    }

    let row = table.transitions(State::Browsing);
    let total_weight: f64 = row.iter().map(|t| t.weight).sum();
    let chi_square: f64 = row
        .iter()
        .map(|t| {
            let expected = samples as f64 * t.weight / total_weight;
            let got = observed.get(&t.event).copied().unwrap_or(0) as f64;
            (got - expected).powi(2) / expected
        })
        .sum();

    assert_eq!(row.len(), 6);
    assert!(
        chi_square < CHI_SQUARE_CRITICAL_DF5,
        "chi-square = {chi_square:.2}, observed = {observed:?}"
    );
}

#[test]
fn test_every_state_can_exit() {
    let table = TransitionTable::standard();
    assert!(table.states_without_exit().is_empty());
    for state in State::ALL {
        assert!(table.can_reach_exit(state), "{state} cannot reach exit");
    }
}
