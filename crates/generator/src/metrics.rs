//! 生成器运行指标
//!
//! 计数器只增不减。每次递增同时转发给 `metrics` facade，
//! 启用 Prometheus 导出时可被外部抓取。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use clickstream_shared::observability::metrics as prom;
use dashmap::DashMap;
use serde::Serialize;

use crate::fsm::{EventType, State};

/// 指标收集接口
pub trait Metrics: Send + Sync {
    /// 事件成功发布
    fn inc_event(&self, event_type: EventType);
    fn inc_session_started(&self);
    fn inc_session_completed(&self);
    fn inc_transition(&self, prev: State, next: State);
    fn inc_error(&self, kind: &str);
    /// 当前全部计数器的拷贝
    fn snapshot(&self) -> MetricsSnapshot;
}

/// 某一时刻的计数器拷贝
///
/// 每个计数器单独原子读取，计数器之间不保证同一瞬间。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_events: u64,
    pub events_by_type: BTreeMap<String, u64>,
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub transitions: BTreeMap<String, u64>,
    pub errors: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }

    pub fn events_of(&self, event_type: EventType) -> u64 {
        self.events_by_type
            .get(event_type.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn transition_count(&self, prev: State, next: State) -> u64 {
        self.transitions
            .get(&transition_key(prev, next))
            .copied()
            .unwrap_or(0)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "events={} sessions_started={} sessions_completed={} errors={}",
            self.total_events,
            self.sessions_started,
            self.sessions_completed,
            self.total_errors()
        )
    }
}

/// 迁移计数的键，形如 `"browsing -> search"`
pub fn transition_key(prev: State, next: State) -> String {
    format!("{prev} -> {next}")
}

/// 进程内指标实现
#[derive(Default)]
pub struct InMemoryMetrics {
    total_events: AtomicU64,
    events_by_type: DashMap<&'static str, AtomicU64>,
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
    transitions: DashMap<String, AtomicU64>,
    errors: DashMap<String, AtomicU64>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 已有键只拿分片读锁，首次出现才走 entry 写入
fn bump<K>(map: &DashMap<K, AtomicU64>, key: K)
where
    K: Eq + std::hash::Hash,
{
    if let Some(counter) = map.get(&key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    map.entry(key)
        .or_default()
        .fetch_add(1, Ordering::Relaxed);
}

fn collect<K: ToString>(map: &DashMap<K, AtomicU64>) -> BTreeMap<String, u64>
where
    K: Eq + std::hash::Hash,
{
    map.iter()
        .map(|entry| (entry.key().to_string(), entry.value().load(Ordering::Relaxed)))
        .collect()
}

impl Metrics for InMemoryMetrics {
    fn inc_event(&self, event_type: EventType) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        bump(&self.events_by_type, event_type.as_str());
        prom::record_event(event_type.as_str());
    }

    fn inc_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        prom::record_session_started();
    }

    fn inc_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        prom::record_session_completed();
    }

    fn inc_transition(&self, prev: State, next: State) {
        bump(&self.transitions, transition_key(prev, next));
        prom::record_state_transition(prev.as_str(), next.as_str());
    }

    fn inc_error(&self, kind: &str) {
        if let Some(counter) = self.errors.get(kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            bump(&self.errors, kind.to_string());
        }
        prom::record_error(kind);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_events: self.total_events.load(Ordering::Relaxed),
            events_by_type: collect(&self.events_by_type),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            transitions: collect(&self.transitions),
            errors: collect(&self.errors),
        }
    }
}
