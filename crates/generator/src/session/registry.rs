//! 会话注册表
//!
//! 用户索引和会话表放在同一把锁内，任何时刻两者都保持一致：
//! 不会出现只能从一个索引找到的会话。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clickstream_shared::observability::metrics as prom;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::model::Session;
use crate::metrics::Metrics;

/// 会话句柄
///
/// 一次 step 通过持有会话锁独占该会话；锁顺序固定为先注册表后会话。
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
struct Inner {
    /// session_id -> 会话
    sessions: HashMap<String, SessionHandle>,
    /// user_id -> session_id
    user_index: HashMap<String, String>,
}

impl Inner {
    fn remove(&mut self, session_id: &str) -> Option<SessionHandle> {
        let handle = self.sessions.remove(session_id)?;
        let user_id = handle.lock().user_id.clone();
        if self.user_index.get(&user_id).is_some_and(|sid| sid == session_id) {
            self.user_index.remove(&user_id);
        }
        Some(handle)
    }
}

pub struct SessionRegistry {
    inner: Mutex<Inner>,
    ttl_ms: i64,
    seq: AtomicU64,
    metrics: Arc<dyn Metrics>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            seq: AtomicU64::new(0),
            metrics,
        }
    }

    /// 取用户当前会话，没有可用会话时新建
    ///
    /// 找到未终止且未过期的会话时滑动续期后返回；会话已过期时视同
    /// 被清理（计一次会话结束）并替换为新会话；会话已终止时直接替换。
    pub fn get_or_create(&self, user_id: &str, now: i64) -> SessionHandle {
        let mut inner = self.inner.lock();

        if let Some(session_id) = inner.user_index.get(user_id).cloned()
            && let Some(handle) = inner.sessions.get(&session_id).cloned()
        {
            let mut session = handle.lock();
            if !session.state.is_terminal() && !session.is_expired(now) {
                session.touch(now, self.ttl_ms);
                drop(session);
                return handle;
            }
            let expired = !session.state.is_terminal();
            drop(session);

            inner.remove(&session_id);
            if expired {
                self.metrics.inc_session_completed();
                debug!(user_id, session_id = %session_id, "会话已过期，重新创建");
            }
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let session_id = format!("sess_{user_id}_{now}_{seq}");
        let handle = Arc::new(Mutex::new(Session::new(
            session_id.clone(),
            user_id.to_string(),
            now,
            self.ttl_ms,
        )));
        inner.sessions.insert(session_id.clone(), Arc::clone(&handle));
        inner.user_index.insert(user_id.to_string(), session_id);
        drop(inner);

        self.metrics.inc_session_started();
        handle
    }

    /// 删除会话，两个索引同时移除
    ///
    /// 用户索引只在仍指向该会话时才删除，避免误删同一用户的新会话。
    pub fn delete(&self, user_id: &str, session_id: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.sessions.remove(session_id).is_some();
        if inner.user_index.get(user_id).is_some_and(|sid| sid == session_id) {
            inner.user_index.remove(user_id);
        }
        removed
    }

    /// 清理所有已过期会话，返回清理数量
    pub fn sweep(&self, now: i64) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, handle)| handle.lock().is_expired(now))
            .map(|(sid, _)| sid.clone())
            .collect();

        for sid in &expired {
            inner.remove(sid);
        }
        let remaining = inner.sessions.len();
        drop(inner);

        for _ in &expired {
            self.metrics.inc_session_completed();
        }
        prom::set_active_sessions(remaining);

        if !expired.is_empty() {
            debug!(removed = expired.len(), remaining, "已清理过期会话");
        }
        expired.len()
    }

    /// 在独立任务上周期性清理，直到取消
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // 第一次 tick 立即返回，跳过
            ticker.tick().await;

            info!(interval_ms = interval.as_millis() as u64, "会话清理任务已启动");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.sweep(crate::now_millis());
                    }
                }
            }
            info!("会话清理任务已停止");
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.inner.lock().user_index.contains_key(user_id)
    }

    /// 用户当前登记的会话，不续期
    pub fn session_for_user(&self, user_id: &str) -> Option<SessionHandle> {
        let inner = self.inner.lock();
        let sid = inner.user_index.get(user_id)?;
        inner.sessions.get(sid).cloned()
    }

    /// 检查两个索引是否一致，供测试和诊断使用
    pub fn is_consistent(&self) -> bool {
        let inner = self.inner.lock();
        inner.user_index.len() == inner.sessions.len()
            && inner.user_index.iter().all(|(user, sid)| {
                inner
                    .sessions
                    .get(sid)
                    .is_some_and(|handle| handle.lock().user_id == *user)
            })
    }
}
