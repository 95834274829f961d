//! 输出事件

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fsm::{EventType, State};
use crate::rng::SharedRng;

/// 事件属性：状态信息加上负载生成器合并进来的扩展字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttributes {
    pub state: State,
    pub prev_state: State,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 一次迁移产生的事件
///
/// 构造完成后不再修改，所有权依次转移给输出队列和 sink worker。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: EventType,
    /// 毫秒时间戳
    pub event_ts: i64,
    pub user_id: String,
    pub session_id: String,
    pub attributes: EventAttributes,
}

impl Event {
    pub fn new(
        event_type: EventType,
        now: i64,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        state: State,
        prev_state: State,
        rng: &SharedRng,
    ) -> Self {
        Self {
            event_id: generate_event_id(now, rng),
            event_type,
            event_ts: now,
            user_id: user_id.into(),
            session_id: session_id.into(),
            attributes: EventAttributes {
                state,
                prev_state,
                extra: Map::new(),
            },
        }
    }

    /// 合并扩展字段
    ///
    /// `state`/`prev_state` 由迁移决定，负载里的同名键被忽略。
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        for (key, value) in extra {
            if key == "state" || key == "prev_state" {
                continue;
            }
            self.attributes.extra.insert(key, value);
        }
        self
    }
}

/// 时间前缀加 9 位随机数
pub fn generate_event_id(now: i64, rng: &SharedRng) -> String {
    format!("evt-{now}-{:09}", rng.gen_u32_below(1_000_000_000))
}
