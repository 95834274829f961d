//! 行为引擎
//!
//! 纯状态迁移函数：引擎自身无状态，只读写传入的会话。

use std::sync::Arc;

use super::transitions::TransitionTable;
use super::types::{EventType, State};
use crate::catalog::Catalog;
use crate::event::Event;
use crate::rng::SharedRng;
use crate::session::SessionView;

pub struct BehaviorEngine {
    table: Arc<TransitionTable>,
    rng: SharedRng,
    catalog: &'static Catalog,
}

impl BehaviorEngine {
    pub fn new(table: Arc<TransitionTable>, rng: SharedRng) -> Self {
        Self {
            table,
            rng,
            catalog: Catalog::global(),
        }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// 推进会话一步
    ///
    /// 没有可用迁移（终止状态、未登记状态、权重全为 0）时返回 None，
    /// 会话保持不变。
    pub fn step<S: SessionView + ?Sized>(&self, session: &mut S, now: i64) -> Option<Event> {
        if session.state().is_none() {
            session.set_state(State::START);
        }

        let current = session.state();
        let transition = *self.table.choose(current, &self.rng)?;

        let next = match transition.next_state {
            Some(next) => next,
            None => match session.prev_state() {
                State::None => State::START,
                prev => prev,
            },
        };

        session.set_prev_state(current);
        session.set_state(next);
        session.set_last_event_ts(now);

        if transition.event == EventType::SearchSubmitted {
            session.set_search_keyword(self.catalog.random_keyword(&self.rng));
            session.set_page_index(1);
        }

        Some(Event::new(
            transition.event,
            now,
            session.user_id(),
            session.id(),
            next,
            current,
            &self.rng,
        ))
    }
}
