//! 事件负载生成
//!
//! 根据事件类型和会话上下文生成扩展属性。生成器可以修改它负责语义的
//! 会话字段（如最近选中的商品、购买数量），调用方应视为正常行为。

mod browsing;
mod cart;
mod click;
mod event_browsing;
mod next_page;
mod purchase;
mod search;

use serde_json::{Map, Value, json};

use crate::catalog::{Catalog, Product};
use crate::fsm::{EventType, State};
use crate::rng::SharedRng;
use crate::session::{PickedProduct, SessionView};

pub type Payload = Map<String, Value>;

/// 负载生成接口
pub trait PayloadGenerator: Send + Sync {
    fn generate(&self, event_type: EventType, session: &mut dyn SessionView) -> Payload;
}

/// 基于商品目录的负载生成器
pub struct CatalogPayloadGenerator {
    rng: SharedRng,
    catalog: &'static Catalog,
}

impl CatalogPayloadGenerator {
    pub fn new(rng: SharedRng) -> Self {
        Self {
            rng,
            catalog: Catalog::global(),
        }
    }

    /// `[base, base + span)` 的停留秒数
    fn stay_sec(&self, base: u32, span: u32) -> u32 {
        base + self.rng.gen_u32_below(span)
    }

    /// 1 到 5 件
    fn quantity(&self) -> u32 {
        self.rng.gen_range(1..=5)
    }

    fn pick_one(&self, items: &[&'static str]) -> &'static str {
        self.rng.choose(items).copied().unwrap_or_default()
    }

    /// 会话按进入当前状态前所在的位置决定负载
    fn dispatch(&self, event_type: EventType, session: &mut dyn SessionView) -> Payload {
        let current = session.state();
        let prev = session.prev_state();

        match event_type {
            EventType::SearchSubmitted => self.search(session, event_type),
            EventType::PageViewed if current == State::NextPage => {
                self.next_page(session, event_type)
            }
            EventType::PageViewed => self.browsing(session, event_type),
            EventType::ProductClicked => match prev {
                State::Search => self.search(session, event_type),
                State::NextPage => self.next_page(session, event_type),
                _ => self.browsing(session, event_type),
            },
            EventType::EventPageClicked | EventType::CategoryClicked => {
                self.browsing(session, event_type)
            }
            EventType::AddToCart => self.click(session, event_type),
            EventType::Purchased if prev == State::AddToCart => self.cart(session, event_type),
            EventType::Purchased => self.purchase(session, event_type),
            EventType::Back | EventType::Exit => match prev {
                State::EventBrowsing => self.event_browsing(session, event_type),
                State::Search => self.search(session, event_type),
                State::NextPage => self.next_page(session, event_type),
                State::Click => self.click(session, event_type),
                State::AddToCart => self.cart(session, event_type),
                State::Purchase => self.purchase(session, event_type),
                _ => self.browsing(session, event_type),
            },
        }
    }
}

impl PayloadGenerator for CatalogPayloadGenerator {
    fn generate(&self, event_type: EventType, session: &mut dyn SessionView) -> Payload {
        let mut payload = self.dispatch(event_type, session);

        payload.insert("session_id".into(), json!(session.id()));
        payload.insert("user_id".into(), json!(session.user_id()));
        payload.insert("generated_at".into(), json!(session.last_event_ts()));
        payload.insert("current_state".into(), json!(session.state().as_str()));
        payload
    }
}

/// 记住选中的商品，后续点击、加购、购买都引用它
fn remember(session: &mut dyn SessionView, product: &Product) {
    session.set_last_picked(PickedProduct {
        product_id: product.product_id.to_string(),
        category: product.category.to_string(),
        country: product.country.to_string(),
    });
}

/// 把最近选中的商品写入负载，`category_key` 因阶段不同而不同
fn insert_last_picked(payload: &mut Payload, session: &dyn SessionView, category_key: &str) {
    let picked = session.last_picked();
    payload.insert("product_id".into(), json!(picked.product_id));
    payload.insert(category_key.into(), json!(picked.category));
    payload.insert("country".into(), json!(picked.country));
}
