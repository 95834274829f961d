//! 购物车阶段的负载

use serde_json::json;

use super::{CatalogPayloadGenerator, Payload, insert_last_picked};
use crate::fsm::EventType;
use crate::session::SessionView;

impl CatalogPayloadGenerator {
    pub(super) fn cart(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();
        insert_last_picked(&mut payload, session, "product_category");
        if session.last_picked().category.is_empty() {
            payload.insert("product_category".into(), json!("unknown"));
        }
        payload.insert("quantity".into(), json!(session.last_quantity()));
        payload.insert("stay_sec".into(), json!(self.stay_sec(5, 20)));

        match event_type {
            // 区分详情页直购和购物车结算
            EventType::Purchased => {
                payload.insert("purchase_source".into(), json!("cart_checkout"));
            }
            EventType::Back => {
                payload.insert("action".into(), json!("back_to_previous"));
            }
            EventType::Exit => {
                payload.insert("exit_reason".into(), json!("user_left_with_items"));
            }
            _ => {}
        }

        payload
    }
}
