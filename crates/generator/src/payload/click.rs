//! 商品详情页阶段的负载

use serde_json::json;

use super::{CatalogPayloadGenerator, Payload, insert_last_picked};
use crate::fsm::EventType;
use crate::session::SessionView;

impl CatalogPayloadGenerator {
    pub(super) fn click(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();
        insert_last_picked(&mut payload, session, "category");

        match event_type {
            EventType::AddToCart | EventType::Purchased => {
                let quantity = self.quantity();
                session.set_last_quantity(quantity);
                payload.insert("quantity".into(), json!(quantity));
            }
            EventType::Back => {
                payload.insert("stay_sec".into(), json!(self.stay_sec(5, 30)));
            }
            EventType::Exit => {
                payload.insert("exit_reason".into(), json!("user_left"));
            }
            _ => {}
        }

        payload
    }
}
