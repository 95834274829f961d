//! 支付阶段的负载

use serde_json::json;

use super::{CatalogPayloadGenerator, Payload, insert_last_picked};
use crate::fsm::{EventType, State};
use crate::session::SessionView;

const PAYMENT_METHODS: [&str; 5] = ["card", "kakao_pay", "naver_pay", "apple_pay", "google_pay"];

impl CatalogPayloadGenerator {
    pub(super) fn purchase(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        // 从详情页直接购买，数量在这里生成
        if event_type == EventType::Purchased && session.prev_state() == State::Click {
            session.set_last_quantity(self.quantity());
        }

        let mut payload = Payload::new();
        insert_last_picked(&mut payload, session, "product_category");
        payload.insert("quantity".into(), json!(session.last_quantity()));
        payload.insert("payment_method".into(), json!(self.pick_one(&PAYMENT_METHODS)));
        payload.insert("stay_sec".into(), json!(self.stay_sec(20, 40)));

        if event_type == EventType::Exit {
            payload.insert("action".into(), json!("order_complete_exit"));
            payload.insert("exit_reason".into(), json!("user_closed_after_purchase"));
            payload.insert("stay_sec".into(), json!(self.stay_sec(2, 10)));
        }

        payload
    }
}
