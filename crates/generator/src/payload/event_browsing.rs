//! 活动页阶段的负载

use serde_json::json;

use super::{CatalogPayloadGenerator, Payload};
use crate::fsm::EventType;
use crate::session::SessionView;

impl CatalogPayloadGenerator {
    pub(super) fn event_browsing(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();
        let current_page = session.event_page().to_string();

        match event_type {
            EventType::Back => {
                payload.insert("from_page".into(), json!(current_page));
                payload.insert("to_page".into(), json!("home"));
                payload.insert("action".into(), json!("back_button_click"));
                payload.insert("stay_sec".into(), json!(self.stay_sec(2, 60)));
            }
            EventType::Exit => {
                payload.insert("last_viewed_page".into(), json!(current_page));
                payload.insert("exit_reason".into(), json!("user_left"));
                payload.insert("total_event_stay_sec".into(), json!(self.stay_sec(10, 50)));
            }
            _ => {}
        }

        payload
    }
}
