//! 搜索阶段的负载

use serde_json::json;
use tracing::debug;

use super::{CatalogPayloadGenerator, Payload, remember};
use crate::fsm::EventType;
use crate::session::SessionView;

impl CatalogPayloadGenerator {
    pub(super) fn search(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();
        payload.insert("query".into(), json!(session.search_keyword()));

        match event_type {
            EventType::SearchSubmitted => {
                payload.insert("page_index".into(), json!(session.page_index()));
                payload.insert("stay_sec".into(), json!(self.stay_sec(1, 10)));
            }
            EventType::PageViewed => {
                payload.insert("stay_sec".into(), json!(self.stay_sec(1, 40)));
            }
            EventType::ProductClicked => {
                let keyword = session.search_keyword().to_string();
                let (product, match_kind) = self.catalog.resolve_keyword(&keyword, &self.rng);
                payload.insert("search_type".into(), json!(match_kind.as_str()));

                match product {
                    Some(product) => {
                        remember(session, product);
                        payload.insert("product_id".into(), json!(product.product_id));
                        payload.insert("category".into(), json!(product.category));
                        payload.insert("country".into(), json!(product.country));
                    }
                    None => debug!(keyword = %keyword, "搜索词未匹配到商品"),
                }
            }
            EventType::Back => {
                payload.insert("exit_reason".into(), json!("back_to_home"));
                payload.insert("stay_sec".into(), json!(self.stay_sec(1, 5)));
            }
            EventType::Exit => {
                payload.insert("exit_reason".into(), json!("search_exit"));
                payload.insert("stay_sec".into(), json!(self.stay_sec(1, 5)));
            }
            _ => {}
        }

        payload
    }
}
