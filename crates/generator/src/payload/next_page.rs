//! 搜索结果翻页阶段的负载

use serde_json::json;
use tracing::debug;

use super::{CatalogPayloadGenerator, Payload, remember};
use crate::fsm::EventType;
use crate::session::SessionView;

impl CatalogPayloadGenerator {
    pub(super) fn next_page(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();
        payload.insert("query".into(), json!(session.search_keyword()));
        payload.insert("stay_sec".into(), json!(self.stay_sec(10, 40)));

        match event_type {
            EventType::PageViewed => {
                let page_index = session.increment_page_index();
                payload.insert("page_index".into(), json!(page_index));
                payload.insert("action".into(), json!("scroll_next_page"));
            }
            EventType::ProductClicked => {
                let keyword = session.search_keyword().to_string();
                let (product, match_kind) = self.catalog.resolve_keyword(&keyword, &self.rng);
                payload.insert("page_index".into(), json!(session.page_index()));
                payload.insert("search_type".into(), json!(match_kind.as_str()));

                match product {
                    Some(product) => {
                        remember(session, product);
                        payload.insert("product_id".into(), json!(product.product_id));
                        payload.insert("product_name".into(), json!(product.product_name));
                        payload.insert("category".into(), json!(product.category));
                        payload.insert("country".into(), json!(product.country));
                    }
                    None => debug!(keyword = %keyword, "搜索词未匹配到商品"),
                }
            }
            EventType::Back => {
                payload.insert("action".into(), json!("back_button_click"));
                payload.insert("stay_sec".into(), json!(self.stay_sec(2, 60)));
            }
            EventType::Exit => {
                payload.insert("exit_reason".into(), json!("user_left"));
                payload.insert("total_event_stay_sec".into(), json!(self.stay_sec(10, 50)));
            }
            _ => {}
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SharedRng;
    use crate::session::Session;

    #[test]
    fn test_page_view_advances_index() {
        let generator = CatalogPayloadGenerator::new(SharedRng::seeded(1));
        let mut s = Session::default();
        s.page_index = 1;
        let payload = generator.next_page(&mut s, EventType::PageViewed);
        assert_eq!(payload["page_index"], 2);
        let payload = generator.next_page(&mut s, EventType::PageViewed);
        assert_eq!(payload["page_index"], 3);
        assert_eq!(s.page_index, 3);
    }
}
