//! 首页浏览阶段的负载

use serde_json::json;

use super::{CatalogPayloadGenerator, Payload, remember};
use crate::catalog::{categories, countries};
use crate::fsm::EventType;
use crate::session::SessionView;

const EVENT_PAGE_TYPES: [&str; 2] = ["special_event_category", "recommend_category"];
const SPECIAL_EVENT_PAGES: [&str; 4] = [
    "flight_promotion",
    "referral_promotion",
    "continent_promotion",
    "season_promotion",
];
const CATEGORY_PAGE_TYPES: [&str; 2] = ["country_category", "product_category"];

impl CatalogPayloadGenerator {
    pub(super) fn browsing(&self, session: &mut dyn SessionView, event_type: EventType) -> Payload {
        let mut payload = Payload::new();

        match event_type {
            EventType::PageViewed => {
                session.set_page_type("first_page");
                session.reset_browsing_context();
                payload.insert("page_type".into(), json!("first_page"));
                payload.insert("stay_sec".into(), json!(self.stay_sec(5, 180)));
            }
            EventType::EventPageClicked => {
                let page_type = self.pick_one(&EVENT_PAGE_TYPES);
                session.set_page_type(page_type);
                payload.insert("page_type".into(), json!(page_type));

                if page_type == "special_event_category" {
                    let event_page = self.pick_one(&SPECIAL_EVENT_PAGES);
                    session.set_event_page(event_page);
                    payload.insert("special_event_category".into(), json!(event_page));
                } else {
                    session.set_event_page("recommend_category");
                    payload.insert("recommend_category".into(), json!("recommend_list_to_friends"));
                }
                payload.insert("stay_sec".into(), json!(self.stay_sec(5, 180)));
            }
            EventType::ProductClicked => {
                // 首页直接点击时只会点到顶部曝光位
                if let Some(product) = self.catalog.random_home_exposure(&self.rng) {
                    remember(session, product);
                    payload.insert("product_id".into(), json!(product.product_id));
                    payload.insert("product_name".into(), json!(product.product_name));
                    payload.insert("category".into(), json!(product.category));
                    payload.insert("country".into(), json!(product.country));
                }
                payload.insert("stay_sec".into(), json!(self.stay_sec(5, 180)));
            }
            EventType::CategoryClicked => {
                let page_type = self.pick_one(&CATEGORY_PAGE_TYPES);
                session.set_page_type(page_type);
                payload.insert("page_type".into(), json!(page_type));

                if page_type == "country_category" {
                    let country = self.pick_one(&countries::ALL);
                    if let Some(product) = self.catalog.random_by_country(country, &self.rng) {
                        remember(session, product);
                        session.set_browsing_context(country, "");
                        payload.insert("selected_country".into(), json!(country));
                        payload.insert("product_id".into(), json!(product.product_id));
                        payload.insert("product_name".into(), json!(product.product_name));
                        payload.insert("category".into(), json!(product.category));
                        payload.insert("recommend_category".into(), json!("country_navigation_list"));
                    }
                } else {
                    let category = self.pick_one(&categories::ALL);
                    if let Some(product) = self.catalog.random_by_category(category, &self.rng) {
                        remember(session, product);
                        session.set_browsing_context("", category);
                        payload.insert("selected_category".into(), json!(category));
                        payload.insert("product_id".into(), json!(product.product_id));
                        payload.insert("product_name".into(), json!(product.product_name));
                        payload.insert("country".into(), json!(product.country));
                        payload.insert("recommend_category".into(), json!("category_navigation_list"));
                    }
                }
                payload.insert("stay_sec".into(), json!(self.stay_sec(5, 180)));
            }
            EventType::Exit | EventType::Back => {
                payload.insert("exit_reason".into(), json!("user_left"));
            }
            _ => {}
        }

        payload
    }
}
