//! 会话数据与能力接口

use serde::Serialize;

use crate::fsm::State;

/// 最近一次选中的商品
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PickedProduct {
    pub product_id: String,
    pub category: String,
    pub country: String,
}

/// 行为引擎和负载生成器看到的会话能力集合
///
/// 引擎只依赖这组读写方法，单元测试可以换成测试替身。
pub trait SessionView: Send {
    fn id(&self) -> &str;
    fn user_id(&self) -> &str;

    fn state(&self) -> State;
    fn set_state(&mut self, state: State);
    fn prev_state(&self) -> State;
    fn set_prev_state(&mut self, state: State);

    fn last_event_ts(&self) -> i64;
    fn set_last_event_ts(&mut self, ts: i64);
    fn expires_at(&self) -> i64;
    fn set_expires_at(&mut self, ts: i64);

    fn page_type(&self) -> &str;
    fn set_page_type(&mut self, page_type: &str);
    fn event_page(&self) -> &str;
    fn set_event_page(&mut self, event_page: &str);

    fn browsing_country(&self) -> &str;
    fn browsing_category(&self) -> &str;
    fn set_browsing_context(&mut self, country: &str, category: &str);
    fn reset_browsing_context(&mut self);

    fn search_keyword(&self) -> &str;
    fn set_search_keyword(&mut self, keyword: &str);
    fn page_index(&self) -> u32;
    fn set_page_index(&mut self, index: u32);
    fn increment_page_index(&mut self) -> u32 {
        let next = self.page_index().saturating_add(1);
        self.set_page_index(next);
        next
    }

    fn last_picked(&self) -> &PickedProduct;
    fn set_last_picked(&mut self, picked: PickedProduct);
    fn last_quantity(&self) -> u32;
    fn set_last_quantity(&mut self, quantity: u32);
}

/// 一个模拟用户正在进行的访问
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub state: State,
    pub prev_state: State,
    pub page_type: String,
    pub event_page: String,
    pub browsing_country: String,
    pub browsing_category: String,
    pub search_keyword: String,
    pub page_index: u32,
    pub last_event_ts: i64,
    pub expires_at: i64,
    pub last_picked: PickedProduct,
    pub last_quantity: u32,
}

impl Session {
    /// 以起始状态创建会话
    pub fn new(id: String, user_id: String, now: i64, ttl_ms: i64) -> Self {
        Self {
            id,
            user_id,
            state: State::START,
            last_event_ts: now,
            expires_at: now.saturating_add(ttl_ms),
            ..Default::default()
        }
    }

    /// 滑动续期
    pub fn touch(&mut self, now: i64, ttl_ms: i64) {
        self.last_event_ts = now;
        self.expires_at = now.saturating_add(ttl_ms);
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

impl SessionView for Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }

    fn prev_state(&self) -> State {
        self.prev_state
    }

    fn set_prev_state(&mut self, state: State) {
        self.prev_state = state;
    }

    fn last_event_ts(&self) -> i64 {
        self.last_event_ts
    }

    fn set_last_event_ts(&mut self, ts: i64) {
        self.last_event_ts = ts;
    }

    fn expires_at(&self) -> i64 {
        self.expires_at
    }

    fn set_expires_at(&mut self, ts: i64) {
        self.expires_at = ts;
    }

    fn page_type(&self) -> &str {
        &self.page_type
    }

    fn set_page_type(&mut self, page_type: &str) {
        page_type.clone_into(&mut self.page_type);
    }

    fn event_page(&self) -> &str {
        &self.event_page
    }

    fn set_event_page(&mut self, event_page: &str) {
        event_page.clone_into(&mut self.event_page);
    }

    fn browsing_country(&self) -> &str {
        &self.browsing_country
    }

    fn browsing_category(&self) -> &str {
        &self.browsing_category
    }

    fn set_browsing_context(&mut self, country: &str, category: &str) {
        country.clone_into(&mut self.browsing_country);
        category.clone_into(&mut self.browsing_category);
    }

    fn reset_browsing_context(&mut self) {
        self.browsing_country.clear();
        self.browsing_category.clear();
    }

    fn search_keyword(&self) -> &str {
        &self.search_keyword
    }

    fn set_search_keyword(&mut self, keyword: &str) {
        keyword.clone_into(&mut self.search_keyword);
    }

    fn page_index(&self) -> u32 {
        self.page_index
    }

    fn set_page_index(&mut self, index: u32) {
        self.page_index = index;
    }

    fn last_picked(&self) -> &PickedProduct {
        &self.last_picked
    }

    fn set_last_picked(&mut self, picked: PickedProduct) {
        self.last_picked = picked;
    }

    fn last_quantity(&self) -> u32 {
        self.last_quantity
    }

    fn set_last_quantity(&mut self, quantity: u32) {
        self.last_quantity = quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_browsing() {
        let s = Session::new("sess_1".into(), "user_1".into(), 1_000, 500);
        assert_eq!(s.state, State::Browsing);
        assert_eq!(s.prev_state, State::None);
        assert_eq!(s.expires_at, 1_500);
        assert!(s.expires_at > s.last_event_ts);
        assert!(!s.is_expired(1_499));
        assert!(s.is_expired(1_500));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let mut s = Session::new("sess_1".into(), "user_1".into(), 1_700_000_000_000, i64::MAX);
        assert_eq!(s.expires_at, i64::MAX);
        s.touch(1_700_000_000_500, i64::MAX);
        assert_eq!(s.expires_at, i64::MAX);
        assert!(!s.is_expired(1_700_000_001_000));
    }

    #[test]
    fn test_touch_slides_expiry() {
        let mut s = Session::new("sess_1".into(), "user_1".into(), 1_000, 500);
        s.touch(1_400, 500);
        assert_eq!(s.last_event_ts, 1_400);
        assert_eq!(s.expires_at, 1_900);
    }

    #[test]
    fn test_page_index_and_browsing_context() {
        let mut s = Session::default();
        assert_eq!(s.increment_page_index(), 1);
        assert_eq!(s.increment_page_index(), 2);

        s.set_browsing_context("Macau", "transport");
        assert_eq!(s.browsing_country(), "Macau");
        s.reset_browsing_context();
        assert!(s.browsing_category().is_empty());
    }
}
