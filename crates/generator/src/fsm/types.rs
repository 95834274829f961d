//! 行为模型的状态与事件类型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 会话所处的位置（状态）
///
/// `None` 是哨兵值：新会话尚未进入模型，或没有可回退的上一个状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    #[serde(rename = "")]
    None,
    Browsing,
    EventBrowsing,
    Search,
    NextPage,
    Click,
    AddToCart,
    Purchase,
    Exit,
}

impl State {
    /// 模型中除哨兵外的全部状态
    pub const ALL: [State; 8] = [
        State::Browsing,
        State::EventBrowsing,
        State::Search,
        State::NextPage,
        State::Click,
        State::AddToCart,
        State::Purchase,
        State::Exit,
    ];

    /// 会话的起始状态
    pub const START: State = State::Browsing;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Browsing => "browsing",
            Self::EventBrowsing => "eventbrowsing",
            Self::Search => "search",
            Self::NextPage => "nextpage",
            Self::Click => "click",
            Self::AddToCart => "addtocart",
            Self::Purchase => "purchase",
            Self::Exit => "exit",
        }
    }

    /// 终止状态，到达后会话从注册表中移除
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户行为（事件类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SearchSubmitted,
    PageViewed,
    EventPageClicked,
    ProductClicked,
    CategoryClicked,
    AddToCart,
    Purchased,
    Back,
    Exit,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::SearchSubmitted,
        EventType::PageViewed,
        EventType::EventPageClicked,
        EventType::ProductClicked,
        EventType::CategoryClicked,
        EventType::AddToCart,
        EventType::Purchased,
        EventType::Back,
        EventType::Exit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchSubmitted => "search_submitted",
            Self::PageViewed => "page_viewed",
            Self::EventPageClicked => "event_page_clicked",
            Self::ProductClicked => "product_clicked",
            Self::CategoryClicked => "category_clicked",
            Self::AddToCart => "add_to_cart",
            Self::Purchased => "purchased",
            Self::Back => "back",
            Self::Exit => "exit",
        }
    }

    /// 被计为"会话开始"的事件类型
    pub fn signals_session_start(&self) -> bool {
        matches!(self, Self::SearchSubmitted)
    }

    /// 结束会话的事件类型
    pub fn signals_session_end(&self) -> bool {
        matches!(self, Self::Exit)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
