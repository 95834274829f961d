//! 商品目录参考数据
//!
//! 模拟商城中的旅行票务商品。数据仅用于生成看起来真实的事件负载，
//! 不构成任何业务契约。

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use crate::rng::SharedRng;

pub mod countries {
    pub const HONG_KONG: &str = "Hong Kong";
    pub const TAIWAN: &str = "Taiwan";
    pub const MACAU: &str = "Macau";
    pub const SINGAPORE: &str = "Singapore";
    pub const MALAYSIA: &str = "Malaysia";
    pub const THAILAND: &str = "Thailand";
    pub const UAE: &str = "UAE";
    pub const USA: &str = "USA";

    pub const ALL: [&str; 8] = [
        HONG_KONG, TAIWAN, MACAU, SINGAPORE, MALAYSIA, THAILAND, UAE, USA,
    ];
}

pub mod categories {
    pub const ATTRACTION: &str = "attraction";
    pub const TRANSPORT: &str = "transport";
    pub const MUSEUM: &str = "museum";
    pub const FOOD: &str = "food";
    pub const TOUR: &str = "tour";
    pub const SHOW: &str = "show";
    pub const EXHIBITION: &str = "exhibition";
    pub const ETC: &str = "etc";

    pub const ALL: [&str; 8] = [
        ATTRACTION, TRANSPORT, MUSEUM, FOOD, TOUR, SHOW, EXHIBITION, ETC,
    ];
}

use categories::*;
use countries::*;

/// 目录中的一个商品
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub product_id: &'static str,
    pub product_name: &'static str,
    pub country: &'static str,
    pub category: &'static str,
    pub vendors: &'static [&'static str],
}

const fn product(
    product_id: &'static str,
    product_name: &'static str,
    country: &'static str,
    category: &'static str,
    vendors: &'static [&'static str],
) -> Product {
    Product {
        product_id,
        product_name,
        country,
        category,
        vendors,
    }
}

const PRODUCTS: &[Product] = &[
    product("P001", "Hong Kong Disneyland", HONG_KONG, ATTRACTION, &["VendorA", "VendorB", "VendorC"]),
    product("P002", "Cotai Water Jet", HONG_KONG, TRANSPORT, &["VendorA", "VendorC"]),
    product("P003", "Hong Kong TurboJET", HONG_KONG, TRANSPORT, &["VendorA", "VendorC"]),
    product("P004", "Peak Tram", HONG_KONG, TRANSPORT, &["VendorA", "VendorB"]),
    product("P005", "Ngong Ping Cable Car", HONG_KONG, ATTRACTION, &["VendorA", "VendorB", "VendorC"]),
    product("P006", "Taiwan National Palace Museum", TAIWAN, MUSEUM, &["VendorA", "VendorC"]),
    product("P007", "Din Tai Fung", TAIWAN, FOOD, &["VendorB", "VendorC"]),
    product("P008", "Taipei 101", TAIWAN, ATTRACTION, &["VendorA", "VendorB"]),
    product("P009", "Easy SIM Card", TAIWAN, ETC, &["VendorC"]),
    product("P010", "Macau Open Top Bus", MACAU, TRANSPORT, &["VendorA", "VendorB"]),
    product("P011", "Macau Harry Potter Exhibition", MACAU, EXHIBITION, &["VendorA"]),
    product("P012", "Macau TurboJET", MACAU, TRANSPORT, &["VendorA", "VendorC"]),
    product("P013", "Macau Tower 360", MACAU, ATTRACTION, &["VendorB", "VendorC"]),
    product("P014", "Macau Observation Deck", MACAU, ATTRACTION, &["VendorA", "VendorB"]),
    product("P015", "Gardens by the Bay", SINGAPORE, ATTRACTION, &["VendorA", "VendorB", "VendorC"]),
    product("P016", "Universal Studios Singapore", SINGAPORE, ATTRACTION, &["VendorA", "VendorC"]),
    product("P017", "Wings of Time", SINGAPORE, SHOW, &["VendorA"]),
    product("P018", "Singapore Flyer", SINGAPORE, ATTRACTION, &["VendorB"]),
    product("P019", "River Cruise", SINGAPORE, TOUR, &["VendorA", "VendorC"]),
    product("P020", "Night Safari", SINGAPORE, ATTRACTION, &["VendorA", "VendorB"]),
    product("P021", "Legoland", MALAYSIA, ATTRACTION, &["VendorA", "VendorC"]),
    product("P022", "SuperPark Malaysia", MALAYSIA, ATTRACTION, &["VendorB"]),
    product("P023", "5G SIM Card", MALAYSIA, ETC, &["VendorC"]),
    product("P024", "Sunway Lagoon", MALAYSIA, ATTRACTION, &["VendorA", "VendorB"]),
    product("P025", "Sanctuary of Truth", THAILAND, ATTRACTION, &["VendorA"]),
    product("P026", "Mahanakhon SkyWalk", THAILAND, ATTRACTION, &["VendorA", "VendorB"]),
    product("P027", "Phuket Aquarium", THAILAND, ATTRACTION, &["VendorC"]),
    product("P028", "Qasr Al Watan", UAE, ATTRACTION, &["VendorA", "VendorB"]),
    product("P029", "Ferrari World Abu Dhabi", UAE, ATTRACTION, &["VendorA", "VendorC"]),
    product("P030", "Louvre Abu Dhabi", UAE, MUSEUM, &["VendorB", "VendorC"]),
    product("P031", "Burj Khalifa", UAE, MUSEUM, &["VendorA", "VendorB", "VendorC"]),
    product("P032", "The View at The Palm", UAE, ATTRACTION, &["VendorA", "VendorC"]),
    product("P033", "Global Village Dubai", UAE, ATTRACTION, &["VendorB"]),
    product("P034", "American Museum of Natural History", USA, MUSEUM, &["VendorA"]),
    product("P035", "Disneyland California", USA, ATTRACTION, &["VendorA", "VendorC"]),
    product("P036", "LA Big Bus Tour", USA, TOUR, &["VendorB"]),
    product("P037", "MoMA Museum of Modern Art", USA, MUSEUM, &["VendorC"]),
    product("P038", "Top of the Rock", USA, ATTRACTION, &["VendorA", "VendorB"]),
];

/// 首页顶部曝光的商品
const HOME_EXPOSURE: [&str; 5] = [
    "Hong Kong Disneyland",
    "Universal Studios Singapore",
    "SuperPark Malaysia",
    "Ferrari World Abu Dhabi",
    "Disneyland California",
];

/// 用户可能输入的搜索词
///
/// 既有国家名和完整商品名，也有只能部分匹配或完全匹配不到的词，
/// 让下游能看到各种搜索命中类型。
const KEYWORDS: &[&str] = &[
    // 国家
    HONG_KONG, TAIWAN, MACAU, SINGAPORE, MALAYSIA, THAILAND, UAE, USA,
    // 组合商品
    "combo",
    // 商品名（部分为简写）
    "Hong Kong Disneyland", "Cotai Water Jet", "Hong Kong TurboJET", "Peak Tram",
    "Ngong Ping Cable Car", "Palace Museum", "Din Tai Fung", "Taipei 101", "Easy SIM Card",
    "Macau Open Top Bus", "Harry Potter", "Macau TurboJET", "Tower 360",
    "Macau Observation Deck", "Gardens by the Bay", "Universal Studios Singapore",
    "Wings of Time", "Singapore Flyer", "River Cruise", "Night Safari", "Legoland",
    "SuperPark Malaysia", "Sunway Lagoon", "5G SIM Card", "Sanctuary of Truth",
    "Mahanakhon SkyWalk", "Phuket Aquarium", "Qasr Al Watan", "Ferrari World Abu Dhabi",
    "Louvre Abu Dhabi", "Burj Khalifa", "The View at The Palm", "Global Village Dubai",
    "Natural History", "Disneyland California", "LA Big Bus", "MoMA", "Top of the Rock",
];

/// 搜索词命中商品的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ProductMatch,
    CountryMatch,
    CategoryMatch,
    PartialMatch,
    NoMatch,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductMatch => "product_match",
            Self::CountryMatch => "country_match",
            Self::CategoryMatch => "category_match",
            Self::PartialMatch => "partial_match",
            Self::NoMatch => "no_match",
        }
    }
}

/// 带索引的商品目录
pub struct Catalog {
    products: &'static [Product],
    by_name: HashMap<&'static str, usize>,
    by_country: HashMap<&'static str, Vec<usize>>,
    by_category: HashMap<&'static str, Vec<usize>>,
}

static GLOBAL: LazyLock<Catalog> = LazyLock::new(|| Catalog::new(PRODUCTS));

impl Catalog {
    fn new(products: &'static [Product]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_country: HashMap<&'static str, Vec<usize>> = HashMap::new();
        let mut by_category: HashMap<&'static str, Vec<usize>> = HashMap::new();

        for (idx, p) in products.iter().enumerate() {
            by_name.insert(p.product_name, idx);
            by_country.entry(p.country).or_default().push(idx);
            by_category.entry(p.category).or_default().push(idx);
        }

        Self {
            products,
            by_name,
            by_country,
            by_category,
        }
    }

    /// 进程内共享的只读目录
    pub fn global() -> &'static Catalog {
        &GLOBAL
    }

    pub fn products(&self) -> &'static [Product] {
        self.products
    }

    pub fn by_name(&self, name: &str) -> Option<&'static Product> {
        self.by_name.get(name).map(|&idx| &self.products[idx])
    }

    pub fn random_by_country(&self, country: &str, rng: &SharedRng) -> Option<&'static Product> {
        let indexes = self.by_country.get(country)?;
        rng.choose(indexes).map(|&idx| &self.products[idx])
    }

    pub fn random_by_category(&self, category: &str, rng: &SharedRng) -> Option<&'static Product> {
        let indexes = self.by_category.get(category)?;
        rng.choose(indexes).map(|&idx| &self.products[idx])
    }

    /// 从首页曝光位中随机取一个商品
    pub fn random_home_exposure(&self, rng: &SharedRng) -> Option<&'static Product> {
        rng.choose(&HOME_EXPOSURE)
            .and_then(|name| self.by_name(name))
    }

    /// 随机生成一个搜索词
    pub fn random_keyword(&self, rng: &SharedRng) -> &'static str {
        rng.choose(KEYWORDS).copied().unwrap_or(HONG_KONG)
    }

    /// 根据搜索词找商品
    ///
    /// 优先级：商品名完全匹配 > 国家名 > 类别名 > 商品名包含搜索词。
    pub fn resolve_keyword(
        &self,
        query: &str,
        rng: &SharedRng,
    ) -> (Option<&'static Product>, MatchKind) {
        if let Some(p) = self.by_name(query) {
            return (Some(p), MatchKind::ProductMatch);
        }
        if let Some(p) = self.random_by_country(query, rng) {
            return (Some(p), MatchKind::CountryMatch);
        }
        if let Some(p) = self.random_by_category(query, rng) {
            return (Some(p), MatchKind::CategoryMatch);
        }
        if !query.is_empty()
            && let Some(p) = self.products.iter().find(|p| p.product_name.contains(query))
        {
            return (Some(p), MatchKind::PartialMatch);
        }
        (None, MatchKind::NoMatch)
    }
}
