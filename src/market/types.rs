use serde::{Deserialize, Serialize};

/// Immutable snapshot of a tradable instrument.
/// Replaced wholesale on reload, never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInstrument {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_range: Option<DayRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayRange {
    pub low: f64,
    pub high: f64,
}

/// Trending entry as delivered by the backend, passed through unmodified.
/// Joined onto full instrument records by symbol at selector time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingStock {
    pub id: u64,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHolding {
    pub stock: StockInstrument,
    pub shares: f64,
    pub current_value: f64,
}

/// Total equity is maintained through the order-fulfillment path only,
/// never recomputed from holdings on read.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub total_equity: f64,
    pub holdings: Vec<PortfolioHolding>,
}

/// Where a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrigin {
    Search,
    Recent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub stock: StockInstrument,
    pub origin: SearchOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyOrder {
    pub stock: StockInstrument,
    pub shares: f64,
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    pub estimated_total: f64,
}

/// Fill details echoed by the order endpoint. Only success/failure is
/// consumed by the state engine; the rest is logged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: String,
    pub status: String,
    pub executed_price: f64,
    pub executed_shares: f64,
    pub executed_at: String,
}
