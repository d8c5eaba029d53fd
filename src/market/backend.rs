use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::types::{
    BuyOrder, DayRange, OrderReceipt, Portfolio, PortfolioHolding, SearchOrigin, SearchResult,
    StockInstrument, TrendingStock,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("backend returned status {0}")]
    Status(u16),
}

/// Seam to the brokerage backend. The state engine only ever sees this
/// trait; transport lives behind it.
#[async_trait]
pub trait StockBackend: Send + Sync {
    async fn fetch_portfolio(&self) -> Result<Portfolio, BackendError>;
    async fn fetch_stocks(&self) -> Result<Vec<StockInstrument>, BackendError>;
    async fn fetch_trending(&self) -> Result<Vec<TrendingStock>, BackendError>;
    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchResult>, BackendError>;
    async fn place_order(&self, order: &BuyOrder) -> Result<OrderReceipt, BackendError>;
}

// ── Wire shapes ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioWire {
    total_value: f64,
    positions: Vec<PositionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionWire {
    symbol: String,
    current_price: f64,
    #[serde(default)]
    change_percent: f64,
    quantity: f64,
    market_value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockRow {
    symbol: String,
    full_name: String,
    ask: f64,
    open: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    logo: Option<String>,
    low: f64,
    high: f64,
}

/// `"+X.XX%"` for non-negative values, `"X.XX%"` otherwise.
pub fn format_change_percent(pct: f64) -> String {
    if pct >= 0.0 {
        format!("+{pct:.2}%")
    } else {
        format!("{pct:.2}%")
    }
}

fn map_stock_row(row: StockRow) -> StockInstrument {
    let pct = if row.open == 0.0 {
        0.0
    } else {
        (row.close - row.open) / row.open * 100.0
    };
    StockInstrument {
        symbol: row.symbol,
        name: row.full_name,
        price: row.ask,
        change_percent: format_change_percent(pct),
        logo: row.logo,
        market_cap: row.market_cap.map(|cap| cap / 1_000_000.0),
        volume: row.volume,
        day_range: Some(DayRange {
            low: row.low,
            high: row.high,
        }),
    }
}

fn map_portfolio(wire: PortfolioWire) -> Portfolio {
    let holdings = wire
        .positions
        .into_iter()
        .map(|position| PortfolioHolding {
            stock: StockInstrument {
                symbol: position.symbol,
                // The portfolio endpoint carries no display name.
                name: String::new(),
                price: position.current_price,
                change_percent: format_change_percent(position.change_percent),
                logo: None,
                market_cap: None,
                volume: None,
                day_range: None,
            },
            shares: position.quantity,
            current_value: position.market_value,
        })
        .collect();
    Portfolio {
        total_equity: wire.total_value,
        holdings,
    }
}

fn matches_query(row: &StockRow, query: &str) -> bool {
    row.symbol.to_lowercase().contains(query) || row.full_name.to_lowercase().contains(query)
}

// ── HTTP gateway ─────────────────────────────────────────────────

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "backend GET");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| BackendError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl StockBackend for HttpBackend {
    async fn fetch_portfolio(&self) -> Result<Portfolio, BackendError> {
        let wire: PortfolioWire = self.get_json("/portfolio").await?;
        Ok(map_portfolio(wire))
    }

    async fn fetch_stocks(&self) -> Result<Vec<StockInstrument>, BackendError> {
        let rows: Vec<StockRow> = self.get_json("/stocks").await?;
        Ok(rows.into_iter().map(map_stock_row).collect())
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingStock>, BackendError> {
        self.get_json("/trending").await
    }

    // There is no dedicated search endpoint; the stock list is filtered
    // client-side by case-insensitive substring on symbol or full name.
    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchResult>, BackendError> {
        let needle = query.to_lowercase();
        let rows: Vec<StockRow> = self.get_json("/stocks").await?;
        Ok(rows
            .into_iter()
            .filter(|row| matches_query(row, &needle))
            .map(|row| SearchResult {
                stock: map_stock_row(row),
                origin: SearchOrigin::Search,
            })
            .collect())
    }

    async fn place_order(&self, order: &BuyOrder) -> Result<OrderReceipt, BackendError> {
        let url = format!("{}/orders", self.base_url);
        debug!(%url, symbol = %order.stock.symbol, shares = order.shares, "backend POST");
        let response = self.client.post(&url).json(order).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        response
            .json::<OrderReceipt>()
            .await
            .map_err(|err| BackendError::Malformed(err.to_string()))
    }
}
