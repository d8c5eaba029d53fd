use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use super::backend::{BackendError, StockBackend};
use super::types::{
    BuyOrder, DayRange, OrderReceipt, Portfolio, PortfolioHolding, SearchOrigin, SearchResult,
    StockInstrument, TrendingStock,
};

/// Offline backend with a fixed instrument catalog. Every order fills
/// immediately at the quoted price.
pub struct PaperBackend {
    catalog: Vec<StockInstrument>,
    next_order_id: AtomicU64,
}

fn instrument(
    symbol: &str,
    name: &str,
    price: f64,
    change_percent: &str,
    volume: f64,
    market_cap: f64,
) -> StockInstrument {
    StockInstrument {
        symbol: symbol.to_string(),
        name: name.to_string(),
        price,
        change_percent: change_percent.to_string(),
        logo: None,
        market_cap: Some(market_cap),
        volume: Some(volume),
        day_range: Some(DayRange {
            low: price * 0.97,
            high: price * 1.02,
        }),
    }
}

impl PaperBackend {
    pub fn new() -> Self {
        Self {
            catalog: vec![
                instrument("AAPL", "Apple Inc.", 189.30, "+1.24%", 58_400_000.0, 2_950_000.0),
                instrument("MSFT", "Microsoft Corporation", 412.10, "+0.67%", 21_700_000.0, 3_060_000.0),
                instrument("TSLA", "Tesla, Inc.", 246.75, "-2.11%", 96_100_000.0, 784_000.0),
                instrument("AMZN", "Amazon.com, Inc.", 178.05, "+0.32%", 41_300_000.0, 1_850_000.0),
                instrument("NVDA", "NVIDIA Corporation", 118.92, "+3.48%", 244_000_000.0, 2_930_000.0),
                instrument("KO", "The Coca-Cola Company", 62.40, "-0.18%", 12_900_000.0, 269_000.0),
            ],
            next_order_id: AtomicU64::new(1),
        }
    }
}

impl Default for PaperBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StockBackend for PaperBackend {
    async fn fetch_portfolio(&self) -> Result<Portfolio, BackendError> {
        let holdings = vec![
            PortfolioHolding {
                stock: self.catalog[0].clone(),
                shares: 10.0,
                current_value: 10.0 * self.catalog[0].price,
            },
            PortfolioHolding {
                stock: self.catalog[2].clone(),
                shares: 4.5,
                current_value: 4.5 * self.catalog[2].price,
            },
        ];
        Ok(Portfolio {
            total_equity: holdings.iter().map(|h| h.current_value).sum(),
            holdings,
        })
    }

    async fn fetch_stocks(&self) -> Result<Vec<StockInstrument>, BackendError> {
        Ok(self.catalog.clone())
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingStock>, BackendError> {
        Ok(self
            .catalog
            .iter()
            .take(3)
            .enumerate()
            .map(|(idx, stock)| TrendingStock {
                id: idx as u64 + 1,
                symbol: stock.symbol.clone(),
            })
            .collect())
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchResult>, BackendError> {
        let needle = query.to_lowercase();
        Ok(self
            .catalog
            .iter()
            .filter(|stock| {
                stock.symbol.to_lowercase().contains(&needle)
                    || stock.name.to_lowercase().contains(&needle)
            })
            .map(|stock| SearchResult {
                stock: stock.clone(),
                origin: SearchOrigin::Search,
            })
            .collect())
    }

    async fn place_order(&self, order: &BuyOrder) -> Result<OrderReceipt, BackendError> {
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);

        info!(
            order_id,
            symbol = %order.stock.symbol,
            shares = order.shares,
            price = order.stock.price,
            "PAPER FILL"
        );

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(OrderReceipt {
            order_id: format!("ORD-{order_id}"),
            status: "filled".to_string(),
            executed_price: order.stock.price,
            executed_shares: order.shares,
            executed_at: now.to_string(),
        })
    }
}
