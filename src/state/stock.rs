use std::sync::Arc;

use crate::market::types::{BuyOrder, Portfolio, SearchResult, StockInstrument, TrendingStock};

/// Bound on the recent-search list, enforced by the reducer and mirrored
/// by the persistent cache on load.
pub const RECENT_SEARCH_LIMIT: usize = 5;

/// Transient status of one async resource. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl LoadingState {
    pub const fn idle() -> Self {
        Self {
            is_loading: false,
            error: None,
        }
    }

    pub const fn loading() -> Self {
        Self {
            is_loading: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            error: Some(error.into()),
        }
    }
}

/// The stocks feature slice. List-shaped fields and the portfolio sit
/// behind `Arc` so each reduced state structurally shares the sub-trees
/// an action did not touch.
#[derive(Debug, Clone, PartialEq)]
pub struct StockState {
    pub portfolio: Option<Arc<Portfolio>>,
    pub portfolio_loading: LoadingState,

    pub stocks: Arc<Vec<StockInstrument>>,
    pub stocks_loading: LoadingState,

    pub trending: Arc<Vec<TrendingStock>>,
    pub trending_loading: LoadingState,

    pub search_results: Arc<Vec<SearchResult>>,
    pub recent_searches: Arc<Vec<SearchResult>>,
    pub search_loading: LoadingState,
    pub search_query: String,

    pub pending_order: Option<Arc<BuyOrder>>,
    pub order_loading: LoadingState,
    pub order_success: bool,
}

impl StockState {
    pub fn initial() -> Self {
        Self {
            portfolio: None,
            portfolio_loading: LoadingState::idle(),
            stocks: Arc::new(Vec::new()),
            stocks_loading: LoadingState::idle(),
            trending: Arc::new(Vec::new()),
            trending_loading: LoadingState::idle(),
            search_results: Arc::new(Vec::new()),
            recent_searches: Arc::new(Vec::new()),
            search_loading: LoadingState::idle(),
            search_query: String::new(),
            pending_order: None,
            order_loading: LoadingState::idle(),
            order_success: false,
        }
    }
}

impl Default for StockState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Root state container. Further feature slices can be added alongside
/// `stocks` without touching it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub stocks: StockState,
}

impl AppState {
    pub fn initial() -> Self {
        Self {
            stocks: StockState::initial(),
        }
    }
}
