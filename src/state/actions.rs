use std::sync::Arc;

use crate::market::types::{BuyOrder, Portfolio, SearchResult, StockInstrument, TrendingStock};

/// The closed set of state transitions. Result payloads arrive behind
/// `Arc` so the reducer installs them without copying.
#[derive(Debug, Clone)]
pub enum Action {
    LoadPortfolio,
    LoadPortfolioSuccess(Arc<Portfolio>),
    LoadPortfolioFailure(String),

    LoadStocks,
    LoadStocksSuccess(Arc<Vec<StockInstrument>>),
    LoadStocksFailure(String),

    LoadTrending,
    LoadTrendingSuccess(Arc<Vec<TrendingStock>>),
    LoadTrendingFailure(String),

    Search(String),
    SearchSuccess(Arc<Vec<SearchResult>>),
    SearchFailure(String),
    ClearSearchResults,
    SetSearchQuery(String),

    LoadRecentSearches,
    LoadRecentSearchesSuccess(Arc<Vec<SearchResult>>),
    AddToRecentSearches(StockInstrument),

    PlaceOrder(Arc<BuyOrder>),
    PlaceOrderSuccess(Arc<BuyOrder>),
    PlaceOrderFailure(String),
    ClearBuyOrder,
}

impl Action {
    /// Stable label used for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::LoadPortfolio => "load_portfolio",
            Action::LoadPortfolioSuccess(_) => "load_portfolio_success",
            Action::LoadPortfolioFailure(_) => "load_portfolio_failure",
            Action::LoadStocks => "load_stocks",
            Action::LoadStocksSuccess(_) => "load_stocks_success",
            Action::LoadStocksFailure(_) => "load_stocks_failure",
            Action::LoadTrending => "load_trending",
            Action::LoadTrendingSuccess(_) => "load_trending_success",
            Action::LoadTrendingFailure(_) => "load_trending_failure",
            Action::Search(_) => "search",
            Action::SearchSuccess(_) => "search_success",
            Action::SearchFailure(_) => "search_failure",
            Action::ClearSearchResults => "clear_search_results",
            Action::SetSearchQuery(_) => "set_search_query",
            Action::LoadRecentSearches => "load_recent_searches",
            Action::LoadRecentSearchesSuccess(_) => "load_recent_searches_success",
            Action::AddToRecentSearches(_) => "add_to_recent_searches",
            Action::PlaceOrder(_) => "place_order",
            Action::PlaceOrderSuccess(_) => "place_order_success",
            Action::PlaceOrderFailure(_) => "place_order_failure",
            Action::ClearBuyOrder => "clear_buy_order",
        }
    }
}
