use std::sync::{Arc, Mutex};

use crate::market::types::{Portfolio, SearchResult, StockInstrument};

use super::stock::AppState;

pub const TOP_VOLUME_COUNT: usize = 3;

/// Everything the dashboard consumer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub portfolio: Option<Arc<Portfolio>>,
    pub trending: Arc<Vec<StockInstrument>>,
    pub is_loading: bool,
}

/// Everything the search consumer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub results: Arc<Vec<SearchResult>>,
    pub recents: Arc<Vec<SearchResult>>,
    pub is_loading: bool,
    pub query: String,
}

/// Derived read views over the state tree, memoized on the pointer
/// identity of their inputs: a selector recomputes only when an input
/// `Arc` was replaced by a dispatch. Selectors read from an immutable
/// snapshot and never touch I/O.
#[derive(Default)]
pub struct Selectors {
    top_by_volume: Mutex<Option<TopVolumeMemo>>,
    trending_details: Mutex<Option<TrendingMemo>>,
    dashboard: Mutex<Option<DashboardMemo>>,
    search_view: Mutex<Option<SearchMemo>>,
}

struct TopVolumeMemo {
    stocks_key: usize,
    value: Arc<Vec<StockInstrument>>,
}

struct TrendingMemo {
    trending_key: usize,
    stocks_key: usize,
    value: Arc<Vec<StockInstrument>>,
}

struct DashboardMemo {
    portfolio_key: usize,
    trending_key: usize,
    portfolio_loading: bool,
    trending_loading: bool,
    value: Arc<DashboardView>,
}

struct SearchMemo {
    results_key: usize,
    recents_key: usize,
    is_loading: bool,
    query: String,
    value: Arc<SearchView>,
}

fn ptr_key<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as usize
}

impl Selectors {
    /// Instruments with a known volume, descending, first three. The
    /// sort is stable so equal volumes keep their incoming order.
    pub fn top_by_volume(&self, state: &AppState) -> Arc<Vec<StockInstrument>> {
        let stocks_key = ptr_key(&state.stocks.stocks);
        let mut memo = self.top_by_volume.lock().expect("selector lock poisoned");
        if let Some(cached) = memo.as_ref() {
            if cached.stocks_key == stocks_key {
                return Arc::clone(&cached.value);
            }
        }

        let mut ranked: Vec<StockInstrument> = state
            .stocks
            .stocks
            .iter()
            .filter(|stock| stock.volume.is_some())
            .cloned()
            .collect();
        ranked.sort_by(|a, b| {
            b.volume
                .unwrap_or(0.0)
                .total_cmp(&a.volume.unwrap_or(0.0))
        });
        ranked.truncate(TOP_VOLUME_COUNT);

        let value = Arc::new(ranked);
        *memo = Some(TopVolumeMemo {
            stocks_key,
            value: Arc::clone(&value),
        });
        value
    }

    /// Trending ids joined onto full instrument records by symbol.
    /// Unmatched entries are dropped; trending order is preserved.
    pub fn trending_with_details(&self, state: &AppState) -> Arc<Vec<StockInstrument>> {
        let trending_key = ptr_key(&state.stocks.trending);
        let stocks_key = ptr_key(&state.stocks.stocks);
        let mut memo = self
            .trending_details
            .lock()
            .expect("selector lock poisoned");
        if let Some(cached) = memo.as_ref() {
            if cached.trending_key == trending_key && cached.stocks_key == stocks_key {
                return Arc::clone(&cached.value);
            }
        }

        let value = Arc::new(
            state
                .stocks
                .trending
                .iter()
                .filter_map(|trending| {
                    state
                        .stocks
                        .stocks
                        .iter()
                        .find(|stock| stock.symbol == trending.symbol)
                        .cloned()
                })
                .collect::<Vec<_>>(),
        );
        *memo = Some(TrendingMemo {
            trending_key,
            stocks_key,
            value: Arc::clone(&value),
        });
        value
    }

    pub fn dashboard(&self, state: &AppState) -> Arc<DashboardView> {
        let trending = self.trending_with_details(state);
        let portfolio_key = state.stocks.portfolio.as_ref().map_or(0, ptr_key);
        let trending_key = ptr_key(&trending);
        let portfolio_loading = state.stocks.portfolio_loading.is_loading;
        let trending_loading = state.stocks.trending_loading.is_loading;

        let mut memo = self.dashboard.lock().expect("selector lock poisoned");
        if let Some(cached) = memo.as_ref() {
            if cached.portfolio_key == portfolio_key
                && cached.trending_key == trending_key
                && cached.portfolio_loading == portfolio_loading
                && cached.trending_loading == trending_loading
            {
                return Arc::clone(&cached.value);
            }
        }

        let value = Arc::new(DashboardView {
            portfolio: state.stocks.portfolio.clone(),
            trending,
            is_loading: portfolio_loading || trending_loading,
        });
        *memo = Some(DashboardMemo {
            portfolio_key,
            trending_key,
            portfolio_loading,
            trending_loading,
            value: Arc::clone(&value),
        });
        value
    }

    pub fn search_view(&self, state: &AppState) -> Arc<SearchView> {
        let results_key = ptr_key(&state.stocks.search_results);
        let recents_key = ptr_key(&state.stocks.recent_searches);
        let is_loading = state.stocks.search_loading.is_loading;
        let query = &state.stocks.search_query;

        let mut memo = self.search_view.lock().expect("selector lock poisoned");
        if let Some(cached) = memo.as_ref() {
            if cached.results_key == results_key
                && cached.recents_key == recents_key
                && cached.is_loading == is_loading
                && cached.query == *query
            {
                return Arc::clone(&cached.value);
            }
        }

        let value = Arc::new(SearchView {
            results: Arc::clone(&state.stocks.search_results),
            recents: Arc::clone(&state.stocks.recent_searches),
            is_loading,
            query: query.clone(),
        });
        *memo = Some(SearchMemo {
            results_key,
            recents_key,
            is_loading,
            query: query.clone(),
            value: Arc::clone(&value),
        });
        value
    }
}
