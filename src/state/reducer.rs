use std::sync::Arc;

use crate::market::types::{BuyOrder, Portfolio, PortfolioHolding, SearchOrigin, SearchResult};

use super::actions::Action;
use super::stock::{AppState, LoadingState, RECENT_SEARCH_LIMIT, StockState};

/// Pure transition function. Never performs I/O; actions it does not
/// handle leave the state unchanged.
pub fn reduce(state: &AppState, action: &Action) -> AppState {
    AppState {
        stocks: reduce_stocks(&state.stocks, action),
    }
}

fn reduce_stocks(state: &StockState, action: &Action) -> StockState {
    let mut next = state.clone();
    match action {
        Action::LoadPortfolio => next.portfolio_loading = LoadingState::loading(),
        Action::LoadPortfolioSuccess(portfolio) => {
            next.portfolio = Some(Arc::clone(portfolio));
            next.portfolio_loading = LoadingState::idle();
        }
        Action::LoadPortfolioFailure(error) => {
            next.portfolio_loading = LoadingState::failed(error.clone());
        }

        Action::LoadStocks => next.stocks_loading = LoadingState::loading(),
        Action::LoadStocksSuccess(stocks) => {
            next.stocks = Arc::clone(stocks);
            next.stocks_loading = LoadingState::idle();
        }
        Action::LoadStocksFailure(error) => {
            next.stocks_loading = LoadingState::failed(error.clone());
        }

        Action::LoadTrending => next.trending_loading = LoadingState::loading(),
        Action::LoadTrendingSuccess(trending) => {
            next.trending = Arc::clone(trending);
            next.trending_loading = LoadingState::idle();
        }
        Action::LoadTrendingFailure(error) => {
            next.trending_loading = LoadingState::failed(error.clone());
        }

        Action::Search(query) => {
            next.search_query = query.clone();
            next.search_loading = LoadingState::loading();
        }
        Action::SearchSuccess(results) => {
            next.search_results = Arc::clone(results);
            next.search_loading = LoadingState::idle();
        }
        Action::SearchFailure(error) => {
            next.search_loading = LoadingState::failed(error.clone());
        }
        // Independent of the loading state on purpose.
        Action::ClearSearchResults => {
            next.search_results = Arc::new(Vec::new());
            next.search_query.clear();
        }
        Action::SetSearchQuery(query) => next.search_query = query.clone(),

        Action::LoadRecentSearches => {}
        Action::LoadRecentSearchesSuccess(searches) => {
            next.recent_searches = Arc::clone(searches);
        }
        Action::AddToRecentSearches(stock) => {
            let mut recents: Vec<SearchResult> = state
                .recent_searches
                .iter()
                .filter(|entry| entry.stock.symbol != stock.symbol)
                .cloned()
                .collect();
            recents.insert(
                0,
                SearchResult {
                    stock: stock.clone(),
                    origin: SearchOrigin::Recent,
                },
            );
            recents.truncate(RECENT_SEARCH_LIMIT);
            next.recent_searches = Arc::new(recents);
        }

        Action::PlaceOrder(order) => {
            next.pending_order = Some(Arc::clone(order));
            next.order_loading = LoadingState::loading();
        }
        Action::PlaceOrderSuccess(order) => apply_fill(&mut next, order),
        Action::PlaceOrderFailure(error) => {
            next.order_loading = LoadingState::failed(error.clone());
            next.order_success = false;
        }
        Action::ClearBuyOrder => {
            next.pending_order = None;
            next.order_success = false;
            next.order_loading = LoadingState::idle();
        }
    }
    next
}

/// Folds a fulfilled order into the portfolio. Total equity moves by the
/// order's estimated total, not by a recomputation over holdings.
fn apply_fill(next: &mut StockState, order: &BuyOrder) {
    next.order_loading = LoadingState::idle();
    next.order_success = true;

    let Some(portfolio) = next.portfolio.as_deref() else {
        return;
    };

    let mut holdings = portfolio.holdings.clone();
    match holdings
        .iter_mut()
        .find(|holding| holding.stock.symbol == order.stock.symbol)
    {
        Some(holding) => {
            holding.shares += order.shares;
            holding.current_value = holding.shares * order.stock.price;
        }
        None => holdings.push(PortfolioHolding {
            stock: order.stock.clone(),
            shares: order.shares,
            current_value: order.shares * order.stock.price,
        }),
    }

    next.portfolio = Some(Arc::new(Portfolio {
        total_equity: portfolio.total_equity + order.estimated_total,
        holdings,
    }));
    next.pending_order = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{OrderKind, StockInstrument, TrendingStock};

    fn stock(symbol: &str, price: f64) -> StockInstrument {
        StockInstrument {
            symbol: symbol.to_string(),
            name: format!("{symbol} Inc."),
            price,
            change_percent: "+0.00%".to_string(),
            logo: None,
            market_cap: None,
            volume: None,
            day_range: None,
        }
    }

    fn order(symbol: &str, shares: f64, price: f64, estimated_total: f64) -> Arc<BuyOrder> {
        Arc::new(BuyOrder {
            stock: stock(symbol, price),
            shares,
            kind: OrderKind::Market,
            limit_price: None,
            estimated_total,
        })
    }

    fn with_portfolio(total_equity: f64, holdings: Vec<PortfolioHolding>) -> AppState {
        let mut state = AppState::initial();
        state.stocks.portfolio = Some(Arc::new(Portfolio {
            total_equity,
            holdings,
        }));
        state
    }

    fn holding(symbol: &str, shares: f64, current_value: f64) -> PortfolioHolding {
        PortfolioHolding {
            stock: stock(symbol, current_value / shares),
            shares,
            current_value,
        }
    }

    #[test]
    fn reduce_is_pure() {
        let state = AppState::initial();
        let action = Action::Search("AAPL".to_string());
        let first = reduce(&state, &action);
        let second = reduce(&state, &action);
        assert_eq!(first, second);
        assert_eq!(state, AppState::initial());
    }

    #[test]
    fn load_trigger_sets_loading_and_clears_error() {
        let mut state = AppState::initial();
        state.stocks.portfolio_loading = LoadingState::failed("boom");
        let next = reduce(&state, &Action::LoadPortfolio);
        assert_eq!(next.stocks.portfolio_loading, LoadingState::loading());
    }

    #[test]
    fn load_success_replaces_data_wholesale() {
        let state = AppState::initial();
        let stocks = Arc::new(vec![stock("AAPL", 190.0)]);
        let next = reduce(&state, &Action::LoadStocksSuccess(Arc::clone(&stocks)));
        assert!(Arc::ptr_eq(&next.stocks.stocks, &stocks));
        assert_eq!(next.stocks.stocks_loading, LoadingState::idle());
    }

    #[test]
    fn load_failure_keeps_prior_data() {
        let state = AppState::initial();
        let loaded = reduce(
            &state,
            &Action::LoadStocksSuccess(Arc::new(vec![stock("AAPL", 190.0)])),
        );
        let failed = reduce(&loaded, &Action::LoadStocksFailure("timeout".to_string()));
        assert!(Arc::ptr_eq(&failed.stocks.stocks, &loaded.stocks.stocks));
        assert_eq!(
            failed.stocks.stocks_loading,
            LoadingState::failed("timeout")
        );
    }

    #[test]
    fn failure_in_one_slice_leaves_others_untouched() {
        let mut state = AppState::initial();
        state.stocks.stocks = Arc::new(vec![stock("AAPL", 190.0)]);
        state.stocks.trending = Arc::new(vec![TrendingStock {
            id: 1,
            symbol: "AAPL".to_string(),
        }]);

        let next = reduce(
            &state,
            &Action::LoadPortfolioFailure("unreachable".to_string()),
        );
        assert!(Arc::ptr_eq(&next.stocks.stocks, &state.stocks.stocks));
        assert!(Arc::ptr_eq(&next.stocks.trending, &state.stocks.trending));
        assert_eq!(next.stocks.search_results, state.stocks.search_results);
        assert_eq!(
            next.stocks.portfolio_loading,
            LoadingState::failed("unreachable")
        );
    }

    #[test]
    fn search_sets_query_and_loading() {
        let next = reduce(&AppState::initial(), &Action::Search("AAPL".to_string()));
        assert_eq!(next.stocks.search_query, "AAPL");
        assert!(next.stocks.search_loading.is_loading);
    }

    #[test]
    fn clear_search_results_is_idempotent() {
        let mut state = AppState::initial();
        state.stocks.search_query = "AAPL".to_string();
        state.stocks.search_results = Arc::new(vec![SearchResult {
            stock: stock("AAPL", 190.0),
            origin: SearchOrigin::Search,
        }]);

        let once = reduce(&state, &Action::ClearSearchResults);
        let twice = reduce(&once, &Action::ClearSearchResults);
        assert_eq!(once, twice);
        assert!(once.stocks.search_results.is_empty());
        assert_eq!(once.stocks.search_query, "");
    }

    #[test]
    fn recent_searches_dedupe_and_stay_bounded() {
        let mut state = AppState::initial();
        for symbol in ["AAPL", "MSFT", "TSLA", "AMZN", "NVDA", "KO", "MSFT"] {
            state = reduce(
                &state,
                &Action::AddToRecentSearches(stock(symbol, 100.0)),
            );
        }

        let recents = &state.stocks.recent_searches;
        assert_eq!(recents.len(), RECENT_SEARCH_LIMIT);
        let symbols: Vec<&str> = recents.iter().map(|r| r.stock.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "KO", "NVDA", "AMZN", "TSLA"]);
        assert!(recents.iter().all(|r| r.origin == SearchOrigin::Recent));
    }

    #[test]
    fn order_success_merges_existing_holding() {
        let state = with_portfolio(5_000.0, vec![holding("AAPL", 10.0, 1_000.0)]);
        let next = reduce(
            &state,
            &Action::PlaceOrderSuccess(order("AAPL", 5.0, 110.0, 550.0)),
        );

        let portfolio = next.stocks.portfolio.as_deref().unwrap();
        assert_eq!(portfolio.holdings.len(), 1);
        assert_eq!(portfolio.holdings[0].shares, 15.0);
        assert_eq!(portfolio.holdings[0].current_value, 1_650.0);
        assert_eq!(portfolio.total_equity, 5_550.0);
        assert!(next.stocks.order_success);
        assert!(next.stocks.pending_order.is_none());
        assert_eq!(next.stocks.order_loading, LoadingState::idle());
    }

    #[test]
    fn order_success_appends_new_holding() {
        let state = with_portfolio(5_000.0, vec![holding("MSFT", 2.0, 800.0)]);
        let next = reduce(
            &state,
            &Action::PlaceOrderSuccess(order("AAPL", 5.0, 110.0, 550.0)),
        );

        let portfolio = next.stocks.portfolio.as_deref().unwrap();
        assert_eq!(portfolio.holdings.len(), 2);
        let added = &portfolio.holdings[1];
        assert_eq!(added.stock.symbol, "AAPL");
        assert_eq!(added.shares, 5.0);
        assert_eq!(added.current_value, 550.0);
        assert_eq!(portfolio.total_equity, 5_550.0);
    }

    #[test]
    fn order_success_without_portfolio_only_flags_success() {
        let state = AppState::initial();
        let next = reduce(
            &state,
            &Action::PlaceOrderSuccess(order("AAPL", 5.0, 110.0, 550.0)),
        );
        assert!(next.stocks.portfolio.is_none());
        assert!(next.stocks.order_success);
        assert_eq!(next.stocks.order_loading, LoadingState::idle());
    }

    #[test]
    fn order_failure_clears_success_flag() {
        let mut state = AppState::initial();
        state.stocks.order_success = true;
        let next = reduce(
            &state,
            &Action::PlaceOrderFailure("rejected".to_string()),
        );
        assert!(!next.stocks.order_success);
        assert_eq!(
            next.stocks.order_loading,
            LoadingState::failed("rejected")
        );
    }

    #[test]
    fn clear_buy_order_resets_order_state() {
        let state = with_portfolio(1_000.0, vec![]);
        let placed = reduce(
            &state,
            &Action::PlaceOrder(order("AAPL", 1.0, 110.0, 110.0)),
        );
        assert!(placed.stocks.pending_order.is_some());
        assert!(placed.stocks.order_loading.is_loading);

        let cleared = reduce(&placed, &Action::ClearBuyOrder);
        assert!(cleared.stocks.pending_order.is_none());
        assert!(!cleared.stocks.order_success);
        assert_eq!(cleared.stocks.order_loading, LoadingState::idle());
    }
}
