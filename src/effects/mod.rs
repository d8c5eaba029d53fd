use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::market::backend::StockBackend;
use crate::market::types::BuyOrder;
use crate::observability;
use crate::state::actions::Action;
use crate::state::store::{Store, StoreHandle};
use crate::storage::RecentSearchStore;

/// One supersede channel per trigger kind: a newer trigger invalidates
/// the pending result of an older one on the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectChannel {
    Portfolio,
    Stocks,
    Trending,
    Search,
    Recents,
    Order,
    OrderClear,
}

#[derive(Debug, Clone)]
pub struct EffectTiming {
    /// Quiet time required before a search query reaches the backend.
    pub search_debounce: Duration,
    /// Floor on how fast the recent-search load may complete.
    pub recents_min_delay: Duration,
    /// Delay before a fulfilled order's success state self-resets.
    pub order_clear_delay: Duration,
}

impl Default for EffectTiming {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            recents_min_delay: Duration::from_millis(100),
            order_clear_delay: Duration::from_millis(100),
        }
    }
}

/// Latest issued generation per channel. A completion may dispatch only
/// while its generation is still current.
#[derive(Clone, Default)]
struct Generations(Arc<DashMap<EffectChannel, u64>>);

impl Generations {
    fn begin(&self, channel: EffectChannel) -> u64 {
        let mut entry = self.0.entry(channel).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_current(&self, channel: EffectChannel, generation: u64) -> bool {
        self.0
            .get(&channel)
            .map_or(false, |current| *current == generation)
    }

    fn invalidate(&self, channel: EffectChannel) {
        self.begin(channel);
    }
}

/// State shared with a spawned effect task: enough to dispatch the one
/// result action, and to know when not to.
#[derive(Clone)]
struct EffectContext {
    handle: StoreHandle,
    generations: Generations,
    shutdown: watch::Receiver<bool>,
}

impl EffectContext {
    fn settle(&self, channel: EffectChannel, generation: u64, label: &'static str, action: Action) {
        if !self.generations.is_current(channel, generation) || *self.shutdown.borrow() {
            observability::record_dropped_result(label);
            debug!(channel = label, "dropping superseded effect result");
            return;
        }
        self.handle.send(action);
    }
}

/// Observes the dispatched action stream and turns trigger actions into
/// backend calls. Every spawned task settles with at most one dispatch;
/// backend failures become `*Failure` actions and never escape.
pub struct EffectRunner {
    store: Arc<Store>,
    handle: StoreHandle,
    backend: Arc<dyn StockBackend>,
    recents: Arc<RecentSearchStore>,
    timing: EffectTiming,
    generations: Generations,
    last_search: Arc<Mutex<Option<String>>>,
    shutdown: watch::Receiver<bool>,
}

impl EffectRunner {
    pub fn new(
        store: Arc<Store>,
        handle: StoreHandle,
        backend: Arc<dyn StockBackend>,
        recents: Arc<RecentSearchStore>,
        timing: EffectTiming,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            handle,
            backend,
            recents,
            timing,
            generations: Generations::default(),
            last_search: Arc::new(Mutex::new(None)),
            shutdown,
        }
    }

    pub async fn run(mut self, mut actions: mpsc::UnboundedReceiver<Action>) {
        info!("effect runner started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                maybe_action = actions.recv() => {
                    let Some(action) = maybe_action else { break };
                    self.handle_action(action);
                }
            }
        }
        info!("effect runner stopped");
    }

    fn handle_action(&self, action: Action) {
        match action {
            Action::LoadPortfolio => self.spawn_portfolio_load(),
            Action::LoadStocks => self.spawn_stocks_load(),
            Action::LoadTrending => self.spawn_trending_load(),
            Action::Search(query) => self.spawn_search(query),
            Action::ClearSearchResults => {
                // A cleared search invalidates pending debounces and
                // re-arms the duplicate filter.
                self.generations.invalidate(EffectChannel::Search);
                *self.last_search.lock().expect("search filter poisoned") = None;
            }
            Action::LoadRecentSearches => self.spawn_recents_load(),
            Action::AddToRecentSearches(_) => self.spawn_recents_persist(),
            Action::PlaceOrder(order) => self.spawn_place_order(order),
            Action::PlaceOrderSuccess(_) => self.spawn_order_clear(),
            _ => {}
        }
    }

    fn context(&self) -> EffectContext {
        EffectContext {
            handle: self.handle.clone(),
            generations: self.generations.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    fn spawn_portfolio_load(&self) {
        let generation = self.generations.begin(EffectChannel::Portfolio);
        let context = self.context();
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = backend.fetch_portfolio().await;
            observability::record_backend_latency("portfolio", started.elapsed());
            let action = match result {
                Ok(portfolio) => Action::LoadPortfolioSuccess(Arc::new(portfolio)),
                Err(err) => {
                    warn!(error = %err, "portfolio load failed");
                    Action::LoadPortfolioFailure(format!("Failed to load portfolio: {err}"))
                }
            };
            context.settle(EffectChannel::Portfolio, generation, "portfolio", action);
        });
    }

    fn spawn_stocks_load(&self) {
        let generation = self.generations.begin(EffectChannel::Stocks);
        let context = self.context();
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = backend.fetch_stocks().await;
            observability::record_backend_latency("stocks", started.elapsed());
            let action = match result {
                Ok(stocks) => Action::LoadStocksSuccess(Arc::new(stocks)),
                Err(err) => {
                    warn!(error = %err, "stocks load failed");
                    Action::LoadStocksFailure(format!("Failed to load stocks: {err}"))
                }
            };
            context.settle(EffectChannel::Stocks, generation, "stocks", action);
        });
    }

    fn spawn_trending_load(&self) {
        let generation = self.generations.begin(EffectChannel::Trending);
        let context = self.context();
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = backend.fetch_trending().await;
            observability::record_backend_latency("trending", started.elapsed());
            let action = match result {
                Ok(trending) => Action::LoadTrendingSuccess(Arc::new(trending)),
                Err(err) => {
                    warn!(error = %err, "trending load failed");
                    Action::LoadTrendingFailure(format!("Failed to load trending stocks: {err}"))
                }
            };
            context.settle(EffectChannel::Trending, generation, "trending", action);
        });
    }

    fn spawn_search(&self, query: String) {
        let query = query.trim().to_string();
        // Blank queries never reach the backend; clearing results is the
        // consumer's move.
        if query.is_empty() {
            debug!("ignoring blank search query");
            return;
        }

        let generation = self.generations.begin(EffectChannel::Search);
        let context = self.context();
        let backend = Arc::clone(&self.backend);
        let last_search = Arc::clone(&self.last_search);
        let debounce = self.timing.search_debounce;
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(debounce) => {}
                _ = shutdown.changed() => return,
            }
            if !context.generations.is_current(EffectChannel::Search, generation) {
                debug!(%query, "search superseded during debounce");
                return;
            }
            {
                let mut last = last_search.lock().expect("search filter poisoned");
                if last.as_deref() == Some(query.as_str()) {
                    debug!(%query, "suppressing duplicate search");
                    return;
                }
                *last = Some(query.clone());
            }

            let started = Instant::now();
            let result = backend.search_stocks(&query).await;
            observability::record_backend_latency("search", started.elapsed());
            let action = match result {
                Ok(results) => Action::SearchSuccess(Arc::new(results)),
                Err(err) => {
                    warn!(error = %err, %query, "search failed");
                    Action::SearchFailure(format!("Failed to search stocks: {err}"))
                }
            };
            context.settle(EffectChannel::Search, generation, "search", action);
        });
    }

    fn spawn_recents_load(&self) {
        let generation = self.generations.begin(EffectChannel::Recents);
        let context = self.context();
        let recents = Arc::clone(&self.recents);
        let min_delay = self.timing.recents_min_delay;
        tokio::spawn(async move {
            // Hold the result until the floor has passed so the list does
            // not flicker in on first paint.
            let (loaded, _) = futures::join!(recents.load(), sleep(min_delay));
            context.settle(
                EffectChannel::Recents,
                generation,
                "recents",
                Action::LoadRecentSearchesSuccess(Arc::new(loaded)),
            );
        });
    }

    /// Persistence only. The task gets no store handle, so it cannot
    /// dispatch by construction.
    fn spawn_recents_persist(&self) {
        // The reducer has already folded the new entry in and bounded the
        // list; persist that snapshot.
        let snapshot = Arc::clone(&self.store.state().stocks.recent_searches);
        let recents = Arc::clone(&self.recents);
        tokio::spawn(async move {
            recents.save(&snapshot).await;
        });
    }

    fn spawn_place_order(&self, order: Arc<BuyOrder>) {
        let generation = self.generations.begin(EffectChannel::Order);
        let context = self.context();
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = backend.place_order(&order).await;
            observability::record_backend_latency("orders", started.elapsed());
            let action = match result {
                Ok(receipt) => {
                    info!(
                        order_id = %receipt.order_id,
                        status = %receipt.status,
                        symbol = %order.stock.symbol,
                        shares = order.shares,
                        "order placed"
                    );
                    // The originally submitted order drives the portfolio
                    // merge, not the server echo.
                    Action::PlaceOrderSuccess(order)
                }
                Err(err) => {
                    warn!(error = %err, symbol = %order.stock.symbol, "order placement failed");
                    Action::PlaceOrderFailure(format!("Failed to place order: {err}"))
                }
            };
            context.settle(EffectChannel::Order, generation, "orders", action);
        });
    }

    fn spawn_order_clear(&self) {
        let generation = self.generations.begin(EffectChannel::OrderClear);
        let context = self.context();
        let delay = self.timing.order_clear_delay;
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => return,
            }
            context.settle(
                EffectChannel::OrderClear,
                generation,
                "order_clear",
                Action::ClearBuyOrder,
            );
        });
    }
}
