use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use invest_engine::config::Config;
use invest_engine::effects::EffectRunner;
use invest_engine::market::backend::{HttpBackend, StockBackend};
use invest_engine::market::paper::PaperBackend;
use invest_engine::observability;
use invest_engine::state::actions::Action;
use invest_engine::state::selectors::Selectors;
use invest_engine::state::stock::AppState;
use invest_engine::state::store::{self, Store};
use invest_engine::storage::{FileKvStore, KvStore, RecentSearchStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    observability::init_metrics_server()?;

    let config = Config::from_env()?;
    info!(
        backend = %config.backend_url,
        paper = config.paper_trading,
        "invest-engine starting"
    );

    let backend: Arc<dyn StockBackend> = if config.paper_trading {
        Arc::new(PaperBackend::new())
    } else {
        Arc::new(HttpBackend::new(&config.backend_url))
    };
    let kv = Arc::new(FileKvStore::new(&config.recents_path)) as Arc<dyn KvStore>;
    let recents = Arc::new(RecentSearchStore::new(kv));

    let store = Arc::new(Store::new(AppState::initial()));
    let (handle, inbox) = store::channel();
    let (effects_tx, effects_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let selectors = Arc::new(Selectors::default());
    {
        let selectors = Arc::clone(&selectors);
        store.subscribe(move |state| {
            let dashboard = selectors.dashboard(state);
            debug!(
                holdings = dashboard.portfolio.as_ref().map_or(0, |p| p.holdings.len()),
                trending = dashboard.trending.len(),
                loading = dashboard.is_loading,
                "dashboard updated"
            );
        });
    }

    let pump = tokio::spawn(store::run_store(
        Arc::clone(&store),
        inbox,
        effects_tx,
        shutdown_rx.clone(),
    ));
    let runner = EffectRunner::new(
        Arc::clone(&store),
        handle.clone(),
        backend,
        recents,
        config.timing.clone(),
        shutdown_rx,
    );
    let effects = tokio::spawn(runner.run(effects_rx));

    for action in [
        Action::LoadPortfolio,
        Action::LoadStocks,
        Action::LoadTrending,
        Action::LoadRecentSearches,
    ] {
        handle.send(action);
    }

    tokio::select! {
        res = pump => {
            match res {
                Ok(()) => warn!("store pump exited"),
                Err(err) => warn!(error = %err, "store pump panicked"),
            }
        }
        res = effects => {
            match res {
                Ok(()) => warn!("effect runner exited"),
                Err(err) => warn!(error = %err, "effect runner panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C, shutting down");
            let _ = shutdown_tx.send(true);
        }
    }

    Ok(())
}
