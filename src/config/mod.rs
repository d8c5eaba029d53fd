use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::effects::EffectTiming;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub recents_path: PathBuf,
    pub paper_trading: bool,
    pub timing: EffectTiming,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        let backend_url =
            std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
        let recents_path = std::env::var("RECENTS_PATH")
            .unwrap_or_else(|_| "recent_searches.json".to_string())
            .into();
        let paper_trading = std::env::var("PAPER_TRADING")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let defaults = EffectTiming::default();
        let timing = EffectTiming {
            search_debounce: env_millis("SEARCH_DEBOUNCE_MS", defaults.search_debounce)?,
            recents_min_delay: env_millis("RECENTS_MIN_DELAY_MS", defaults.recents_min_delay)?,
            order_clear_delay: env_millis("ORDER_CLEAR_DELAY_MS", defaults.order_clear_delay)?,
        };

        Ok(Self {
            backend_url,
            recents_path,
            paper_trading,
            timing,
        })
    }
}

fn env_millis(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => {
            let millis: u64 = raw
                .parse()
                .with_context(|| format!("{key} must be an integer millisecond count"))?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(default),
    }
}
