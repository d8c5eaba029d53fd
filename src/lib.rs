pub mod config;
pub mod effects;
pub mod market;
pub mod observability;
pub mod state;
pub mod storage;

pub use state::actions::Action;
pub use state::stock::AppState;
pub use state::store::{Store, StoreHandle};
