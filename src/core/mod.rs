pub mod app_state;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod types;
pub mod validate;

pub use app_state::AppState;
