pub mod core;
pub mod fetch;
pub mod mcp;
pub mod pipeline;
pub mod tools;

// --- Primary core exports ---
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::AppState;
pub use self::core::{cache, config, error, metrics, rate_limit, validate};

// --- Engine entry points ---
pub use fetch::ladder;
pub use fetch::{HttpFetcher, SourceFetcher};
pub use tools::{articles, status, top_news};
