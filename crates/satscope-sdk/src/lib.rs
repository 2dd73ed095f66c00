pub mod cache;
pub mod client;
pub mod context;
pub mod endpoints;
pub mod errors;
pub mod preferences;
pub mod refresh;
pub mod search;
pub mod service;
pub mod synthesizer;

pub use cache::CacheStore;
pub use client::{ApiClient, FetcherConfig, HttpFetcher, ResourceFetcher};
pub use context::{AppConfig, AppContext};
pub use errors::ApiError;
pub use preferences::{Network, PreferenceStore, Preferences};
pub use refresh::{RefreshCoordinator, ResourceFamily};
pub use search::{SearchQuery, SearchResult};
pub use service::{DashboardSnapshot, DataOrigin, DataService, Fetched};
pub use synthesizer::Synthesizer;
