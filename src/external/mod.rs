pub mod failure_cache;
pub mod serpapi;
pub mod trend_provider;
