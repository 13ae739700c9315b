pub mod cache_store;
pub mod radar_cache;

pub use cache_store::CacheStore;
pub use radar_cache::RadarCache;
