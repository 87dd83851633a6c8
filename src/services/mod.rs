pub mod calendar;
pub mod summary;
pub mod trend;
pub mod trend_cache;
pub mod window;
