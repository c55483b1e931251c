// Adapters layer: concrete implementations for external systems (storage, http APIs, calendar files).

pub mod calendar;
pub mod collector;
pub mod github;
pub mod http;
pub mod slack;
pub mod storage;

pub use collector::ActivityCollector;
pub use storage::LocalStorage;
