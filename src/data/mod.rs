//! Domain records, store contracts and the read-only accessor.

pub mod accessor;
pub mod models;
pub mod store;

pub use accessor::MetricRecordAccessor;
pub use store::{InMemoryStore, MetricsStore, RosterStore, StoreSnapshot};
