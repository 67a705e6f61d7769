//! Shared process state.

pub mod result_cache;

pub use result_cache::{Clock, ManualClock, ResultCache, SystemClock};
