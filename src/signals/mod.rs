//! Signal classification, prop analysis, model scoring and the cached
//! engine facade over them.

pub mod classifier;
pub mod engine;
pub mod fantasy;
pub mod model;
pub mod props;
pub mod trend;

pub use classifier::{SignalClassifier, SignalThresholds};
pub use engine::{Opportunity, OpportunityList, PropPick, SignalEngine};
pub use trend::{TrendClass, TrendReading};
