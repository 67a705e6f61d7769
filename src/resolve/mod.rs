//! Player name normalization and entity resolution.

pub mod normalize;
pub mod resolver;

pub use normalize::normalize;
pub use resolver::{EntityResolver, MatchTier};
