//! Portfolio risk aggregation.

pub mod portfolio;

pub use portfolio::{assess, Holding, PortfolioRiskReport};
