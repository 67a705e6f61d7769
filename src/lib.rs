//! Library entrypoint for player-market-engine.
//!
//! Exposes all modules so integration tests can import them.

pub mod api;
pub mod config;
pub mod data;
pub mod errors;
pub mod market;
pub mod resolve;
pub mod risk;
pub mod signals;
pub mod state;
