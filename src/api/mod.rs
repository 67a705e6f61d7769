//! Odds provider client.

pub mod errors;
pub mod odds_client;

pub use errors::OddsApiError;
pub use odds_client::{parse_event_props, OddsApiClient};
