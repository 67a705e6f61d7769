//! Sportsbook quote aggregation and price helpers.

pub mod quote_book;

pub use quote_book::{
    devig_over_probability, implied_probability, quotes_fingerprint, BookmakerPreference, QuoteBook,
    UnresolvedQuote,
};
