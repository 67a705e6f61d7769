//! Quote Book: the best available line per (player, stat type).
//!
//! Raw quotes are resolved against the roster, unresolved ones are kept as
//! diagnostics, and within each (player, stat type) group the quote from the
//! most preferred bookmaker wins. Ties keep the first quote seen.

use rust_decimal::Decimal;
use std::collections::btree_map::Entry;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, info};

use crate::data::models::{PlayerId, QuoteBookEntry, RawQuote, Resolution, StatType};
use crate::resolve::EntityResolver;

/// Bookmakers in descending order of preference.
pub const DEFAULT_BOOKMAKERS: [&str; 6] = [
    "fanduel",
    "draftkings",
    "betmgm",
    "caesars",
    "pointsbet",
    "bovada",
];

// =============================================================================
// Bookmaker preference
// =============================================================================

/// Ordered bookmaker ranking. Rank 0 is most preferred; unknown bookmakers
/// rank behind every listed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmakerPreference {
    order: Vec<String>,
}

impl BookmakerPreference {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            order: order
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn rank(&self, bookmaker: &str) -> usize {
        let key = bookmaker.trim().to_lowercase();
        self.order
            .iter()
            .position(|b| *b == key)
            .unwrap_or(usize::MAX)
    }

    pub fn bookmakers(&self) -> &[String] {
        &self.order
    }
}

impl Default for BookmakerPreference {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKMAKERS)
    }
}

// =============================================================================
// Quote Book
// =============================================================================

/// Content fingerprint of a quote batch. Two batches differing in any quote
/// field, or in order, fingerprint differently.
pub fn quotes_fingerprint(quotes: &[RawQuote]) -> u64 {
    let mut hasher = DefaultHasher::new();
    quotes.hash(&mut hasher);
    hasher.finish()
}

/// A quote that could not be matched to a roster player.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedQuote {
    pub player_name: String,
    pub stat_type: StatType,
    pub bookmaker: String,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    entries: BTreeMap<(PlayerId, StatType), QuoteBookEntry>,
    unresolved: Vec<UnresolvedQuote>,
    quotes_seen: usize,
}

impl QuoteBook {
    /// Build a book from one point-in-time batch of quotes.
    pub fn build(
        quotes: &[RawQuote],
        resolver: &EntityResolver,
        preference: &BookmakerPreference,
    ) -> Self {
        let mut entries: BTreeMap<(PlayerId, StatType), QuoteBookEntry> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for resolved in resolver.resolve_quotes(quotes) {
            let quote = &resolved.quote;
            let player_id = match resolved.resolution {
                Resolution::Resolved(id) => id,
                Resolution::Unresolved => {
                    debug!(
                        player_name = %quote.player_name,
                        stat_type = %quote.stat_type,
                        bookmaker = %quote.bookmaker,
                        "Quote unresolved, excluded from book"
                    );
                    unresolved.push(UnresolvedQuote {
                        player_name: quote.player_name.clone(),
                        stat_type: quote.stat_type,
                        bookmaker: quote.bookmaker.clone(),
                    });
                    continue;
                }
            };

            match entries.entry((player_id.clone(), quote.stat_type)) {
                Entry::Vacant(slot) => {
                    slot.insert(entry_from(player_id, quote));
                }
                Entry::Occupied(mut slot) => {
                    // Strictly better rank replaces; equal rank keeps the first.
                    if preference.rank(&quote.bookmaker) < preference.rank(&slot.get().bookmaker) {
                        slot.insert(entry_from(player_id, quote));
                    }
                }
            }
        }

        info!(
            quotes = quotes.len(),
            roster = resolver.roster_size(),
            entries = entries.len(),
            unresolved = unresolved.len(),
            "Quote book built"
        );

        Self {
            entries,
            unresolved,
            quotes_seen: quotes.len(),
        }
    }

    pub fn get(&self, player_id: &str, stat_type: StatType) -> Option<&QuoteBookEntry> {
        self.entries.get(&(player_id.to_string(), stat_type))
    }

    /// All entries in (player_id, stat type) order.
    pub fn entries(&self) -> impl Iterator<Item = &QuoteBookEntry> {
        self.entries.values()
    }

    /// Entries for one player, in stat type order.
    pub fn player_lines<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a QuoteBookEntry> {
        self.entries
            .values()
            .filter(move |e| e.player_id == player_id)
    }

    /// Distinct resolved players, sorted.
    pub fn players(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.entries.keys().map(|(id, _)| id.clone()).collect();
        ids.dedup();
        ids
    }

    pub fn unresolved(&self) -> &[UnresolvedQuote] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quotes_seen(&self) -> usize {
        self.quotes_seen
    }
}

fn entry_from(player_id: PlayerId, quote: &RawQuote) -> QuoteBookEntry {
    QuoteBookEntry {
        player_id,
        stat_type: quote.stat_type,
        line: quote.line,
        bookmaker: quote.bookmaker.clone(),
        over_price: quote.over_price,
        under_price: quote.under_price,
        home_team: quote.home_team.clone(),
        away_team: quote.away_team.clone(),
    }
}

// =============================================================================
// Price helpers
// =============================================================================

/// Raw implied probability of an American price. `None` for a zero price.
///
/// -110 -> 110 / 210 = 0.5238..., +150 -> 100 / 250 = 0.40
pub fn implied_probability(american: Decimal) -> Option<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;
    if american.is_zero() {
        return None;
    }
    let p = if american.is_sign_negative() {
        let risk = -american;
        risk / (risk + hundred)
    } else {
        hundred / (american + hundred)
    };
    Some(p.round_dp(6))
}

/// Over probability with the bookmaker margin removed. Needs both prices.
pub fn devig_over_probability(entry: &QuoteBookEntry) -> Option<Decimal> {
    let over = implied_probability(entry.over_price?)?;
    let under = implied_probability(entry.under_price?)?;
    let total = over + under;
    if total.is_zero() {
        return None;
    }
    Some((over / total).round_dp(4))
}
