//! Entity resolution of sportsbook player names against the roster.
//!
//! Strategies are tried in order and the first success wins:
//! 1. alias override (nicknames, legal names)
//! 2. exact normalized match
//! 3. token-subset match
//! 4. last-name fallback with a first-name prefix check
//!
//! Candidates are always scanned in ascending player ID order so ties
//! resolve the same way on every run.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::data::models::{PlayerId, PlayerIdentity, RawQuote, Resolution, ResolvedQuote};

use super::normalize::{normalize, significant_tokens};

/// Characters of the first name checked in the last-name fallback.
const FIRST_NAME_PREFIX_LEN: usize = 3;

/// Known provider-name to roster-name mismatches. Both sides are normalized
/// at construction so accented spellings are accepted on either side.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("carlton carrington", "bub carrington"),
    ("carlton \"bub\" carrington", "bub carrington"),
    ("vit krejci", "vít krejčí"),
    ("luka doncic", "luka dončić"),
    ("bogdan bogdanovic", "bogdan bogdanović"),
    ("nikola jokic", "nikola jokić"),
    ("nikola vucevic", "nikola vučević"),
    ("dario saric", "dario šarić"),
    ("bojan bogdanovic", "bojan bogdanović"),
    ("goran dragic", "goran dragić"),
    ("herb jones", "herbert jones"),
    ("nic claxton", "nicolas claxton"),
    ("cam johnson", "cameron johnson"),
    ("moe wagner", "moritz wagner"),
];

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Alias,
    Exact,
    TokenSubset,
    LastName,
}

#[derive(Debug, Clone)]
struct Candidate {
    player_id: PlayerId,
    normalized: String,
}

/// Resolves free-text names to canonical player IDs.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    // Sorted by player_id.
    candidates: Vec<Candidate>,
    aliases: HashMap<String, String>,
}

impl EntityResolver {
    pub fn new(roster: &BTreeMap<PlayerId, PlayerIdentity>) -> Self {
        Self::with_aliases(roster, std::iter::empty::<(String, String)>())
    }

    /// Build with the default alias table plus `extra` entries.
    pub fn with_aliases<I, K, V>(roster: &BTreeMap<PlayerId, PlayerIdentity>, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let candidates = roster
            .values()
            .map(|p| Candidate {
                player_id: p.player_id.clone(),
                normalized: normalize(&p.full_name),
            })
            .filter(|c| !c.normalized.is_empty())
            .collect();

        let mut aliases: HashMap<String, String> = DEFAULT_ALIASES
            .iter()
            .map(|(from, to)| (normalize(from), normalize(to)))
            .collect();
        for (from, to) in extra {
            aliases.insert(normalize(from.as_ref()), normalize(to.as_ref()));
        }

        Self {
            candidates,
            aliases,
        }
    }

    pub fn roster_size(&self) -> usize {
        self.candidates.len()
    }

    /// Resolve a raw name to a player ID, or `Unresolved`.
    pub fn resolve(&self, raw_name: &str) -> Resolution {
        match self.resolve_with_tier(raw_name) {
            Some((id, _)) => Resolution::Resolved(id),
            None => Resolution::Unresolved,
        }
    }

    /// Resolve a batch of quotes. Every input quote appears in the output.
    pub fn resolve_quotes(&self, quotes: &[RawQuote]) -> Vec<ResolvedQuote> {
        quotes
            .iter()
            .map(|q| ResolvedQuote {
                quote: q.clone(),
                resolution: self.resolve(&q.player_name),
            })
            .collect()
    }

    pub fn resolve_with_tier(&self, raw_name: &str) -> Option<(PlayerId, MatchTier)> {
        let name = normalize(raw_name);
        if name.is_empty() {
            return None;
        }

        if let Some(target) = self.aliases.get(&name) {
            if let Some(c) = self.exact(target) {
                return Some((c.player_id.clone(), MatchTier::Alias));
            }
        }

        if let Some(c) = self.exact(&name) {
            return Some((c.player_id.clone(), MatchTier::Exact));
        }

        if let Some(c) = self.token_subset(&name) {
            return Some((c.player_id.clone(), MatchTier::TokenSubset));
        }

        if let Some(c) = self.last_name(&name) {
            return Some((c.player_id.clone(), MatchTier::LastName));
        }

        debug!(raw_name, normalized = %name, "Name unresolved");
        None
    }

    fn exact(&self, normalized: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.normalized == normalized)
    }

    /// Accept the candidate sharing the most tokens with the raw name, as long
    /// as all but one token of either side matched.
    fn token_subset(&self, name: &str) -> Option<&Candidate> {
        let raw_tokens = significant_tokens(name);
        if raw_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&Candidate, usize)> = None;
        for c in &self.candidates {
            let cand_tokens = significant_tokens(&c.normalized);
            let matches = raw_tokens
                .iter()
                .filter(|rt| {
                    cand_tokens
                        .iter()
                        .any(|ct| ct.contains(**rt) || rt.contains(*ct))
                })
                .count();

            if matches == 0 {
                continue;
            }
            let accepted = matches + 1 >= raw_tokens.len() || matches + 1 >= cand_tokens.len();
            if !accepted {
                continue;
            }
            // Strictly greater keeps the first candidate on ties.
            if best.map(|(_, m)| matches > m).unwrap_or(true) {
                best = Some((c, matches));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Match on the last token, then require the first name's prefix to
    /// appear in the candidate. Only a single survivor is accepted.
    fn last_name(&self, name: &str) -> Option<&Candidate> {
        let tokens: Vec<&str> = name.split_whitespace().collect();
        let last = *tokens.last()?;
        let first = tokens.first()?;
        let prefix: String = first.chars().take(FIRST_NAME_PREFIX_LEN).collect();

        let mut survivors = self.candidates.iter().filter(|c| {
            let Some(cand_last) = c.normalized.split_whitespace().last() else {
                return false;
            };
            let last_hit = cand_last.contains(last) || last.contains(cand_last);
            last_hit && c.normalized.contains(prefix.as_str())
        });

        let only = survivors.next()?;
        if survivors.next().is_some() {
            return None;
        }
        Some(only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[(&str, &str)]) -> BTreeMap<PlayerId, PlayerIdentity> {
        names
            .iter()
            .map(|(id, name)| {
                (
                    id.to_string(),
                    PlayerIdentity {
                        player_id: id.to_string(),
                        full_name: name.to_string(),
                        team_name: "Team".to_string(),
                        position: "G".to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_accented_roster_name_resolves() {
        let r = EntityResolver::new(&roster(&[("10", "Luka Dončić"), ("11", "Luka Garza")]));
        let (id, tier) = r.resolve_with_tier("Luka Doncic").unwrap();
        assert_eq!(id, "10");
        assert_eq!(tier, MatchTier::Alias);
    }

    #[test]
    fn test_resolve_quotes_keeps_every_input() {
        use rust_decimal::Decimal;

        let r = EntityResolver::new(&roster(&[("1", "Stephen Curry"), ("2", "Jalen Brunson")]));
        assert_eq!(r.roster_size(), 2);

        let quote = |name: &str| RawQuote {
            player_name: name.to_string(),
            stat_type: crate::data::models::StatType::Points,
            line: Decimal::new(255, 1),
            over_price: None,
            under_price: None,
            bookmaker: "fanduel".to_string(),
            home_team: String::new(),
            away_team: String::new(),
            commence_time: None,
        };
        let quotes = vec![quote("Stephen Curry"), quote("Mystery Man"), quote("Jalen Brunson")];
        let resolved = r.resolve_quotes(&quotes);

        assert_eq!(resolved.len(), 3);
        assert!(resolved[0].resolution.is_resolved());
        assert_eq!(resolved[0].resolution.player_id(), Some("1"));
        assert!(!resolved[1].resolution.is_resolved());
        assert_eq!(resolved[1].quote.player_name, "Mystery Man");
        assert_eq!(resolved[2].resolution.player_id(), Some("2"));
    }

    #[test]
    fn test_nickname_alias() {
        let r = EntityResolver::new(&roster(&[("5", "Bub Carrington")]));
        assert_eq!(
            r.resolve("Carlton Carrington"),
            Resolution::Resolved("5".to_string())
        );
    }

    #[test]
    fn test_custom_alias_overrides() {
        let r = EntityResolver::with_aliases(
            &roster(&[("1", "Alperen Sengun")]),
            [("Alpi Sengun", "Alperen Şengün")],
        );
        assert_eq!(r.resolve_with_tier("Alpi Sengun").unwrap().1, MatchTier::Alias);
    }

    #[test]
    fn test_exact_match_ignores_suffix_and_periods() {
        let r = EntityResolver::new(&roster(&[("7", "Jaren Jackson Jr."), ("8", "P.J. Tucker")]));
        assert_eq!(r.resolve_with_tier("Jaren Jackson").unwrap(), ("7".to_string(), MatchTier::Exact));
        assert_eq!(r.resolve_with_tier("PJ Tucker").unwrap(), ("8".to_string(), MatchTier::Exact));
    }

    #[test]
    fn test_token_subset_prefers_highest_match_count() {
        let r = EntityResolver::new(&roster(&[
            ("1", "Shai Gilgeous-Alexander"),
            ("2", "Shai Smith"),
        ]));
        let (id, tier) = r.resolve_with_tier("Shai Gilgeous-Alexander Sr").unwrap();
        assert_eq!(tier, MatchTier::Exact);
        assert_eq!(id, "1");

        let (id, tier) = r.resolve_with_tier("Shai Gilgeous").unwrap();
        assert_eq!(tier, MatchTier::TokenSubset);
        assert_eq!(id, "1");
    }

    #[test]
    fn test_token_subset_tie_takes_lowest_player_id() {
        let r = EntityResolver::new(&roster(&[("b", "Marcus Morris"), ("a", "Markieff Morris")]));
        // "morris" matches both with count 1; ascending ID order wins.
        let (id, tier) = r.resolve_with_tier("Mr Morris").unwrap();
        assert_eq!(tier, MatchTier::TokenSubset);
        assert_eq!(id, "a");
    }

    #[test]
    fn test_token_subset_needs_at_least_one_match() {
        let r = EntityResolver::new(&roster(&[("1", "Stephen Curry")]));
        assert_eq!(r.resolve("Zion"), Resolution::Unresolved);
    }

    #[test]
    fn test_last_name_fallback_single_candidate() {
        let r = EntityResolver::new(&roster(&[
            ("1", "Giorgos Antetokounmpo Papadopoulos"),
            ("2", "Thanasis Antetokounmpo"),
        ]));
        // One of three tokens matches, so the token tier rejects it.
        // Last token "papadopoulos" plus the "gio" prefix leaves one survivor.
        let (id, tier) = r
            .resolve_with_tier("Giovanni Quux Papadopoulos")
            .unwrap();
        assert_eq!(tier, MatchTier::LastName);
        assert_eq!(id, "1");
    }

    #[test]
    fn test_last_name_fallback_ambiguous_is_unresolved() {
        let r = EntityResolver::new(&roster(&[
            ("1", "Jalen Williams Longname"),
            ("2", "Jalani Smith Longname"),
        ]));
        // Both share the last name and the "jal" prefix.
        assert_eq!(r.resolve("Jalbert Foo Bar Longname"), Resolution::Unresolved);
    }

    #[test]
    fn test_empty_name_unresolved() {
        let r = EntityResolver::new(&roster(&[("1", "Stephen Curry")]));
        assert_eq!(r.resolve(""), Resolution::Unresolved);
        assert_eq!(r.resolve(" . "), Resolution::Unresolved);
    }

    #[test]
    fn test_resolution_is_reproducible() {
        let names = roster(&[("3", "Jalen Green"), ("1", "Jalen Brunson"), ("2", "Jalen Duren")]);
        let first = EntityResolver::new(&names).resolve("Jalen Xavier");
        for _ in 0..10 {
            assert_eq!(EntityResolver::new(&names).resolve("Jalen Xavier"), first);
        }
        assert_eq!(first, Resolution::Resolved("1".to_string()));
    }
}
