//! Player name normalization for cross-source matching.

use deunicode::deunicode;

/// Generational suffixes dropped from the end of a name.
const NAME_SUFFIXES: [&str; 4] = ["jr", "sr", "ii", "iii"];

/// Turn a free-text player name into its comparable form.
///
/// Folds diacritics to ASCII (`Dončić` -> `doncic`), lower-cases, strips
/// periods, collapses whitespace and removes trailing generational suffixes.
/// Total and idempotent.
pub fn normalize(name: &str) -> String {
    let ascii = deunicode(name).to_lowercase().replace('.', "");

    let mut tokens: Vec<&str> = ascii.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

/// Whitespace tokens of a normalized name, skipping single characters
/// (initials carry too little signal to match on).
pub fn significant_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        assert_eq!(normalize("  LeBron   James "), "lebron james");
        assert_eq!(normalize("P.J. Washington"), "pj washington");
        assert_eq!(normalize("Jaren Jackson Jr."), "jaren jackson");
        assert_eq!(normalize("Gary Trent Jr"), "gary trent");
        assert_eq!(normalize("Kelly Oubre Sr."), "kelly oubre");
    }

    #[test]
    fn test_diacritics_are_folded() {
        assert_eq!(normalize("Luka Dončić"), "luka doncic");
        assert_eq!(normalize("Nikola Jokić"), "nikola jokic");
        assert_eq!(normalize("Vít Krejčí"), "vit krejci");
        assert_eq!(normalize("Dario Šarić"), "dario saric");
    }

    #[test]
    fn test_roman_numeral_suffixes_only_as_trailing_words() {
        assert_eq!(normalize("Robert Williams III"), "robert williams");
        assert_eq!(normalize("Gary Payton II"), "gary payton");
        // Not a whole word: keep it.
        assert_eq!(normalize("Iiro Smith"), "iiro smith");
        // Not trailing: keep it.
        assert_eq!(normalize("Jr Smith"), "jr smith");
        // Stacked suffixes are all removed.
        assert_eq!(normalize("John Doe Jr. II"), "john doe");
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize("Jr."), "jr");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "Luka Dončić",
            "Jaren Jackson Jr.",
            "  Shai   Gilgeous-Alexander ",
            "Carlton \"Bub\" Carrington",
            "A.J. Green III",
            "Jr.",
            "Ørjan Åse",
            "Mo Bamba ii iii",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_significant_tokens_skip_initials() {
        assert_eq!(significant_tokens("j smith"), vec!["smith"]);
        assert_eq!(significant_tokens("luka doncic"), vec!["luka", "doncic"]);
    }
}
