// src/profile/words.rs
use std::collections::HashMap;

/// Lowercase alphanumeric tokens, split on everything else, keeping only
/// tokens longer than two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2)
        .map(String::from)
        .collect()
}

/// Most frequent tokens across the given values: count-descending with an
/// alphabetical tie-break, capped at `limit`.
pub fn top_words(values: &[&str], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        for token in tokenize(value) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_short_tokens() {
        assert_eq!(
            tokenize("The Quick-Brown FOX, v2 on 42nd street"),
            vec!["the", "quick", "brown", "fox", "42nd", "street"]
        );
        assert!(tokenize("a an of 12").is_empty());
    }

    #[test]
    fn top_words_ranks_by_count_then_alphabetically() {
        let values = vec![
            "delivery late late",
            "late delivery",
            "missing parcel",
            "parcel",
        ];
        let ranked = top_words(&values, 3);
        assert_eq!(
            ranked,
            vec![
                ("late".to_string(), 3),
                ("delivery".to_string(), 2),
                ("parcel".to_string(), 2),
            ]
        );
    }

    #[test]
    fn limit_is_respected() {
        let values = vec!["one two three four five six seven eight nine"];
        assert_eq!(top_words(&values, 4).len(), 4);
    }
}
