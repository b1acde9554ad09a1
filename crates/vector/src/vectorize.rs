use std::collections::BTreeMap;

/// Tokens shorter than this carry no signal; longer ones are usually
/// minified noise.
const MIN_TOKEN_LEN: usize = 2;
const MAX_TOKEN_LEN: usize = 64;
const MAX_BIGRAMS: usize = 128;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "for", "is", "on", "with", "as", "by", "at",
    "be", "this", "that", "it", "from", "are", "was", "were", "not",
];

/// 32-bit FNV-1a over the UTF-8 bytes. Part of the engine contract: changing
/// this requires an engine version bump.
pub fn fnv1a32(input: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Base token stream: camelCase boundaries split, lowercased, punctuation
/// stripped, `[a-z0-9_/-]` runs of 2..=64 chars, stop words and pure-numeric
/// tokens dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(text.len() + 16);
    let mut prev_lower = false;
    for ch in text.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        spaced.push(ch);
    }

    let normalized: String = spaced
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
                ch
            } else {
                ' '
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TOKEN_LEN && token.len() <= MAX_TOKEN_LEN)
        .filter(|token| !STOP_WORDS.contains(token))
        .filter(|token| !token.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Tokens plus adjacent-token bigrams (capped), the term stream the vector
/// is built from.
pub fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = tokens.clone();
    for (idx, pair) in tokens.windows(2).enumerate() {
        if idx >= MAX_BIGRAMS {
            break;
        }
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}

/// Hash-trick embedding: each term selects a bucket via FNV-1a mod the
/// dimension and contributes `1 + ln(count)`; the result is L2-normalized.
/// Bucket collisions are accepted approximation, not corrected. Text with no
/// usable terms yields the zero vector.
pub fn vectorize(text: &str, dimension: usize) -> Vec<f32> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for term in terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }

    let mut vector = vec![0.0f32; dimension];
    for (term, count) in &counts {
        let bucket = (fnv1a32(term) as usize) % dimension;
        vector[bucket] += 1.0 + (*count as f32).ln();
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

/// Dot product; equals cosine similarity for L2-normalized inputs.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fnv1a32_reference_values() {
        assert_eq!(fnv1a32(""), 0x811c_9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c_292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn tokenize_splits_camel_case_and_drops_noise() {
        assert_eq!(
            tokenize("getPlaybackState(42) // the state"),
            vec!["get", "playback", "state", "state"]
        );
        assert_eq!(tokenize("a 1 2 the of"), Vec::<String>::new());
    }

    #[test]
    fn terms_include_bigrams() {
        let terms = terms("playback state");
        assert_eq!(terms, vec!["playback", "state", "playback state"]);
    }

    #[test]
    fn vectors_are_normalized_and_deterministic() {
        let first = vectorize("playback state route handler", 64);
        let second = vectorize("playback state route handler", 64);
        assert_eq!(first, second);

        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm {norm}");
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let vector = vectorize("   \n\t  ", 32);
        assert!(vector.iter().all(|v| *v == 0.0));
        assert_eq!(vector.len(), 32);
    }

    #[test]
    fn similar_texts_score_higher() {
        let dim = 256;
        let query = vectorize("playback state", dim);
        let close = vectorize("update playback state for the player", dim);
        let far = vectorize("database migration schema", dim);
        assert!(dot(&query, &close) > dot(&query, &far));
    }
}
