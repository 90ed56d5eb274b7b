//! Character-level similarity measures used by the fuzzy matcher
//!
//! `sequence_ratio` is the normalized Indel similarity from `rapidfuzz`:
//! 2*L / T where L is the longest common subsequence and T the combined
//! length. Edit distance is delegated to `strsim`.

use rapidfuzz::fuzz;

/// Similarity ratio in [0.0, 1.0]; two empty strings are identical
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    fuzz::ratio(a.chars(), b.chars())
}

/// Levenshtein distance counted in characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}
