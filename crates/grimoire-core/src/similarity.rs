//! String similarity shared by the matcher, resolver and linker.
//!
//! Scores are the Indel ratio `2 * LCS / (|a| + |b|)`, so a dropped or added
//! letter costs less than a substitution ("Orc" and "Orcs" score 0.857).

use rapidfuzz::fuzz;

/// Case-insensitive Indel similarity in `[0.0, 1.0]`.
///
/// Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }
    fuzz::ratio(a.chars(), b.chars()) as f32
}

/// [`ratio`] on the 0-100 scale used by `fuzzy_threshold`.
pub fn ratio_percent(a: &str, b: &str) -> f32 {
    ratio(a, b) * 100.0
}
