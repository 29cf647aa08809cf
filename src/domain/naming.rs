// Series classification from display labels, and shift/extreme suffix surgery
//
// Every predicate normalizes the label to English first, so classification
// does not depend on the display language.

use super::locale::normalize_series_name;
use regex::Regex;
use std::sync::LazyLock;

pub const SHIFTED_SERIES_IDENTIFIER: &str = "shifted";
pub const TEST_NUMBERS_IDENTIFIER: &str = "tests";
pub const MIN_MAX_IDENTIFIERS: [&str; 2] = ["min", "max"];
pub const POSITIVITY_IDENTIFIER: &str = "positivity";
pub const AVERAGED_IDENTIFIER: &str = "d avg)";
pub const POSITIVE_TESTS_SUFFIX: &str = " - Positive Tests";
pub const NEGATIVE_TESTS_SUFFIX: &str = " - Negative Tests";

// ` shifted by <N> wave(s) <±D|NaN>d`
static WAVE_SHIFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" shifted by \d+ waves? (?:[+-]?\d+|NaN)d").unwrap());
// ` shifted by <±D>d`
static DAY_SHIFT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" shifted by [+-]?\d+d").unwrap());
// ` maxima over <D>d` / ` minima over <D>d`
static EXTREME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" (?:maxima|minima) over \d+d").unwrap());

pub fn is_shifted_series(label: &str) -> bool {
    normalize_series_name(label).to_lowercase().contains(SHIFTED_SERIES_IDENTIFIER)
}

pub fn is_test_number_series(label: &str) -> bool {
    normalize_series_name(label).to_lowercase().contains(TEST_NUMBERS_IDENTIFIER)
}

pub fn is_min_max_series(label: &str) -> bool {
    let lower = normalize_series_name(label).to_lowercase();
    MIN_MAX_IDENTIFIERS.iter().any(|id| lower.contains(id))
}

pub fn is_positivity_series(label: &str) -> bool {
    normalize_series_name(label).to_lowercase().contains(POSITIVITY_IDENTIFIER)
}

/// Case-sensitive on purpose: matches the rendered `(28d avg)` suffix only.
pub fn is_averaged_series(label: &str) -> bool {
    normalize_series_name(label).contains(AVERAGED_IDENTIFIER)
}

pub fn is_positive_test_series(label: &str) -> bool {
    normalize_series_name(label).contains(POSITIVE_TESTS_SUFFIX)
}

pub fn is_negative_test_series(label: &str) -> bool {
    normalize_series_name(label).contains(NEGATIVE_TESTS_SUFFIX)
}

pub fn is_shifted_test_number_series(label: &str) -> bool {
    is_shifted_series(label) && (is_test_number_series(label) || is_positivity_series(label))
}

/// Base name of a positive/negative test pair.
pub fn get_test_pair_base_name(label: &str) -> String {
    normalize_series_name(label)
        .replace(POSITIVE_TESTS_SUFFIX, "")
        .replace(NEGATIVE_TESTS_SUFFIX, "")
}

fn strip_shift_suffixes(label: &str) -> String {
    let without_waves = WAVE_SHIFT.replace_all(label, "");
    DAY_SHIFT.replace_all(&without_waves, "").into_owned()
}

/// Removes every shift and extreme-marker suffix.
pub fn strip_shift_and_extreme_suffixes(label: &str) -> String {
    let stripped = strip_shift_suffixes(label);
    EXTREME_MARKER.replace_all(&stripped, "").into_owned()
}

/// Pre-shift identity of a label, in canonical English.
///
/// Labels that are not shifted come back unchanged. Anything that still reads
/// as shifted after the known suffixes are removed is cut at the keyword, so
/// the result is never classified as shifted.
pub fn get_base_series_name_without_shift(label: &str) -> String {
    if !is_shifted_series(label) {
        return label.to_string();
    }

    let stripped = strip_shift_suffixes(&normalize_series_name(label));
    match stripped.to_ascii_lowercase().find(SHIFTED_SERIES_IDENTIFIER) {
        Some(position) => stripped[..position].trim_end().to_string(),
        None => stripped,
    }
}

/// Collapses every shift amount and alignment mode to a single ` shifted`
/// marker, so labels that only differ in how far they are shifted share a key.
pub fn get_base_series_name(label: &str) -> String {
    if !is_shifted_series(label) {
        return label.to_string();
    }

    let normalized = normalize_series_name(label);
    let collapsed = WAVE_SHIFT.replace_all(&normalized, " shifted");
    DAY_SHIFT.replace_all(&collapsed, " shifted").trim().to_string()
}
