// Default visibility, display ordering and remembered visibility choices

use super::naming::{
    get_base_series_name, is_averaged_series, is_min_max_series, is_negative_test_series,
    is_positive_test_series, is_positivity_series, is_shifted_series, is_test_number_series,
};
use super::timeseries::{DataSeries, SeriesKey, SeriesType};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const PRIORITY_POSITIVITY: u8 = 0;
pub const PRIORITY_POSITIVITY_SHIFTED: u8 = 1;
pub const PRIORITY_POSITIVITY_AVERAGED: u8 = 2;
pub const PRIORITY_POSITIVE_TESTS: u8 = 3;
pub const PRIORITY_NEGATIVE_TESTS: u8 = 4;
pub const PRIORITY_POSITIVE_TESTS_SHIFTED: u8 = 5;
pub const PRIORITY_NEGATIVE_TESTS_SHIFTED: u8 = 6;
pub const PRIORITY_OTHER: u8 = 7;

/// Presentation toggles that shape default visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityToggles {
    pub show_shifted: bool,
    pub show_test_numbers: bool,
    pub show_shifted_test_numbers: bool,
    pub show_non_averaged_series: bool,
}

pub fn is_non_averaged_series(series_type: SeriesType) -> bool {
    series_type == SeriesType::Raw
}

/// Starting visibility for a label. First matching rule wins.
///
/// `show_shifted` decides whether shifted series exist in a chart at all,
/// not whether they start out visible.
pub fn get_visibility_default(label: &str, toggles: &VisibilityToggles, series_type: Option<SeriesType>) -> bool {
    if is_min_max_series(label) {
        return false;
    }

    let shifted = is_shifted_series(label);
    let test_number = is_test_number_series(label);

    if shifted && test_number {
        return toggles.show_shifted_test_numbers;
    }
    if shifted {
        return false;
    }
    if test_number {
        return toggles.show_test_numbers;
    }
    if series_type.is_some_and(is_non_averaged_series) && !toggles.show_non_averaged_series {
        return false;
    }

    true
}

/// Sort rank in `0..=7`, lower first. Test pairs are checked before
/// positivity since their names contain "Positivity" too.
pub fn get_series_type_priority(label: &str) -> u8 {
    let shifted = is_shifted_series(label);

    if is_positive_test_series(label) {
        return if shifted { PRIORITY_POSITIVE_TESTS_SHIFTED } else { PRIORITY_POSITIVE_TESTS };
    }
    if is_negative_test_series(label) {
        return if shifted { PRIORITY_NEGATIVE_TESTS_SHIFTED } else { PRIORITY_NEGATIVE_TESTS };
    }
    if is_positivity_series(label) {
        if shifted {
            return PRIORITY_POSITIVITY_SHIFTED;
        }
        if is_averaged_series(label) {
            return PRIORITY_POSITIVITY_AVERAGED;
        }
        return PRIORITY_POSITIVITY;
    }

    PRIORITY_OTHER
}

/// Fewer words first, then alphabetical ignoring case.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    let words_a = a.split_whitespace().count();
    let words_b = b.split_whitespace().count();
    words_a
        .cmp(&words_b)
        .then_with(|| a.chars().flat_map(char::to_lowercase).cmp(b.chars().flat_map(char::to_lowercase)))
        .then_with(|| a.cmp(b))
}

/// Indices of `series` in display order: type priority, then label.
pub fn sort_series_for_display(series: &[DataSeries]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..series.len()).collect();
    order.sort_by(|&a, &b| {
        let (la, lb) = (&series[a].name, &series[b].name);
        get_series_type_priority(la)
            .cmp(&get_series_type_priority(lb))
            .then_with(|| compare_labels(la, lb))
    });
    order
}

/// Visibility choices keyed by stable series identity, so they survive
/// language switches and changes of shift amount or alignment mode.
#[derive(Debug, Clone, Default)]
pub struct VisibilityStore {
    entries: HashMap<SeriesKey, bool>,
}

impl VisibilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SeriesKey) -> Option<bool> {
        self.entries.get(key).copied()
    }

    pub fn set(&mut self, key: SeriesKey, visible: bool) {
        self.entries.insert(key, visible);
    }

    /// Sets the series whose key renders as `rendered_key`; false when no
    /// such series has been seen.
    pub fn set_matching(&mut self, rendered_key: &str, visible: bool) -> bool {
        match self.entries.iter_mut().find(|(key, _)| key.to_string() == rendered_key) {
            Some((_, entry)) => {
                *entry = visible;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seeds unknown series with their default, forgets series that are gone,
    /// and returns the visibility of each series in order.
    pub fn reconcile(&mut self, series: &[DataSeries], toggles: &VisibilityToggles) -> Vec<bool> {
        let present: HashSet<&SeriesKey> = series.iter().map(|s| &s.key).collect();
        self.entries.retain(|key, _| present.contains(key));

        series
            .iter()
            .map(|s| {
                *self
                    .entries
                    .entry(s.key.clone())
                    .or_insert_with(|| get_visibility_default(&s.name, toggles, Some(s.series_type)))
            })
            .collect()
    }
}

/// Label-keyed variant for stored maps that predate [`SeriesKey`]: a new
/// label inherits the most recent stored choice with the same base name.
pub fn preserve_visibility_by_label(
    stored: &[(String, bool)],
    current_labels: &[String],
    toggles: &VisibilityToggles,
) -> Vec<(String, bool)> {
    let mut result: Vec<(String, bool)> = Vec::with_capacity(current_labels.len());

    for label in current_labels {
        let visible = match stored.iter().find(|(name, _)| name == label) {
            Some((_, visible)) => *visible,
            None => {
                let base = get_base_series_name(label);
                stored
                    .iter()
                    .rev()
                    .find(|(name, _)| get_base_series_name(name) == base)
                    .map(|(_, visible)| *visible)
                    .unwrap_or_else(|| get_visibility_default(label, toggles, None))
            }
        };
        result.push((label.clone(), visible));
    }

    result
}
