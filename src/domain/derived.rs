// Derived series: moving averages, local extremes, shift alignment and ratios

use super::timeseries::{
    DataSeries, Datapoint, ExtremeKind, ExtremeSeries, Sample, ScalarDatapoint, SeriesKind, SeriesType,
    SeriesValues, ShiftLabel, TestSign, TimeseriesData,
};
use chrono::{Days, NaiveDate};
use std::cmp::Ordering;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts a window length in days to index units, never below one sample.
pub fn window_size_days_to_index(window_size_in_days: u32, frequency_in_days: u32) -> usize {
    let index = (window_size_in_days as f64 / frequency_in_days.max(1) as f64).round() as usize;
    index.max(1)
}

fn moving_average<T: Sample>(values: &[Option<T>], window_size_in_index: usize) -> Vec<Option<T>> {
    if values.is_empty() {
        return Vec::new();
    }

    let radius = (window_size_in_index / 2) as i64;
    let last = values.len() as i64 - 1;

    (0..values.len() as i64)
        .map(|center| {
            let mut sum: Option<T> = None;
            let mut count = 0usize;
            for offset in -radius..=radius {
                // edges replicate the first/last sample
                let index = (center + offset).clamp(0, last) as usize;
                if let Some(value) = values[index] {
                    sum = Some(match sum {
                        Some(acc) => acc.zip_with(value, |a, b| a + b),
                        None => value,
                    });
                    count += 1;
                }
            }
            sum.map(|total| total.map(|field| field / count as f64))
        })
        .collect()
}

fn average_values(values: &SeriesValues, window_size_in_index: usize) -> SeriesValues {
    match values {
        SeriesValues::Positivity(v) => SeriesValues::Positivity(moving_average(v, window_size_in_index)),
        SeriesValues::Scalar(v) => SeriesValues::Scalar(moving_average(v, window_size_in_index)),
    }
}

/// Appends a centered moving average of every series for every window.
///
/// Originals are kept in front; the averaged variants follow, grouped by
/// series, each as long as its input.
pub fn compute_moving_average_timeseries(data: &TimeseriesData, window_sizes_in_days: &[u32]) -> TimeseriesData {
    let averaged = data.series.iter().flat_map(|series| {
        window_sizes_in_days.iter().map(move |&window_days| {
            let window_size_in_index = window_size_days_to_index(window_days, series.frequency_in_days);
            let mut derived = series.derive(
                SeriesKind::Averaged { window_days },
                average_values(&series.values, window_size_in_index),
            );
            derived.series_type = SeriesType::Averaged;
            derived.window_size_in_index = Some(window_size_in_index);
            derived
        })
    });

    let series = data.series.iter().cloned().chain(averaged).collect();
    TimeseriesData::new(data.dates.clone(), series)
}

fn is_extreme_window(values: &SeriesValues, index: usize, half_window: usize, extreme: ExtremeKind) -> bool {
    let center = values.metric_at(index);
    if center.is_nan() {
        return false;
    }

    let start = index.saturating_sub(half_window);
    let end = (index + half_window).min(values.len() - 1);

    (start..=end).filter(|&i| i != index).all(|i| {
        let neighbour = values.metric_at(i);
        let better = match extreme {
            ExtremeKind::Maxima => Ordering::Greater,
            ExtremeKind::Minima => Ordering::Less,
        };
        neighbour.partial_cmp(&center) != Some(better)
    })
}

/// Local extremes of an averaged series whose window matches
/// `desired_window_size_in_days`. Edges never qualify, and a neighbour only
/// disqualifies when it is strictly better, so plateaus flag every member.
pub fn find_local_extreme(
    series: &DataSeries,
    desired_window_size_in_days: u32,
    extreme: ExtremeKind,
) -> Option<ExtremeSeries> {
    if series.series_type != SeriesType::Averaged {
        return None;
    }
    let resolved_days = series
        .window_size_in_index
        .map(|w| w as u64 * series.frequency_in_days as u64)?;
    if resolved_days != desired_window_size_in_days as u64 {
        return None;
    }
    if series.len() < 3 {
        return None;
    }

    let window_size_in_index = window_size_days_to_index(desired_window_size_in_days, series.frequency_in_days);
    let half_window = window_size_in_index / 2;

    let indices: Vec<usize> = (1..series.len() - 1)
        .filter(|&i| is_extreme_window(&series.values, i, half_window, extreme))
        .collect();

    if indices.is_empty() {
        return None;
    }
    Some(ExtremeSeries::new(&series.name, extreme, desired_window_size_in_days, indices))
}

pub fn find_local_maxima(series: &DataSeries, desired_window_size_in_days: u32) -> Option<ExtremeSeries> {
    find_local_extreme(series, desired_window_size_in_days, ExtremeKind::Maxima)
}

pub fn find_local_minima(series: &DataSeries, desired_window_size_in_days: u32) -> Option<ExtremeSeries> {
    find_local_extreme(series, desired_window_size_in_days, ExtremeKind::Minima)
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[middle - 1] + values[middle]) / 2.0
    } else {
        values[middle]
    }
}

fn filter_extremes(series: &DataSeries, maxima: &[usize], minima: &[usize], requested: ExtremeKind) -> Vec<usize> {
    let requested_indices = match requested {
        ExtremeKind::Maxima => maxima,
        ExtremeKind::Minima => minima,
    };
    if maxima.is_empty() || minima.is_empty() {
        return requested_indices.to_vec();
    }

    let present = |indices: &[usize]| -> Vec<f64> {
        indices
            .iter()
            .map(|&i| series.values.metric_at(i))
            .filter(|v| !v.is_nan())
            .collect()
    };
    let median_maxima = median(&mut present(maxima));
    let median_minima = median(&mut present(minima));
    if median_maxima.is_nan() || median_minima.is_nan() {
        return requested_indices.to_vec();
    }

    let halfway = (median_maxima + median_minima) / 2.0;
    requested_indices
        .iter()
        .copied()
        .filter(|&i| {
            let value = series.values.metric_at(i);
            match requested {
                ExtremeKind::Maxima => value >= halfway,
                ExtremeKind::Minima => value <= halfway,
            }
        })
        .collect()
}

/// Drops shallow extremes: maxima below, and minima above, the midpoint
/// between the median maximum and the median minimum of `series`.
/// Extreme series left without indices are removed.
pub fn filter_extremes_by_median_threshold(
    series: &DataSeries,
    maxima: &[ExtremeSeries],
    minima: &[ExtremeSeries],
) -> (Vec<ExtremeSeries>, Vec<ExtremeSeries>) {
    let all_maxima: Vec<usize> = maxima.iter().flat_map(|e| e.indices.iter().copied()).collect();
    let all_minima: Vec<usize> = minima.iter().flat_map(|e| e.indices.iter().copied()).collect();

    let keep = |extremes: &[ExtremeSeries], requested: ExtremeKind| -> Vec<ExtremeSeries> {
        let kept = filter_extremes(series, &all_maxima, &all_minima, requested);
        extremes
            .iter()
            .map(|e| ExtremeSeries {
                indices: kept.iter().copied().filter(|i| e.indices.contains(i)).collect(),
                ..e.clone()
            })
            .filter(|e| !e.indices.is_empty())
            .collect()
    };

    (keep(maxima, ExtremeKind::Maxima), keep(minima, ExtremeKind::Minima))
}

/// Index distance between the extremes at two ranks counted back from the
/// most recent one (rank 1). `None` when either rank does not exist.
pub fn extreme_shift(extreme: &ExtremeSeries, from_rank: usize, to_rank: usize) -> Option<i64> {
    let len = extreme.indices.len();
    let at = |rank: usize| -> Option<i64> {
        if rank == 0 || rank > len {
            return None;
        }
        Some(extreme.indices[len - rank] as i64)
    };
    Some(at(to_rank)? - at(from_rank)?)
}

fn shift_slice<T: Copy>(values: &[Option<T>], delta: Option<i64>, length: usize) -> Vec<Option<T>> {
    (0..length)
        .map(|i| {
            let source = i64::try_from(i).ok()?.checked_add(delta?)?;
            let source = usize::try_from(source).ok()?;
            values.get(source).copied().flatten()
        })
        .collect()
}

fn shift_values(values: &SeriesValues, delta: Option<i64>, length: usize) -> SeriesValues {
    match values {
        SeriesValues::Positivity(v) => SeriesValues::Positivity(shift_slice(v, delta, length)),
        SeriesValues::Scalar(v) => SeriesValues::Scalar(shift_slice(v, delta, length)),
    }
}

/// Appends `extra_count` dates, `frequency_in_days` apart, after the last one.
/// Dates that are not ISO calendar dates are left unextended.
fn extend_dates(dates: &[String], extra_count: usize, frequency_in_days: u32) -> Vec<String> {
    let mut extended = dates.to_vec();
    let Some(last) = dates.last().and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()) else {
        return extended;
    };

    for step in 1..=extra_count as u64 {
        match last.checked_add_days(Days::new(step * frequency_in_days as u64)) {
            Some(date) => extended.push(date.format(DATE_FORMAT).to_string()),
            None => break,
        }
    }
    extended
}

/// Shared shift primitive: each series in `data` gets zero or more shifted
/// copies (emitted ahead of it), value `i` of a copy reading the parent at
/// `i + delta`. Reads outside the parent are gaps.
fn apply_shifts<F>(data: &TimeseriesData, include_future_dates: bool, shifts_for: F) -> TimeseriesData
where
    F: Fn(&DataSeries) -> Vec<(ShiftLabel, Option<i64>)>,
{
    let planned: Vec<Vec<(ShiftLabel, Option<i64>)>> = data.series.iter().map(&shifts_for).collect();

    // Past the parent's length a lookback only adds gaps.
    let largest_lookback = data
        .series
        .iter()
        .zip(&planned)
        .flat_map(|(parent, shifts)| {
            shifts
                .iter()
                .filter_map(|(_, delta)| *delta)
                .filter(|&delta| delta < 0)
                .map(|delta| usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX).min(parent.len()))
        })
        .max()
        .unwrap_or(0);

    let dates = if include_future_dates && largest_lookback > 0 {
        let frequency = data.series.first().map_or(1, |s| s.frequency_in_days);
        extend_dates(&data.dates, largest_lookback, frequency)
    } else {
        data.dates.clone()
    };
    let extra = dates.len() - data.dates.len();

    let mut series = Vec::with_capacity(data.series.len());
    for (parent, shifts) in data.series.iter().zip(planned) {
        for (label, delta) in shifts {
            let amount_days = delta.and_then(|d| d.checked_mul(i64::from(parent.frequency_in_days)));
            let values = shift_values(&parent.values, delta, parent.len() + extra);
            series.push(parent.derive(SeriesKind::Shifted { label, amount_days }, values));
        }
        let mut base = parent.clone();
        if extra > 0 {
            base.values = base.values.padded(extra);
        }
        series.push(base);
    }

    TimeseriesData::new(dates, series)
}

/// Shifts every series that has extremes so the extreme at `from_rank`
/// lines up with the one at `to_rank` (both counted back from the most
/// recent, which is rank 1).
pub fn shift_to_align_extreme_dates(
    data: &TimeseriesData,
    extremes: &[ExtremeSeries],
    from_rank: usize,
    to_rank: usize,
    include_future_dates: bool,
) -> TimeseriesData {
    let label = ShiftLabel::Waves { count: to_rank.abs_diff(from_rank) };
    apply_shifts(data, include_future_dates, |series| {
        extremes
            .iter()
            .filter(|e| e.original_series_name == series.name)
            .map(|e| (label, extreme_shift(e, from_rank, to_rank)))
            .collect()
    })
}

/// Shifts every series that is not already shifted by a fixed number of
/// days, rounded to whole samples.
pub fn shift_by_days(data: &TimeseriesData, days: i64, include_future_dates: bool) -> TimeseriesData {
    apply_shifts(data, include_future_dates, |series| {
        if matches!(series.kind, SeriesKind::Shifted { .. }) {
            return Vec::new();
        }
        let delta = (days as f64 / series.frequency_in_days as f64).round() as i64;
        vec![(ShiftLabel::Days, Some(delta))]
    })
}

/// Positive and negative test counts of a positivity series, as bar series.
pub fn split_test_numbers(series: &DataSeries) -> Option<(DataSeries, DataSeries)> {
    let values = series.values.as_positivity()?;

    let counts = |f: fn(&Datapoint) -> f64| -> SeriesValues {
        SeriesValues::Scalar(values.iter().map(|v| v.as_ref().map(|dp| ScalarDatapoint::new(f(dp)))).collect())
    };

    let positive = series.derive(SeriesKind::TestCount { sign: TestSign::Positive }, counts(|dp| dp.positive));
    let negative = series.derive(
        SeriesKind::TestCount { sign: TestSign::Negative },
        counts(|dp| dp.tests - dp.positive),
    );
    Some((positive, negative))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioData {
    pub series_name: String,
    pub ratio_7_days: Option<f64>,
    pub ratio_28_days: Option<f64>,
    pub last_data_date: Option<String>,
}

fn summed<T: Sample>(values: &[Option<T>]) -> Option<T> {
    values.iter().flatten().copied().reduce(|acc, v| acc.zip_with(v, |a, b| a + b))
}

fn period_metric<T: Sample>(values: &[Option<T>], start: usize, end: usize) -> Option<f64> {
    let window = values.get(start..end.min(values.len()))?;
    summed(window).map(|total| total.metric())
}

fn period_ratio(series: &DataSeries, end_index: usize, period_days: u32) -> Option<f64> {
    let period = (period_days / series.frequency_in_days) as usize;

    let current_end = end_index + 1;
    let current_start = current_end.saturating_sub(period);
    let previous_end = current_start;
    let previous_start = current_start.saturating_sub(period);
    if current_start >= current_end || previous_start >= previous_end {
        return None;
    }

    let (current, previous) = match &series.values {
        SeriesValues::Positivity(v) => (
            period_metric(v, current_start, current_end)?,
            period_metric(v, previous_start, previous_end)?,
        ),
        SeriesValues::Scalar(v) => (
            period_metric(v, current_start, current_end)?,
            period_metric(v, previous_start, previous_end)?,
        ),
    };

    let ratio = current / previous;
    ratio.is_finite().then_some(ratio)
}

/// Week-over-week and month-over-month change of each named series, for
/// periods ending at the last date not after `today` (`YYYY-MM-DD`).
pub fn calculate_ratios(data: &TimeseriesData, series_names: &[String], today: &str) -> Vec<RatioData> {
    let Some(end_index) = data.dates.iter().rposition(|d| d.as_str() <= today) else {
        return Vec::new();
    };

    series_names
        .iter()
        .map(|name| match data.find_series(name) {
            Some(series) => RatioData {
                series_name: name.clone(),
                ratio_7_days: period_ratio(series, end_index, 7),
                ratio_28_days: period_ratio(series, end_index, 28),
                last_data_date: Some(data.dates[end_index].clone()),
            },
            None => RatioData {
                series_name: name.clone(),
                ratio_7_days: None,
                ratio_28_days: None,
                last_data_date: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn percent_series(name: &str, percents: &[f64], frequency_in_days: u32) -> DataSeries {
        let values = percents.iter().map(|&p| Some(Datapoint::new(p, 100.0))).collect();
        DataSeries::positivity(name, values, frequency_in_days)
    }

    fn averaged(name: &str, percents: &[f64], window_size_in_index: usize, frequency_in_days: u32) -> DataSeries {
        let mut series = percent_series(name, percents, frequency_in_days).with_type(SeriesType::Averaged);
        series.window_size_in_index = Some(window_size_in_index);
        series
    }

    fn dates(count: usize) -> Vec<String> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..count as u64)
            .map(|i| start.checked_add_days(Days::new(i)).unwrap().format(DATE_FORMAT).to_string())
            .collect()
    }

    #[test]
    fn test_window_size_days_to_index() {
        assert_eq!(window_size_days_to_index(28, 1), 28);
        assert_eq!(window_size_days_to_index(28, 7), 4);
        assert_eq!(window_size_days_to_index(3, 7), 1);
        assert_eq!(window_size_days_to_index(0, 1), 1);
    }

    #[test]
    fn test_moving_average_replicates_edges() {
        let data = TimeseriesData::new(dates(5), vec![percent_series("A", &[1.0, 3.0, 2.0, 4.0, 1.0], 1)]);
        let result = compute_moving_average_timeseries(&data, &[3]);

        assert_eq!(result.series.len(), 2);
        assert_eq!(result.series[0], data.series[0]);

        let avg = &result.series[1];
        assert_eq!(avg.name, "A (3d avg)");
        assert_eq!(avg.series_type, SeriesType::Averaged);
        assert_eq!(avg.window_size_in_index, Some(3));
        assert_eq!(avg.len(), 5);

        let first = avg.values.as_positivity().unwrap()[0].unwrap();
        assert!((first.positive - (1.0 + 1.0 + 3.0) / 3.0).abs() < EPSILON);
        assert!((first.tests - 100.0).abs() < EPSILON);

        let last = avg.values.as_positivity().unwrap()[4].unwrap();
        assert!((last.positive - (4.0 + 1.0 + 1.0) / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_moving_average_skips_gaps() {
        let series = DataSeries::scalar(
            "Load",
            vec![Some(ScalarDatapoint::new(2.0)), None, Some(ScalarDatapoint::new(4.0)), None],
            7,
        );
        let data = TimeseriesData::new(dates(4), vec![series]);
        let result = compute_moving_average_timeseries(&data, &[21]);
        let avg = result.series[1].values.as_scalar().unwrap();

        assert_eq!(avg[1], Some(ScalarDatapoint::new(3.0)));
        assert_eq!(avg[3], Some(ScalarDatapoint::new(4.0)));
        assert!(result.is_aligned());
    }

    #[test]
    fn test_moving_average_of_empty_series() {
        let data = TimeseriesData::new(vec![], vec![percent_series("A", &[], 1)]);
        let result = compute_moving_average_timeseries(&data, &[28]);
        assert!(result.series[1].is_empty());
    }

    #[test]
    fn test_find_local_maxima() {
        let series = averaged("A", &[1.0, 3.0, 2.0, 4.0, 1.0], 3, 1);
        let maxima = find_local_maxima(&series, 3).unwrap();
        assert_eq!(maxima.indices, vec![1, 3]);
        assert_eq!(maxima.name, "A maxima over 3d");
        assert_eq!(maxima.original_series_name, "A");

        let minima = find_local_minima(&series, 3).unwrap();
        assert_eq!(minima.indices, vec![2]);
    }

    #[test]
    fn test_extremes_require_matching_window() {
        let series = averaged("A", &[1.0, 3.0, 2.0, 4.0, 1.0], 3, 1);
        assert!(find_local_maxima(&series, 5).is_none());

        let raw = percent_series("A", &[1.0, 3.0, 2.0, 4.0, 1.0], 1);
        assert!(find_local_maxima(&raw, 3).is_none());
    }

    #[test]
    fn test_extremes_exclude_edges() {
        let series = averaged("A", &[9.0, 1.0, 1.0, 1.0, 9.0], 3, 1);
        let maxima = find_local_maxima(&series, 3);
        assert!(maxima.is_none_or(|m| !m.indices.contains(&0) && !m.indices.contains(&4)));
    }

    #[test]
    fn test_plateau_flags_every_member() {
        let series = averaged("A", &[1.0, 5.0, 5.0, 1.0], 3, 1);
        assert_eq!(find_local_maxima(&series, 3).unwrap().indices, vec![1, 2]);
    }

    #[test]
    fn test_missing_center_is_never_extreme() {
        let mut series = averaged("A", &[1.0, 3.0, 2.0, 4.0, 1.0], 3, 1);
        if let SeriesValues::Positivity(values) = &mut series.values {
            values[3] = None;
        }
        assert_eq!(find_local_maxima(&series, 3).unwrap().indices, vec![1]);
    }

    #[test]
    fn test_filter_extremes_by_median_threshold() {
        let series = averaged("A", &[0.0, 10.0, 1.0, 3.0, 2.0, 9.0, 0.5, 0.0], 3, 1);
        let maxima = vec![ExtremeSeries::new("A", ExtremeKind::Maxima, 3, vec![1, 3, 5])];
        let minima = vec![ExtremeSeries::new("A", ExtremeKind::Minima, 3, vec![2, 4, 6])];

        // median maxima 9, median minima 1, halfway 5
        let (kept_maxima, kept_minima) = filter_extremes_by_median_threshold(&series, &maxima, &minima);
        assert_eq!(kept_maxima[0].indices, vec![1, 5]);
        assert_eq!(kept_minima[0].indices, vec![2, 4, 6]);
    }

    #[test]
    fn test_filter_passes_through_without_both_kinds() {
        let series = averaged("A", &[0.0, 10.0, 1.0], 3, 1);
        let maxima = vec![ExtremeSeries::new("A", ExtremeKind::Maxima, 3, vec![1])];
        let (kept_maxima, kept_minima) = filter_extremes_by_median_threshold(&series, &maxima, &[]);
        assert_eq!(kept_maxima, maxima);
        assert!(kept_minima.is_empty());
    }

    #[test]
    fn test_shift_to_align_extreme_dates() {
        let series = averaged("A", &[0.0, 5.0, 0.0, 0.0, 6.0, 0.0], 3, 7);
        let data = TimeseriesData::new(dates(6), vec![series.clone()]);
        let maxima = vec![ExtremeSeries::new("A", ExtremeKind::Maxima, 21, vec![1, 4])];

        let result = shift_to_align_extreme_dates(&data, &maxima, 1, 2, false);
        assert_eq!(result.series.len(), 2);
        assert!(result.is_aligned());

        let shifted = &result.series[0];
        assert_eq!(shifted.name, "A shifted by 1 wave -21d");
        let values = shifted.values.as_positivity().unwrap();
        assert_eq!(values[..3], [None, None, None]);
        // the older peak now sits on the most recent one
        assert_eq!(values[4], series.values.as_positivity().unwrap()[1]);

        assert_eq!(result.series[1], series);
    }

    #[test]
    fn test_shift_extends_future_dates() {
        let series = averaged("A", &[0.0, 5.0, 0.0, 0.0, 6.0, 0.0], 3, 7);
        let data = TimeseriesData::new(dates(6), vec![series]);
        let maxima = vec![ExtremeSeries::new("A", ExtremeKind::Maxima, 21, vec![1, 4])];

        let result = shift_to_align_extreme_dates(&data, &maxima, 1, 2, true);
        assert_eq!(result.dates.len(), 9);
        assert_eq!(result.dates[6], "2025-01-13");
        assert_eq!(result.dates[8], "2025-01-27");
        assert!(result.is_aligned());
        assert!(result.series[1].values.metric_at(7).is_nan());
    }

    #[test]
    fn test_shift_with_missing_rank_is_all_gaps() {
        let series = averaged("A", &[0.0, 5.0, 0.0], 3, 1);
        let data = TimeseriesData::new(dates(3), vec![series]);
        let maxima = vec![ExtremeSeries::new("A", ExtremeKind::Maxima, 3, vec![1])];

        let result = shift_to_align_extreme_dates(&data, &maxima, 1, 2, true);
        assert_eq!(result.dates.len(), 3);
        assert_eq!(result.series[0].name, "A shifted by 1 wave NaNd");
        assert!((0..3).all(|i| result.series[0].values.metric_at(i).is_nan()));
    }

    #[test]
    fn test_shift_by_days_rounds_to_samples() {
        let data = TimeseriesData::new(dates(4), vec![percent_series("A", &[1.0, 2.0, 3.0, 4.0], 7)]);
        let result = shift_by_days(&data, -10, false);

        assert_eq!(result.series[0].name, "A shifted by -7d");
        assert_eq!(result.series[0].values.metric_at(1), 1.0);
        assert!(result.series[0].values.metric_at(0).is_nan());

        let twice = shift_by_days(&result, -10, false);
        assert_eq!(twice.series.len(), 3);
    }

    #[test]
    fn test_shift_by_days_at_integer_extremes_is_all_gaps() {
        let data = TimeseriesData::new(dates(3), vec![percent_series("A", &[1.0, 2.0, 3.0], 1)]);

        for days in [i64::MIN, i64::MAX] {
            let result = shift_by_days(&data, days, false);
            assert_eq!(result.series.len(), 2);
            assert!(result.is_aligned());
            assert!((0..3).all(|i| result.series[0].values.metric_at(i).is_nan()));
            assert_eq!(result.series[1], data.series[0]);
        }

        let extended = shift_by_days(&data, i64::MIN, true);
        assert_eq!(extended.dates.len(), 6);
        assert!(extended.is_aligned());
    }

    #[test]
    fn test_future_extension_is_capped_at_series_length() {
        let data = TimeseriesData::new(dates(3), vec![percent_series("A", &[1.0, 2.0, 3.0], 1)]);
        let result = shift_by_days(&data, -2_000_000, true);

        assert_eq!(result.dates.len(), 6);
        assert_eq!(result.dates.last().map(String::as_str), Some("2025-01-06"));
        assert!(result.is_aligned());
        assert!((0..6).all(|i| result.series[0].values.metric_at(i).is_nan()));
    }

    #[test]
    fn test_split_test_numbers() {
        let series = DataSeries::positivity("PCR Positivity", vec![Some(Datapoint::new(5.0, 50.0)), None], 1);
        let (positive, negative) = split_test_numbers(&series).unwrap();

        assert_eq!(positive.name, "PCR Positivity - Positive Tests");
        assert_eq!(negative.name, "PCR Positivity - Negative Tests");
        assert_eq!(positive.values.metric_at(0), 5.0);
        assert_eq!(negative.values.metric_at(0), 45.0);
        assert!(negative.values.metric_at(1).is_nan());

        let load = DataSeries::scalar("Load", vec![], 7);
        assert!(split_test_numbers(&load).is_none());
    }

    #[test]
    fn test_calculate_ratios() {
        let mut percents = vec![10.0; 14];
        percents.extend(vec![20.0; 7]);
        let data = TimeseriesData::new(dates(21), vec![percent_series("A", &percents, 1)]);

        let ratios = calculate_ratios(&data, &["A".to_string(), "B".to_string()], "2025-01-21");
        assert_eq!(ratios.len(), 2);
        assert!((ratios[0].ratio_7_days.unwrap() - 2.0).abs() < EPSILON);
        // not enough history for two 28 day periods
        assert_eq!(ratios[0].ratio_28_days, None);
        assert_eq!(ratios[0].last_data_date.as_deref(), Some("2025-01-21"));
        assert_eq!(ratios[1].ratio_7_days, None);
        assert_eq!(ratios[1].last_data_date, None);
    }

    #[test]
    fn test_calculate_ratios_ignores_future_dates() {
        let data = TimeseriesData::new(dates(21), vec![percent_series("A", &[10.0; 21], 1)]);
        let ratios = calculate_ratios(&data, &["A".to_string()], "2025-01-14");
        assert_eq!(ratios[0].last_data_date.as_deref(), Some("2025-01-14"));
        assert!((ratios[0].ratio_7_days.unwrap() - 1.0).abs() < EPSILON);

        assert!(calculate_ratios(&data, &["A".to_string()], "2024-12-31").is_empty());
    }
}
