// Custom graph assembly: one aligned timeseries out of series picked across charts

use super::locale::normalize_series_name;
use super::naming::is_shifted_series;
use super::timeseries::{DataSeries, DataType, Sample, SeriesKind, SeriesValues, TimeseriesData};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Country filter value that stands for the EU aggregate.
pub const EU_AGGREGATE: &str = "EU/EEA";

/// Reference to a series of a rendered chart, resolved at assembly time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomGraphSelection {
    pub source_chart_index: usize,
    /// Canonical English series name.
    pub series_name: String,
}

impl CustomGraphSelection {
    pub fn new(source_chart_index: usize, series_name: impl Into<String>) -> Self {
        Self {
            source_chart_index,
            series_name: series_name.into(),
        }
    }
}

/// What the assembler needs to know about a rendered chart.
#[derive(Debug, Clone, Default)]
pub struct SourceChartInfo {
    pub data: TimeseriesData,
    pub short_title: String,
    pub is_custom_graph: bool,
    pub country_filter: Option<String>,
    pub survtype_filter: Option<String>,
}

impl SourceChartInfo {
    pub fn new(data: TimeseriesData, short_title: impl Into<String>) -> Self {
        Self {
            data,
            short_title: short_title.into(),
            ..Default::default()
        }
    }

    pub fn with_country_filter(mut self, country: impl Into<String>) -> Self {
        self.country_filter = Some(country.into());
        self
    }

    pub fn with_survtype_filter(mut self, survtype: impl Into<String>) -> Self {
        self.survtype_filter = Some(survtype.into());
        self
    }

    fn accepts(&self, series: &DataSeries) -> bool {
        series.matches_filters(self.country_filter.as_deref(), self.survtype_filter.as_deref())
    }

    fn display_suffix(&self) -> String {
        match self.country_filter.as_deref() {
            Some(country) if country != EU_AGGREGATE => format!("{} - {}", self.short_title, country),
            _ => self.short_title.clone(),
        }
    }
}

/// How a value missing from a source is weighted between its anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationWeighting {
    /// Position in the merged date list.
    #[default]
    MergedIndex,
    /// Calendar days between the anchor dates.
    ElapsedDays,
}

struct Picked<'a> {
    series: &'a DataSeries,
    source_dates: &'a [String],
    name: String,
}

fn is_shifted(series: &DataSeries) -> bool {
    matches!(series.kind, SeriesKind::Shifted { .. }) || is_shifted_series(&series.name)
}

fn day_number(date: &str) -> Option<i64> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.signed_duration_since(NaiveDate::MIN).num_days())
}

fn interpolation_ratio(
    dates: &[String],
    index: usize,
    previous: usize,
    next: usize,
    weighting: InterpolationWeighting,
) -> f64 {
    let by_index = (index - previous) as f64 / (next - previous) as f64;
    match weighting {
        InterpolationWeighting::MergedIndex => by_index,
        InterpolationWeighting::ElapsedDays => {
            match (day_number(&dates[previous]), day_number(&dates[index]), day_number(&dates[next])) {
                (Some(p), Some(i), Some(n)) if n != p => (i - p) as f64 / (n - p) as f64,
                _ => by_index,
            }
        }
    }
}

fn align<T: Sample>(
    values: &[Option<T>],
    source_index: &HashMap<&str, usize>,
    dates: &[String],
    weighting: InterpolationWeighting,
) -> Vec<Option<T>> {
    let in_source = |i: usize| source_index.contains_key(dates[i].as_str());
    let value_at = |i: usize| -> Option<T> {
        source_index
            .get(dates[i].as_str())
            .and_then(|&s| values.get(s).copied().flatten())
    };

    (0..dates.len())
        .map(|index| {
            if let Some(&s) = source_index.get(dates[index].as_str()) {
                if s < values.len() {
                    return values[s];
                }
            }

            let previous = (0..index).rev().find(|&i| in_source(i))?;
            let next = (index + 1..dates.len()).find(|&i| in_source(i))?;
            let (before, after) = (value_at(previous)?, value_at(next)?);

            let ratio = interpolation_ratio(dates, index, previous, next, weighting);
            Some(before.lerp(after, ratio))
        })
        .collect()
}

/// Assembles the selected series onto one merged date grid, weighting
/// interpolated values by merged-list position.
pub fn assemble_custom_graph_data(
    selections: &[CustomGraphSelection],
    source_charts: &[SourceChartInfo],
    show_shifted: bool,
) -> TimeseriesData {
    assemble_custom_graph_data_with(selections, source_charts, show_shifted, InterpolationWeighting::default())
}

/// Assembles the selected series onto one merged date grid.
///
/// Selections that point at a missing chart, a custom graph, a series that
/// is filtered out or absent, a hidden shifted series, a scalar series, or a
/// series already picked from the same chart are skipped. Dates missing from
/// a source are interpolated between its nearest dates on either side, or
/// left as gaps at the ends.
pub fn assemble_custom_graph_data_with(
    selections: &[CustomGraphSelection],
    source_charts: &[SourceChartInfo],
    show_shifted: bool,
    weighting: InterpolationWeighting,
) -> TimeseriesData {
    if selections.is_empty() {
        return TimeseriesData::empty();
    }

    let mut all_dates: BTreeSet<&str> = BTreeSet::new();
    let mut processed_charts: HashSet<usize> = HashSet::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut picked: Vec<Picked> = Vec::new();

    for selection in selections {
        let Some(chart) = source_charts.get(selection.source_chart_index) else {
            continue;
        };
        if chart.is_custom_graph {
            continue;
        }

        let Some(series) = chart
            .data
            .series
            .iter()
            .filter(|s| chart.accepts(s))
            .find(|s| normalize_series_name(&s.name) == selection.series_name)
        else {
            continue;
        };

        if !show_shifted && is_shifted(series) {
            continue;
        }
        if series.data_type() != DataType::Positivity {
            continue;
        }
        if !seen.insert(format!("{}:{}", selection.source_chart_index, series.name)) {
            continue;
        }

        if processed_charts.insert(selection.source_chart_index) {
            all_dates.extend(chart.data.dates.iter().map(String::as_str));
        }

        picked.push(Picked {
            series,
            source_dates: &chart.data.dates,
            name: format!("{} ({})", series.name, chart.display_suffix()),
        });
    }

    let dates: Vec<String> = all_dates.into_iter().map(str::to_string).collect();

    let series = picked
        .into_iter()
        .map(|p| {
            let source_index: HashMap<&str, usize> =
                p.source_dates.iter().enumerate().map(|(i, d)| (d.as_str(), i)).collect();
            let values = match &p.series.values {
                SeriesValues::Positivity(v) => SeriesValues::Positivity(align(v, &source_index, &dates, weighting)),
                SeriesValues::Scalar(v) => SeriesValues::Scalar(align(v, &source_index, &dates, weighting)),
            };
            DataSeries {
                name: p.name,
                values,
                ..p.series.clone()
            }
        })
        .collect();

    TimeseriesData::new(dates, series)
}
