// Chart domain model and the render pipeline over a source timeseries
use super::derived::{
    calculate_ratios, compute_moving_average_timeseries, filter_extremes_by_median_threshold, find_local_maxima,
    find_local_minima, shift_by_days, shift_to_align_extreme_dates, split_test_numbers, RatioData,
};
use super::naming::{is_shifted_series, is_test_number_series};
use super::timeseries::{DataType, ExtremeSeries, SeriesKind, SeriesType, TimeseriesData};
use super::visibility::{sort_series_for_display, VisibilityStore, VisibilityToggles};

pub const DEFAULT_AVERAGING_WINDOW_DAYS: u32 = 28;

/// What shifted series are aligned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignByExtreme {
    /// A fixed number of days.
    Days,
    #[default]
    Maxima,
    Minima,
}

impl AlignByExtreme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "days" => Some(AlignByExtreme::Days),
            "maxima" => Some(AlignByExtreme::Maxima),
            "minima" => Some(AlignByExtreme::Minima),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlignByExtreme::Days => "days",
            AlignByExtreme::Maxima => "maxima",
            AlignByExtreme::Minima => "minima",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub toggles: VisibilityToggles,
    pub averaging_windows: Vec<u32>,
    pub extreme_window_days: u32,
    pub align_by_extreme: AlignByExtreme,
    /// Days to shift by in `Days` mode, waves to go back otherwise.
    pub shift_override: Option<i64>,
    pub include_future: bool,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub split_test_numbers: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            toggles: VisibilityToggles {
                show_shifted: true,
                show_test_numbers: false,
                show_shifted_test_numbers: false,
                show_non_averaged_series: false,
            },
            averaging_windows: vec![DEFAULT_AVERAGING_WINDOW_DAYS],
            extreme_window_days: DEFAULT_AVERAGING_WINDOW_DAYS,
            align_by_extreme: AlignByExtreme::default(),
            shift_override: Some(1),
            include_future: false,
            country: None,
            survtype: None,
            split_test_numbers: false,
        }
    }
}

/// A chart ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub data: TimeseriesData,
    pub maxima: Vec<ExtremeSeries>,
    pub minima: Vec<ExtremeSeries>,
    pub ratios: Vec<RatioData>,
    /// Visibility of `data.series`, index for index.
    pub visibility: Vec<bool>,
    /// Indices of `data.series` in legend order.
    pub display_order: Vec<usize>,
}

fn filter_series(data: &TimeseriesData, country: Option<&str>, survtype: Option<&str>) -> TimeseriesData {
    let series = data
        .series
        .iter()
        .filter(|s| s.matches_filters(country, survtype))
        .cloned()
        .collect();
    TimeseriesData::new(data.dates.clone(), series)
}

fn with_test_numbers(data: TimeseriesData) -> TimeseriesData {
    let mut series = Vec::with_capacity(data.series.len() * 3);
    for s in data.series {
        let split = (s.kind == SeriesKind::Raw && s.data_type() == DataType::Positivity)
            .then(|| split_test_numbers(&s))
            .flatten();
        series.push(s);
        if let Some((positive, negative)) = split {
            series.push(positive);
            series.push(negative);
        }
    }
    TimeseriesData::new(data.dates, series)
}

/// Extremes of every averaged series at the configured window, with shallow
/// ones filtered out.
fn detect_extremes(data: &TimeseriesData, window_days: u32) -> (Vec<ExtremeSeries>, Vec<ExtremeSeries>) {
    let mut maxima = Vec::new();
    let mut minima = Vec::new();

    for series in data.series.iter().filter(|s| s.series_type == SeriesType::Averaged) {
        let found_maxima: Vec<ExtremeSeries> = find_local_maxima(series, window_days).into_iter().collect();
        let found_minima: Vec<ExtremeSeries> = find_local_minima(series, window_days).into_iter().collect();
        let (kept_maxima, kept_minima) = filter_extremes_by_median_threshold(series, &found_maxima, &found_minima);
        maxima.extend(kept_maxima);
        minima.extend(kept_minima);
    }

    (maxima, minima)
}

fn apply_shift(
    data: TimeseriesData,
    settings: &RenderSettings,
    maxima: &[ExtremeSeries],
    minima: &[ExtremeSeries],
) -> TimeseriesData {
    if !settings.toggles.show_shifted {
        return data;
    }

    match settings.align_by_extreme {
        AlignByExtreme::Days => match settings.shift_override {
            Some(days) if days != 0 => shift_by_days(&data, days, settings.include_future),
            _ => data,
        },
        mode => {
            let waves = settings.shift_override.unwrap_or(1).max(1) as usize;
            let extremes = if mode == AlignByExtreme::Maxima { maxima } else { minima };
            shift_to_align_extreme_dates(&data, extremes, 1, 1 + waves, settings.include_future)
        }
    }
}

/// Runs the full derivation for one chart: filters, averages, splits test
/// numbers, finds extremes, shifts, then resolves visibility against
/// `visibility` and computes change ratios of the visible main series.
pub fn render_chart(
    source: &TimeseriesData,
    settings: &RenderSettings,
    visibility: &mut VisibilityStore,
    today: &str,
) -> ChartView {
    let filtered = filter_series(source, settings.country.as_deref(), settings.survtype.as_deref());
    let averaged = compute_moving_average_timeseries(&filtered, &settings.averaging_windows);
    let with_tests = if settings.split_test_numbers { with_test_numbers(averaged) } else { averaged };

    let (maxima, minima) = detect_extremes(&with_tests, settings.extreme_window_days);
    let data = apply_shift(with_tests, settings, &maxima, &minima);

    let visible = visibility.reconcile(&data.series, &settings.toggles);
    let display_order = sort_series_for_display(&data.series);

    let main_series: Vec<String> = data
        .series
        .iter()
        .zip(&visible)
        .filter(|(s, shown)| **shown && !is_shifted_series(&s.name) && !is_test_number_series(&s.name))
        .map(|(s, _)| s.name.clone())
        .collect();
    let ratios = calculate_ratios(&data, &main_series, today);

    ChartView {
        data,
        maxima,
        minima,
        ratios,
        visibility: visible,
        display_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timeseries::{DataSeries, Datapoint};

    fn weekly_dates(count: usize) -> Vec<String> {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count as u64)
            .map(|i| (start + chrono::Days::new(i * 7)).format("%Y-%m-%d").to_string())
            .collect()
    }

    /// Two clear waves, twelve weeks apart.
    fn wave_source() -> TimeseriesData {
        let percents = [
            1.0, 2.0, 4.0, 8.0, 12.0, 8.0, 4.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 4.0, 8.0, 14.0, 8.0, 4.0, 2.0, 1.0,
        ];
        let values = percents.iter().map(|&p| Some(Datapoint::new(p, 100.0))).collect();
        TimeseriesData::new(
            weekly_dates(percents.len()),
            vec![DataSeries::positivity("PCR Positivity", values, 7).with_source("cz")],
        )
    }

    fn settings() -> RenderSettings {
        RenderSettings {
            averaging_windows: vec![21],
            extreme_window_days: 21,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn test_align_by_extreme_parse() {
        assert_eq!(AlignByExtreme::parse("minima"), Some(AlignByExtreme::Minima));
        assert_eq!(AlignByExtreme::parse("weeks"), None);
        assert_eq!(AlignByExtreme::Days.as_str(), "days");
    }

    #[test]
    fn test_render_aligns_last_two_waves() {
        let mut store = VisibilityStore::new();
        let view = render_chart(&wave_source(), &settings(), &mut store, "2024-12-31");

        assert!(view.data.is_aligned());
        assert_eq!(view.maxima.len(), 1);
        assert_eq!(view.maxima[0].indices, vec![4, 15]);

        let names: Vec<&str> = view.data.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["PCR Positivity", "PCR Positivity (21d avg) shifted by 1 wave -77d", "PCR Positivity (21d avg)"]
        );
        assert_eq!(view.visibility, vec![false, false, true]);
        assert_eq!(view.display_order, vec![0, 1, 2]);

        assert_eq!(view.ratios.len(), 1);
        assert_eq!(view.ratios[0].series_name, "PCR Positivity (21d avg)");
    }

    #[test]
    fn test_render_without_shifted_series() {
        let mut store = VisibilityStore::new();
        let mut no_shift = settings();
        no_shift.toggles.show_shifted = false;

        let view = render_chart(&wave_source(), &no_shift, &mut store, "2024-12-31");
        assert_eq!(view.data.series.len(), 2);
        assert!(!view.maxima.is_empty());
    }

    #[test]
    fn test_render_shift_by_days_with_future_dates() {
        let mut store = VisibilityStore::new();
        let by_days = RenderSettings {
            align_by_extreme: AlignByExtreme::Days,
            shift_override: Some(-14),
            include_future: true,
            ..settings()
        };

        let view = render_chart(&wave_source(), &by_days, &mut store, "2024-12-31");
        assert_eq!(view.data.dates.len(), 22);
        assert!(view.data.is_aligned());
        assert!(view.data.find_series("PCR Positivity shifted by -14d").is_some());
        assert!(view.data.find_series("PCR Positivity (21d avg) shifted by -14d").is_some());
    }

    #[test]
    fn test_render_splits_test_numbers() {
        let mut store = VisibilityStore::new();
        let mut split = settings();
        split.split_test_numbers = true;
        split.toggles.show_shifted = false;
        split.toggles.show_test_numbers = true;

        let view = render_chart(&wave_source(), &split, &mut store, "2024-12-31");
        let positive = view.data.find_series("PCR Positivity (21d avg) - Positive Tests");
        assert!(positive.is_none());
        let index = view
            .data
            .series
            .iter()
            .position(|s| s.name == "PCR Positivity - Positive Tests")
            .unwrap();
        assert!(view.visibility[index]);
    }

    #[test]
    fn test_render_keeps_user_choice() {
        let mut store = VisibilityStore::new();
        let first = render_chart(&wave_source(), &settings(), &mut store, "2024-12-31");
        store.set(first.data.series[1].key.clone(), true);

        let mut two_waves = settings();
        two_waves.shift_override = Some(2);
        let second = render_chart(&wave_source(), &two_waves, &mut store, "2024-12-31");
        assert_eq!(second.data.series[1].name, "PCR Positivity (21d avg) shifted by 2 waves NaNd");
        assert!(second.visibility[1]);
    }

    #[test]
    fn test_render_filters_country() {
        let data = TimeseriesData::new(
            weekly_dates(1),
            vec![
                DataSeries::positivity("Influenza Positivity", vec![Some(Datapoint::new(1.0, 10.0))], 7)
                    .with_country("Austria"),
                DataSeries::positivity("Influenza Positivity", vec![Some(Datapoint::new(2.0, 10.0))], 7)
                    .with_country("EU/EEA"),
            ],
        );
        let filtered = RenderSettings { country: Some("EU/EEA".to_string()), ..settings() };
        let view = render_chart(&data, &filtered, &mut VisibilityStore::new(), "2024-12-31");
        assert!(view.data.series.iter().all(|s| s.country.as_deref() == Some("EU/EEA")));
        assert_eq!(view.data.series.len(), 2);
    }
}
