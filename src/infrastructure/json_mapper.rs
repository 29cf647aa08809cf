// Mapper to convert domain models to JSON transfer types
use crate::domain::chart::ChartView;
use crate::domain::derived::RatioData;
use crate::domain::locale::{translate_series_name, Language};
use crate::domain::timeseries::{DataSeries, ExtremeSeries, SeriesKind, SeriesValues, TimeseriesData};
use crate::infrastructure::config::ChartConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummaryDto {
    pub id: String,
    pub title: String,
    pub short_title: String,
    pub source: &'static str,
    pub country_filter: Option<String>,
    pub test_numbers: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositivityPointDto {
    pub positive: f64,
    pub tests: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SeriesValuesDto {
    Positivity(Vec<Option<PositivityPointDto>>),
    Scalar(Vec<Option<f64>>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDto {
    pub key: String,
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_days: Option<i64>,
    #[serde(rename = "type")]
    pub series_type: &'static str,
    pub data_type: &'static str,
    pub frequency_in_days: u32,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub visible: bool,
    /// Position in the legend.
    pub order: usize,
    pub values: SeriesValuesDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtremeDto {
    pub name: String,
    pub original_series_name: String,
    pub kind: &'static str,
    pub window_days: u32,
    pub indices: Vec<usize>,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioDto {
    pub series_name: String,
    pub ratio_7_days: Option<f64>,
    pub ratio_28_days: Option<f64>,
    pub last_data_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub id: String,
    pub title: String,
    pub short_title: String,
    pub language: &'static str,
    pub dates: Vec<String>,
    pub series: Vec<SeriesDto>,
    pub maxima: Vec<ExtremeDto>,
    pub minima: Vec<ExtremeDto>,
    pub ratios: Vec<RatioDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGraphResponse {
    pub language: &'static str,
    pub dates: Vec<String>,
    pub series: Vec<SeriesDto>,
}

/// One line of the chart stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamMessage {
    Skeleton { charts: Vec<ChartSummaryDto> },
    Chart { chart: Box<ChartResponse> },
    #[serde(rename_all = "camelCase")]
    Failed { chart_id: String, error: String },
    #[serde(rename_all = "camelCase")]
    Complete { total_charts: usize, duration_ms: u64 },
}

pub fn chart_summary_to_json(chart: &ChartConfig) -> ChartSummaryDto {
    ChartSummaryDto {
        id: chart.id.clone(),
        title: chart.title.clone(),
        short_title: chart.short_title.clone(),
        source: chart.source.as_str(),
        country_filter: chart.country_filter.clone(),
        test_numbers: chart.test_numbers,
    }
}

fn kind_name(kind: &SeriesKind) -> &'static str {
    match kind {
        SeriesKind::Raw => "raw",
        SeriesKind::Averaged { .. } => "averaged",
        SeriesKind::Shifted { .. } => "shifted",
        SeriesKind::TestCount { .. } => "testCount",
    }
}

fn values_to_json(values: &SeriesValues) -> SeriesValuesDto {
    match values {
        SeriesValues::Positivity(v) => SeriesValuesDto::Positivity(
            v.iter()
                .map(|p| p.map(|p| PositivityPointDto { positive: p.positive, tests: p.tests }))
                .collect(),
        ),
        SeriesValues::Scalar(v) => SeriesValuesDto::Scalar(v.iter().map(|p| p.map(|p| p.virus_load)).collect()),
    }
}

fn series_to_json(series: &DataSeries, language: Language, visible: bool, order: usize) -> SeriesDto {
    let shift_days = match series.kind {
        SeriesKind::Shifted { amount_days, .. } => amount_days,
        _ => None,
    };
    SeriesDto {
        key: series.key.to_string(),
        name: translate_series_name(&series.name, language),
        kind: kind_name(&series.kind),
        shift_days,
        series_type: series.series_type.as_str(),
        data_type: series.data_type().as_str(),
        frequency_in_days: series.frequency_in_days,
        country: series.country.clone(),
        survtype: series.survtype.clone(),
        visible,
        order,
        values: values_to_json(&series.values),
    }
}

fn extreme_to_json(extreme: &ExtremeSeries, dates: &[String], language: Language) -> ExtremeDto {
    ExtremeDto {
        name: translate_series_name(&extreme.name, language),
        original_series_name: translate_series_name(&extreme.original_series_name, language),
        kind: extreme.extreme.as_str(),
        window_days: extreme.window_days,
        indices: extreme.indices.clone(),
        dates: extreme.indices.iter().filter_map(|&i| dates.get(i).cloned()).collect(),
    }
}

fn ratio_to_json(ratio: &RatioData, language: Language) -> RatioDto {
    RatioDto {
        series_name: translate_series_name(&ratio.series_name, language),
        ratio_7_days: ratio.ratio_7_days,
        ratio_28_days: ratio.ratio_28_days,
        last_data_date: ratio.last_data_date.clone(),
    }
}

pub fn chart_to_json(chart: &ChartConfig, view: &ChartView, language: Language) -> ChartResponse {
    let mut order = vec![0; view.data.series.len()];
    for (position, &index) in view.display_order.iter().enumerate() {
        order[index] = position;
    }

    let series = view
        .data
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| series_to_json(s, language, view.visibility.get(i).copied().unwrap_or(true), order[i]))
        .collect();
    let extremes = |list: &[ExtremeSeries]| {
        list.iter()
            .map(|e| extreme_to_json(e, &view.data.dates, language))
            .collect::<Vec<_>>()
    };

    ChartResponse {
        id: chart.id.clone(),
        title: chart.title.clone(),
        short_title: chart.short_title.clone(),
        language: language.code(),
        dates: view.data.dates.clone(),
        series,
        maxima: extremes(&view.maxima),
        minima: extremes(&view.minima),
        ratios: view.ratios.iter().map(|r| ratio_to_json(r, language)).collect(),
    }
}

pub fn custom_graph_to_json(data: &TimeseriesData, language: Language) -> CustomGraphResponse {
    CustomGraphResponse {
        language: language.code(),
        dates: data.dates.clone(),
        series: data
            .series
            .iter()
            .enumerate()
            .map(|(i, s)| series_to_json(s, language, true, i))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timeseries::{Datapoint, ExtremeKind, ScalarDatapoint, SeriesType, ShiftLabel};
    use crate::infrastructure::config::SourceKind;
    use serde_json::json;

    fn chart_config() -> ChartConfig {
        ChartConfig {
            id: "mzcr".to_string(),
            title: "COVID-19 tests".to_string(),
            short_title: "CZ".to_string(),
            source: SourceKind::MzcrCovid,
            file: "testy.csv".to_string(),
            url: None,
            country_filter: None,
            preserve_survtype: false,
            test_numbers: true,
        }
    }

    fn view() -> ChartView {
        let raw = DataSeries::positivity(
            "PCR Positivity",
            vec![Some(Datapoint::new(1.0, 10.0)), None],
            1,
        )
        .with_source("mzcr");
        let shifted = raw
            .derive(
                SeriesKind::Shifted { label: ShiftLabel::Waves { count: 1 }, amount_days: Some(-347) },
                raw.values.clone(),
            )
            .with_type(SeriesType::Averaged);
        ChartView {
            data: TimeseriesData::new(vec!["2025-01-01".to_string(), "2025-01-02".to_string()], vec![shifted, raw]),
            maxima: vec![ExtremeSeries::new("PCR Positivity", ExtremeKind::Maxima, 28, vec![1])],
            minima: Vec::new(),
            ratios: vec![RatioData {
                series_name: "PCR Positivity".to_string(),
                ratio_7_days: Some(1.5),
                ratio_28_days: None,
                last_data_date: Some("2025-01-02".to_string()),
            }],
            visibility: vec![false, true],
            display_order: vec![1, 0],
        }
    }

    #[test]
    fn test_chart_to_json_in_czech() {
        let response = chart_to_json(&chart_config(), &view(), Language::Cs);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["language"], "cs");
        assert_eq!(value["series"][0]["name"], "PCR pozitivita posunuto o 1 vlna (-347 dnů)");
        assert_eq!(value["series"][0]["kind"], "shifted");
        assert_eq!(value["series"][0]["shiftDays"], -347);
        assert_eq!(value["series"][0]["type"], "averaged");
        assert_eq!(value["series"][0]["visible"], false);
        assert_eq!(value["series"][0]["order"], 1);
        assert_eq!(value["series"][1]["key"], "mzcr/PCR Positivity");
        assert_eq!(value["series"][1]["values"], json!([{"positive": 1.0, "tests": 10.0}, null]));
        assert!(value["series"][1].get("shiftDays").is_none());
        assert_eq!(value["maxima"][0]["dates"], json!(["2025-01-02"]));
        assert_eq!(value["ratios"][0]["seriesName"], "PCR pozitivita");
        assert_eq!(value["ratios"][0]["ratio7Days"], 1.5);
    }

    #[test]
    fn test_scalar_values_and_stream_messages() {
        let data = TimeseriesData::new(
            vec!["2025-01-06".to_string()],
            vec![DataSeries::scalar("RSV Wastewater", vec![Some(ScalarDatapoint::new(12.5))], 7)],
        );
        let value = serde_json::to_value(custom_graph_to_json(&data, Language::En)).unwrap();
        assert_eq!(value["series"][0]["values"], json!([12.5]));
        assert_eq!(value["series"][0]["dataType"], "scalar");

        let failed = StreamMessage::Failed { chart_id: "nl".to_string(), error: "gone".to_string() };
        assert_eq!(
            serde_json::to_value(failed).unwrap(),
            json!({"type": "failed", "chartId": "nl", "error": "gone"})
        );
        let complete = StreamMessage::Complete { total_charts: 6, duration_ms: 40 };
        assert_eq!(
            serde_json::to_value(complete).unwrap(),
            json!({"type": "complete", "totalCharts": 6, "durationMs": 40})
        );
    }
}
