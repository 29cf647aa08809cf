// HTTP request handlers
use crate::application::chart_service::RenderRequest;
use crate::application::custom_graph_service::SeriesSelection;
use crate::domain::chart::AlignByExtreme;
use crate::domain::locale::Language;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::json_response;
use crate::infrastructure::json_mapper::{
    chart_summary_to_json, chart_to_json, custom_graph_to_json, ChartSummaryDto,
};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Largest accepted day shift in either direction, about a century.
const MAX_SHIFT_DAYS: i64 = 36_525;

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    /// Comma separated averaging windows in days, e.g. `28,7`.
    pub windows: Option<String>,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub shifted: Option<bool>,
    pub test_numbers: Option<bool>,
    pub shifted_test_numbers: Option<bool>,
    pub non_averaged: Option<bool>,
    /// `maxima`, `minima` or `days`.
    pub align: Option<String>,
    pub shift: Option<i64>,
    pub future: Option<bool>,
    pub lang: Option<String>,
}

impl ChartQuery {
    pub fn to_request(&self) -> Result<RenderRequest, String> {
        let averaging_windows = match self.windows.as_deref() {
            Some(raw) => Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(|w| match w.parse::<u32>() {
                        Ok(days) if days > 0 => Ok(days),
                        _ => Err(format!("invalid averaging window: {}", w)),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        let align_by_extreme = match self.align.as_deref() {
            Some(mode) => Some(AlignByExtreme::parse(mode).ok_or_else(|| format!("invalid align mode: {}", mode))?),
            None => None,
        };

        if let Some(days) = self.shift.filter(|d| d.unsigned_abs() > MAX_SHIFT_DAYS.unsigned_abs()) {
            return Err(format!("shift out of range: {}", days));
        }

        Ok(RenderRequest {
            averaging_windows,
            country: self.country.clone(),
            survtype: self.survtype.clone(),
            show_shifted: self.shifted,
            show_test_numbers: self.test_numbers,
            show_shifted_test_numbers: self.shifted_test_numbers,
            show_non_averaged_series: self.non_averaged,
            align_by_extreme,
            shift_override: self.shift,
            include_future: self.future,
        })
    }

    pub fn language(&self) -> Result<Language, String> {
        match self.lang.as_deref() {
            Some(code) => Language::from_code(code).ok_or_else(|| format!("unsupported language: {}", code)),
            None => Ok(Language::default()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VisibilityUpdate {
    pub key: String,
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionBody {
    pub chart_id: String,
    pub series_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomGraphBody {
    pub selections: Vec<SelectionBody>,
}

fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false)
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

fn into_response(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured charts
pub async fn list_charts(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let charts: Vec<ChartSummaryDto> = state.chart_service.charts().iter().map(chart_summary_to_json).collect();
    into_response(json_response(&charts, accepts_brotli(&headers)).await)
}

/// Render one chart
pub async fn get_chart(
    Path(id): Path<String>,
    Query(query): Query<ChartQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let (request, language) = match (query.to_request(), query.language()) {
        (Ok(request), Ok(language)) => (request, language),
        (Err(message), _) | (_, Err(message)) => return bad_request(message),
    };
    let Some(chart) = state.chart_service.find_chart(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.chart_service.render(chart, &request).await {
        Ok(view) => into_response(json_response(&chart_to_json(chart, &view, language), accepts_brotli(&headers)).await),
        Err(e) => {
            tracing::error!("Error rendering chart {}: {:#}", id, e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Stream all charts (progressive loading)
pub async fn stream_charts(
    Query(query): Query<ChartQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let (request, language) = match (query.to_request(), query.language()) {
        (Ok(request), Ok(language)) => (request, language),
        (Err(message), _) | (_, Err(message)) => return bad_request(message),
    };

    let rx = state.chart_service.stream_charts(request, language);
    stream_from_receiver(rx, accepts_brotli(&headers)).await.into_response()
}

/// Show or hide a rendered series
pub async fn set_visibility(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<VisibilityUpdate>,
) -> StatusCode {
    if state.chart_service.set_visibility(&id, &update.key, update.visible).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Assemble series from several charts into one graph
pub async fn custom_graph(
    Query(query): Query<ChartQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CustomGraphBody>,
) -> Response {
    let (request, language) = match (query.to_request(), query.language()) {
        (Ok(request), Ok(language)) => (request, language),
        (Err(message), _) | (_, Err(message)) => return bad_request(message),
    };

    let selections: Vec<SeriesSelection> = body
        .selections
        .into_iter()
        .map(|s| SeriesSelection { chart_id: s.chart_id, series_name: s.series_name })
        .collect();
    let data = state.custom_graph_service.assemble(&selections, &request).await;

    into_response(json_response(&custom_graph_to_json(&data, language), accepts_brotli(&headers)).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_request() {
        let query = ChartQuery {
            windows: Some("28, 7".to_string()),
            align: Some("days".to_string()),
            shift: Some(-14),
            shifted: Some(true),
            lang: Some("cs".to_string()),
            ..ChartQuery::default()
        };
        let request = query.to_request().unwrap();
        assert_eq!(request.averaging_windows, Some(vec![28, 7]));
        assert_eq!(request.align_by_extreme, Some(AlignByExtreme::Days));
        assert_eq!(request.shift_override, Some(-14));
        assert_eq!(request.show_shifted, Some(true));
        assert_eq!(query.language(), Ok(Language::Cs));

        assert_eq!(ChartQuery::default().to_request(), Ok(RenderRequest::default()));
    }

    #[test]
    fn test_query_rejects_bad_values() {
        let zero = ChartQuery { windows: Some("0".to_string()), ..ChartQuery::default() };
        assert!(zero.to_request().is_err());

        let align = ChartQuery { align: Some("peaks".to_string()), ..ChartQuery::default() };
        assert_eq!(align.to_request(), Err("invalid align mode: peaks".to_string()));

        for shift in [i64::MIN, i64::MAX, -MAX_SHIFT_DAYS - 1] {
            let query = ChartQuery { shift: Some(shift), ..ChartQuery::default() };
            assert_eq!(query.to_request(), Err(format!("shift out of range: {}", shift)));
        }
        let edge = ChartQuery { shift: Some(-MAX_SHIFT_DAYS), ..ChartQuery::default() };
        assert_eq!(edge.to_request().map(|r| r.shift_override), Ok(Some(-MAX_SHIFT_DAYS)));

        let lang = ChartQuery { lang: Some("de".to_string()), ..ChartQuery::default() };
        assert!(lang.language().is_err());
    }

    #[test]
    fn test_accepts_brotli() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_brotli(&headers));
        headers.insert("accept-encoding", "gzip, br".parse().unwrap());
        assert!(accepts_brotli(&headers));
    }
}
