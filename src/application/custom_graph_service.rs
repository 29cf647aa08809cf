// Custom graph service - Combines series picked from several charts onto one date grid
use crate::application::chart_service::{ChartService, RenderRequest};
use crate::domain::custom_graph::{
    assemble_custom_graph_data_with, CustomGraphSelection, InterpolationWeighting, SourceChartInfo,
};
use crate::domain::chart::RenderSettings;
use crate::domain::locale::normalize_series_name;
use crate::domain::timeseries::TimeseriesData;
use crate::domain::visibility::VisibilityStore;
use crate::infrastructure::config::ChartConfig;

/// A series picked by chart id and display name (either language).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSelection {
    pub chart_id: String,
    pub series_name: String,
}

#[derive(Clone)]
pub struct CustomGraphService {
    charts: ChartService,
    weighting: InterpolationWeighting,
}

impl CustomGraphService {
    pub fn new(charts: ChartService, weighting: InterpolationWeighting) -> Self {
        Self { charts, weighting }
    }

    async fn source_chart(&self, chart: &ChartConfig, request: &RenderRequest) -> SourceChartInfo {
        // Renders here must not disturb the legend state of the charts themselves.
        let mut scratch = VisibilityStore::new();
        let data = match self.charts.render_with_store(chart, request, &mut scratch).await {
            Ok(view) => view.data,
            Err(e) => {
                tracing::warn!("Custom graph source {} unavailable: {:#}", chart.id, e);
                TimeseriesData::empty()
            }
        };

        let settings = self.charts.settings_for(chart, request);
        let mut info = SourceChartInfo::new(data, chart.short_title.clone());
        if let Some(country) = settings.country {
            info = info.with_country_filter(country);
        }
        if let Some(survtype) = settings.survtype {
            info = info.with_survtype_filter(survtype);
        }
        info
    }

    pub async fn assemble(&self, selections: &[SeriesSelection], request: &RenderRequest) -> TimeseriesData {
        let mut chart_ids: Vec<&str> = Vec::new();
        let mut picks = Vec::with_capacity(selections.len());
        for selection in selections {
            if self.charts.find_chart(&selection.chart_id).is_none() {
                tracing::warn!("Custom graph selection names unknown chart {}", selection.chart_id);
                continue;
            }
            let index = match chart_ids.iter().position(|id| *id == selection.chart_id) {
                Some(index) => index,
                None => {
                    chart_ids.push(&selection.chart_id);
                    chart_ids.len() - 1
                }
            };
            picks.push(CustomGraphSelection::new(index, normalize_series_name(&selection.series_name)));
        }

        let sources = futures::future::join_all(
            chart_ids
                .iter()
                .filter_map(|id| self.charts.find_chart(id))
                .map(|chart| self.source_chart(chart, request)),
        )
        .await;

        let show_shifted = request
            .show_shifted
            .unwrap_or(RenderSettings::default().toggles.show_shifted);
        let data = assemble_custom_graph_data_with(&picks, &sources, show_shifted, self.weighting);
        tracing::debug!(
            "Assembled custom graph: {} of {} selections, {} dates",
            data.series.len(),
            selections.len(),
            data.dates.len()
        );
        data
    }
}
