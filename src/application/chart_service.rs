// Chart service - Loads sources and renders charts, one by one or as a progressive stream
use crate::application::source_repository::SourceRepository;
use crate::domain::chart::{render_chart, AlignByExtreme, ChartView, RenderSettings};
use crate::domain::locale::Language;
use crate::domain::visibility::{VisibilityStore, VisibilityToggles};
use crate::infrastructure::config::{ChartConfig, DashboardConfig};
use crate::infrastructure::json_mapper::{chart_summary_to_json, chart_to_json, StreamMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

/// Per-request overrides of the configured render defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    pub averaging_windows: Option<Vec<u32>>,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub show_shifted: Option<bool>,
    pub show_test_numbers: Option<bool>,
    pub show_shifted_test_numbers: Option<bool>,
    pub show_non_averaged_series: Option<bool>,
    pub align_by_extreme: Option<AlignByExtreme>,
    pub shift_override: Option<i64>,
    pub include_future: Option<bool>,
}

#[derive(Clone)]
pub struct ChartService {
    repository: Arc<dyn SourceRepository>,
    config: Arc<DashboardConfig>,
    visibility: Arc<Mutex<HashMap<String, VisibilityStore>>>,
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

impl ChartService {
    pub fn new(repository: Arc<dyn SourceRepository>, config: Arc<DashboardConfig>) -> Self {
        Self {
            repository,
            config,
            visibility: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn charts(&self) -> &[ChartConfig] {
        &self.config.charts
    }

    pub fn find_chart(&self, id: &str) -> Option<&ChartConfig> {
        self.config.chart(id)
    }

    /// Render defaults from configuration, the chart's own filter and the request, in that order.
    pub fn settings_for(&self, chart: &ChartConfig, request: &RenderRequest) -> RenderSettings {
        let defaults = RenderSettings::default();
        let render = &self.config.render;

        let toggles = VisibilityToggles {
            show_shifted: request.show_shifted.unwrap_or(defaults.toggles.show_shifted),
            show_test_numbers: request.show_test_numbers.unwrap_or(defaults.toggles.show_test_numbers),
            show_shifted_test_numbers: request
                .show_shifted_test_numbers
                .unwrap_or(defaults.toggles.show_shifted_test_numbers),
            show_non_averaged_series: request
                .show_non_averaged_series
                .unwrap_or(defaults.toggles.show_non_averaged_series),
        };

        RenderSettings {
            toggles,
            averaging_windows: request
                .averaging_windows
                .clone()
                .unwrap_or_else(|| render.averaging_windows.clone()),
            extreme_window_days: render.extreme_window_days,
            align_by_extreme: request.align_by_extreme.unwrap_or(defaults.align_by_extreme),
            shift_override: request.shift_override.or(defaults.shift_override),
            include_future: request.include_future.unwrap_or(defaults.include_future),
            country: request.country.clone().or_else(|| chart.country_filter.clone()),
            survtype: request.survtype.clone(),
            split_test_numbers: chart.test_numbers,
        }
    }

    /// Render with a caller-owned visibility store.
    pub async fn render_with_store(
        &self,
        chart: &ChartConfig,
        request: &RenderRequest,
        store: &mut VisibilityStore,
    ) -> anyhow::Result<ChartView> {
        let data = self.repository.load_timeseries(chart).await?;
        let settings = self.settings_for(chart, request);
        Ok(render_chart(&data, &settings, store, &today()))
    }

    /// Render against the chart's shared visibility state.
    pub async fn render(&self, chart: &ChartConfig, request: &RenderRequest) -> anyhow::Result<ChartView> {
        let data = self.repository.load_timeseries(chart).await?;
        let settings = self.settings_for(chart, request);

        // The lock covers only the copy out and the write back.
        let mut store = self.visibility.lock().await.get(&chart.id).cloned().unwrap_or_default();
        let view = render_chart(&data, &settings, &mut store, &today());
        self.visibility.lock().await.insert(chart.id.clone(), store);

        tracing::debug!(
            "Rendered chart {}: {} series, {} visible",
            chart.id,
            view.data.series.len(),
            view.visibility.iter().filter(|v| **v).count()
        );
        Ok(view)
    }

    /// Record a legend choice for a series already rendered in the chart.
    pub async fn set_visibility(&self, chart_id: &str, series_key: &str, visible: bool) -> bool {
        let mut stores = self.visibility.lock().await;
        stores
            .get_mut(chart_id)
            .is_some_and(|store| store.set_matching(series_key, visible))
    }

    /// Send the chart list first, then each chart as soon as it renders, then a completion event.
    pub fn stream_charts(&self, request: RenderRequest, language: Language) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(16);
        let start_time = Instant::now();
        let charts = self.config.charts.clone();
        let total_charts = charts.len();

        let service = self.clone();
        tokio::spawn(async move {
            let skeleton = StreamMessage::Skeleton {
                charts: charts.iter().map(chart_summary_to_json).collect(),
            };
            if tx.send(skeleton).await.is_err() {
                return;
            }

            let handles: Vec<_> = charts
                .into_iter()
                .map(|chart| {
                    let tx = tx.clone();
                    let service = service.clone();
                    let request = request.clone();
                    tokio::spawn(async move {
                        let msg = match service.render(&chart, &request).await {
                            Ok(view) => StreamMessage::Chart {
                                chart: Box::new(chart_to_json(&chart, &view, language)),
                            },
                            Err(e) => {
                                tracing::warn!("Chart {} failed: {:#}", chart.id, e);
                                StreamMessage::Failed { chart_id: chart.id.clone(), error: format!("{:#}", e) }
                            }
                        };
                        let _ = tx.send(msg).await;
                    })
                })
                .collect();

            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    tracing::error!("Chart task panicked: {}", e);
                }
            }

            let duration_ms = start_time.elapsed().as_millis() as u64;
            let _ = tx.send(StreamMessage::Complete { total_charts, duration_ms }).await;
        });

        rx
    }
}
