// Repository trait for source timeseries access
use crate::domain::timeseries::TimeseriesData;
use crate::infrastructure::config::ChartConfig;
use async_trait::async_trait;

#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Load the chart's source file and turn it into a timeseries whose series
    /// keys carry the chart id as their source.
    async fn load_timeseries(&self, chart: &ChartConfig) -> anyhow::Result<TimeseriesData>;
}
