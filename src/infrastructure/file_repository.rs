// File-backed source repository: reads published CSV/TSV files, downloading missing ones
use crate::application::source_repository::SourceRepository;
use crate::domain::timeseries::TimeseriesData;
use crate::infrastructure::config::{ChartConfig, DataSettings};
use crate::infrastructure::error::SourceError;
use crate::infrastructure::sources::{compute_timeseries, AdapterOptions, Row};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Split a delimited file into rows keyed by its header. Short rows are kept,
/// their missing columns read as empty.
pub fn parse_delimited(bytes: &[u8], delimiter: u8, origin: &str) -> Result<Vec<Row>, SourceError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.iter().all(str::is_empty) {
        return Err(SourceError::MissingHeader { path: origin.to_string() });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct FileSourceRepository {
    directory: PathBuf,
    download_missing: bool,
    client: reqwest::Client,
}

impl FileSourceRepository {
    pub fn new(settings: &DataSettings) -> Self {
        Self {
            directory: PathBuf::from(&settings.directory),
            download_missing: settings.download_missing,
            client: reqwest::Client::new(),
        }
    }

    fn path_for(&self, chart: &ChartConfig) -> PathBuf {
        self.directory.join(&chart.file)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<Bytes, SourceError> {
        tracing::debug!("Downloading {} to {}", url, path.display());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::DownloadFailed {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &body).await?;
        tracing::debug!("Stored {} bytes at {}", body.len(), path.display());

        Ok(body)
    }

    async fn read_or_download(&self, chart: &ChartConfig) -> Result<Bytes, SourceError> {
        let path = self.path_for(chart);
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Bytes::from(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => match chart.download_url() {
                Some(url) if self.download_missing => self.download(&url, &path).await,
                _ => Err(SourceError::NotAvailable { path: path.display().to_string() }),
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SourceRepository for FileSourceRepository {
    async fn load_timeseries(&self, chart: &ChartConfig) -> anyhow::Result<TimeseriesData> {
        let contents = self
            .read_or_download(chart)
            .await
            .with_context(|| format!("Failed to read source for chart {}", chart.id))?;

        let origin = self.path_for(chart).display().to_string();
        let rows = parse_delimited(&contents, chart.source.delimiter(), &origin)?;
        let options = AdapterOptions { preserve_survtype: chart.preserve_survtype };
        let data = compute_timeseries(chart.source, &rows, options)
            .with_context(|| format!("Failed to parse {} as {}", origin, chart.source.as_str()))?;

        tracing::debug!(
            "Loaded chart {}: {} rows, {} dates, {} series",
            chart.id,
            rows.len(),
            data.dates.len(),
            data.series.len()
        );

        Ok(data.with_source(&chart.id))
    }
}
