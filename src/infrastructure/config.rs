// Dashboard configuration: server, data directory, render defaults and charts
use crate::domain::chart::DEFAULT_AVERAGING_WINDOW_DAYS;
use crate::domain::custom_graph::InterpolationWeighting;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub data: DataSettings,
    #[serde(default)]
    pub render: RenderDefaults,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSettings {
    pub directory: String,
    #[serde(default)]
    pub download_missing: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderDefaults {
    #[serde(default = "default_averaging_windows")]
    pub averaging_windows: Vec<u32>,
    #[serde(default = "default_extreme_window")]
    pub extreme_window_days: u32,
    #[serde(default)]
    pub interpolation: InterpolationSetting,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            averaging_windows: default_averaging_windows(),
            extreme_window_days: default_extreme_window(),
            interpolation: InterpolationSetting::default(),
        }
    }
}

fn default_averaging_windows() -> Vec<u32> {
    vec![DEFAULT_AVERAGING_WINDOW_DAYS]
}

fn default_extreme_window() -> u32 {
    DEFAULT_AVERAGING_WINDOW_DAYS
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationSetting {
    #[default]
    MergedIndex,
    ElapsedDays,
}

impl From<InterpolationSetting> for InterpolationWeighting {
    fn from(setting: InterpolationSetting) -> Self {
        match setting {
            InterpolationSetting::MergedIndex => InterpolationWeighting::MergedIndex,
            InterpolationSetting::ElapsedDays => InterpolationWeighting::ElapsedDays,
        }
    }
}

/// Which adapter turns a source file into a timeseries.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    MzcrCovid,
    EcdcErvis,
    AmelagWastewater,
    RkiAre,
    NlInfectieradar,
    SzuRespiratory,
}

impl SourceKind {
    pub fn delimiter(&self) -> u8 {
        match self {
            SourceKind::AmelagWastewater | SourceKind::RkiAre => b'\t',
            SourceKind::NlInfectieradar => b';',
            _ => b',',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MzcrCovid => "mzcr_covid",
            SourceKind::EcdcErvis => "ecdc_ervis",
            SourceKind::AmelagWastewater => "amelag_wastewater",
            SourceKind::RkiAre => "rki_are",
            SourceKind::NlInfectieradar => "nl_infectieradar",
            SourceKind::SzuRespiratory => "szu_respiratory",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    pub id: String,
    pub title: String,
    pub short_title: String,
    pub source: SourceKind,
    pub file: String,
    /// Download location; `${file}` is replaced by the file name.
    pub url: Option<String>,
    pub country_filter: Option<String>,
    #[serde(default)]
    pub preserve_survtype: bool,
    #[serde(default)]
    pub test_numbers: bool,
}

impl ChartConfig {
    pub fn download_url(&self) -> Option<String> {
        let mut vars = HashMap::new();
        vars.insert("file".to_string(), self.file.clone());
        self.url.as_deref().map(|template| prepare_url(template, &vars))
    }
}

impl DashboardConfig {
    pub fn chart(&self, id: &str) -> Option<&ChartConfig> {
        self.charts.iter().find(|c| c.id == id)
    }
}

/// Loads `config/dashboard`, overridden by `DASHBOARD__SECTION__KEY` variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a URL
pub fn prepare_url(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        bind_address = "127.0.0.1:9000"

        [data]
        directory = "data"

        [render]
        interpolation = "elapsed_days"

        [[charts]]
        id = "eu"
        title = "EU ECDC Respiratory Viruses"
        short_title = "ECDC"
        source = "ecdc_ervis"
        file = "nonSentinelTestsDetections.csv"
        url = "https://example.org/data/${file}"
        country_filter = "EU/EEA"
        test_numbers = true
    "#;

    fn sample() -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(SAMPLE, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_prepare_url() {
        let mut vars = HashMap::new();
        vars.insert("file".to_string(), "overview.csv".to_string());

        let url = prepare_url("https://example.org/api/v2/${file}", &vars);
        assert_eq!(url, "https://example.org/api/v2/overview.csv");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config = sample();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert!(!config.data.download_missing);
        assert_eq!(config.render.averaging_windows, vec![28]);
        assert_eq!(config.render.extreme_window_days, 28);
        assert_eq!(config.render.interpolation, InterpolationSetting::ElapsedDays);

        let chart = config.chart("eu").unwrap();
        assert_eq!(chart.source, SourceKind::EcdcErvis);
        assert!(!chart.preserve_survtype);
        assert!(chart.test_numbers);
        assert_eq!(
            chart.download_url().as_deref(),
            Some("https://example.org/data/nonSentinelTestsDetections.csv")
        );
        assert!(config.chart("missing").is_none());
    }

    #[test]
    fn test_source_delimiters() {
        assert_eq!(SourceKind::AmelagWastewater.delimiter(), b'\t');
        assert_eq!(SourceKind::NlInfectieradar.delimiter(), b';');
        assert_eq!(SourceKind::MzcrCovid.delimiter(), b',');
    }
}
