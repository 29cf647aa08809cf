// Source adapters: split rows of a published file into a timeseries
//
// Every adapter returns dates ascending and unique, with one value per date
// in every series and names in canonical English.
pub mod amelag;
pub mod ecdc;
pub mod infectieradar;
pub mod mzcr;
pub mod rki_are;
pub mod szu;

use crate::domain::timeseries::TimeseriesData;
use crate::infrastructure::config::SourceKind;
use crate::infrastructure::error::SourceError;
use chrono::{DateTime, Days, NaiveDate, Utc, Weekday};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// One record keyed by column header.
pub type Row = HashMap<String, String>;

const DATE_FORMAT: &str = "%Y-%m-%d";

static ISO_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{2})$").unwrap());
static CZECH_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.KT\s+(\d{4})$").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterOptions {
    pub preserve_survtype: bool,
}

pub fn compute_timeseries(kind: SourceKind, rows: &[Row], options: AdapterOptions) -> Result<TimeseriesData, SourceError> {
    match kind {
        SourceKind::MzcrCovid => mzcr::compute_positivity(rows),
        SourceKind::EcdcErvis => ecdc::compute_positivity(rows, options.preserve_survtype),
        SourceKind::AmelagWastewater => amelag::compute_wastewater(rows),
        SourceKind::RkiAre => rki_are::compute_incidence(rows),
        SourceKind::NlInfectieradar => infectieradar::compute_positivity(rows),
        SourceKind::SzuRespiratory => szu::compute_positivity(rows),
    }
}

pub(crate) fn field<'a>(row: &'a Row, key: &str) -> &'a str {
    row.get(key).map(|v| v.trim()).unwrap_or("")
}

/// Numeric field: missing or empty reads as zero, garbage as `None`.
pub(crate) fn parse_float(row: &Row, key: &str) -> Option<f64> {
    let raw = field(row, key);
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok()
}

/// Numeric field that defaults to zero whenever it cannot be read.
pub(crate) fn to_float(row: &Row, key: &str) -> f64 {
    parse_float(row, key).unwrap_or(0.0)
}

/// Normalizes `YYYY-MM-DD`, `YYYY.MM.DD`, `DD.MM.YYYY` and RFC 3339 timestamps
/// to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<String, SourceError> {
    let raw = raw.trim();
    let parsed = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y.%m.%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        });

    parsed
        .map(|d| d.format(DATE_FORMAT).to_string())
        .ok_or_else(|| SourceError::InvalidDate(raw.to_string()))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_iso_week(iso_week: &str) -> Result<(i32, u32), SourceError> {
    let invalid = || SourceError::InvalidIsoWeek(iso_week.to_string());
    let caps = ISO_WEEK.captures(iso_week.trim()).ok_or_else(invalid)?;
    let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
    let week = caps[2].parse::<u32>().map_err(|_| invalid())?;
    Ok((year, week))
}

/// Monday of an ISO week given as `YYYY-Www`.
pub fn week_to_date(iso_week: &str) -> Result<String, SourceError> {
    let (year, week) = parse_iso_week(iso_week)?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
        .map(format_date)
        .ok_or_else(|| SourceError::InvalidIsoWeek(iso_week.to_string()))
}

/// Start of week `week` counted in whole weeks from January 1st, the way the
/// ECDC `yearweek` column is laid onto calendar dates.
pub fn year_week_to_date(year_week: &str) -> Result<String, SourceError> {
    let (year, week) = parse_iso_week(year_week)?;
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| SourceError::InvalidIsoWeek(year_week.to_string()))?;
    let offset = u64::from(week.saturating_sub(1)) * 7;
    jan_first
        .checked_add_days(Days::new(offset))
        .map(format_date)
        .ok_or_else(|| SourceError::InvalidIsoWeek(year_week.to_string()))
}

/// `N.KT YYYY` (Czech calendar week) to `YYYY-Www`.
pub fn czech_week_to_iso_week(czech_week: &str) -> Result<String, SourceError> {
    let invalid = || SourceError::InvalidCzechWeek(czech_week.to_string());
    let caps = CZECH_WEEK.captures(czech_week.trim()).ok_or_else(invalid)?;
    let week = caps[1].parse::<u32>().map_err(|_| invalid())?;
    Ok(format!("{}-W{:02}", &caps[2], week))
}

#[cfg(test)]
pub(crate) fn row(pairs: &[(&str, &str)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
