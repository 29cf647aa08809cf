// Dutch Infectieradar weekly pathogen test results (semicolon separated, comma decimals)
use super::{field, Row};
use crate::domain::timeseries::{DataSeries, Datapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::{BTreeMap, HashMap};

fn pathogen_name(name: &str) -> &str {
    if name.contains("Parainfluenza") {
        "Parainfluenza"
    } else if name.contains("Influenza") {
        "Influenza"
    } else {
        name
    }
}

fn parse_decimal_comma(raw: &str) -> Option<f64> {
    let raw = if raw.is_empty() { "0" } else { raw };
    raw.replacen(',', ".", 1).parse().ok()
}

fn parse_count(raw: &str) -> Option<f64> {
    let raw = if raw.is_empty() { "0" } else { raw };
    raw.parse::<i64>().ok().map(|n| n as f64)
}

pub fn compute_positivity(rows: &[Row]) -> Result<TimeseriesData, SourceError> {
    let mut by_date: BTreeMap<String, HashMap<String, Datapoint>> = BTreeMap::new();
    let mut pathogens: Vec<String> = Vec::new();

    for row in rows {
        let pathogen = pathogen_name(field(row, "PATHOGEN"));
        if pathogen.is_empty() {
            continue;
        }
        if !pathogens.iter().any(|p| p == pathogen) {
            pathogens.push(pathogen.to_string());
        }

        let date = field(row, "WEEK");
        let (Some(samples), Some(percent)) = (parse_count(field(row, "SAMPLES_N")), parse_decimal_comma(field(row, "PERC")))
        else {
            continue;
        };
        if date.is_empty() {
            continue;
        }

        let stats = by_date
            .entry(date.to_string())
            .or_default()
            .entry(pathogen.to_string())
            .or_insert(Datapoint::new(0.0, 0.0));
        stats.positive += percent / 100.0 * samples;
        stats.tests += samples;
    }

    let dates: Vec<String> = by_date.keys().cloned().collect();
    let series = pathogens
        .iter()
        .map(|pathogen| {
            let values = by_date
                .values()
                .map(|stats| {
                    let point = stats.get(pathogen).copied().unwrap_or(Datapoint::new(0.0, 0.0));
                    Some(Datapoint::new(point.positive.round(), point.tests))
                })
                .collect();
            DataSeries::positivity(format!("{} Positivity", pathogen), values, 7)
        })
        .collect();

    Ok(TimeseriesData::new(dates, series))
}
