// EU ECDC ERVIS weekly tests and detections per country, pathogen and surveillance type
use super::{field, to_float, year_week_to_date, Row};
use crate::domain::timeseries::{DataSeries, Datapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const SENTINEL_SURVTYPE: &str = "primary care sentinel";
const ALL_SURVTYPES_KEY: &str = "all";

#[derive(Default, Clone, Copy)]
struct Counts {
    tests: f64,
    detections: f64,
}

type GroupKey = (String, String, String);

fn series_name(pathogen: &str, survtype: &str, preserve_survtype: bool) -> String {
    let base = format!("{} Positivity", pathogen);
    if !preserve_survtype || survtype == ALL_SURVTYPES_KEY {
        return base;
    }
    let label = if survtype == SENTINEL_SURVTYPE { "Sentinel" } else { "Non-Sentinel" };
    format!("{} ({})", base, label)
}

pub fn compute_positivity(rows: &[Row], preserve_survtype: bool) -> Result<TimeseriesData, SourceError> {
    let mut grouped: BTreeMap<String, HashMap<GroupKey, Counts>> = BTreeMap::new();
    let mut countries: BTreeSet<String> = BTreeSet::new();
    let mut survtypes: BTreeSet<String> = BTreeSet::new();
    let mut pathogens: Vec<String> = Vec::new();

    for row in rows.iter().filter(|r| field(r, "pathogen") == field(r, "pathogentype")) {
        let date = year_week_to_date(field(row, "yearweek"))?;
        let pathogen = field(row, "pathogen").to_string();
        let country = field(row, "countryname").to_string();
        let survtype = if preserve_survtype { field(row, "survtype") } else { ALL_SURVTYPES_KEY }.to_string();

        let value = to_float(row, "value");
        let counts = grouped
            .entry(date)
            .or_default()
            .entry((country.clone(), pathogen.clone(), survtype.clone()))
            .or_default();
        match field(row, "indicator") {
            "tests" => counts.tests += value,
            "detections" => counts.detections += value,
            _ => {}
        }

        if !pathogens.contains(&pathogen) {
            pathogens.push(pathogen);
        }
        countries.insert(country);
        survtypes.insert(survtype);
    }

    let dates: Vec<String> = grouped.keys().cloned().collect();
    let mut series = Vec::new();

    for country in &countries {
        for pathogen in &pathogens {
            for survtype in &survtypes {
                let key = (country.clone(), pathogen.clone(), survtype.clone());
                let values = grouped
                    .values()
                    .map(|by_key| {
                        let counts = by_key.get(&key).copied().unwrap_or_default();
                        Some(Datapoint::new(counts.detections, counts.tests))
                    })
                    .collect();

                let mut s = DataSeries::positivity(series_name(pathogen, survtype, preserve_survtype), values, 7)
                    .with_country(country.clone());
                if preserve_survtype {
                    s = s.with_survtype(survtype.clone());
                }
                series.push(s);
            }
        }
    }

    Ok(TimeseriesData::new(dates, series))
}
