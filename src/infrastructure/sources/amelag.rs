// German RKI AMELAG normalized wastewater viral load
use super::{field, normalize_date, parse_float, Row};
use crate::domain::timeseries::{DataSeries, ScalarDatapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::{BTreeMap, HashMap};

/// Collapses subtypes onto the virus they belong to.
fn virus_name(typ: &str) -> &str {
    if typ.contains("Influenza") {
        "Influenza"
    } else if typ.contains("RSV") {
        "RSV"
    } else {
        typ
    }
}

pub fn compute_wastewater(rows: &[Row]) -> Result<TimeseriesData, SourceError> {
    let mut by_date: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    let mut types: Vec<String> = Vec::new();

    for row in rows {
        let typ = field(row, "typ");
        if typ.is_empty() {
            continue;
        }
        if !types.iter().any(|t| t == typ) {
            types.push(typ.to_string());
        }

        let raw_date = field(row, "datum");
        let Some(load) = parse_float(row, "viruslast_normalisiert") else {
            continue;
        };
        if raw_date.is_empty() {
            continue;
        }

        // later rows win
        by_date
            .entry(normalize_date(raw_date)?)
            .or_default()
            .insert(typ.to_string(), load);
    }

    let mut viruses: Vec<&str> = Vec::new();
    for typ in &types {
        let virus = virus_name(typ);
        if !viruses.contains(&virus) {
            viruses.push(virus);
        }
    }

    let dates: Vec<String> = by_date.keys().cloned().collect();
    let series = viruses
        .iter()
        .map(|&virus| {
            let values = by_date
                .values()
                .map(|loads| {
                    let total: f64 = types
                        .iter()
                        .filter(|t| virus_name(t) == virus)
                        .filter_map(|t| loads.get(t))
                        .sum();
                    Some(ScalarDatapoint::new(total))
                })
                .collect();
            DataSeries::scalar(format!("{} Wastewater", virus), values, 7)
        })
        .collect();

    Ok(TimeseriesData::new(dates, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timeseries::DataType;
    use crate::infrastructure::sources::row;

    fn record(date: &str, typ: &str, load: &str) -> Row {
        row(&[("datum", date), ("typ", typ), ("viruslast_normalisiert", load)])
    }

    #[test]
    fn test_compute_wastewater() {
        let rows = vec![
            record("2025-01-08", "SARS-CoV-2", "100"),
            record("2025-01-01", "Influenza A", "10"),
            record("2025-01-01", "Influenza B", "5"),
            record("2025-01-01", "SARS-CoV-2", "80"),
            record("2025-01-01", "SARS-CoV-2", "90"),
            record("2025-01-08", "RSV A/B", "NA"),
            record("", "RSV A", "1"),
        ];

        let data = compute_wastewater(&rows).unwrap();
        assert_eq!(data.dates, vec!["2025-01-01", "2025-01-08"]);
        assert!(data.is_aligned());

        let names: Vec<&str> = data.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SARS-CoV-2 Wastewater", "Influenza Wastewater", "RSV Wastewater"]);
        assert!(data.series.iter().all(|s| s.data_type() == DataType::Scalar && s.frequency_in_days == 7));

        let sars = data.series[0].values.as_scalar().unwrap();
        assert_eq!(sars, [Some(ScalarDatapoint::new(90.0)), Some(ScalarDatapoint::new(100.0))]);

        let influenza = data.series[1].values.as_scalar().unwrap();
        assert_eq!(influenza[0], Some(ScalarDatapoint::new(15.0)));
        assert_eq!(influenza[1], Some(ScalarDatapoint::new(0.0)));

        assert_eq!(data.series[2].values.metric_at(0), 0.0);
    }
}
