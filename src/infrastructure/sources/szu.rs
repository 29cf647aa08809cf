// Czech SZU weekly respiratory virus detections
use super::{czech_week_to_iso_week, field, week_to_date, Row};
use crate::domain::timeseries::{DataSeries, Datapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::BTreeMap;

/// Column and series name of every virus reported.
pub const VIRUSES: [(&str, &str); 7] = [
    ("influenzaA", "Influenza A"),
    ("influenzaB", "Influenza B"),
    ("rsv", "RSV"),
    ("adenovirus", "Adenovirus"),
    ("rhinovirus", "Rhinovirus"),
    ("parainfluenza", "Parainfluenza"),
    ("coronavirus", "Coronavirus (non-CoV-2)"),
];

fn count(row: &Row, key: &str) -> f64 {
    field(row, key).parse::<i64>().map_or(0.0, |n| n as f64)
}

/// Weeks come as `YYYY-Www` or in the Czech `N.KT YYYY` form.
fn week_start(raw: &str) -> Result<String, SourceError> {
    if raw.contains(".KT") {
        week_to_date(&czech_week_to_iso_week(raw)?)
    } else {
        week_to_date(raw)
    }
}

pub fn compute_positivity(rows: &[Row]) -> Result<TimeseriesData, SourceError> {
    let mut by_date: BTreeMap<String, &Row> = BTreeMap::new();
    for row in rows {
        by_date.insert(week_start(field(row, "week"))?, row);
    }

    let dates: Vec<String> = by_date.keys().cloned().collect();
    let series = VIRUSES
        .iter()
        .map(|&(column, name)| {
            let values = by_date
                .values()
                .map(|row| Some(Datapoint::new(count(row, column), count(row, "totalTests"))))
                .collect();
            DataSeries::positivity(name, values, 7)
        })
        .collect();

    Ok(TimeseriesData::new(dates, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::row;

    #[test]
    fn test_compute_positivity() {
        let rows = vec![
            row(&[("week", "41.KT 2025"), ("influenzaA", "4"), ("rsv", "x"), ("totalTests", "40")]),
            row(&[
                ("week", "2025-W40"),
                ("influenzaA", "15"),
                ("influenzaB", "3"),
                ("rsv", "45"),
                ("adenovirus", "12"),
                ("rhinovirus", "23"),
                ("parainfluenza", "8"),
                ("coronavirus", "5"),
                ("totalTests", "250"),
            ]),
        ];

        let data = compute_positivity(&rows).unwrap();
        assert_eq!(data.dates, vec!["2025-09-29", "2025-10-06"]);
        assert_eq!(data.series.len(), 7);
        assert!(data.is_aligned());

        let rsv = data.find_series("RSV").unwrap();
        assert_eq!(rsv.values.as_positivity().unwrap()[0], Some(Datapoint::new(45.0, 250.0)));
        assert_eq!(rsv.values.as_positivity().unwrap()[1], Some(Datapoint::new(0.0, 40.0)));
        assert_eq!(data.find_series("Influenza A").unwrap().values.metric_at(1), 10.0);
    }

    #[test]
    fn test_bad_week_is_an_error() {
        let rows = vec![row(&[("week", "40/2025")])];
        assert!(matches!(compute_positivity(&rows), Err(SourceError::InvalidIsoWeek(_))));
    }
}
