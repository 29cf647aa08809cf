// German RKI acute respiratory illness consultation incidence
use super::{field, to_float, week_to_date, Row};
use crate::domain::timeseries::{DataSeries, Datapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::{BTreeMap, HashMap};

const NATIONWIDE: &str = "Bundesweit";
pub const AGE_GROUPS: [&str; 6] = ["00+", "0-4", "5-14", "15-34", "35-59", "60+"];
/// Incidence is per 100k; stored as `positive` over this constant base.
pub const INCIDENCE_BASE_POPULATION: f64 = 100_000.0;

pub fn compute_incidence(rows: &[Row]) -> Result<TimeseriesData, SourceError> {
    let mut by_week: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();

    for row in rows.iter().filter(|r| field(r, "Bundesland") == NATIONWIDE) {
        by_week
            .entry(field(row, "Kalenderwoche").to_string())
            .or_default()
            .insert(field(row, "Altersgruppe").to_string(), to_float(row, "ARE_Konsultationsinzidenz"));
    }

    let dates = by_week.keys().map(String::as_str).map(week_to_date).collect::<Result<Vec<_>, _>>()?;

    let series = AGE_GROUPS
        .iter()
        .map(|&age| {
            let values = by_week
                .values()
                .map(|groups| {
                    let incidence = groups.get(age).copied().unwrap_or(0.0);
                    Some(Datapoint::new(incidence, INCIDENCE_BASE_POPULATION))
                })
                .collect();
            DataSeries::positivity(format!("ARE {} years", age), values, 7)
        })
        .collect();

    Ok(TimeseriesData::new(dates, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::row;

    fn record(state: &str, week: &str, age: &str, incidence: &str) -> Row {
        row(&[
            ("Bundesland", state),
            ("Kalenderwoche", week),
            ("Altersgruppe", age),
            ("ARE_Konsultationsinzidenz", incidence),
        ])
    }

    #[test]
    fn test_compute_incidence() {
        let rows = vec![
            record("Bundesweit", "2024-W02", "00+", "1200"),
            record("Bundesweit", "2024-W01", "0-4", "3000"),
            record("Bayern", "2024-W01", "00+", "9999"),
        ];

        let data = compute_incidence(&rows).unwrap();
        assert_eq!(data.dates, vec!["2024-01-01", "2024-01-08"]);
        assert_eq!(data.series.len(), AGE_GROUPS.len());
        assert_eq!(data.series[0].name, "ARE 00+ years");

        let all_ages = data.series[0].values.as_positivity().unwrap();
        assert_eq!(all_ages[0], Some(Datapoint::new(0.0, INCIDENCE_BASE_POPULATION)));
        assert_eq!(all_ages[1], Some(Datapoint::new(1200.0, INCIDENCE_BASE_POPULATION)));

        let toddlers = data.find_series("ARE 0-4 years").unwrap();
        assert_eq!(toddlers.values.as_positivity().unwrap()[0].unwrap().positive, 3000.0);
    }

    #[test]
    fn test_bad_week_is_an_error() {
        let rows = vec![record("Bundesweit", "2024/01", "00+", "1")];
        assert!(matches!(compute_incidence(&rows), Err(SourceError::InvalidIsoWeek(_))));
    }
}
