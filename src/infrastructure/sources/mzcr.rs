// Czech MZCR daily COVID-19 test overview
use super::{field, normalize_date, to_float, Row};
use crate::domain::timeseries::{DataSeries, Datapoint, TimeseriesData};
use crate::infrastructure::error::SourceError;
use std::collections::BTreeMap;

pub fn compute_positivity(rows: &[Row]) -> Result<TimeseriesData, SourceError> {
    let mut by_date: BTreeMap<String, (Datapoint, Datapoint)> = BTreeMap::new();

    for row in rows {
        let raw_date = match field(row, "datum") {
            "" => field(row, "Datum"),
            value => value,
        };
        let date = normalize_date(raw_date)?;

        let pcr = Datapoint::new(
            to_float(row, "PCR_pozit_sympt") + to_float(row, "PCR_pozit_asymp"),
            to_float(row, "pocet_PCR_testy"),
        );
        let antigen = Datapoint::new(
            to_float(row, "AG_pozit_symp") + to_float(row, "AG_pozit_asymp_PCR_conf"),
            to_float(row, "pocet_AG_testy"),
        );
        by_date.insert(date, (pcr, antigen));
    }

    let dates: Vec<String> = by_date.keys().cloned().collect();
    let pcr = by_date.values().map(|(p, _)| Some(*p)).collect();
    let antigen = by_date.values().map(|(_, a)| Some(*a)).collect();

    Ok(TimeseriesData::new(
        dates,
        vec![
            DataSeries::positivity("PCR Positivity", pcr, 1),
            DataSeries::positivity("Antigen Positivity", antigen, 1),
        ],
    ))
}
