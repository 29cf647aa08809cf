// Time series domain models shared by every source and derived view

use std::fmt;

/// Survtype filter value that disables survtype filtering.
pub const ALL_SURVTYPES: &str = "both";

/// One positivity observation: positive results out of tests performed.
///
/// Incidence-style sources reuse this shape with a constant `tests` base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub positive: f64,
    pub tests: f64,
}

impl Datapoint {
    pub fn new(positive: f64, tests: f64) -> Self {
        Self { positive, tests }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarDatapoint {
    pub virus_load: f64,
}

impl ScalarDatapoint {
    pub fn new(virus_load: f64) -> Self {
        Self { virus_load }
    }
}

/// Numeric operations the derived-series engine needs from a sample,
/// applied field by field.
pub trait Sample: Copy + fmt::Debug + PartialEq {
    fn map(self, f: impl Fn(f64) -> f64) -> Self;

    fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self;

    /// Value used to rank samples against each other (percent positive, or load).
    fn metric(&self) -> f64;

    fn zero() -> Self;

    fn lerp(self, other: Self, ratio: f64) -> Self {
        self.zip_with(other, |a, b| a + (b - a) * ratio)
    }
}

impl Sample for Datapoint {
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Datapoint::new(f(self.positive), f(self.tests))
    }

    fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Datapoint::new(f(self.positive, other.positive), f(self.tests, other.tests))
    }

    fn metric(&self) -> f64 {
        datapoint_to_percentage(Some(self))
    }

    fn zero() -> Self {
        Datapoint::new(0.0, 0.0)
    }
}

impl Sample for ScalarDatapoint {
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        ScalarDatapoint::new(f(self.virus_load))
    }

    fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        ScalarDatapoint::new(f(self.virus_load, other.virus_load))
    }

    fn metric(&self) -> f64 {
        self.virus_load
    }

    fn zero() -> Self {
        ScalarDatapoint::new(0.0)
    }
}

/// Percent positive; NaN for a missing point or zero tests.
pub fn datapoint_to_percentage(datapoint: Option<&Datapoint>) -> f64 {
    match datapoint {
        Some(dp) if dp.tests != 0.0 => dp.positive / dp.tests * 100.0,
        _ => f64::NAN,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesType {
    Raw,
    Averaged,
}

impl SeriesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesType::Raw => "raw",
            SeriesType::Averaged => "averaged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Positivity,
    Scalar,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Positivity => "positivity",
            DataType::Scalar => "scalar",
        }
    }
}

/// Values of a series. `None` marks a gap (out-of-range shift read or
/// an interpolation without an anchor on both sides).
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Positivity(Vec<Option<Datapoint>>),
    Scalar(Vec<Option<ScalarDatapoint>>),
}

impl SeriesValues {
    pub fn len(&self) -> usize {
        match self {
            SeriesValues::Positivity(v) => v.len(),
            SeriesValues::Scalar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SeriesValues::Positivity(_) => DataType::Positivity,
            SeriesValues::Scalar(_) => DataType::Scalar,
        }
    }

    /// Ranking metric at `index`, NaN when missing or out of range.
    pub fn metric_at(&self, index: usize) -> f64 {
        match self {
            SeriesValues::Positivity(v) => v.get(index).copied().flatten().map_or(f64::NAN, |p| p.metric()),
            SeriesValues::Scalar(v) => v.get(index).copied().flatten().map_or(f64::NAN, |p| p.metric()),
        }
    }

    pub fn as_positivity(&self) -> Option<&[Option<Datapoint>]> {
        match self {
            SeriesValues::Positivity(v) => Some(v),
            SeriesValues::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&[Option<ScalarDatapoint>]> {
        match self {
            SeriesValues::Scalar(v) => Some(v),
            SeriesValues::Positivity(_) => None,
        }
    }

    /// Append `count` gaps at the end.
    pub fn padded(&self, count: usize) -> SeriesValues {
        match self {
            SeriesValues::Positivity(v) => {
                let mut out = v.clone();
                out.extend(std::iter::repeat_n(None, count));
                SeriesValues::Positivity(out)
            }
            SeriesValues::Scalar(v) => {
                let mut out = v.clone();
                out.extend(std::iter::repeat_n(None, count));
                SeriesValues::Scalar(out)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestSign {
    Positive,
    Negative,
}

impl TestSign {
    pub fn suffix(&self) -> &'static str {
        match self {
            TestSign::Positive => " - Positive Tests",
            TestSign::Negative => " - Negative Tests",
        }
    }
}

/// How a shifted series was aligned; decides the label grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftLabel {
    /// Aligned on extremes, `count` waves apart.
    Waves { count: usize },
    /// Shifted by a user-chosen number of days.
    Days,
}

impl ShiftLabel {
    /// Suffix appended to the parent name. `amount_days` is `None` when the
    /// shift could not be resolved, rendered as `NaN` like the wave grammar allows.
    pub fn suffix(&self, amount_days: Option<i64>) -> String {
        let amount = amount_days.map_or_else(|| "NaN".to_string(), |d| d.to_string());
        match self {
            ShiftLabel::Waves { count } => {
                let word = if *count == 1 { "wave" } else { "waves" };
                format!(" shifted by {} {} {}d", count, word, amount)
            }
            ShiftLabel::Days => format!(" shifted by {}d", amount),
        }
    }
}

/// Outermost transform applied to a series. Display names are generated
/// from this, never parsed back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Raw,
    Averaged { window_days: u32 },
    Shifted { label: ShiftLabel, amount_days: Option<i64> },
    TestCount { sign: TestSign },
}

impl SeriesKind {
    pub fn decorate(&self, parent_name: &str) -> String {
        match self {
            SeriesKind::Raw => parent_name.to_string(),
            SeriesKind::Averaged { window_days } => format!("{} ({}d avg)", parent_name, window_days),
            SeriesKind::Shifted { label, amount_days } => {
                format!("{}{}", parent_name, label.suffix(*amount_days))
            }
            SeriesKind::TestCount { sign } => format!("{}{}", parent_name, sign.suffix()),
        }
    }
}

/// Step in a series' transform chain, stripped of anything that changes
/// between renders (shift amount, alignment mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    Averaged { window_days: u32 },
    Shifted,
    TestCount(TestSign),
}

impl SeriesKind {
    pub fn transform(&self) -> Option<Transform> {
        match *self {
            SeriesKind::Raw => None,
            SeriesKind::Averaged { window_days } => Some(Transform::Averaged { window_days }),
            SeriesKind::Shifted { .. } => Some(Transform::Shifted),
            SeriesKind::TestCount { sign } => Some(Transform::TestCount(sign)),
        }
    }
}

/// Stable identity of a logical series, independent of its display text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub source_id: String,
    pub base_name: String,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub chain: Vec<Transform>,
}

impl SeriesKey {
    pub fn new(source_id: impl Into<String>, base_name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            base_name: base_name.into(),
            country: None,
            survtype: None,
            chain: Vec::new(),
        }
    }

    pub fn then(&self, kind: SeriesKind) -> Self {
        let mut next = self.clone();
        if let Some(step) = kind.transform() {
            next.chain.push(step);
        }
        next
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.base_name)?;
        if let Some(country) = &self.country {
            write!(f, "@{}", country)?;
        }
        if let Some(survtype) = &self.survtype {
            write!(f, "#{}", survtype)?;
        }
        for step in &self.chain {
            match step {
                Transform::Averaged { window_days } => write!(f, "|avg{}", window_days)?,
                Transform::Shifted => write!(f, "|shifted")?,
                Transform::TestCount(TestSign::Positive) => write!(f, "|pos")?,
                Transform::TestCount(TestSign::Negative) => write!(f, "|neg")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSeries {
    pub name: String,
    pub key: SeriesKey,
    pub kind: SeriesKind,
    pub series_type: SeriesType,
    pub frequency_in_days: u32,
    pub country: Option<String>,
    pub survtype: Option<String>,
    pub window_size_in_index: Option<usize>,
    pub values: SeriesValues,
}

impl DataSeries {
    pub fn positivity(name: impl Into<String>, values: Vec<Option<Datapoint>>, frequency_in_days: u32) -> Self {
        Self::raw(name.into(), SeriesValues::Positivity(values), frequency_in_days)
    }

    pub fn scalar(name: impl Into<String>, values: Vec<Option<ScalarDatapoint>>, frequency_in_days: u32) -> Self {
        Self::raw(name.into(), SeriesValues::Scalar(values), frequency_in_days)
    }

    fn raw(name: String, values: SeriesValues, frequency_in_days: u32) -> Self {
        Self {
            key: SeriesKey::new("", name.clone()),
            name,
            kind: SeriesKind::Raw,
            series_type: SeriesType::Raw,
            frequency_in_days: frequency_in_days.max(1),
            country: None,
            survtype: None,
            window_size_in_index: None,
            values,
        }
    }

    pub fn with_source(mut self, source_id: &str) -> Self {
        self.key.source_id = source_id.to_string();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        let country = country.into();
        self.key.country = Some(country.clone());
        self.country = Some(country);
        self
    }

    pub fn with_survtype(mut self, survtype: impl Into<String>) -> Self {
        let survtype = survtype.into();
        self.key.survtype = Some(survtype.clone());
        self.survtype = Some(survtype);
        self
    }

    pub fn with_type(mut self, series_type: SeriesType) -> Self {
        self.series_type = series_type;
        self
    }

    /// A new series derived from this one: attributes are inherited, the
    /// name and key are extended by `kind`.
    pub fn derive(&self, kind: SeriesKind, values: SeriesValues) -> Self {
        Self {
            name: kind.decorate(&self.name),
            key: self.key.then(kind),
            kind,
            series_type: self.series_type,
            frequency_in_days: self.frequency_in_days,
            country: self.country.clone(),
            survtype: self.survtype.clone(),
            window_size_in_index: self.window_size_in_index,
            values,
        }
    }

    /// Country and survtype filters; a series without the attribute passes.
    pub fn matches_filters(&self, country: Option<&str>, survtype: Option<&str>) -> bool {
        let country_ok = match (country, self.country.as_deref()) {
            (Some(filter), Some(c)) => c == filter,
            _ => true,
        };
        let survtype_ok = match (survtype, self.survtype.as_deref()) {
            (Some(filter), Some(t)) if filter != ALL_SURVTYPES => t == filter,
            _ => true,
        };
        country_ok && survtype_ok
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeseriesData {
    pub dates: Vec<String>,
    pub series: Vec<DataSeries>,
}

impl TimeseriesData {
    pub fn new(dates: Vec<String>, series: Vec<DataSeries>) -> Self {
        Self { dates, series }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Every series has exactly one value per date.
    pub fn is_aligned(&self) -> bool {
        self.series.iter().all(|s| s.len() == self.dates.len())
    }

    pub fn find_series(&self, name: &str) -> Option<&DataSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Tag every series with the id of the source it was loaded from.
    pub fn with_source(self, source_id: &str) -> Self {
        Self {
            dates: self.dates,
            series: self.series.into_iter().map(|s| s.with_source(source_id)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtremeKind {
    Maxima,
    Minima,
}

impl ExtremeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtremeKind::Maxima => "maxima",
            ExtremeKind::Minima => "minima",
        }
    }
}

/// Positions of local extremes in an averaged series. Derived, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtremeSeries {
    pub name: String,
    pub original_series_name: String,
    pub indices: Vec<usize>,
    pub extreme: ExtremeKind,
    pub window_days: u32,
}

impl ExtremeSeries {
    pub fn new(original_series_name: &str, extreme: ExtremeKind, window_days: u32, indices: Vec<usize>) -> Self {
        Self {
            name: format!("{} {} over {}d", original_series_name, extreme.as_str(), window_days),
            original_series_name: original_series_name.to_string(),
            indices,
            extreme,
            window_days,
        }
    }
}
