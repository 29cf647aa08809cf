// Series name localization: English is canonical, Czech is the display alternative

use regex::{Captures, Regex};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Cs,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "cs" => Some(Language::Cs),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Cs => "cs",
        }
    }
}

/// English base names and their Czech display forms.
const BASE_NAMES: &[(&str, &str)] = &[
    ("PCR Positivity", "PCR pozitivita"),
    ("Antigen Positivity", "Antigenní pozitivita"),
    ("Influenza Positivity", "Chřipka pozitivita"),
    ("RSV Positivity", "RSV pozitivita"),
    ("SARS-CoV-2 Positivity", "SARS-CoV-2 pozitivita"),
    ("Influenza Wastewater", "Chřipka odpadní vody"),
    ("RSV Wastewater", "RSV odpadní vody"),
    ("SARS-CoV-2 Wastewater", "SARS-CoV-2 odpadní vody"),
];

/// Lower-case Czech variants accepted on the way back to English.
const LOWERCASE_ALIASES: &[(&str, &str)] = &[
    ("antigenní pozitivita", "Antigen Positivity"),
    ("chřipka pozitivita", "Influenza Positivity"),
    ("chřipka odpadní vody", "Influenza Wastewater"),
];

const POSITIVE_TESTS_EN: &str = " - Positive Tests";
const NEGATIVE_TESTS_EN: &str = " - Negative Tests";
const POSITIVE_TESTS_CS: &str = " - pozitivní testy";
const NEGATIVE_TESTS_CS: &str = " - negativní testy";

static WAVE_SHIFT_EN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" shifted by (\d+) (?:wave|waves) ([+-]?\d+|NaN)d").unwrap());
static DAY_SHIFT_EN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" shifted by ([+-]?\d+)d").unwrap());
static AVERAGE_EN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \((\d+)d avg\)").unwrap());

static WAVE_SHIFT_CS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" posunuto o (\d+) (?:vlna|vlny|vln) \(([+-]?\d+|NaN) dnů\)").unwrap()
});
static DAY_SHIFT_CS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" posunuto o ([+-]?\d+) dnů").unwrap());
static AVERAGE_CS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \((\d+)d prům\.\)").unwrap());

fn english_wave_word(count: &str) -> &'static str {
    if count == "1" { "wave" } else { "waves" }
}

fn czech_wave_word(count: &str) -> &'static str {
    if count == "1" { "vlna" } else { "vlny" }
}

/// Canonical English form of a label in any supported language.
///
/// Labels that already carry the English `Positivity` or `Wastewater`
/// keyword are returned unchanged.
pub fn normalize_series_name(series_name: &str) -> String {
    if series_name.contains("Positivity") || series_name.contains("Wastewater") {
        return series_name.to_string();
    }

    let mut normalized = series_name
        .replace(POSITIVE_TESTS_CS, POSITIVE_TESTS_EN)
        .replace(NEGATIVE_TESTS_CS, NEGATIVE_TESTS_EN);

    normalized = WAVE_SHIFT_CS
        .replace_all(&normalized, |caps: &Captures| {
            format!(" shifted by {} {} {}d", &caps[1], english_wave_word(&caps[1]), &caps[2])
        })
        .into_owned();
    normalized = DAY_SHIFT_CS.replace_all(&normalized, " shifted by ${1}d").into_owned();
    normalized = AVERAGE_CS.replace_all(&normalized, " (${1}d avg)").into_owned();

    for (english, czech) in BASE_NAMES {
        normalized = normalized.replace(czech, english);
    }
    for (czech, english) in LOWERCASE_ALIASES {
        normalized = normalized.replace(czech, english);
    }

    normalized
}

/// Display form of a canonical English label.
pub fn translate_series_name(series_name: &str, language: Language) -> String {
    if language == Language::En {
        return series_name.to_string();
    }

    let mut translated = series_name
        .replace(POSITIVE_TESTS_EN, POSITIVE_TESTS_CS)
        .replace(NEGATIVE_TESTS_EN, NEGATIVE_TESTS_CS);

    translated = WAVE_SHIFT_EN
        .replace_all(&translated, |caps: &Captures| {
            format!(" posunuto o {} {} ({} dnů)", &caps[1], czech_wave_word(&caps[1]), &caps[2])
        })
        .into_owned();
    translated = DAY_SHIFT_EN.replace_all(&translated, " posunuto o $1 dnů").into_owned();
    translated = AVERAGE_EN.replace_all(&translated, " (${1}d prům.)").into_owned();

    for (english, czech) in BASE_NAMES {
        translated = translated.replace(english, czech);
    }

    translated
}
