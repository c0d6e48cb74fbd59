use serde::{Deserialize, Serialize};

/// Supported UI locales. `ko` is the canonical content language; every
/// localized column falls back to the Korean value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ko,
    En,
    Ja,
    Zh,
}

pub const ALL_LOCALES: [Locale; 4] = [Locale::Ko, Locale::En, Locale::Ja, Locale::Zh];

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ko => "ko",
            Locale::En => "en",
            Locale::Ja => "ja",
            Locale::Zh => "zh",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" => Some(Locale::Ko),
            "en" => Some(Locale::En),
            "ja" => Some(Locale::Ja),
            "zh" => Some(Locale::Zh),
            _ => None,
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// First supported primary language tag in an `Accept-Language` value.
    ///
    /// Quality weights are ignored; browsers already list tags in
    /// preference order.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .filter_map(|tag| tag.trim().split(['-', '_']).next())
            .find_map(Self::parse)
    }
}

/// Pick the localized value, falling back to the Korean one when the
/// localized column is missing or blank.
pub fn localized<'a>(ko: &'a str, other: Option<&'a str>) -> &'a str {
    match other.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => ko,
    }
}
