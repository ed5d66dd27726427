//! Language identification for incoming text.
//!
//! The engine needs an ISO 639-1 code alongside the text.  Detection is done
//! with `lingua` (feature `detect`) restricted to the languages the speech
//! model handles; when it cannot decide, callers fall back to a configured
//! default.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// ISO 639-1 language codes supported by the speech engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "nl")]
    Dutch,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "zh")]
    Chinese,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 11] = [
        LanguageCode::English,
        LanguageCode::Spanish,
        LanguageCode::French,
        LanguageCode::German,
        LanguageCode::Italian,
        LanguageCode::Portuguese,
        LanguageCode::Dutch,
        LanguageCode::Russian,
        LanguageCode::Korean,
        LanguageCode::Japanese,
        LanguageCode::Chinese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
            LanguageCode::Dutch => "nl",
            LanguageCode::Russian => "ru",
            LanguageCode::Korean => "ko",
            LanguageCode::Japanese => "ja",
            LanguageCode::Chinese => "zh",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageCode {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        LanguageCode::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .ok_or(UnknownLanguage(s.to_string()))
    }
}

#[cfg(feature = "detect")]
pub use detector::LanguageDetector;

#[cfg(feature = "detect")]
mod detector {
    use lingua::{Language, LanguageDetectorBuilder};

    use super::LanguageCode;

    impl LanguageCode {
        fn to_lingua(self) -> Language {
            match self {
                LanguageCode::English => Language::English,
                LanguageCode::Spanish => Language::Spanish,
                LanguageCode::French => Language::French,
                LanguageCode::German => Language::German,
                LanguageCode::Italian => Language::Italian,
                LanguageCode::Portuguese => Language::Portuguese,
                LanguageCode::Dutch => Language::Dutch,
                LanguageCode::Russian => Language::Russian,
                LanguageCode::Korean => Language::Korean,
                LanguageCode::Japanese => Language::Japanese,
                LanguageCode::Chinese => Language::Chinese,
            }
        }

        fn from_lingua(language: Language) -> Self {
            match language {
                Language::English => LanguageCode::English,
                Language::Spanish => LanguageCode::Spanish,
                Language::French => LanguageCode::French,
                Language::German => LanguageCode::German,
                Language::Italian => LanguageCode::Italian,
                Language::Portuguese => LanguageCode::Portuguese,
                Language::Dutch => LanguageCode::Dutch,
                Language::Russian => LanguageCode::Russian,
                Language::Korean => LanguageCode::Korean,
                Language::Japanese => LanguageCode::Japanese,
                Language::Chinese => LanguageCode::Chinese,
            }
        }
    }

    /// Detector over [`LanguageCode::ALL`].  Building the language models is
    /// the expensive part, so construct one per process and share it.
    pub struct LanguageDetector {
        inner: lingua::LanguageDetector,
    }

    impl LanguageDetector {
        pub fn new() -> Self {
            let languages: Vec<Language> =
                LanguageCode::ALL.iter().map(|c| c.to_lingua()).collect();
            Self { inner: LanguageDetectorBuilder::from_languages(&languages).build() }
        }

        pub fn detect(&self, text: &str) -> Option<LanguageCode> {
            self.inner.detect_language_of(text).map(LanguageCode::from_lingua)
        }

        /// Detect, falling back to `default` when the text is undecidable.
        pub fn detect_or(&self, text: &str, default: LanguageCode) -> LanguageCode {
            match self.detect(text) {
                Some(code) => code,
                None => {
                    tracing::debug!(fallback = %default, "Language detection inconclusive");
                    default
                }
            }
        }
    }

    impl Default for LanguageDetector {
        fn default() -> Self {
            Self::new()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_str() {
        for code in LanguageCode::ALL {
            assert_eq!(code.as_str().parse::<LanguageCode>(), Ok(code));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" EN ".parse::<LanguageCode>(), Ok(LanguageCode::English));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "xx".parse::<LanguageCode>(),
            Err(UnknownLanguage("xx".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_iso_codes() {
        assert_eq!(serde_json::to_string(&LanguageCode::Korean).unwrap(), "\"ko\"");
        assert_eq!(LanguageCode::default().to_string(), "en");
    }
}
