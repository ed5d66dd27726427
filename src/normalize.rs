//! Text normalisation pipeline.
//!
//! Rewrites arbitrary user or markdown text into a form the speech engine
//! reads naturally: blank lines and emoji go away, emphasis markers are
//! stripped, `%` and temperature units are spelled out, and `*` is resolved
//! to either "times" or a plain dash.
//!
//! The steps run in the fixed order of [`NormalizationStep::ALL`]; each one
//! sees the output of the step before it, so the order is part of the
//! contract.

use once_cell::sync::Lazy;
use regex::Regex;

/// Line separator used when blank lines are dropped and the text rejoined.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// Line separator used when blank lines are dropped and the text rejoined.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        // flags: pairs of regional indicators, then strays
        r"[\x{1F1E6}-\x{1F1FF}]{1,2}",
        // keycaps: 1️⃣ #️⃣ *️⃣
        r"|[0-9#*]\x{FE0F}?\x{20E3}",
        // pictographs with optional presentation selector, skin tone and ZWJ chains
        r"|\p{Extended_Pictographic}[\x{FE0E}\x{FE0F}]?[\x{1F3FB}-\x{1F3FF}]?",
        // tag sequences (subdivision flags such as England)
        r"[\x{E0020}-\x{E007F}]*",
        r"(?:\x{200D}\p{Extended_Pictographic}[\x{FE0E}\x{FE0F}]?[\x{1F3FB}-\x{1F3FF}]?)*",
        r"|[\x{1F3FB}-\x{1F3FF}]",
    ))
    .unwrap()
});
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_MONOSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"``(.*?)``").unwrap());
/// A `*` with a numeric-like character on its left.
static RE_MULTIPLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d)}\]]\*").unwrap());
/// Characters that may follow a multiplication `*`.
static RE_MULTIPLICAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d({\[]$").unwrap());
static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Markdown emphasis styles
// ─────────────────────────────────────────────────────────────────────────────

/// A markdown emphasis marker pair and the inner-content pattern it wraps.
pub struct EmphasisStyle {
    pub name: &'static str,
    pattern: &'static Lazy<Regex>,
    /// Characters of marker on each side of the inner content.
    pub width: usize,
}

/// Emphasis styles in the order they must be stripped.
///
/// Bold has to run before italic: otherwise `\*(.*?)\*` would pair up the
/// two halves of a `**` marker.  Monospace is delimited by *doubled*
/// backticks; single backticks are left alone so apostrophe-like uses
/// survive.
pub static EMPHASIS_STYLES: [EmphasisStyle; 3] = [
    EmphasisStyle { name: "bold", pattern: &RE_BOLD, width: 2 },
    EmphasisStyle { name: "italic", pattern: &RE_ITALIC, width: 1 },
    EmphasisStyle { name: "monospace", pattern: &RE_MONOSPACE, width: 2 },
];

impl EmphasisStyle {
    /// Replace every occurrence of this style with its inner content.
    ///
    /// Explicit search/splice loop that resumes right after each splice.  The
    /// character before a leftmost match is never a marker and the inner
    /// content holds no closing marker, so a splice never exposes a new pair
    /// and a re-scan from the start would find the same matches.
    pub fn strip(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(m) = self.pattern.find_at(text, cursor) {
            out.push_str(&text[cursor..m.start()]);
            out.push_str(&text[m.start() + self.width..m.end() - self.width]);
            cursor = m.end();
        }
        out.push_str(&text[cursor..]);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Individual steps
// ─────────────────────────────────────────────────────────────────────────────

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split on every Unicode line boundary, treating `\r\n` as one break.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(is_line_break) {
        lines.push(&rest[..pos]);
        let tail = &rest[pos..];
        let width = if tail.starts_with("\r\n") {
            2
        } else {
            tail.chars().next().map_or(1, char::len_utf8)
        };
        rest = &tail[width..];
    }
    lines.push(rest);
    lines
}

/// Drop empty lines and rejoin the rest with [`LINE_SEPARATOR`].
///
/// Lines holding only spaces are not empty and are kept.
pub fn remove_blank_lines(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

pub fn remove_emoji(text: &str) -> String {
    RE_EMOJI.replace_all(text, "").into_owned()
}

/// Strip bold, italic and monospace markers, in that order.
pub fn strip_emphasis(text: &str) -> String {
    EMPHASIS_STYLES
        .iter()
        .fold(text.to_string(), |acc, style| style.strip(&acc))
}

/// `50 %` and `50%` both become `50 percent`.
pub fn expand_percent(text: &str) -> String {
    text.replace(" %", " percent").replace('%', " percent")
}

/// Resolve `*` (and `·`) to multiplication where it sits between numeric-like
/// boundaries, then turn every other asterisk into `-`.
///
/// A leading bullet such as `* Item` has nothing numeric before it, so it
/// falls through to the dash replacement.
pub fn disambiguate_asterisks(text: &str) -> String {
    let text = text.replace('·', "*");
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in RE_MULTIPLY.find_iter(&text) {
        let rest = &text[m.end()..];
        let is_product = match rest.chars().next() {
            None => true,
            Some(c) => RE_MULTIPLICAND.is_match(&rest[..c.len_utf8()]),
        };
        if is_product {
            // keep the left operand, drop the `*`
            out.push_str(&text[last..m.end() - 1]);
            out.push_str(" times ");
            last = m.end();
        }
    }
    out.push_str(&text[last..]);
    out.replace('*', "-")
}

/// Secondary `+` bullets indented by two spaces become `-` bullets.
pub fn normalize_list_markers(text: &str) -> String {
    text.replace("  +", "  -")
}

/// Remove every `\r` and trim the whole text.  Inner newlines stay: the
/// engine pauses at line breaks.
pub fn strip_carriage_returns(text: &str) -> String {
    text.replace('\r', "").trim().to_string()
}

/// Runs of two or more spaces become one.  Tabs and newlines are untouched.
pub fn collapse_spaces(text: &str) -> String {
    RE_SPACE_RUN.replace_all(text, " ").into_owned()
}

pub fn expand_temperature_units(text: &str) -> String {
    text.replace("°F", "° Fahrenheit")
        .replace("°C", "° Celsius")
        .replace("°K", "° Kelvin")
}

// ─────────────────────────────────────────────────────────────────────────────
// NormalizationStep — the ordered rule list
// ─────────────────────────────────────────────────────────────────────────────

/// One rewrite rule of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationStep {
    BlankLines,
    Emoji,
    Emphasis,
    Percent,
    Asterisks,
    ListMarkers,
    CarriageReturns,
    Spaces,
    TemperatureUnits,
}

impl NormalizationStep {
    /// Every step, in the order the pipeline applies them.
    pub const ALL: [NormalizationStep; 9] = [
        NormalizationStep::BlankLines,
        NormalizationStep::Emoji,
        NormalizationStep::Emphasis,
        NormalizationStep::Percent,
        NormalizationStep::Asterisks,
        NormalizationStep::ListMarkers,
        NormalizationStep::CarriageReturns,
        NormalizationStep::Spaces,
        NormalizationStep::TemperatureUnits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BlankLines => "blank_lines",
            Self::Emoji => "emoji",
            Self::Emphasis => "emphasis",
            Self::Percent => "percent",
            Self::Asterisks => "asterisks",
            Self::ListMarkers => "list_markers",
            Self::CarriageReturns => "carriage_returns",
            Self::Spaces => "spaces",
            Self::TemperatureUnits => "temperature_units",
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            Self::BlankLines => remove_blank_lines(text),
            Self::Emoji => remove_emoji(text),
            Self::Emphasis => strip_emphasis(text),
            Self::Percent => expand_percent(text),
            Self::Asterisks => disambiguate_asterisks(text),
            Self::ListMarkers => normalize_list_markers(text),
            Self::CarriageReturns => strip_carriage_returns(text),
            Self::Spaces => collapse_spaces(text),
            Self::TemperatureUnits => expand_temperature_units(text),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TextNormalizer — full pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Per-step switches for the normalisation pipeline.
///
/// Disabling a step skips it; the remaining steps keep their order.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub remove_blank_lines: bool,
    pub remove_emoji: bool,
    pub strip_emphasis: bool,
    pub expand_percent: bool,
    pub disambiguate_asterisks: bool,
    pub normalize_list_markers: bool,
    pub strip_carriage_returns: bool,
    pub collapse_spaces: bool,
    pub expand_temperature_units: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            remove_blank_lines: true,
            remove_emoji: true,
            strip_emphasis: true,
            expand_percent: true,
            disambiguate_asterisks: true,
            normalize_list_markers: true,
            strip_carriage_returns: true,
            collapse_spaces: true,
            expand_temperature_units: true,
        }
    }
}

impl NormalizerConfig {
    pub fn is_enabled(&self, step: NormalizationStep) -> bool {
        match step {
            NormalizationStep::BlankLines => self.remove_blank_lines,
            NormalizationStep::Emoji => self.remove_emoji,
            NormalizationStep::Emphasis => self.strip_emphasis,
            NormalizationStep::Percent => self.expand_percent,
            NormalizationStep::Asterisks => self.disambiguate_asterisks,
            NormalizationStep::ListMarkers => self.normalize_list_markers,
            NormalizationStep::CarriageReturns => self.strip_carriage_returns,
            NormalizationStep::Spaces => self.collapse_spaces,
            NormalizationStep::TemperatureUnits => self.expand_temperature_units,
        }
    }
}

/// The normalisation pipeline.  Stateless apart from its config, so one
/// instance can be shared across request handlers.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    pub config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, text: &str) -> String {
        let mut text = text.to_string();
        for step in NormalizationStep::ALL {
            if !self.config.is_enabled(step) {
                continue;
            }
            text = step.apply(&text);
            tracing::trace!(step = step.name(), len = text.len(), "normalisation step applied");
        }
        text
    }
}

/// Run the full default pipeline over `text`.
pub fn normalize(text: &str) -> String {
    TextNormalizer::new().process(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
