use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Release-date patterns seen on Steam store pages, most specific first.
///
/// `%b` only accepts a three-letter abbreviation, but `%B` accepts both forms, so each
/// abbreviated pattern must precede the long pattern of the same shape.
pub const STEAM_INPUT_FORMATS: &[&str] = &[
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %Y",
];

pub const CANONICAL_OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Normalizes free-form date strings into one output pattern.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    target_format: String,
    input_formats: Vec<String>,
}

impl DateFormatter {
    pub fn new(target_format: impl Into<String>) -> Self {
        Self {
            target_format: target_format.into(),
            input_formats: Vec::new(),
        }
    }

    /// Formatter used for Steam release dates (`YYYY-MM-DD` output).
    pub fn steam_release_dates() -> Self {
        let mut formatter = Self::new(CANONICAL_OUTPUT_FORMAT);
        formatter.set_input_formats(STEAM_INPUT_FORMATS.iter().copied());
        formatter
    }

    pub fn add_input_format(&mut self, input_format: impl Into<String>) {
        self.input_formats.push(input_format.into());
    }

    pub fn set_input_formats<I, S>(&mut self, input_formats: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_formats = input_formats.into_iter().map(Into::into).collect();
    }

    pub fn input_formats(&self) -> &[String] {
        &self.input_formats
    }

    /// Reformat `text` with the first input pattern that consumes it entirely.
    ///
    /// Ordinal suffixes (`1st`, `22nd`, ...) are stripped before matching. When nothing
    /// matches, the original text is returned untouched, suffixes included.
    pub fn normalize(&self, text: &str) -> String {
        let trimmed = strip_ordinals(text);
        self.input_formats
            .iter()
            .find_map(|format| parse_date(&trimmed, format))
            .and_then(|date| self.render(date))
            .unwrap_or_else(|| text.to_string())
    }

    fn render(&self, date: NaiveDate) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", date.format(&self.target_format)).ok()?;
        Some(out)
    }
}

fn ordinal_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)(st|nd|rd|th)").expect("static ordinal regex"))
}

pub fn strip_ordinals(text: &str) -> Cow<'_, str> {
    ordinal_suffix().replace_all(text, "$1")
}

fn whitespace_runs(text: &str) -> usize {
    text.chars()
        .fold((0, false), |(runs, in_run), c| {
            let ws = c.is_whitespace();
            (runs + usize::from(ws && !in_run), ws)
        })
        .0
}

/// Parse a full date; patterns without a day resolve to the first of the month.
fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    // chrono lets a pattern space match no whitespace at all ("Apr2018").
    if whitespace_runs(text) != whitespace_runs(format) {
        return None;
    }
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, StrftimeItems::new(format)).ok()?;
    let date = match parsed.to_naive_date() {
        Ok(date) => date,
        Err(_) => {
            parsed.set_day(1).ok()?;
            parsed.to_naive_date().ok()?
        }
    };
    // chrono lets `%d %Y` split a bare year ("2018" -> day 20, year 18).
    (1000..=9999).contains(&date.year()).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_month_year() -> DateFormatter {
        let mut formatter = DateFormatter::new(CANONICAL_OUTPUT_FORMAT);
        for format in &STEAM_INPUT_FORMATS[..STEAM_INPUT_FORMATS.len() - 1] {
            formatter.add_input_format(*format);
        }
        formatter
    }

    #[test]
    fn normalizes_store_dates() {
        let formatter = without_month_year();
        let cases = [
            ("Dec 20, 2018", "2018-12-20"),
            ("December 2018", "December 2018"),
            ("20 Dec, 2018", "2018-12-20"),
            ("Apr 2018", "Apr 2018"),
            ("2018", "2018"),
            ("Winter 2018", "Winter 2018"),
            (" ", " "),
            ("November 7th, 2018", "2018-11-07"),
            ("October 09, 2018", "2018-10-09"),
        ];
        for (input, expected) in cases {
            assert_eq!(formatter.normalize(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn month_year_resolves_to_first_of_month() {
        let formatter = DateFormatter::steam_release_dates();
        assert_eq!(formatter.normalize("Apr 2018"), "2018-04-01");
        assert_eq!(formatter.normalize("December 2018"), "December 2018");
    }

    #[test]
    fn ordinals_are_stripped_before_matching() {
        let formatter = DateFormatter::steam_release_dates();
        assert_eq!(formatter.normalize("1st Jan, 2019"), "2019-01-01");
        assert_eq!(formatter.normalize("22nd March 2020"), "2020-03-22");
        assert_eq!(formatter.normalize("August 3rd 2017"), "2017-08-03");
    }

    #[test]
    fn fallback_returns_unstripped_input() {
        let formatter = DateFormatter::steam_release_dates();
        assert_eq!(formatter.normalize("2nd quarter 2019"), "2nd quarter 2019");
        assert_eq!(strip_ordinals("2nd quarter 2019"), "2 quarter 2019");
    }

    #[test]
    fn abbreviated_patterns_precede_long_patterns() {
        assert_eq!(
            DateFormatter::steam_release_dates().input_formats(),
            &[
                "%b %d, %Y",
                "%B %d, %Y",
                "%d %b, %Y",
                "%d %B, %Y",
                "%b %d %Y",
                "%B %d %Y",
                "%d %b %Y",
                "%d %B %Y",
                "%b %Y",
            ]
        );
        // The long form also accepts abbreviations; the reverse is not true.
        assert!(parse_date("Dec 20, 2018", "%B %d, %Y").is_some());
        assert!(parse_date("December 20, 2018", "%b %d, %Y").is_none());
    }

    #[test]
    fn bare_year_is_not_split_into_day_and_year() {
        assert!(parse_date("Apr 2018", "%b %d %Y").is_none());
        assert!(parse_date("December 2018", "%B %d %Y").is_none());
    }

    #[test]
    fn pattern_spaces_need_input_whitespace() {
        let formatter = DateFormatter::steam_release_dates();
        assert_eq!(formatter.normalize("Apr2018"), "Apr2018");
        assert_eq!(formatter.normalize("Nov 7,2018"), "Nov 7,2018");
        assert_eq!(formatter.normalize("8Nov, 1998"), "8Nov, 1998");
        assert_eq!(formatter.normalize("Nov  7,   2018"), "2018-11-07");
        assert_eq!(whitespace_runs("%d %B, %Y"), 2);
    }

    #[test]
    fn honours_custom_output_format() {
        let mut formatter = DateFormatter::new("%d/%m/%Y");
        formatter.add_input_format("%B %d, %Y");
        assert_eq!(formatter.normalize("March 5, 2021"), "05/03/2021");
    }
}
