//! Duration string parsing and formatting.
//!
//! Event exports describe elapsed time as whitespace-separated unit tokens
//! (`"2d 3h"`, `"1h 30m"`, `"45s"`). Parsing is lenient: a token that is not an
//! unsigned integer followed by a single `d`/`h`/`m`/`s` letter is skipped, so a
//! single bad field never aborts a whole analysis.

use paperclip::actix::Apiv2Schema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::models::events::NOT_APPLICABLE;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 86_400;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([dhmsDHMS])$").expect("duration token pattern"));

/// Language used when rendering durations for people
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Compact unit letters (`1h 30m`), re-parseable by [`parse_to_seconds`]
    #[default]
    En,
    /// Korean unit words (`1시간 30분`)
    Ko,
}

impl Locale {
    /// Parse a locale tag such as `en`, `ko` or `ko-KR`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "ko" => Some(Self::Ko),
            _ => None,
        }
    }
}

fn token_seconds(token: &str) -> Option<u64> {
    let captures = TOKEN.captures(token)?;
    let amount: u64 = captures[1].parse().ok()?;
    let multiplier = match captures[2].to_ascii_lowercase().as_str() {
        "d" => SECONDS_PER_DAY,
        "h" => SECONDS_PER_HOUR,
        "m" => SECONDS_PER_MINUTE,
        _ => 1,
    };
    Some(amount.saturating_mul(multiplier))
}

/// Parse a duration string, returning `None` when no token is recognized.
///
/// This is how callers tell "no duration" apart from an explicit `"0s"`.
pub fn parse_duration(text: &str) -> Option<u64> {
    text.split_whitespace()
        .filter_map(token_seconds)
        .fold(None, |total: Option<u64>, seconds| {
            Some(total.unwrap_or(0).saturating_add(seconds))
        })
}

/// Parse a duration string into total seconds; empty or unparseable input is 0
pub fn parse_to_seconds(text: &str) -> u64 {
    parse_duration(text).unwrap_or(0)
}

/// Render seconds using the two largest applicable units, truncating
pub fn format_seconds(seconds: u64, locale: Locale) -> String {
    let (days, hours, minutes) = (
        seconds / SECONDS_PER_DAY,
        (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
        (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
    );

    match locale {
        Locale::En => {
            if seconds < SECONDS_PER_MINUTE {
                format!("{seconds}s")
            } else if seconds < SECONDS_PER_HOUR {
                format!("{}m", seconds / SECONDS_PER_MINUTE)
            } else if seconds < SECONDS_PER_DAY {
                format!("{}h {minutes}m", seconds / SECONDS_PER_HOUR)
            } else {
                format!("{days}d {hours}h")
            }
        }
        Locale::Ko => {
            if seconds < SECONDS_PER_MINUTE {
                format!("{seconds}초")
            } else if seconds < SECONDS_PER_HOUR {
                format!("{}분", seconds / SECONDS_PER_MINUTE)
            } else if seconds < SECONDS_PER_DAY {
                format!("{}시간 {minutes}분", seconds / SECONDS_PER_HOUR)
            } else {
                format!("{days}일 {hours}시간")
            }
        }
    }
}

/// Mean of the positive durations among `durations`, truncated to whole seconds
pub fn average_seconds<'a, I>(durations: I) -> Option<u64>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let (total, count) = durations
        .into_iter()
        .flatten()
        .filter_map(parse_duration)
        .filter(|seconds| *seconds > 0)
        .fold((0u128, 0u64), |(total, count), seconds| {
            (total + u128::from(seconds), count + 1)
        });

    (count > 0).then(|| (total / u128::from(count)) as u64)
}

/// Formatted mean duration, or `"N/A"` when no entry has a positive duration
pub fn average_duration<'a, I>(durations: I, locale: Locale) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    average_seconds(durations)
        .map(|seconds| format_seconds(seconds, locale))
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        assert_eq!(parse_to_seconds("1h 30m"), 5400);
        assert_eq!(parse_to_seconds("45m"), 2700);
        assert_eq!(parse_to_seconds("2d 3h"), 183_600);
        assert_eq!(parse_to_seconds("10s"), 10);
        assert_eq!(parse_to_seconds("1D 2H"), 93_600);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert_eq!(parse_to_seconds(""), 0);
        assert_eq!(parse_to_seconds("   "), 0);
        assert_eq!(parse_to_seconds("garbage"), 0);
        assert_eq!(parse_duration("garbage"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_skips_malformed_tokens() {
        assert_eq!(parse_to_seconds("-5m 10s"), 10);
        assert_eq!(parse_to_seconds("1x 2h"), 7200);
        assert_eq!(parse_to_seconds("h1 abc5m 3m"), 180);
        assert_eq!(parse_to_seconds("1hm"), 0);
        assert_eq!(parse_to_seconds("1.5h"), 0);
    }

    #[test]
    fn test_explicit_zero_is_a_value() {
        assert_eq!(parse_duration("0s"), Some(0));
        assert_eq!(parse_duration("0m garbage"), Some(0));
    }

    #[test]
    fn test_parse_saturates_on_overflow() {
        assert_eq!(parse_to_seconds("99999999999999999999d"), 0);
        assert_eq!(
            parse_to_seconds("18446744073709551615d 1s"),
            u64::MAX
        );
    }

    #[test]
    fn test_format_unit_boundaries() {
        assert_eq!(format_seconds(0, Locale::En), "0s");
        assert_eq!(format_seconds(59, Locale::En), "59s");
        assert_eq!(format_seconds(60, Locale::En), "1m");
        assert_eq!(format_seconds(3599, Locale::En), "59m");
        assert_eq!(format_seconds(5400, Locale::En), "1h 30m");
        assert_eq!(format_seconds(86_399, Locale::En), "23h 59m");
        assert_eq!(format_seconds(183_600, Locale::En), "2d 3h");
    }

    #[test]
    fn test_format_korean() {
        assert_eq!(format_seconds(30, Locale::Ko), "30초");
        assert_eq!(format_seconds(2700, Locale::Ko), "45분");
        assert_eq!(format_seconds(5400, Locale::Ko), "1시간 30분");
        assert_eq!(format_seconds(183_600, Locale::Ko), "2일 3시간");
    }

    #[test]
    fn test_format_round_trip_stays_in_bucket() {
        for seconds in [7, 59, 61, 3_725, 86_399, 90_061, 1_000_000] {
            let reparsed = parse_to_seconds(&format_seconds(seconds, Locale::En));
            assert!(reparsed <= seconds, "{seconds} -> {reparsed}");
            assert_eq!(
                format_seconds(reparsed, Locale::En),
                format_seconds(seconds, Locale::En)
            );
        }
    }

    #[test]
    fn test_average_excludes_empty_entries() {
        let durations = [Some("1h"), Some("30m"), Some(""), Some("2h 15m")];
        assert_eq!(average_seconds(durations), Some(4500));
        assert_eq!(average_duration(durations, Locale::En), "1h 15m");
        assert_eq!(average_duration(durations, Locale::Ko), "1시간 15분");
    }

    #[test]
    fn test_average_not_applicable() {
        assert_eq!(average_duration([None, Some(""), Some("0s")], Locale::En), "N/A");
        assert_eq!(average_duration(std::iter::empty(), Locale::En), "N/A");
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("ko-KR"), Some(Locale::Ko));
        assert_eq!(Locale::from_tag("EN"), Some(Locale::En));
        assert_eq!(Locale::from_tag("fr"), None);
    }
}
