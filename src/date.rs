//! Date utilities (component D): literal-precision inference, closed-open
//! interval arithmetic for comparator expansion, and interval-shortcut
//! handling for date-histogram rendering.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use crate::error::SelError;

/// The `||`-joined multi-format pattern attached to every generated date
/// range query, most to least precise.
pub const ELASTIC_DATE_FORMAT: &str =
    "yyyy-MM-dd HH:mm:ss||yyyy-MM-dd HH:mm||yyyy-MM-dd HH||yyyy-MM-dd||yyyy-MM||yyyy";

/// The precision at which a date literal was written, inferred from which
/// of the six accepted patterns it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Granularity {
    /// The `strftime`/`chrono` pattern matching this granularity.
    fn chrono_pattern(self) -> &'static str {
        match self {
            Granularity::Year => "%Y",
            Granularity::Month => "%Y-%m",
            Granularity::Day => "%Y-%m-%d",
            Granularity::Hour => "%Y-%m-%d %H",
            Granularity::Minute => "%Y-%m-%d %H:%M",
            Granularity::Second => "%Y-%m-%d %H:%M:%S",
        }
    }

    /// Patterns tried in order from most to least precise, paired with
    /// their granularity.
    fn ordered() -> [(Granularity, &'static str); 6] {
        [
            (Granularity::Second, "%Y-%m-%d %H:%M:%S"),
            (Granularity::Minute, "%Y-%m-%d %H:%M"),
            (Granularity::Hour, "%Y-%m-%d %H"),
            (Granularity::Day, "%Y-%m-%d"),
            (Granularity::Month, "%Y-%m"),
            (Granularity::Year, "%Y"),
        ]
    }
}

/// A date literal parsed from SEL surface syntax, retaining the precision
/// at which it was written so arithmetic and re-formatting stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub datetime: NaiveDateTime,
    pub granularity: Granularity,
}

impl ParsedDate {
    /// Render back to text at the same precision it was parsed with.
    pub fn format(&self) -> String {
        self.datetime.format(self.granularity.chrono_pattern()).to_string()
    }

    /// Add one unit of this date's own granularity.
    pub fn add_one_unit(&self) -> ParsedDate {
        ParsedDate {
            datetime: add_unit(self.datetime, self.granularity, 1),
            granularity: self.granularity,
        }
    }
}

/// Parse a date literal against the six accepted patterns (most to least
/// precise), returning the matched value and its granularity.
///
/// Returns `None` (not an error) when the literal matches none of the
/// patterns, so callers can fall back to treating the value as an opaque
/// string for fields whose type isn't actually `date`.
pub fn try_parse(literal: &str) -> Option<ParsedDate> {
    for (granularity, pattern) in Granularity::ordered() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(literal, pattern) {
            return Some(ParsedDate { datetime: dt, granularity });
        }
        // NaiveDateTime::parse_from_str requires both date and time
        // components; date-only patterns must go through NaiveDate.
        if let Ok(date) = chrono::NaiveDate::parse_from_str(literal, pattern) {
            return Some(ParsedDate {
                datetime: date.and_hms_opt(0, 0, 0).unwrap(),
                granularity,
            });
        }
    }
    None
}

/// Parse a date literal, returning a [`SelError::ClientInput`] if it
/// matches none of the six accepted patterns.
pub fn parse(literal: &str) -> Result<ParsedDate, SelError> {
    try_parse(literal).ok_or_else(|| {
        SelError::client_input(format!(
            "'{literal}' does not match any accepted date format"
        ))
    })
}

fn add_unit(dt: NaiveDateTime, granularity: Granularity, amount: i32) -> NaiveDateTime {
    match granularity {
        Granularity::Second => dt + Duration::seconds(amount as i64),
        Granularity::Minute => dt + Duration::minutes(amount as i64),
        Granularity::Hour => dt + Duration::hours(amount as i64),
        Granularity::Day => dt + Duration::days(amount as i64),
        Granularity::Month => add_months(dt, amount),
        Granularity::Year => add_months(dt, amount * 12),
    }
}

fn add_months(dt: NaiveDateTime, months: i32) -> NaiveDateTime {
    let total = dt.year() * 12 + (dt.month() as i32 - 1) + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) + 1;
    let day = dt.day().min(days_in_month(year, month as u32));
    chrono::NaiveDate::from_ymd_opt(year, month as u32, day)
        .unwrap()
        .and_time(dt.time())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    (first_of_next - first_of_this).num_days() as u32
}

/// A comparator range pair emitted for a date comparison: `(gte, lt)` (gte
/// alone, lt alone, or both, per §4.3.1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    pub gte: Option<String>,
    pub lt: Option<String>,
}

/// Expand a single date comparator against a parsed literal into a
/// closed-open `DateRange`, per §4.3.1 step 4.
pub fn expand_comparator(comparator: &str, value: ParsedDate) -> Result<DateRange, SelError> {
    match comparator {
        "=" => Ok(DateRange {
            gte: Some(value.format()),
            lt: Some(value.add_one_unit().format()),
        }),
        ">" => Ok(DateRange {
            gte: Some(value.add_one_unit().format()),
            lt: None,
        }),
        ">=" => Ok(DateRange {
            gte: Some(value.format()),
            lt: None,
        }),
        "<=" => Ok(DateRange {
            gte: None,
            lt: Some(value.add_one_unit().format()),
        }),
        "<" => Ok(DateRange {
            gte: None,
            lt: Some(value.format()),
        }),
        other => Err(SelError::client_input(format!(
            "comparator '{other}' cannot be used as a date range bound"
        ))),
    }
}

/// Date-histogram interval shortcuts, from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Interval {
    /// Parse a full word (`"week"`) or single-letter shortcut (`"w"`).
    pub fn parse(raw: &str) -> Result<Interval, SelError> {
        match raw.to_ascii_lowercase().as_str() {
            "y" | "year" | "years" => Ok(Interval::Year),
            "q" | "quarter" | "quarters" => Ok(Interval::Quarter),
            "m" | "month" | "months" => Ok(Interval::Month),
            "w" | "week" | "weeks" => Ok(Interval::Week),
            "d" | "day" | "days" => Ok(Interval::Day),
            "h" | "hour" | "hours" => Ok(Interval::Hour),
            "mi" | "minute" | "minutes" => Ok(Interval::Minute),
            "s" | "second" | "seconds" => Ok(Interval::Second),
            other => Err(SelError::client_input(format!(
                "'{other}' is not a valid interval"
            ))),
        }
    }

    /// The Elasticsearch `calendar_interval` value for this shortcut.
    pub fn calendar_interval(self) -> &'static str {
        match self {
            Interval::Year => "year",
            Interval::Quarter => "quarter",
            Interval::Month => "month",
            Interval::Week => "week",
            Interval::Day => "day",
            Interval::Hour => "hour",
            Interval::Minute => "minute",
            Interval::Second => "second",
        }
    }

    /// The `chrono` format pattern used to render a histogram bucket's
    /// `key_as_string`, per §4.4 step 2's interval-to-format mapping.
    pub fn key_as_string_pattern(self) -> &'static str {
        match self {
            Interval::Year => "%Y",
            Interval::Quarter | Interval::Month => "%Y-%m",
            Interval::Week | Interval::Day => "%Y-%m-%d",
            Interval::Hour => "%Y-%m-%d %H",
            Interval::Minute => "%Y-%m-%d %H:%M",
            Interval::Second => "%Y-%m-%d %H:%M:%S",
        }
    }

    /// Render a bucket key (milliseconds since the Unix epoch) as
    /// `key_as_string` using this interval's format.
    pub fn format_bucket_key(self, millis_since_epoch: i64) -> String {
        let secs = millis_since_epoch.div_euclid(1000);
        let nanos = (millis_since_epoch.rem_euclid(1000)) as u32 * 1_000_000;
        let dt = chrono::DateTime::from_timestamp(secs, nanos)
            .unwrap_or_default()
            .naive_utc();
        dt.format(self.key_as_string_pattern()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_only_literal() {
        let parsed = parse("2017").unwrap();
        assert_eq!(parsed.granularity, Granularity::Year);
        assert_eq!(parsed.format(), "2017");
    }

    #[test]
    fn parses_full_datetime_literal() {
        let parsed = parse("2017-03-04 05:06:07").unwrap();
        assert_eq!(parsed.granularity, Granularity::Second);
    }

    #[test]
    fn rejects_unparseable_literal() {
        assert!(parse("not-a-date").is_err());
    }

    #[test]
    fn greater_than_year_expands_to_next_year() {
        let parsed = parse("2017").unwrap();
        let range = expand_comparator(">", parsed).unwrap();
        assert_eq!(range.gte.as_deref(), Some("2018"));
        assert_eq!(range.lt, None);
    }

    #[test]
    fn equals_year_expands_to_closed_open_range() {
        let parsed = parse("2017").unwrap();
        let range = expand_comparator("=", parsed).unwrap();
        assert_eq!(range.gte.as_deref(), Some("2017"));
        assert_eq!(range.lt.as_deref(), Some("2018"));
    }

    #[test]
    fn month_arithmetic_rolls_over_year_boundary() {
        let parsed = parse("2017-12").unwrap();
        let next = parsed.add_one_unit();
        assert_eq!(next.format(), "2018-01");
    }

    #[test]
    fn day_arithmetic_respects_month_length() {
        let parsed = parse("2020-02-28").unwrap();
        let next = parsed.add_one_unit();
        // 2020 is a leap year.
        assert_eq!(next.format(), "2020-02-29");
    }

    #[test]
    fn interval_shortcut_and_word_both_parse() {
        assert_eq!(Interval::parse("w").unwrap(), Interval::Week);
        assert_eq!(Interval::parse("week").unwrap(), Interval::Week);
    }

    #[test]
    fn key_as_string_uses_interval_precision() {
        let millis = 1_700_000_000_000i64;
        let rendered = Interval::Day.format_bucket_key(millis);
        assert_eq!(rendered.len(), "yyyy-MM-dd".len());
    }
}
