/// Week scheduling helpers: week numbers, context keys and page URLs
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Which meeting of the week a schedule refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekType {
    Midweek,
    Weekend,
}

impl WeekType {
    /// Position used when composing context keys (`1` for midweek, `2` for weekend)
    pub fn ordinal(&self) -> u32 {
        match self {
            Self::Midweek => 1,
            Self::Weekend => 2,
        }
    }
}

impl fmt::Display for WeekType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Midweek => f.write_str("midweek"),
            Self::Weekend => f.write_str("weekend"),
        }
    }
}

impl FromStr for WeekType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "midweek" | "0" => Ok(Self::Midweek),
            "weekend" | "1" => Ok(Self::Weekend),
            other => Err(format!("unknown week type '{}'", other)),
        }
    }
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Sunday-based week of the year, where week 1 is the week containing 1 January
///
/// Days in the last partial week of December belong to week 1 of the next
/// year, while the calendar year used in context keys stays unchanged.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use meeting_media::model::week_of_year;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
/// assert_eq!(week_of_year(date), 2);
/// ```
pub fn week_of_year(date: NaiveDate) -> u32 {
    let week_year_start = match NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).map(start_of_week) {
        Some(next) if date >= next => next,
        _ => start_of_week(date.with_ordinal(1).unwrap_or(date)),
    };
    let days = (start_of_week(date) - week_year_start).num_days();
    (days / 7 + 1) as u32
}

/// Context key for one week's meeting, e.g. `2024-20--1`
pub fn week_context(date: NaiveDate, week_type: WeekType) -> String {
    format!("{}-{}--{}", date.year(), week_of_year(date), week_type.ordinal())
}

/// Expands a meetings URL template containing `{year}` and `{week}`
pub fn meetings_url(template: &str, date: NaiveDate) -> String {
    template
        .replace("{year}", &date.year().to_string())
        .replace("{week}", &week_of_year(date).to_string())
}
