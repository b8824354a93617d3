use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike as _, NaiveDate, TimeDelta, TimeZone, Utc};

/// A UTC calendar day. Ordered by year, then month, then day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryDate(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {input:?}: expected YYYY-MM-DD")]
pub struct ParseEntryDateError {
    pub input: String,
}

impl EntryDate {
    /// Calendar day of `t` in UTC, whatever zone `t` carries.
    pub fn from_timestamp<Tz: TimeZone>(t: &DateTime<Tz>) -> Self {
        Self(t.with_timezone(&Utc).date_naive())
    }

    /// Returns `None` only for days outside the representable range.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// The following calendar day, stepping from UTC midnight.
    ///
    /// `None` past the last representable day.
    pub fn next_day(self) -> Option<Self> {
        self.0
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .checked_add_signed(TimeDelta::days(1))
            .map(|t| Self::from_timestamp(&t))
    }

    pub fn parse(input: &str) -> Result<Self, ParseEntryDateError> {
        let err = || ParseEntryDateError {
            input: input.to_owned(),
        };

        // chrono's %Y/%m/%d accept unpadded and signed fields; the layout is strict here.
        let bytes = input.as_bytes();
        if bytes.len() != 10 {
            return Err(err());
        }
        let layout_ok = bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !layout_ok {
            return Err(err());
        }

        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| err())
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day()
        )
    }
}

impl FromStr for EntryDate {
    type Err = ParseEntryDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
