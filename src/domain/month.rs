//! Calendar month used as the key of an installment schedule.

use chrono::{Datelike, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid month '{0}', expected MM/YYYY")]
pub struct MonthParseError(pub String);

/// A calendar month, displayed and parsed as `MM/YYYY`.
///
/// Ordering is chronological, so a schedule sorted by `BillingMonth` is
/// sorted by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(MonthParseError(format!("{:02}/{:04}", month, year)));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in the server's local time zone.
    pub fn current() -> Self {
        Self::of(&Local::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month. Fails past `12/9999`, the last month that
    /// still renders as `MM/YYYY`.
    pub fn next(&self) -> Result<Self, MonthParseError> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for BillingMonth {
    type Err = MonthParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw = value.trim();
        let err = || MonthParseError(raw.to_string());

        let (month, year) = raw.split_once('/').ok_or_else(err)?;
        if month.len() != 2 || year.len() != 4 {
            return Err(err());
        }
        if !month.chars().chain(year.chars()).all(|ch| ch.is_ascii_digit()) {
            return Err(err());
        }

        let month: u32 = month.parse().map_err(|_| err())?;
        let year: i32 = year.parse().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }
}

impl Serialize for BillingMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_and_displays_month() {
        let month: BillingMonth = "03/2025".parse().unwrap();
        assert_eq!(month.month(), 3);
        assert_eq!(month.year(), 2025);
        assert_eq!(month.to_string(), "03/2025");
    }

    #[test]
    fn rejects_malformed_months() {
        assert!("13/2025".parse::<BillingMonth>().is_err());
        assert!("00/2025".parse::<BillingMonth>().is_err());
        assert!("1/2025".parse::<BillingMonth>().is_err());
        assert!("2025/01".parse::<BillingMonth>().is_err());
        assert!("ab/2025".parse::<BillingMonth>().is_err());
        assert!("".parse::<BillingMonth>().is_err());
    }

    #[test]
    fn next_rolls_over_year_boundary() {
        let december = BillingMonth::new(2025, 12).unwrap();
        assert_eq!(december.next().unwrap(), BillingMonth::new(2026, 1).unwrap());

        let june = BillingMonth::new(2025, 6).unwrap();
        assert_eq!(june.next().unwrap().to_string(), "07/2025");
    }

    #[test]
    fn next_stops_at_last_four_digit_year() {
        let last = BillingMonth::new(9999, 12).unwrap();
        assert!(last.next().is_err());
        assert_eq!(
            BillingMonth::new(9999, 11).unwrap().next().unwrap().to_string(),
            "12/9999"
        );
    }

    #[test]
    fn orders_chronologically() {
        let dec = BillingMonth::new(2024, 12).unwrap();
        let jan = BillingMonth::new(2025, 1).unwrap();
        assert!(dec < jan);
    }

    #[test]
    fn month_of_date() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        assert_eq!(BillingMonth::of(&date).to_string(), "02/2026");
    }

    #[test]
    fn serializes_as_string() {
        let month = BillingMonth::new(2025, 11).unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"11/2025\"");

        let parsed: BillingMonth = serde_json::from_str("\"11/2025\"").unwrap();
        assert_eq!(parsed, month);
        assert!(serde_json::from_str::<BillingMonth>("\"11-2025\"").is_err());
    }
}
