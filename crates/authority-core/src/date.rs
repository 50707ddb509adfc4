//! Partial calendar dates as found in authority records.
//!
//! Authority files rarely know a full date: a birth year or a year and month
//! is common. [`PartialDate`] keeps exactly the precision that was supplied.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialDate {
  Year(i32),
  YearMonth(i32, u32),
  Date(NaiveDate),
}

impl PartialDate {
  fn year_month(year: i32, month: u32) -> Option<Self> {
    (1..=12).contains(&month).then_some(Self::YearMonth(year, month))
  }
}

fn parse_year(s: &str) -> Option<i32> {
  let unsigned = s.strip_prefix('-').unwrap_or(s);
  if unsigned.is_empty() || unsigned.len() > 4 || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}

fn parse_number(s: &str) -> Option<u32> {
  (!s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_digit()))
    .then(|| s.parse().ok())
    .flatten()
}

/// Accepts `yyyy`, `yyyy-MM`, `yyyy-MM-dd`, `MM.yyyy`, `M.yyyy` and
/// `dd.MM.yyyy`.
impl FromStr for PartialDate {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    let invalid = || Error::InvalidDate(s.to_owned());

    if s.contains('.') {
      let parts: Vec<&str> = s.split('.').collect();
      return match parts.as_slice() {
        [month, year] => {
          let year = parse_year(year).ok_or_else(invalid)?;
          let month = parse_number(month).ok_or_else(invalid)?;
          Self::year_month(year, month).ok_or_else(invalid)
        }
        [day, month, year] => {
          let year = parse_year(year).ok_or_else(invalid)?;
          let month = parse_number(month).ok_or_else(invalid)?;
          let day = parse_number(day).ok_or_else(invalid)?;
          NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::Date)
            .ok_or_else(invalid)
        }
        _ => Err(invalid()),
      };
    }

    // ISO-style; a leading '-' belongs to the year.
    let (sign, body) = match s.strip_prefix('-') {
      Some(rest) => ("-", rest),
      None => ("", s),
    };
    let parts: Vec<&str> = body.split('-').collect();
    let year = parse_year(&format!("{sign}{}", parts[0])).ok_or_else(invalid)?;
    match parts.as_slice() {
      [_] => Ok(Self::Year(year)),
      [_, month] if month.len() == 2 => {
        let month = parse_number(month).ok_or_else(invalid)?;
        Self::year_month(year, month).ok_or_else(invalid)
      }
      [_, month, day] if month.len() == 2 && day.len() == 2 => {
        let month = parse_number(month).ok_or_else(invalid)?;
        let day = parse_number(day).ok_or_else(invalid)?;
        NaiveDate::from_ymd_opt(year, month, day)
          .map(Self::Date)
          .ok_or_else(invalid)
      }
      _ => Err(invalid()),
    }
  }
}

impl fmt::Display for PartialDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Year(y) => write!(f, "{y:04}"),
      Self::YearMonth(y, m) => write!(f, "{y:04}-{m:02}"),
      Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
    }
  }
}

impl Serialize for PartialDate {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for PartialDate {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}
