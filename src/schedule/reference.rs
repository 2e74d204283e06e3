use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReferenceMonthError {
    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),
    #[error("expected YYYY-MM, got '{0}'")]
    Format(String),
}

/// The (year, month) pair that bare day-of-month inputs like "15日" resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceMonth {
    year: i32,
    month: u32,
}

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ReferenceMonthError> {
        if !(1..=12).contains(&month) {
            return Err(ReferenceMonthError::MonthOutOfRange(month));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The date for `day` in this month, or `None` when the month has no such day.
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl Default for ReferenceMonth {
    fn default() -> Self {
        Self {
            year: 2023,
            month: 9,
        }
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReferenceMonth {
    type Err = ReferenceMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || ReferenceMonthError::Format(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(format_err)?;
        let year = year.parse::<i32>().map_err(|_| format_err())?;
        let month = month.parse::<u32>().map_err(|_| format_err())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for ReferenceMonth {
    type Error = ReferenceMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceMonth> for String {
    fn from(value: ReferenceMonth) -> Self {
        value.to_string()
    }
}
