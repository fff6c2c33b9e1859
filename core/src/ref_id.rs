//! Booking reference ids.
//!
//! References look like `IFL2025-26-00042`: a working year running from
//! April 1st to March 31st, then a per-year counter padded to five digits.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const PREFIX: &str = "IFL";

/// Fiscal year starting April 1st.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkingYear {
    start_year: i32,
}

impl WorkingYear {
    /// The working year beginning April 1st of `start_year`.
    #[must_use]
    pub const fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The working year containing `at`.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        let year = at.year();
        if at.month() >= 4 {
            Self::starting(year)
        } else {
            Self::starting(year - 1)
        }
    }

    /// Calendar year the working year starts in.
    #[must_use]
    pub const fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Reference id for the `counter`-th booking of this year.
    #[must_use]
    pub fn ref_id(&self, counter: u32) -> String {
        format!("{PREFIX}{self}-{counter:05}")
    }
}

impl fmt::Display for WorkingYear {
    /// `2025-26`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}
