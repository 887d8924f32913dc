//! Time adapters.

use chrono::NaiveDate;

use crate::ports::Clock;

/// System clock using the OS local time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[cfg(test)]
pub struct FixedClock {
    date: NaiveDate,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }
}
