//! Clock port - Interface for time operations.

use chrono::NaiveDate;

/// Port for getting the current date.
pub trait Clock: Send + Sync {
    /// Today's date in the caller's local time zone.
    fn today(&self) -> NaiveDate;
}
