//! Wall-clock labels for the dashboard and the assistant prompt

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use tokio::sync::watch;

/// Display refresh period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Formatted clock strings for one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    /// Two-digit hour and minute, e.g. "03:07 PM"
    pub time_label: String,
    /// Weekday, short month and day, e.g. "Sunday, Oct 18"
    pub date_label: String,
    /// Time with seconds, used as prompt context
    #[serde(skip)]
    pub prompt_time_label: String,
}

impl ClockReading {
    /// Format the labels for a given instant
    #[must_use]
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time_label: now.format("%I:%M %p").to_string(),
            date_label: now.format("%A, %b %-d").to_string(),
            prompt_time_label: now.format("%-I:%M:%S %p").to_string(),
        }
    }
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSource;

impl ClockSource {
    /// Labels for the current local time
    #[must_use]
    pub fn tick(self) -> ClockReading {
        ClockReading::at(&Local::now())
    }

    /// Publish a fresh reading every second until the task is dropped
    pub async fn run(self, tx: watch::Sender<ClockReading>) {
        let mut interval = tokio::time::interval(TICK_PERIOD);
        loop {
            interval.tick().await;
            if tx.send(self.tick()).is_err() {
                tracing::debug!("clock display closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_labels() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 18, 15, 7, 9).unwrap();
        let reading = ClockReading::at(&instant);

        assert_eq!(reading.time_label, "03:07 PM");
        assert_eq!(reading.date_label, "Sunday, Oct 18");
        assert_eq!(reading.prompt_time_label, "3:07:09 PM");
    }

    #[test]
    fn test_morning_labels() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 5, 0, 30, 0).unwrap();
        let reading = ClockReading::at(&instant);

        assert_eq!(reading.time_label, "12:30 AM");
        assert_eq!(reading.date_label, "Monday, Jan 5");
    }
}
