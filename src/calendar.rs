//! Month grid for the calendar panel

use std::fmt;

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::Serialize;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Column headers, Sunday first
pub const WEEKDAY_HEADERS: [&str; 7] = ["S", "M", "T", "W", "T", "F", "S"];

/// One cell of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarCell {
    /// Padding before the first of the month
    Blank,
    /// A day of the month
    Day { number: u32, is_today: bool },
}

/// The month containing "today"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMonth {
    /// e.g. "Oct 2026"
    pub title: String,
    pub headers: [&'static str; 7],
    /// Blank cells before day 1 (0 when the month starts on Sunday)
    pub leading_blanks: u32,
    pub days_in_month: u32,
    pub today: u32,
}

impl CalendarMonth {
    /// Grid for the month containing `today`
    #[must_use]
    pub fn for_date(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        let days_in_month = first
            .checked_add_months(Months::new(1))
            .and_then(|next| u32::try_from((next - first).num_days()).ok())
            .unwrap_or(31);

        Self {
            title: format!("{} {}", MONTH_NAMES[first.month0() as usize], first.year()),
            headers: WEEKDAY_HEADERS,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days_in_month,
            today: today.day(),
        }
    }

    /// Grid for the current local date
    #[must_use]
    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// Cells in row-major order: leading blanks then each day
    #[must_use]
    pub fn cells(&self) -> Vec<CalendarCell> {
        (0..self.leading_blanks)
            .map(|_| CalendarCell::Blank)
            .chain((1..=self.days_in_month).map(|number| CalendarCell::Day {
                number,
                is_today: number == self.today,
            }))
            .collect()
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:^28}", self.title)?;
        for header in self.headers {
            write!(f, "{header:>4}")?;
        }
        writeln!(f)?;

        for (i, cell) in self.cells().iter().enumerate() {
            match cell {
                CalendarCell::Blank => write!(f, "    ")?,
                CalendarCell::Day { number, is_today: true } => write!(f, "[{number:>2}]")?,
                CalendarCell::Day { number, .. } => write!(f, "{number:>4}")?,
            }
            if i % 7 == 6 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_october_2026() {
        let month = CalendarMonth::for_date(date(2026, 10, 18));

        assert_eq!(month.title, "Oct 2026");
        // Oct 1 2026 is a Thursday
        assert_eq!(month.leading_blanks, 4);
        assert_eq!(month.days_in_month, 31);
        assert_eq!(month.today, 18);
    }

    #[test]
    fn test_leap_february() {
        let month = CalendarMonth::for_date(date(2024, 2, 29));
        assert_eq!(month.days_in_month, 29);
        assert_eq!(month.leading_blanks, 4);

        let month = CalendarMonth::for_date(date(2026, 2, 10));
        assert_eq!(month.days_in_month, 28);
        // Feb 1 2026 is a Sunday
        assert_eq!(month.leading_blanks, 0);
    }

    #[test]
    fn test_december_rollover() {
        let month = CalendarMonth::for_date(date(2025, 12, 31));
        assert_eq!(month.title, "Dec 2025");
        assert_eq!(month.days_in_month, 31);
    }

    #[test]
    fn test_cells_mark_today_once() {
        let month = CalendarMonth::for_date(date(2026, 10, 18));
        let cells = month.cells();

        assert_eq!(cells.len(), 4 + 31);
        assert!(cells[..4].iter().all(|c| *c == CalendarCell::Blank));
        let today: Vec<_> = cells
            .iter()
            .filter(|c| matches!(c, CalendarCell::Day { is_today: true, .. }))
            .collect();
        assert_eq!(
            today,
            vec![&CalendarCell::Day {
                number: 18,
                is_today: true
            }]
        );
    }

    #[test]
    fn test_text_render() {
        let rendered = CalendarMonth::for_date(date(2026, 10, 18)).to_string();
        assert!(rendered.contains("Oct 2026"));
        assert!(rendered.contains("[18]"));
    }
}
