//! Calendar-week partitioning.
//!
//! Maps a linear program length (in active days) onto real calendar weeks
//! starting from a given date. Weeks are Monday-anchored, so the first and
//! last weeks of a program are usually partial.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// One calendar-aligned week of a program.
///
/// Day indices are 1-based and global to the program. Days of week use ISO
/// numbering (1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarWeek {
    pub week_number: u32,
    pub start_day_index: u32,
    pub end_day_index: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_day_of_week: u32,
    pub end_day_of_week: u32,
    /// Monday of the calendar week this program week falls in.
    pub monday: NaiveDate,
}

impl CalendarWeek {
    /// Number of active program days in this week.
    pub fn active_day_count(&self) -> u32 {
        self.end_day_index - self.start_day_index + 1
    }

    /// Calendar date of the `offset`-th active day (0-based) of this week.
    ///
    /// Active days within one Monday-anchored week are always consecutive,
    /// so the date is a plain offset from the week's Monday. Offsets past the
    /// week's last active day resolve to `None`.
    pub fn date_of(&self, offset: u32) -> Option<NaiveDate> {
        if offset >= self.active_day_count() {
            return None;
        }
        self.start_date
            .checked_add_signed(Duration::days(i64::from(offset)))
    }
}

/// Whether a date counts as a program day.
pub fn is_active_day(date: NaiveDate, include_weekends: bool) -> bool {
    include_weekends || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn first_active_on_or_after(date: NaiveDate, include_weekends: bool) -> Option<NaiveDate> {
    let mut cursor = date;
    while !is_active_day(cursor, include_weekends) {
        cursor = cursor.succ_opt()?;
    }
    Some(cursor)
}

/// Partition `total_days` active days starting at `start` into calendar weeks.
///
/// With `include_weekends == false` a weekend start date rolls forward to the
/// following Monday and weeks end on Friday. Returns an empty list for a
/// zero-length program, and `None` when the program would run past the last
/// date chrono can represent.
pub fn calculate_calendar_weeks(
    start: NaiveDate,
    total_days: u32,
    include_weekends: bool,
) -> Option<Vec<CalendarWeek>> {
    let mut weeks = Vec::new();
    if total_days == 0 {
        return Some(weeks);
    }

    let last_day_of_week: u32 = if include_weekends { 7 } else { 5 };
    let mut cursor = first_active_on_or_after(start, include_weekends)?;
    let mut next_day_index = 1;
    let mut week_number = 1;

    while next_day_index <= total_days {
        let start_dow = cursor.weekday().number_from_monday();
        let monday = cursor.checked_sub_signed(Duration::days(i64::from(start_dow - 1)))?;
        let remaining = total_days - next_day_index + 1;
        let count = (last_day_of_week - start_dow + 1).min(remaining);
        let end_date = cursor.checked_add_signed(Duration::days(i64::from(count - 1)))?;

        weeks.push(CalendarWeek {
            week_number,
            start_day_index: next_day_index,
            end_day_index: next_day_index + count - 1,
            start_date: cursor,
            end_date,
            start_day_of_week: start_dow,
            end_day_of_week: start_dow + count - 1,
            monday,
        });

        next_day_index += count;
        week_number += 1;
        if next_day_index <= total_days {
            cursor = monday.checked_add_signed(Duration::days(7))?;
        }
    }

    Some(weeks)
}
