//! Working-calendar arithmetic for task placement.
//!
//! A working day opens at midnight and provides `working_hours_per_day`
//! hours of work; Saturdays and Sundays are skipped when weekends are
//! respected. All walks are bounded by the constraints' `horizon_days` so
//! malformed input fails fast instead of looping unbounded.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

use crate::models::ScheduleConstraints;

/// Errors from calendar walks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("scheduling window of {horizon_days} days exceeded while walking the calendar")]
    HorizonExceeded { horizon_days: u32 },
}

/// Hour-granular working calendar derived from schedule constraints.
#[derive(Clone, Debug)]
pub struct WorkCalendar {
    hours_per_day: i64,
    respect_weekends: bool,
    horizon_days: u32,
}

impl WorkCalendar {
    pub fn new(constraints: &ScheduleConstraints) -> Self {
        Self {
            hours_per_day: i64::from(constraints.working_hours_per_day.clamp(1, 24)),
            respect_weekends: constraints.respect_weekends,
            horizon_days: constraints.horizon_days,
        }
    }

    fn is_working_day(&self, date: NaiveDate) -> bool {
        if !self.respect_weekends {
            return true;
        }
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn day_start(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(0, 0, 0).unwrap_or_default()
    }

    /// End of the working window for a date (exclusive).
    fn window_end(&self, date: NaiveDate) -> NaiveDateTime {
        Self::day_start(date) + Duration::hours(self.hours_per_day)
    }

    fn horizon_err(&self) -> CalendarError {
        CalendarError::HorizonExceeded {
            horizon_days: self.horizon_days,
        }
    }

    /// Move an instant forward onto the next working instant: inside the
    /// working window of a working day.
    pub fn align_forward(&self, t: NaiveDateTime) -> Result<NaiveDateTime, CalendarError> {
        let mut current = t;
        for _ in 0..=self.horizon_days {
            let date = current.date();
            if self.is_working_day(date) && current < self.window_end(date) {
                // Midnight opens the window, so anything before window end works
                return Ok(current);
            }
            let next = date.succ_opt().ok_or_else(|| self.horizon_err())?;
            current = Self::day_start(next);
        }
        Err(self.horizon_err())
    }

    /// Move an instant backward onto the latest working instant at or
    /// before it. Midnight belongs to the previous day's window, so the
    /// returned instant may sit exactly at a window end.
    fn align_backward(&self, t: NaiveDateTime) -> Result<NaiveDateTime, CalendarError> {
        let date = t.date();
        if self.is_working_day(date) && t > Self::day_start(date) {
            return Ok(t.min(self.window_end(date)));
        }
        // Walk dates, not window-end instants: a 24h window ends exactly at
        // the next midnight, so an instant-based walk would stall there
        let mut day = date;
        for _ in 0..=self.horizon_days {
            day = day.pred_opt().ok_or_else(|| self.horizon_err())?;
            if self.is_working_day(day) {
                return Ok(self.window_end(day));
            }
        }
        Err(self.horizon_err())
    }

    /// Advance by `hours` working hours, skipping non-working time.
    pub fn add_hours(
        &self,
        t: NaiveDateTime,
        hours: i64,
    ) -> Result<NaiveDateTime, CalendarError> {
        if hours <= 0 {
            return self.align_forward(t);
        }
        // try_hours rejects spans chrono cannot represent; the horizon
        // guard below bounds everything representable
        let mut remaining = Duration::try_hours(hours).ok_or_else(|| self.horizon_err())?;
        let mut current = self.align_forward(t)?;

        for _ in 0..=self.horizon_days {
            let available = self.window_end(current.date()) - current;
            if remaining <= available {
                return Ok(current + remaining);
            }
            remaining = remaining - available;
            let next = current
                .date()
                .succ_opt()
                .ok_or_else(|| self.horizon_err())?;
            current = self.align_forward(Self::day_start(next))?;
        }
        Err(self.horizon_err())
    }

    /// Back off by `hours` working hours. Used for end-anchored dependency
    /// bounds and negative lags.
    pub fn sub_hours(
        &self,
        t: NaiveDateTime,
        hours: i64,
    ) -> Result<NaiveDateTime, CalendarError> {
        if hours <= 0 {
            return self.align_backward(t);
        }
        let mut remaining = Duration::try_hours(hours).ok_or_else(|| self.horizon_err())?;
        let mut current = self.align_backward(t)?;

        for _ in 0..=self.horizon_days {
            // A window-end instant at midnight belongs to the day it closes
            let day = if current > Self::day_start(current.date()) {
                current.date()
            } else {
                current
                    .date()
                    .pred_opt()
                    .ok_or_else(|| self.horizon_err())?
            };
            let available = current - Self::day_start(day);
            if remaining <= available {
                return Ok(current - remaining);
            }
            remaining = remaining - available;
            current = self.align_backward(Self::day_start(day))?;
        }
        Err(self.horizon_err())
    }

    /// Apply a signed working-hour offset.
    pub fn offset_hours(
        &self,
        t: NaiveDateTime,
        hours: i64,
    ) -> Result<NaiveDateTime, CalendarError> {
        if hours >= 0 {
            self.add_hours(t, hours)
        } else {
            // saturating_neg keeps i64::MIN from overflowing; the walk
            // rejects the saturated value anyway
            self.sub_hours(t, hours.saturating_neg())
        }
    }
}
