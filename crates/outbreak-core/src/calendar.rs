use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Largest supported reference-timezone offset, in minutes (UTC±23:59).
pub const MAX_TZ_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Business calendar for a single game: a reference timezone plus the
/// weekdays and calendar dates on which game time does not pass (overnight
/// truces, reading days, holidays).
///
/// All game-time arithmetic converts both endpoints into the reference
/// timezone first; which calendar date an instant falls on depends entirely
/// on that timezone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameCalendar {
    /// Reference timezone as an offset from UTC, in minutes.
    pub tz_offset_minutes: i32,
    /// Specific dates (in the reference timezone) that are skipped.
    pub ignore_dates: BTreeSet<NaiveDate>,
    /// ISO weekday numbers that are skipped every week, 1 = Monday through
    /// 7 = Sunday.
    pub ignore_weekdays: BTreeSet<u8>,
}

impl GameCalendar {
    pub fn new(
        tz_offset_minutes: i32,
        ignore_dates: BTreeSet<NaiveDate>,
        ignore_weekdays: BTreeSet<u8>,
    ) -> Result<Self, GameError> {
        let calendar = Self {
            tz_offset_minutes,
            ignore_dates,
            ignore_weekdays,
        };
        calendar.validate()?;
        Ok(calendar)
    }

    /// Check invariants. Called from `new`; also useful for calendars that
    /// arrived through deserialization.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.tz_offset_minutes.abs() > MAX_TZ_OFFSET_MINUTES {
            return Err(GameError::InvalidTimezoneOffset(self.tz_offset_minutes));
        }
        for &weekday in &self.ignore_weekdays {
            if !(1..=7).contains(&weekday) {
                return Err(GameError::InvalidWeekday(weekday));
            }
        }
        Ok(())
    }

    fn tz(&self) -> FixedOffset {
        let clamped = self
            .tz_offset_minutes
            .clamp(-MAX_TZ_OFFSET_MINUTES, MAX_TZ_OFFSET_MINUTES);
        // clamped * 60 stays within +-86340 seconds, always a valid offset
        FixedOffset::east_opt(clamped * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Whether game time is suspended for the whole of `date`.
    pub fn is_ignored(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().number_from_monday() as u8;
        self.ignore_weekdays.contains(&weekday) || self.ignore_dates.contains(&date)
    }

    fn every_weekday_ignored(&self) -> bool {
        (1..=7).all(|weekday| self.ignore_weekdays.contains(&weekday))
    }

    /// Game time elapsed between `start` and `end`: the wall-clock
    /// difference minus every portion of the interval that falls on an
    /// ignored day.
    ///
    /// Walks the local date range day by day. A partial first day subtracts
    /// the remainder of that day, a partial last day subtracts the elapsed
    /// part of that day, and each full ignored day in between subtracts a
    /// whole day. The result is clamped at zero, which also covers an
    /// interval contained entirely inside one ignored day.
    pub fn elapsed(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Duration, GameError> {
        if start > end {
            return Err(GameError::InvalidTime(
                "interval start must not be after its end".to_string(),
            ));
        }
        let tz = self.tz();
        let start_local = start.with_timezone(&tz);
        let end_local = end.with_timezone(&tz);

        let mut difference = end_local.signed_duration_since(start_local);
        let first = start_local.date_naive();
        let last = end_local.date_naive();

        let mut day = first;
        loop {
            if self.is_ignored(day) {
                if day == first {
                    let into_day = start_local.time().signed_duration_since(NaiveTime::MIN);
                    difference -= Duration::days(1) - into_day;
                } else if day == last {
                    difference -= end_local.time().signed_duration_since(NaiveTime::MIN);
                } else {
                    difference -= Duration::days(1);
                }
            }
            if day == last {
                break;
            }
            day = day
                .succ_opt()
                .ok_or_else(|| GameError::InvalidTime("calendar date overflow".to_string()))?;
        }

        Ok(difference.max(Duration::zero()))
    }

    /// The earliest instant at which `game_delta` of game time has elapsed
    /// since `start` — the inverse of [`elapsed`](Self::elapsed). Ignored
    /// days contribute no game time, so the projection jumps over them.
    ///
    /// Used to project when a zombie will starve given its last feeding.
    pub fn project(
        &self,
        start: DateTime<Utc>,
        game_delta: Duration,
    ) -> Result<DateTime<Utc>, GameError> {
        let mut remaining = game_delta.max(Duration::zero());
        if remaining > Duration::zero() && self.every_weekday_ignored() {
            return Err(GameError::AllDaysIgnored);
        }

        let tz = self.tz();
        let mut cursor = start.with_timezone(&tz);
        loop {
            let into_day = cursor.time().signed_duration_since(NaiveTime::MIN);
            let until_midnight = Duration::days(1) - into_day;
            let available = if self.is_ignored(cursor.date_naive()) {
                Duration::zero()
            } else {
                until_midnight
            };

            if remaining <= available {
                let result = cursor
                    .checked_add_signed(remaining)
                    .ok_or_else(|| GameError::InvalidTime("calendar date overflow".to_string()))?;
                return Ok(result.with_timezone(&Utc));
            }

            remaining -= available;
            cursor = cursor
                .checked_add_signed(until_midnight)
                .ok_or_else(|| GameError::InvalidTime("calendar date overflow".to_string()))?;
        }
    }
}
