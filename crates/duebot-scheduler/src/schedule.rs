//! Daily schedule: one fixed local time of day at a fixed UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use duebot_core::config::DigestConfig;
use duebot_core::error::{DueBotError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, utc_offset_minutes: i32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| DueBotError::Config(format!("invalid time {hour:02}:{minute:02}")))?;
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            DueBotError::Config(format!("invalid UTC offset {utc_offset_minutes} minutes"))
        })?;
        Ok(Self { at, offset })
    }

    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        let (hour, minute) = config.hour_minute()?;
        Self::new(hour, minute, config.utc_offset_minutes)
    }

    /// Local calendar date at `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Next fire instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.today(now);
        let slot = |date: NaiveDate| {
            // A fixed offset has no gaps or folds, so this is always Single.
            self.offset
                .from_local_datetime(&date.and_time(self.at))
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        };

        match slot(today) {
            Some(fire) if fire > now => fire,
            _ => slot(today + Duration::days(1)).unwrap_or(now + Duration::days(1)),
        }
    }

    /// How long to sleep from `now` until the next fire.
    pub fn until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1))
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (UTC{})", self.at.format("%H:%M"), self.offset)
    }
}
