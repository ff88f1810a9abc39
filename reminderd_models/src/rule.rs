use std::fmt;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),

    #[error("Minute must be between 0 and 59, got {0}")]
    InvalidMinute(u32),

    #[error("Day of month must be between 1 and 31, got {0}")]
    InvalidDayOfMonth(u32),

    #[error("Weekday must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidWeekday(u32),
}

/// Time of day a rule becomes due, at minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderFireTime(NaiveTime);

impl ReminderFireTime {
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, RuleError> {
        if hour > 23 {
            return Err(RuleError::InvalidHour(hour));
        }
        if minute > 59 {
            return Err(RuleError::InvalidMinute(minute));
        }

        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or(RuleError::InvalidHour(hour))
    }

    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner
            .with_second(0)
            .and_then(|time| time.with_nanosecond(0))
            .unwrap_or(inner);
        Self(normalized_time)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for ReminderFireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Fires once per calendar day, on the first check at or after `fire_at`.
///
/// `fired_today` is reset lazily: every call to [`DailyRule::verify`] first
/// compares the date of `now` with the date of the last fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRule {
    fire_at: ReminderFireTime,
    fired_today: bool,
    fired_at: Option<NaiveDateTime>,
}

impl DailyRule {
    pub fn new(fire_at: ReminderFireTime) -> Self {
        Self {
            fire_at,
            fired_today: false,
            fired_at: None,
        }
    }

    pub fn with_fired_state(mut self, fired_today: bool, fired_at: Option<NaiveDateTime>) -> Self {
        self.fired_today = fired_today;
        self.fired_at = fired_at;
        self
    }

    pub fn fire_at(&self) -> ReminderFireTime {
        self.fire_at
    }

    pub fn fired_today(&self) -> bool {
        self.fired_today
    }

    pub fn fired_at(&self) -> Option<NaiveDateTime> {
        self.fired_at
    }

    pub fn verify(&mut self, now: NaiveDateTime) -> bool {
        if self.fired_today && self.fired_at.is_none_or(|at| at.date() != now.date()) {
            self.fired_today = false;
        }

        if !self.fired_today && now.time() >= *self.fire_at.time() {
            self.fired_today = true;
            self.fired_at = Some(now);
            return true;
        }

        false
    }

    /// Takes over `other`'s fired-state if it fired more recently than `self`.
    pub fn adopt_newer_fired_state(&mut self, other: &DailyRule) {
        if other.fired_at > self.fired_at {
            self.fired_today = other.fired_today;
            self.fired_at = other.fired_at;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyRule {
    weekday: Weekday,
    prerequisite: DailyRule,
}

impl WeeklyRule {
    pub fn new(weekday: Weekday, prerequisite: DailyRule) -> Self {
        Self {
            weekday,
            prerequisite,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn verify(&mut self, now: NaiveDateTime) -> bool {
        let daily_due = self.prerequisite.verify(now);
        daily_due && now.weekday() == self.weekday
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRule {
    day: u32,
    prerequisite: DailyRule,
}

impl MonthlyRule {
    /// Days past the end of a month are not clamped: `day = 31` never fires in April.
    pub fn new(day: u32, prerequisite: DailyRule) -> Result<Self, RuleError> {
        if !(1..=31).contains(&day) {
            return Err(RuleError::InvalidDayOfMonth(day));
        }

        Ok(Self { day, prerequisite })
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn verify(&mut self, now: NaiveDateTime) -> bool {
        let daily_due = self.prerequisite.verify(now);
        daily_due && now.day() == self.day
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRule {
    Daily(DailyRule),
    Weekly(WeeklyRule),
    Monthly(MonthlyRule),
}

impl TimeRule {
    pub fn daily(fire_at: ReminderFireTime) -> Self {
        TimeRule::Daily(DailyRule::new(fire_at))
    }

    pub fn weekly(weekday: Weekday, fire_at: ReminderFireTime) -> Self {
        TimeRule::Weekly(WeeklyRule::new(weekday, DailyRule::new(fire_at)))
    }

    pub fn monthly(day: u32, fire_at: ReminderFireTime) -> Result<Self, RuleError> {
        MonthlyRule::new(day, DailyRule::new(fire_at)).map(TimeRule::Monthly)
    }

    /// Checks the rule against `now`, recording a fire when it returns true.
    ///
    /// Weekly and monthly rules always run their daily check first, so the
    /// day rollover is applied even on days outside the period.
    pub fn verify(&mut self, now: NaiveDateTime) -> bool {
        match self {
            TimeRule::Daily(rule) => rule.verify(now),
            TimeRule::Weekly(rule) => rule.verify(now),
            TimeRule::Monthly(rule) => rule.verify(now),
        }
    }

    pub fn daily_rule(&self) -> &DailyRule {
        match self {
            TimeRule::Daily(rule) => rule,
            TimeRule::Weekly(rule) => &rule.prerequisite,
            TimeRule::Monthly(rule) => &rule.prerequisite,
        }
    }

    pub fn daily_rule_mut(&mut self) -> &mut DailyRule {
        match self {
            TimeRule::Daily(rule) => rule,
            TimeRule::Weekly(rule) => &mut rule.prerequisite,
            TimeRule::Monthly(rule) => &mut rule.prerequisite,
        }
    }

    /// Same variant, time of day and period, ignoring fired-state.
    pub fn same_schedule(&self, other: &TimeRule) -> bool {
        let same_period = match (self, other) {
            (TimeRule::Daily(_), TimeRule::Daily(_)) => true,
            (TimeRule::Weekly(a), TimeRule::Weekly(b)) => a.weekday == b.weekday,
            (TimeRule::Monthly(a), TimeRule::Monthly(b)) => a.day == b.day,
            _ => false,
        };

        same_period && self.daily_rule().fire_at == other.daily_rule().fire_at
    }
}

impl fmt::Display for TimeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fire_at = self.daily_rule().fire_at;
        match self {
            TimeRule::Daily(_) => write!(f, "daily at {fire_at}"),
            TimeRule::Weekly(rule) => {
                write!(f, "every {} at {fire_at}", weekday_name(rule.weekday))
            }
            TimeRule::Monthly(rule) => write!(f, "monthly on day {} at {fire_at}", rule.day),
        }
    }
}

/// Parses a Sunday-based weekday index (0 = Sunday .. 6 = Saturday).
pub fn weekday_from_sunday_index(index: u32) -> Result<Weekday, RuleError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(RuleError::InvalidWeekday(other)),
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
