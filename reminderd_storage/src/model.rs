use reminderd_models::{
    chrono::NaiveDateTime,
    reminder::Reminder,
    rule::{
        DailyRule, MonthlyRule, ReminderFireTime, RuleError, TimeRule, WeeklyRule,
        weekday_from_sunday_index,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DAILY: u8 = 1;
const WEEKLY: u8 = 2;
const MONTHLY: u8 = 3;

/// On-disk shape of a reminder. Every variant is flattened into the same
/// record and told apart by `n_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub message: String,
    pub n_type: u8,
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub weekday: u32,
    #[serde(default)]
    pub day: u32,
    #[serde(rename = "wasDoneToday", default)]
    pub was_done_today: bool,
    #[serde(rename = "wasDoneAt", default, with = "done_at_format")]
    pub was_done_at: Option<NaiveDateTime>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Unknown reminder type {0}")]
    UnknownType(u8),

    #[error(transparent)]
    InvalidRule(#[from] RuleError),
}

impl From<&Reminder> for ReminderRecord {
    fn from(value: &Reminder) -> Self {
        let daily = value.rule.daily_rule();
        let (n_type, weekday, day) = convert_rule(&value.rule);

        Self {
            message: value.message.clone(),
            n_type,
            hour: daily.fire_at().hour(),
            minute: daily.fire_at().minute(),
            weekday,
            day,
            was_done_today: daily.fired_today(),
            was_done_at: daily.fired_at(),
        }
    }
}

impl TryFrom<ReminderRecord> for Reminder {
    type Error = RecordError;

    fn try_from(value: ReminderRecord) -> Result<Self, Self::Error> {
        let fire_at = ReminderFireTime::from_hm(value.hour, value.minute)?;
        let prerequisite =
            DailyRule::new(fire_at).with_fired_state(value.was_done_today, value.was_done_at);

        let rule = match value.n_type {
            DAILY => TimeRule::Daily(prerequisite),
            WEEKLY => {
                let weekday = weekday_from_sunday_index(value.weekday)?;
                TimeRule::Weekly(WeeklyRule::new(weekday, prerequisite))
            }
            MONTHLY => TimeRule::Monthly(MonthlyRule::new(value.day, prerequisite)?),
            other => return Err(RecordError::UnknownType(other)),
        };

        Ok(Reminder::new(value.message, rule))
    }
}

fn convert_rule(rule: &TimeRule) -> (u8, u32, u32) {
    match rule {
        TimeRule::Daily(_) => (DAILY, 0, 0),
        TimeRule::Weekly(weekly) => (WEEKLY, weekly.weekday().num_days_from_sunday(), 0),
        TimeRule::Monthly(monthly) => (MONTHLY, 0, monthly.day()),
    }
}

/// RFC 3339 timestamps in host local time. An unset value is written as the
/// zero timestamp `0001-01-01T00:00:00Z`, and any year-1 timestamp reads back
/// as unset.
mod done_at_format {
    use reminderd_models::chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const UNSET: &str = "0001-01-01T00:00:00Z";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(local) => {
                let formatted = Local
                    .from_local_datetime(local)
                    .earliest()
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| local.and_utc().to_rfc3339());
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_str(UNSET),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(de::Error::custom)?;
        if parsed.naive_utc().year() <= 1 {
            return Ok(None);
        }

        Ok(Some(parsed.with_timezone(&Local).naive_local()))
    }
}
