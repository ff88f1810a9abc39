use chrono::NaiveDateTime;

use crate::rule::TimeRule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub message: String,
    pub rule: TimeRule,
}

impl Reminder {
    pub fn new(message: impl Into<String>, rule: TimeRule) -> Self {
        Self {
            message: message.into(),
            rule,
        }
    }

    pub fn verify(&mut self, now: NaiveDateTime) -> bool {
        self.rule.verify(now)
    }

    pub fn same_schedule(&self, other: &Reminder) -> bool {
        self.message == other.message && self.rule.same_schedule(&other.rule)
    }
}
