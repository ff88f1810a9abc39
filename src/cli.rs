use chrono::{NaiveTime, Weekday};
use clap::{Parser, Subcommand};

/// Recurring desktop reminders
#[derive(Parser, Debug)]
#[command(name = "reminderd")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the reminder daemon until interrupted
    Daemon,

    /// Add a reminder. Without --weekly or --monthly it fires every day
    Add {
        /// Text shown in the notification
        message: String,

        /// Time of day, HH:MM
        #[arg(long, value_parser = parse_time)]
        at: NaiveTime,

        /// Fire only on this weekday (mon, tuesday, ...)
        #[arg(long, value_parser = parse_weekday, conflicts_with = "monthly")]
        weekly: Option<Weekday>,

        /// Fire only on this day of the month
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
        monthly: Option<u32>,
    },

    /// Delete the reminder with the given number from `list`
    Delete { index: usize },

    /// List all reminders
    List,
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("expected HH:MM, got '{value}'"))
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse::<Weekday>()
        .map_err(|_| format!("expected a weekday like 'mon' or 'monday', got '{value}'"))
}
