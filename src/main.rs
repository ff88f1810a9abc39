mod appsettings;
mod cli;
mod commands;
mod lock;
mod paths;
mod shutdown;

use anyhow::Context;
use clap::Parser;
use reminderd_storage::ReminderStore;

use appsettings::AppSettings;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let settings = AppSettings::load().context("Could not read settings")?;

    match cli.command {
        Command::Daemon => commands::daemon(&settings).await,
        Command::Add {
            message,
            at,
            weekly,
            monthly,
        } => {
            let rule = commands::build_rule(at, weekly, monthly)?;
            let mut store = open_store(&settings)?;
            commands::add(&mut store, message, rule)
        }
        Command::Delete { index } => {
            let mut store = open_store(&settings)?;
            let removed = commands::delete(&mut store, index)?;
            println!("Deleted '{}' ({})", removed.message, removed.rule);
            Ok(())
        }
        Command::List => {
            let store = open_store(&settings)?;
            commands::list(&store, &mut std::io::stdout().lock())?;
            Ok(())
        }
    }
}

fn open_store(settings: &AppSettings) -> anyhow::Result<ReminderStore> {
    let data_file = paths::data_file(&settings.app_name, paths::process_env)?;
    ReminderStore::open(&data_file).context("Could not load reminders")
}
