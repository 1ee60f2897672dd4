use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use bt_core::Tracker;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use bt_cli::commands::{acting_user, baby, events, log, report, user};
use bt_cli::{BabyAction, Cli, Commands, Config, EventsAction, LogAction, ReportAction, UserAction};

/// Load config and open the tracker, ensuring the database directory exists.
fn open_tracker(config_path: Option<&Path>) -> Result<(Tracker<bt_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let boundary = config.boundary().context("invalid reporting day settings")?;
    let db = bt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((Tracker::new(db, boundary), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let (tracker, config) = open_tracker(cli.config.as_deref())?;
    let username = cli.user.as_deref().or(config.user.as_deref());
    let mut out = std::io::stdout().lock();

    match command {
        Commands::User(UserAction::Add(args)) => user::add(&mut out, &tracker, args)?,
        Commands::Baby(action) => {
            let acting = acting_user(&tracker, username)?;
            match action {
                BabyAction::Create(args) => baby::create(&mut out, &tracker, &acting, args)?,
                BabyAction::List { json } => baby::list(&mut out, &tracker, &acting, *json)?,
                BabyAction::Show(args) => baby::show(&mut out, &tracker, &acting, args)?,
                BabyAction::Rename(args) => baby::rename(&mut out, &tracker, &acting, args)?,
                BabyAction::Delete(args) => baby::delete(&mut out, &tracker, &acting, args)?,
                BabyAction::Join(args) => baby::join(&mut out, &tracker, &acting, args)?,
                BabyAction::AddParent(args) => {
                    baby::add_parent(&mut out, &tracker, &acting, args)?;
                }
                BabyAction::Share(args) => baby::share(&mut out, &tracker, &acting, args)?,
                BabyAction::Unshare(args) => baby::unshare(&mut out, &tracker, &acting, args)?,
            }
        }
        Commands::Log(action) => {
            let acting = acting_user(&tracker, username)?;
            match action {
                LogAction::Sleep(args) => log::sleep(&mut out, &tracker, &acting, args)?,
                LogAction::Diaper(args) => log::diaper(&mut out, &tracker, &acting, args)?,
                LogAction::Nursing(args) => log::nursing(&mut out, &tracker, &acting, args)?,
            }
        }
        Commands::Events(action) => {
            let acting = acting_user(&tracker, username)?;
            match action {
                EventsAction::List(args) => events::list(&mut out, &tracker, &acting, args)?,
                EventsAction::Update(args) => events::update(&mut out, &tracker, &acting, args)?,
                EventsAction::Delete(args) => events::delete(&mut out, &tracker, &acting, args)?,
            }
        }
        Commands::Report(action) => match action {
            ReportAction::Day(args) => report::day(&mut out, &tracker, username, args)?,
            ReportAction::Week(args) => report::week(&mut out, &tracker, username, args)?,
        },
    }

    out.flush()?;
    Ok(())
}
