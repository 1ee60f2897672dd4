//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{baby, events, log, report, user};

/// Shared baby tracker.
///
/// Records sleeps, diaper changes and nursings for babies shared between
/// parents, and summarizes them per day and per week.
#[derive(Debug, Parser)]
#[command(name = "bt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Username to act as (overrides the `user` config key).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage users.
    #[command(subcommand)]
    User(UserAction),

    /// Manage babies, parents and share links.
    #[command(subcommand)]
    Baby(BabyAction),

    /// Record a new event.
    #[command(subcommand)]
    Log(LogAction),

    /// List, correct or remove recorded events.
    #[command(subcommand)]
    Events(EventsAction),

    /// Show daily or weekly summaries.
    #[command(subcommand)]
    Report(ReportAction),
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a new user.
    Add(user::AddArgs),
}

#[derive(Debug, Subcommand)]
pub enum BabyAction {
    /// Create a baby with yourself as its parent.
    Create(baby::CreateArgs),
    /// List the babies you are a parent of.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show a baby and its parents.
    Show(baby::BabyArgs),
    /// Rename a baby.
    Rename(baby::RenameArgs),
    /// Delete a baby and all of its events.
    Delete(baby::BabyArgs),
    /// Become a parent of a baby whose ID you were given.
    Join(baby::BabyArgs),
    /// Add another user as a parent.
    AddParent(baby::AddParentArgs),
    /// Print the baby's read-only share token, creating it if needed.
    Share(baby::BabyArgs),
    /// Revoke the baby's share token.
    Unshare(baby::BabyArgs),
}

#[derive(Debug, Subcommand)]
pub enum LogAction {
    /// Record a sleep interval.
    Sleep(log::SleepArgs),
    /// Record a diaper change.
    Diaper(log::DiaperArgs),
    /// Record a nursing.
    Nursing(log::NursingArgs),
}

#[derive(Debug, Subcommand)]
pub enum EventsAction {
    /// List a baby's events.
    List(events::ListArgs),
    /// Change fields of an event.
    Update(events::UpdateArgs),
    /// Delete an event.
    Delete(events::DeleteArgs),
}

#[derive(Debug, Subcommand)]
pub enum ReportAction {
    /// Events and total sleep for one reporting day.
    Day(report::DayArgs),
    /// Per-day totals and averages for the week ending at a date.
    Week(report::WeekArgs),
}
