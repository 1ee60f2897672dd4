//! Baby management: creation, parents and share links.

use std::io::Write;

use anyhow::Result;
use bt_core::{Baby, BabyId, Tracker, User};
use clap::Args;

use super::Store;

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Display name.
    pub name: String,
}

#[derive(Debug, Args)]
pub struct BabyArgs {
    /// Baby ID.
    pub id: String,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Baby ID.
    pub id: String,
    /// New display name.
    pub name: String,
}

#[derive(Debug, Args)]
pub struct AddParentArgs {
    /// Baby ID.
    pub id: String,
    /// Username of the parent to add.
    pub username: String,
}

pub fn create<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &CreateArgs,
) -> Result<()> {
    let baby = tracker.create_baby(&user.id, &args.name)?;
    writeln!(writer, "Created baby {} ({})", baby.name, baby.id)?;
    Ok(())
}

pub fn list<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    json: bool,
) -> Result<()> {
    let babies = tracker.babies(&user.id)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&babies)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_babies(&babies))?;
    Ok(())
}

pub fn show<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &BabyArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    let baby = tracker.baby(&user.id, &id)?;
    let parents: Vec<String> = tracker
        .parents(&user.id, &id)?
        .into_iter()
        .map(|parent| parent.username)
        .collect();

    writeln!(writer, "{}", baby.name)?;
    writeln!(writer, "  ID:      {}", baby.id)?;
    writeln!(writer, "  Parents: {}", parents.join(", "))?;
    writeln!(
        writer,
        "  Shared:  {}",
        if baby.share_token.is_some() { "yes" } else { "no" }
    )?;
    Ok(())
}

pub fn rename<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &RenameArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    let baby = tracker.rename_baby(&user.id, &id, &args.name)?;
    writeln!(writer, "Renamed baby {} to {}", baby.id, baby.name)?;
    Ok(())
}

pub fn delete<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &BabyArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    tracker.delete_baby(&user.id, &id)?;
    writeln!(writer, "Deleted baby {id}")?;
    Ok(())
}

pub fn join<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &BabyArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    tracker.add_parent(&user.id, &id, &user.id)?;
    let baby = tracker.baby(&user.id, &id)?;
    writeln!(writer, "Joined baby {} ({})", baby.name, baby.id)?;
    Ok(())
}

pub fn add_parent<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &AddParentArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    let parent = tracker.find_user(&args.username)?;
    tracker.add_parent(&user.id, &id, &parent.id)?;
    let baby = tracker.baby(&user.id, &id)?;
    writeln!(
        writer,
        "Added {} as a parent of {}",
        parent.username, baby.name
    )?;
    Ok(())
}

pub fn share<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &BabyArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    let token = tracker.issue_share_token(&user.id, &id)?;
    writeln!(writer, "{token}")?;
    Ok(())
}

pub fn unshare<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &BabyArgs,
) -> Result<()> {
    let id = BabyId::new(args.id.as_str())?;
    tracker.revoke_share_token(&user.id, &id)?;
    writeln!(writer, "Revoked share token for baby {id}")?;
    Ok(())
}

/// Formats the baby list for human-readable output.
pub fn format_babies(babies: &[Baby]) -> String {
    use std::fmt::Write as _;

    let mut output = String::new();
    if babies.is_empty() {
        let _ = writeln!(output, "No babies yet.");
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Hint: Run 'bt baby create <name>' or 'bt baby join <id>'."
        );
        return output;
    }

    let width = babies
        .iter()
        .map(|baby| baby.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let _ = writeln!(output, "{:<width$}  Shared  ID", "Name");
    for baby in babies {
        let shared = if baby.share_token.is_some() { "yes" } else { "no" };
        let _ = writeln!(output, "{:<width$}  {shared:<6}  {}", baby.name, baby.id);
    }
    output
}
