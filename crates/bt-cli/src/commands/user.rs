//! User registration.

use std::io::Write;

use anyhow::Result;
use bt_core::Tracker;
use clap::Args;

use super::Store;

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Unique username.
    pub username: String,
    /// Credential hash produced by the caller's auth layer.
    #[arg(long, default_value = "")]
    pub credential_hash: String,
}

pub fn add<W: Write, S: Store>(writer: &mut W, tracker: &Tracker<S>, args: &AddArgs) -> Result<()> {
    let user = tracker.register_user(&args.username, &args.credential_hash)?;
    writeln!(writer, "Registered user {} ({})", user.username, user.id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use bt_core::{DayBoundary, MemoryStore};

    #[test]
    fn add_registers_and_rejects_duplicates() {
        let tracker = Tracker::new(MemoryStore::new(), DayBoundary::default());
        let args = AddArgs {
            username: "alice".to_string(),
            credential_hash: String::new(),
        };

        let mut output = Vec::new();
        add(&mut output, &tracker, &args).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Registered user alice ("));

        let err = add(&mut Vec::new(), &tracker, &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: username already taken: alice"
        );
    }
}
