use std::io::{Stdout, Write};

use crossterm::{cursor, QueueableCommand};

use shelter_photos::SyncResult;

/// Overwrites the current terminal line with `msg`.
pub fn rewrite_message(stdout: &mut Stdout, msg: &str) -> SyncResult<()> {
    stdout.queue(cursor::SavePosition)?;
    stdout.write_all(msg.as_bytes())?;
    stdout.queue(cursor::RestorePosition)?;
    stdout.flush()?;
    Ok(())
}
