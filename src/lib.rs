pub mod cursor;
pub mod error;
pub mod playback;
pub mod score;

pub use error::SegnoError;
pub use playback::{EventKind, JumpEntry, PlaybackTable, SoundEvent};
pub use score::*;

/// Build the playback event table for a score.
/// This is the main entry point for the library.
pub fn create_table(score: &Score) -> PlaybackTable {
    PlaybackTable::for_score(score)
}
