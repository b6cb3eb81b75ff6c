//! # Error Types
//!
//! Errors surfaced by the playback table's read API.
//!
//! Table construction itself is total: any structurally complete score
//! produces a valid table, with malformed repeat/volta markup degraded to
//! inactive jumps instead of failures. The only errors this crate reports
//! are out-of-range lookups against a finished table.
//!
//! ## Usage
//! ```rust
//! use segno::{create_table, Score, SegnoError};
//!
//! let table = create_table(&Score::default());
//! match table.first_event_for_measure(3) {
//!     Ok(index) => println!("measure 3 starts at event {}", index),
//!     Err(SegnoError::MeasureOutOfRange { measure, num_measures }) => {
//!         eprintln!("measure {} out of range ({} measures)", measure, num_measures);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SegnoError {
    /// Measure lookup past the end of the measure index.
    #[error("Measure {measure} is out of range: the score has {num_measures} measures")]
    MeasureOutOfRange { measure: usize, num_measures: usize },

    /// Event lookup past the end of the event table.
    #[error("Event {index} is out of range: the table has {num_events} events")]
    EventOutOfRange { index: usize, num_events: usize },

    /// Jump lookup past the end of the jumps table.
    #[error("Jump {index} is out of range: the table has {num_jumps} jumps")]
    JumpOutOfRange { index: usize, num_jumps: usize },
}
