//! # Playback Module
//!
//! Derives a time-ordered playback event table from a score.
//!
//! ## Purpose
//! Converting hierarchical, multi-instrument, multi-voice notation into
//! something a player can execute requires flattening it into a single
//! globally sorted sequence of discrete events:
//! 1. **Audio** - sound-on/sound-off pairs with pitch and beat-weighted volume
//! 2. **Visual sync** - highlight-on/off events referencing the source notation
//! 3. **Control flow** - jump entries for repeat signs and volta brackets
//!
//! ## Sub-modules
//! - `types` - SoundEvent, EventKind, JumpEntry definitions
//! - `context` - per-measure accidental state and metric-accent volume
//! - `engine` - three-phase table construction (generate, sort, bind/index)
//! - `table` - the finished table and its read API
//!
//! ## Key Types
//! - [`PlaybackTable`] - the finished artifact: sorted events, measure
//!   index, jump entries, channel record, anacrusis lead-in
//! - [`SoundEvent`] / [`EventKind`] - one discrete playback action
//! - [`JumpEntry`] - one repeat/volta jump with its runtime counters
//!
//! ## Entry Point
//! [`crate::create_table()`] - build the table for a score
//!
//! ## Example
//! ```rust
//! use segno::{
//!     create_table, BarlineKind, Duration, Element, Instrument, Measure, Note, Score, SoundInfo,
//!     Step, TimeSignature,
//! };
//!
//! let mut piano = Instrument::new("Piano", SoundInfo { channel: 0, program: 0 });
//! piano.measures.push(Measure {
//!     time: Some(TimeSignature::new(2, 4)),
//!     voices: vec![vec![
//!         Element::Note(Note::new(Step::D, 5, Duration::Quarter)),
//!         Element::Note(Note::new(Step::A, 4, Duration::Quarter)),
//!     ]],
//!     barline: BarlineKind::Final,
//!     ..Measure::default()
//! });
//!
//! let table = create_table(&Score::new(vec![piano]));
//! assert_eq!(table.num_measures(), 1);
//! assert_eq!(table.first_event_for_measure(0).unwrap(), 0);
//! assert!(!table.is_anacrusis_start());
//! ```
//!
//! ## Ordering Guarantee
//! Events are sorted by `(tick, kind priority)`. The priority order
//! (program change first, sound-off before sound-on, jump before sound-on,
//! sentinel last) guarantees that two notes meeting at the same tick do not
//! leave an audible gap and that a jump is resolved before the note-on it
//! redirects away from.
//!
//! ## Related Modules
//! - `score` - the input data model
//! - `cursor` - the time-ordered iteration the engine consumes

mod context;
mod engine;
mod table;
mod types;


pub use context::MeasureContext;
pub use table::PlaybackTable;
pub use types::{EventKind, JumpEntry, SoundEvent};
