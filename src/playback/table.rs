//! The playback table and its read API
//!
//! A [`PlaybackTable`] is built once per score and is read-only afterward,
//! except for the runtime counters inside its jump entries, which a single
//! playback consumer advances. Rebuilding after a score edit should follow
//! build-then-swap: construct a fresh table, then replace the handle the
//! consumers hold.

use crate::error::SegnoError;
use crate::playback::engine::TableBuilder;
use crate::playback::types::{EventKind, JumpEntry, SoundEvent};
use crate::score::{is_greater_time, Score, TimeUnits};

/// The globally time-sorted event table for one score, with its measure
/// index, jump entries, channel usage record, and anacrusis lead-in.
#[derive(Debug)]
pub struct PlaybackTable {
    events: Vec<SoundEvent>,
    /// First event index per measure, monotonically non-decreasing
    measures: Vec<usize>,
    jumps: Vec<JumpEntry>,
    /// Channels programmed in phase 1, in instrument order
    channels: Vec<u8>,
    anacrusis_missing_time: TimeUnits,
}

impl PlaybackTable {
    /// Builds the table for a score. Total: never fails, even for an empty
    /// score or malformed repeat markup.
    pub fn for_score(score: &Score) -> Self {
        TableBuilder::build(score)
    }

    pub(crate) fn from_parts(
        events: Vec<SoundEvent>,
        measures: Vec<usize>,
        jumps: Vec<JumpEntry>,
        channels: Vec<u8>,
        anacrusis_missing_time: TimeUnits,
    ) -> Self {
        Self {
            events,
            measures,
            jumps,
            channels,
            anacrusis_missing_time,
        }
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    /// All events in final sorted order, ending with the sentinel
    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Result<&SoundEvent, SegnoError> {
        self.events.get(index).ok_or(SegnoError::EventOutOfRange {
            index,
            num_events: self.events.len(),
        })
    }

    /// Index of the end-of-table sentinel (the table is never empty)
    pub fn last_event(&self) -> usize {
        self.events.len() - 1
    }

    pub fn num_measures(&self) -> usize {
        self.measures.len()
    }

    /// Index of the first event belonging to a measure, for seeking
    pub fn first_event_for_measure(&self, measure: usize) -> Result<usize, SegnoError> {
        self.measures
            .get(measure)
            .copied()
            .ok_or(SegnoError::MeasureOutOfRange {
                measure,
                num_measures: self.measures.len(),
            })
    }

    pub fn num_jumps(&self) -> usize {
        self.jumps.len()
    }

    pub fn jumps(&self) -> &[JumpEntry] {
        &self.jumps
    }

    pub fn jump(&self, index: usize) -> Result<&JumpEntry, SegnoError> {
        self.jumps.get(index).ok_or(SegnoError::JumpOutOfRange {
            index,
            num_jumps: self.jumps.len(),
        })
    }

    /// Channels in use, one entry per programmed instrument sound
    pub fn channels(&self) -> &[u8] {
        &self.channels
    }

    /// Lead-in time missing from an incomplete first measure, or zero
    pub fn anacrusis_missing_time(&self) -> TimeUnits {
        self.anacrusis_missing_time
    }

    /// True if the score starts with a pickup measure
    pub fn is_anacrusis_start(&self) -> bool {
        is_greater_time(self.anacrusis_missing_time, 0.0)
    }

    /// Human-readable dump of the full table and the measure index, for
    /// tooling and tests. The format carries no parsing contract.
    pub fn dump_midi_events(&self) -> String {
        let mut dump = self.dump_events_table();
        dump.push('\n');
        dump.push_str(&self.dump_measures_table());
        dump
    }

    fn dump_events_table(&self) -> String {
        let mut dump = format!("Events table. Num. events: {}\n", self.events.len());
        dump.push_str("Event    Time  Meas.  Description\n");
        for (index, event) in self.events.iter().enumerate() {
            dump.push_str(&format!(
                "{:>5} {:>7} {:>6}  {}\n",
                index,
                event.time,
                event.measure,
                describe(event)
            ));
        }
        dump
    }

    fn dump_measures_table(&self) -> String {
        let mut dump = format!("Measures table. Num. measures: {}\n", self.measures.len());
        for (measure, first) in self.measures.iter().enumerate() {
            dump.push_str(&format!("Measure {:>4} --> event {:>5}\n", measure, first));
        }
        dump
    }
}

fn describe(event: &SoundEvent) -> String {
    match &event.kind {
        EventKind::ProgramChange { channel, program } => {
            format!("program change, channel {}, program {}", channel, program)
        }
        EventKind::SoundOff { channel, pitch } => {
            format!("sound off, channel {}, pitch {}", channel, pitch)
        }
        EventKind::HighlightOff { obj } => format!("highlight off, obj {}", obj),
        EventKind::RhythmChange {
            pulses,
            measure_duration,
        } => format!(
            "rhythm change, {} pulses, measure duration {}",
            pulses, measure_duration
        ),
        EventKind::Jump { jump } => format!("jump, entry {}", jump),
        EventKind::SoundOn {
            channel,
            pitch,
            volume,
            ..
        } => format!(
            "sound on, channel {}, pitch {}, volume {}",
            channel, pitch, volume
        ),
        EventKind::HighlightOn { obj } => format!("highlight on, obj {}", obj),
        EventKind::EndOfTable => "end of table".to_string(),
    }
}
