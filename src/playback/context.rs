//! Accidental context and beat-weighted volume
//!
//! [`MeasureContext`] tracks, during one instrument scan, which semitone
//! alteration is currently in force for each of the seven diatonic steps.
//! The table is seeded from the key signature and mutated by written
//! accidentals; a written accidental holds for the rest of the measure, so
//! the table is re-seeded at every barline and key change. The context also
//! carries the active time signature, which drives the metric-accent volume
//! model.

use crate::score::{is_equal_time, KeySignature, Note, TimeSignature, TimeUnits};

/// Volume for a note starting on the first pulse of a measure
const VOLUME_DOWNBEAT: u8 = 85;
/// Volume for a note starting on any other pulse
const VOLUME_PULSE: u8 = 75;
/// Volume for a note starting off the pulse grid
const VOLUME_OFF_PULSE: u8 = 64;

/// Per-measure pitch state and meter for one instrument scan
#[derive(Debug, Clone)]
pub struct MeasureContext {
    /// Current alteration per diatonic step, indexed by `Step::index`
    accidentals: [i8; 7],
    key: KeySignature,
    time: Option<TimeSignature>,
}

impl Default for MeasureContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasureContext {
    /// Starts in C major with no meter
    pub fn new() -> Self {
        Self {
            accidentals: [0; 7],
            key: KeySignature::default(),
            time: None,
        }
    }

    /// Installs a new key signature and re-seeds the accidental table
    pub fn set_key(&mut self, key: KeySignature) {
        self.key = key;
        self.reset_accidentals();
    }

    /// Re-seeds the accidental table from the key signature. Called at
    /// every measure boundary: accidentals apply only within one measure.
    pub fn reset_accidentals(&mut self) {
        self.accidentals = self.key.alterations();
    }

    /// Installs the meter used for volume computation from here on
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time = Some(time_signature);
    }

    pub fn time_signature(&self) -> Option<&TimeSignature> {
        self.time.as_ref()
    }

    /// Folds a note's written accidental into the context. A written
    /// accidental replaces the step's alteration for the rest of the
    /// measure; notes without one change nothing.
    pub fn update_accidentals(&mut self, note: &Note) {
        if let Some(accidental) = note.accidental {
            self.accidentals[note.step.index()] = accidental.alteration();
        }
    }

    /// MIDI pitch of a note under the current context. Call
    /// [`update_accidentals`](Self::update_accidentals) first so the note's
    /// own accidental is in force.
    pub fn sounding_pitch(&self, note: &Note) -> u8 {
        let alteration = self.accidentals[note.step.index()] as i32;
        let midi = (note.octave as i32 + 1) * 12 + note.step.semitones() + alteration;
        midi.clamp(0, 127) as u8
    }

    /// Beat-weighted volume for a note starting `position` time units into
    /// its measure: downbeat >= other pulses >= off-pulse positions. Purely
    /// a function of the position and the active meter.
    pub fn compute_volume(&self, position: TimeUnits) -> u8 {
        let time_signature = match self.time {
            Some(ts) => ts,
            None => return VOLUME_OFF_PULSE,
        };
        let pulse = time_signature.pulse_duration();
        let nearest = (position / pulse).round();
        if is_equal_time(position, nearest * pulse) {
            if nearest == 0.0 {
                VOLUME_DOWNBEAT
            } else {
                VOLUME_PULSE
            }
        } else {
            VOLUME_OFF_PULSE
        }
    }
}
