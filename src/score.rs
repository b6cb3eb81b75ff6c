//! # Score Data Model
//!
//! This module defines the read-only score representation consumed by the
//! playback table builder.
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   └── Vec<Instrument>
//!         ├── Vec<SoundInfo> (channel/program assignment)
//!         └── Vec<Measure>
//!               ├── clef/key/time changes (take effect at measure start)
//!               ├── repeat_start: bool
//!               ├── volta: Option<Volta> (bracket opening at this measure)
//!               ├── voices: Vec<Vec<Element>>
//!               └── barline: BarlineKind (closes the measure)
//!
//! Element (enum)
//!   ├── Note
//!   │     ├── step: Step (C..B)
//!   │     ├── octave: i8 (scientific, 4 contains middle C)
//!   │     ├── accidental: Option<Accidental> (None = inherit context)
//!   │     ├── duration: Duration + dotted + tuplet
//!   │     └── tie_prev/tie_next: bool
//!   └── Rest
//!         └── duration: Duration + dotted + tuplet
//! ```
//!
//! ## Key Concepts
//!
//! ### Time units
//! Durations are measured in continuous [`TimeUnits`] with 64 units per
//! quarter note, so a whole note is 256 units and a 4/4 measure spans 256
//! units. Comparisons go through the tolerance helpers ([`is_equal_time`],
//! [`is_greater_time`]) because durations accumulate through float
//! arithmetic (dots, tuplets).
//!
//! ### Accidentals
//! A note with `accidental: None` does not mean "natural": it means the note
//! inherits whatever alteration is in force for its step — the key
//! signature's, or one written earlier in the same measure. The playback
//! context resolves this (see `playback::context`).
//!
//! ### Voices
//! Simultaneous content inside one instrument is expressed through multiple
//! voices per measure. Each voice is a plain sequence of elements; element
//! start times are derived by accumulating durations from the measure start.
//!
//! ## Related Modules
//! - `cursor` - Iterates this model in time order per instrument
//! - `playback` - Derives the event table from the iteration

use serde::Serialize;

/// Continuous time in score units: 64 units per quarter note.
pub type TimeUnits = f64;

/// Stable index of a note or rest in document order (instrument, then
/// measure, then voice, then element). Highlight events reference score
/// content through this id rather than through a borrow, so the table does
/// not tie its lifetime to the score.
pub type ObjId = usize;

/// Time units per whole note.
pub const WHOLE_NOTE_UNITS: TimeUnits = 256.0;

/// Tolerance for comparing accumulated durations. Smaller than any
/// representable note value (a 256th note is 1.0 units) but large enough to
/// absorb tuplet rounding.
pub const TIME_TOLERANCE: TimeUnits = 0.1;

/// True if the two time positions coincide, within tolerance.
pub fn is_equal_time(t1: TimeUnits, t2: TimeUnits) -> bool {
    (t1 - t2).abs() < TIME_TOLERANCE
}

/// True if `t1` is later than `t2` by more than the tolerance.
pub fn is_greater_time(t1: TimeUnits, t2: TimeUnits) -> bool {
    t1 - t2 > TIME_TOLERANCE
}

/// Diatonic steps C through B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Index into the 7-slot accidental context table (0 = C .. 6 = B)
    pub fn index(self) -> usize {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    /// Semitones above C for the unaltered step
    pub fn semitones(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }
}

/// Written accidentals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Signed semitone alteration
    pub fn alteration(self) -> i8 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }
}

/// Order in which sharps are added to a key signature: F C G D A E B.
/// Flats are added in the reverse order: B E A D G C F.
const SHARP_ORDER: [Step; 7] = [
    Step::F,
    Step::C,
    Step::G,
    Step::D,
    Step::A,
    Step::E,
    Step::B,
];

/// Key signature (number of sharps/flats)
/// Positive = sharps, Negative = flats, Zero = C major / A minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySignature {
    pub fifths: i8, // -7 to +7 (flats to sharps)
}

impl KeySignature {
    pub fn new(fifths: i8) -> Self {
        Self { fifths }
    }

    /// Per-step semitone alterations implied by this key signature,
    /// indexed by [`Step::index`].
    pub fn alterations(&self) -> [i8; 7] {
        let mut table = [0i8; 7];
        let fifths = self.fifths.clamp(-7, 7);
        if fifths > 0 {
            for step in &SHARP_ORDER[..fifths as usize] {
                table[step.index()] = 1;
            }
        } else if fifths < 0 {
            for step in SHARP_ORDER.iter().rev().take(-fifths as usize) {
                table[step.index()] = -1;
            }
        }
        table
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(beats: u8, beat_type: u8) -> Self {
        Self { beats, beat_type }
    }

    /// Duration of the written beat in time units (quarter = 64, eighth = 32)
    pub fn beat_duration(&self) -> TimeUnits {
        WHOLE_NOTE_UNITS / self.beat_type as TimeUnits
    }

    /// Nominal duration of one full measure in time units
    pub fn measure_duration(&self) -> TimeUnits {
        self.beats as TimeUnits * self.beat_duration()
    }

    /// Number of metronome pulses per measure. Compound meters group beats
    /// in threes: 6/8 has 2 pulses, 9/8 has 3, while 3/4 keeps its 3.
    pub fn num_pulses(&self) -> u32 {
        if self.beats > 3 && self.beats % 3 == 0 {
            self.beats as u32 / 3
        } else {
            self.beats as u32
        }
    }

    /// Duration of one metronome pulse in time units
    pub fn pulse_duration(&self) -> TimeUnits {
        self.measure_duration() / self.num_pulses() as TimeUnits
    }
}

/// Note duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Duration {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl Duration {
    /// Returns the duration as a fraction of a whole note
    pub fn as_fraction(&self) -> f64 {
        match self {
            Duration::Whole => 1.0,
            Duration::Half => 0.5,
            Duration::Quarter => 0.25,
            Duration::Eighth => 0.125,
            Duration::Sixteenth => 0.0625,
            Duration::ThirtySecond => 0.03125,
        }
    }

    /// Returns the duration in time units (quarter note = 64)
    pub fn to_time_units(&self) -> TimeUnits {
        self.as_fraction() * WHOLE_NOTE_UNITS
    }
}

/// Tuplet information (e.g., triplet = 3 notes in the time of 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletInfo {
    pub actual_notes: u8, // Number of notes played (e.g., 3 for triplet)
    pub normal_notes: u8, // Number of notes in normal time (e.g., 2 for triplet)
}

/// Scales a base duration by the dot and tuplet modifiers
fn modified_units(base: TimeUnits, dotted: bool, tuplet: Option<TupletInfo>) -> TimeUnits {
    let with_dot = if dotted { base * 1.5 } else { base };
    match tuplet {
        Some(t) => with_dot * (t.normal_notes as f64 / t.actual_notes as f64),
        None => with_dot,
    }
}

/// A musical note
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub step: Step,
    /// Scientific octave number; octave 4 contains middle C
    pub octave: i8,
    /// Written accidental; `None` inherits the measure's accidental context
    pub accidental: Option<Accidental>,
    pub duration: Duration,
    pub dotted: bool,
    pub tuplet: Option<TupletInfo>,
    /// Tied from the previous note: the previous sound continues, no new attack
    pub tie_prev: bool,
    /// Tied to the next note: the sound is not released at this note's end
    pub tie_next: bool,
}

impl Note {
    /// A plain untied note with no written accidental
    pub fn new(step: Step, octave: i8, duration: Duration) -> Self {
        Self {
            step,
            octave,
            accidental: None,
            duration,
            dotted: false,
            tuplet: None,
            tie_prev: false,
            tie_next: false,
        }
    }

    /// Same, with an explicit written accidental
    pub fn with_accidental(step: Step, octave: i8, duration: Duration, acc: Accidental) -> Self {
        Self {
            accidental: Some(acc),
            ..Self::new(step, octave, duration)
        }
    }

    /// Total sounding duration in time units including dot and tuplet
    pub fn time_units(&self) -> TimeUnits {
        modified_units(self.duration.to_time_units(), self.dotted, self.tuplet)
    }
}

/// A rest
#[derive(Debug, Clone, PartialEq)]
pub struct Rest {
    pub duration: Duration,
    pub dotted: bool,
    pub tuplet: Option<TupletInfo>,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            dotted: false,
            tuplet: None,
        }
    }

    /// Total duration in time units including dot and tuplet
    pub fn time_units(&self) -> TimeUnits {
        modified_units(self.duration.to_time_units(), self.dotted, self.tuplet)
    }
}

/// An element in a voice: either a note or a rest
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Note(Note),
    Rest(Rest),
}

impl Element {
    /// Total duration in time units
    pub fn time_units(&self) -> TimeUnits {
        match self {
            Element::Note(note) => note.time_units(),
            Element::Rest(rest) => rest.time_units(),
        }
    }
}

/// Clefs. Produced by the content source for completeness; the playback
/// table builder ignores them (they only affect layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
}

/// The barline closing a measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarlineKind {
    #[default]
    Regular,
    Double,
    Final,
    /// End-repeat sign: playback returns to the most recent repeat start
    RepeatEnd,
}

/// A volta bracket opening at the measure it is attached to.
///
/// `endings` lists the pass numbers the bracket covers (e.g., `[1]` for a
/// first ending). An empty set is an unnumbered continuation: the section
/// played on every remaining pass after the alternate endings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volta {
    pub endings: Vec<u8>,
    /// Number of measures the bracket spans
    pub num_measures: usize,
}

/// A single measure of one instrument
#[derive(Debug, Clone, Default)]
pub struct Measure {
    /// Clef change taking effect at the start of this measure
    pub clef: Option<Clef>,
    /// Key signature change taking effect at the start of this measure
    pub key: Option<KeySignature>,
    /// Time signature change taking effect at the start of this measure
    pub time: Option<TimeSignature>,
    /// Start-repeat sign at the beginning of this measure
    pub repeat_start: bool,
    /// Volta bracket opening at this measure
    pub volta: Option<Volta>,
    pub voices: Vec<Vec<Element>>,
    /// The barline closing this measure
    pub barline: BarlineKind,
}

impl Measure {
    /// A measure with a single voice and default attributes
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            voices: vec![elements],
            ..Self::default()
        }
    }

    /// Number of notes and rests across all voices
    pub fn num_objects(&self) -> usize {
        self.voices.iter().map(|v| v.len()).sum()
    }
}

/// An instrument's sound assignment: playback channel and MIDI program.
/// Channel uniqueness across the score is the document model's
/// responsibility and is assumed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundInfo {
    pub channel: u8,
    pub program: u8,
}

/// One instrument part: its sound assignments and its measures
#[derive(Debug, Clone, Default)]
pub struct Instrument {
    pub name: String,
    pub sounds: Vec<SoundInfo>,
    pub measures: Vec<Measure>,
}

impl Instrument {
    /// An instrument with a single sound and no content yet
    pub fn new(name: &str, sound: SoundInfo) -> Self {
        Self {
            name: name.to_string(),
            sounds: vec![sound],
            measures: Vec::new(),
        }
    }

    /// Number of notes and rests in this instrument, in document order
    pub fn num_objects(&self) -> usize {
        self.measures.iter().map(Measure::num_objects).sum()
    }
}

/// A complete score: the root of the model
#[derive(Debug, Clone, Default)]
pub struct Score {
    pub instruments: Vec<Instrument>,
}

impl Score {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    /// Number of measures in the score: the longest instrument decides
    pub fn num_measures(&self) -> usize {
        self.instruments
            .iter()
            .map(|i| i.measures.len())
            .max()
            .unwrap_or(0)
    }

    /// Total number of notes and rests across the score
    pub fn num_objects(&self) -> usize {
        self.instruments.iter().map(Instrument::num_objects).sum()
    }

    /// Resolves a document-order object id back to its element.
    /// Returns `None` for an id outside the score.
    pub fn object(&self, id: ObjId) -> Option<&Element> {
        let mut remaining = id;
        for instrument in &self.instruments {
            for measure in &instrument.measures {
                for voice in &measure.voices {
                    if remaining < voice.len() {
                        return Some(&voice[remaining]);
                    }
                    remaining -= voice.len();
                }
            }
        }
        None
    }
}
