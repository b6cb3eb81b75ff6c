//! # Ordered Content Source
//!
//! Time-ordered iteration over score content, one instrument at a time.
//!
//! The playback table builder does not walk the nested score model directly.
//! It consumes a [`ContentCursor`], which flattens one instrument's measures
//! into a sequence of [`ContentItem`]s ordered by time position, then by
//! voice. Barline items carry the structural context the jump resolver needs
//! (the volta bracket opened by the following measure, if any), so repeat
//! detection can happen exactly at barlines.
//!
//! Measure geometry is shared across instruments through a [`TimeMap`] built
//! once per score: every instrument places its barlines on the same grid, so
//! events generated independently per instrument align when globally sorted.

use crate::score::{
    is_equal_time, is_greater_time, BarlineKind, Clef, Element, Instrument, KeySignature, Note,
    ObjId, Rest, Score, TimeSignature, TimeUnits, Volta,
};

/// Per-score measure grid: start time, duration, and governing time
/// signature for every measure.
#[derive(Debug, Clone)]
pub struct TimeMap {
    starts: Vec<TimeUnits>,
    durations: Vec<TimeUnits>,
    time_signatures: Vec<Option<TimeSignature>>,
}

impl TimeMap {
    /// Builds the grid. A measure's duration is the largest summed voice
    /// duration over all instruments; a measure with no content at all falls
    /// back to the nominal duration of the governing time signature.
    pub fn build(score: &Score) -> Self {
        let num_measures = score.num_measures();
        let mut starts = Vec::with_capacity(num_measures);
        let mut durations = Vec::with_capacity(num_measures);
        let mut time_signatures = Vec::with_capacity(num_measures);

        let mut active: Option<TimeSignature> = None;
        let mut time: TimeUnits = 0.0;
        for m in 0..num_measures {
            if let Some(ts) = score
                .instruments
                .iter()
                .find_map(|i| i.measures.get(m).and_then(|measure| measure.time))
            {
                active = Some(ts);
            }

            let mut duration: TimeUnits = 0.0;
            for instrument in &score.instruments {
                if let Some(measure) = instrument.measures.get(m) {
                    for voice in &measure.voices {
                        let sum: TimeUnits = voice.iter().map(Element::time_units).sum();
                        if sum > duration {
                            duration = sum;
                        }
                    }
                }
            }
            if is_equal_time(duration, 0.0) {
                duration = active.map(|ts| ts.measure_duration()).unwrap_or(0.0);
            }

            starts.push(time);
            durations.push(duration);
            time_signatures.push(active);
            time += duration;
        }

        Self {
            starts,
            durations,
            time_signatures,
        }
    }

    pub fn num_measures(&self) -> usize {
        self.starts.len()
    }

    /// Start time of a measure. Measures past the end of the score report
    /// the end of the last measure, so barlines of short instruments still
    /// land on the grid.
    pub fn start_of(&self, measure: usize) -> TimeUnits {
        match self.starts.get(measure) {
            Some(start) => *start,
            None => self.end_time(),
        }
    }

    pub fn duration_of(&self, measure: usize) -> TimeUnits {
        self.durations.get(measure).copied().unwrap_or(0.0)
    }

    /// End of the last measure (total score duration)
    pub fn end_time(&self) -> TimeUnits {
        match (self.starts.last(), self.durations.last()) {
            (Some(start), Some(duration)) => start + duration,
            _ => 0.0,
        }
    }

    /// Lead-in time missing from an incomplete first measure, or zero.
    /// A score starts with an anacrusis iff this is strictly positive.
    pub fn anacrusis_missing_time(&self) -> TimeUnits {
        let nominal = match self.time_signatures.first() {
            Some(Some(ts)) => ts.measure_duration(),
            _ => return 0.0,
        };
        let actual = match self.durations.first() {
            Some(actual) => *actual,
            None => return 0.0,
        };
        if is_greater_time(nominal, actual) {
            nominal - actual
        } else {
            0.0
        }
    }
}

/// One notation element, placed in time
#[derive(Debug, Clone)]
pub enum ContentItem<'a> {
    Clef {
        clef: Clef,
        time: TimeUnits,
        measure: usize,
    },
    KeyChange {
        key: KeySignature,
        time: TimeUnits,
        measure: usize,
    },
    TimeChange {
        time_signature: TimeSignature,
        time: TimeUnits,
        measure: usize,
    },
    Note {
        note: &'a Note,
        time: TimeUnits,
        measure: usize,
        voice: usize,
        obj: ObjId,
    },
    Rest {
        rest: &'a Rest,
        time: TimeUnits,
        measure: usize,
        voice: usize,
        obj: ObjId,
    },
    Barline {
        kind: BarlineKind,
        time: TimeUnits,
        measure: usize,
        /// Volta bracket opened by the following measure, if any
        next_volta: Option<&'a Volta>,
        /// Whether the following measure carries a start-repeat sign
        next_repeat_start: bool,
    },
}

/// Time-ordered iteration over one instrument's content.
///
/// Restartable: constructing a new cursor restarts the scan. The sequence is
/// materialized up front; the score is never mutated.
pub struct ContentCursor<'a> {
    items: Vec<ContentItem<'a>>,
    pos: usize,
}

impl<'a> ContentCursor<'a> {
    pub fn new(score: &'a Score, instrument_index: usize, time_map: &TimeMap) -> Self {
        let mut items = Vec::new();
        let instrument = match score.instruments.get(instrument_index) {
            Some(instrument) => instrument,
            None => return Self { items, pos: 0 },
        };

        // Object ids are document-order across the whole score, so this
        // instrument's ids start after all preceding instruments' elements.
        let mut next_obj: ObjId = score.instruments[..instrument_index]
            .iter()
            .map(Instrument::num_objects)
            .sum();

        for (m, measure) in instrument.measures.iter().enumerate() {
            let start = time_map.start_of(m);

            if let Some(clef) = measure.clef {
                items.push(ContentItem::Clef {
                    clef,
                    time: start,
                    measure: m,
                });
            }
            if let Some(key) = measure.key {
                items.push(ContentItem::KeyChange {
                    key,
                    time: start,
                    measure: m,
                });
            }
            if let Some(time_signature) = measure.time {
                items.push(ContentItem::TimeChange {
                    time_signature,
                    time: start,
                    measure: m,
                });
            }

            // Ids are assigned in document order (voice by voice) before the
            // time sort interleaves the voices.
            let mut voice_items = Vec::new();
            for (v, voice) in measure.voices.iter().enumerate() {
                let mut time = start;
                for element in voice {
                    let obj = next_obj;
                    next_obj += 1;
                    match element {
                        Element::Note(note) => voice_items.push(ContentItem::Note {
                            note,
                            time,
                            measure: m,
                            voice: v,
                            obj,
                        }),
                        Element::Rest(rest) => voice_items.push(ContentItem::Rest {
                            rest,
                            time,
                            measure: m,
                            voice: v,
                            obj,
                        }),
                    }
                    time += element.time_units();
                }
            }
            // Stable sort: equal times keep voice order
            voice_items.sort_by(|a, b| item_time(a).total_cmp(&item_time(b)));
            items.extend(voice_items);

            let next = instrument.measures.get(m + 1);
            items.push(ContentItem::Barline {
                kind: measure.barline,
                time: start + time_map.duration_of(m),
                measure: m,
                next_volta: next.and_then(|measure| measure.volta.as_ref()),
                next_repeat_start: next.map(|measure| measure.repeat_start).unwrap_or(false),
            });
        }

        Self { items, pos: 0 }
    }
}

fn item_time(item: &ContentItem<'_>) -> TimeUnits {
    match item {
        ContentItem::Clef { time, .. }
        | ContentItem::KeyChange { time, .. }
        | ContentItem::TimeChange { time, .. }
        | ContentItem::Note { time, .. }
        | ContentItem::Rest { time, .. }
        | ContentItem::Barline { time, .. } => *time,
    }
}

impl<'a> Iterator for ContentCursor<'a> {
    type Item = ContentItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.pos).cloned();
        self.pos += 1;
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Duration, Element, Instrument, Measure, Note, Score, SoundInfo, Step};

    use approx::assert_abs_diff_eq;

    fn note(step: Step, duration: Duration) -> Element {
        Element::Note(Note::new(step, 4, duration))
    }

    fn score_with_measures(measures: Vec<Measure>) -> Score {
        let mut instrument = Instrument::new("Test", SoundInfo { channel: 0, program: 0 });
        instrument.measures = measures;
        Score::new(vec![instrument])
    }

    #[test]
    fn test_time_map_measure_grid() {
        let score = score_with_measures(vec![
            Measure {
                time: Some(TimeSignature::new(3, 4)),
                voices: vec![vec![
                    note(Step::C, Duration::Quarter),
                    note(Step::D, Duration::Quarter),
                    note(Step::E, Duration::Quarter),
                ]],
                ..Measure::default()
            },
            Measure {
                voices: vec![vec![note(Step::F, Duration::Half), note(Step::G, Duration::Quarter)]],
                ..Measure::default()
            },
        ]);
        let map = TimeMap::build(&score);

        assert_eq!(map.num_measures(), 2);
        assert_abs_diff_eq!(map.start_of(0), 0.0);
        assert_abs_diff_eq!(map.start_of(1), 192.0);
        assert_abs_diff_eq!(map.end_time(), 384.0);
        // Past-the-end measures land at the end of the score
        assert_abs_diff_eq!(map.start_of(5), 384.0);
    }

    #[test]
    fn test_empty_measure_falls_back_to_nominal_duration() {
        let score = score_with_measures(vec![
            Measure {
                time: Some(TimeSignature::new(4, 4)),
                voices: vec![vec![note(Step::C, Duration::Whole)]],
                ..Measure::default()
            },
            Measure::default(),
        ]);
        let map = TimeMap::build(&score);

        assert_abs_diff_eq!(map.duration_of(1), 256.0);
        assert_abs_diff_eq!(map.end_time(), 512.0);
    }

    #[test]
    fn test_anacrusis_missing_time() {
        let score = score_with_measures(vec![
            Measure {
                time: Some(TimeSignature::new(4, 4)),
                voices: vec![vec![note(Step::G, Duration::Eighth)]],
                ..Measure::default()
            },
            Measure {
                voices: vec![vec![note(Step::C, Duration::Whole)]],
                ..Measure::default()
            },
        ]);
        let map = TimeMap::build(&score);

        assert_abs_diff_eq!(map.anacrusis_missing_time(), 224.0, epsilon = 0.01);
    }

    #[test]
    fn test_no_time_signature_means_no_anacrusis() {
        let score = score_with_measures(vec![Measure {
            voices: vec![vec![note(Step::C, Duration::Quarter)]],
            ..Measure::default()
        }]);
        let map = TimeMap::build(&score);

        assert_abs_diff_eq!(map.anacrusis_missing_time(), 0.0);
    }

    #[test]
    fn test_cursor_orders_by_time_then_voice() {
        let score = score_with_measures(vec![Measure {
            voices: vec![
                vec![note(Step::C, Duration::Half)],
                vec![note(Step::E, Duration::Quarter), note(Step::G, Duration::Quarter)],
            ],
            ..Measure::default()
        }]);
        let map = TimeMap::build(&score);
        let items: Vec<_> = ContentCursor::new(&score, 0, &map).collect();

        let notes: Vec<(usize, Step)> = items
            .iter()
            .filter_map(|item| match item {
                ContentItem::Note { note, voice, .. } => Some((*voice, note.step)),
                _ => None,
            })
            .collect();
        // Same start time keeps voice order; the later note comes last
        assert_eq!(notes, vec![(0, Step::C), (1, Step::E), (1, Step::G)]);
    }

    #[test]
    fn test_barline_carries_next_measure_structure() {
        let score = score_with_measures(vec![
            Measure {
                voices: vec![vec![note(Step::C, Duration::Quarter)]],
                ..Measure::default()
            },
            Measure {
                repeat_start: true,
                volta: Some(Volta {
                    endings: vec![1],
                    num_measures: 1,
                }),
                voices: vec![vec![note(Step::D, Duration::Quarter)]],
                ..Measure::default()
            },
        ]);
        let map = TimeMap::build(&score);
        let items: Vec<_> = ContentCursor::new(&score, 0, &map).collect();

        let barlines: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                ContentItem::Barline {
                    next_volta,
                    next_repeat_start,
                    ..
                } => Some((next_volta.is_some(), *next_repeat_start)),
                _ => None,
            })
            .collect();
        assert_eq!(barlines, vec![(true, true), (false, false)]);
    }
}
