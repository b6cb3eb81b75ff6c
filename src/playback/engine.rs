//! Playback table construction
//!
//! Builds a [`PlaybackTable`] from a score in one synchronous pass,
//! following a strict three-phase structure:
//!
//! 1. **Generate**: program-change events for every instrument sound, then
//!    one scan per instrument over the ordered content source, appending
//!    timed events in scan order. Events from different instruments are not
//!    interleaved yet.
//! 2. **Sort**: one stable global sort by `(tick, kind priority)`. This is
//!    the only point where cross-instrument ordering is established;
//!    sorting once at the end avoids merging instrument streams during
//!    generation.
//! 3. **Bind and index**: the measure index is computed from the sorted
//!    sequence, jump entries are bound to the concrete event at the start
//!    of their target measure (only stable after the sort), the anacrusis
//!    lead-in is recorded, and the end-of-table sentinel closes the table.
//!
//! Construction is total: an empty score yields a valid single-sentinel
//! table, and malformed repeat/volta markup yields degenerate inactive
//! jumps bound to their own event instead of an error.

use std::collections::{HashMap, HashSet};

use crate::cursor::{ContentCursor, ContentItem, TimeMap};
use crate::playback::context::MeasureContext;
use crate::playback::table::PlaybackTable;
use crate::playback::types::{EventKind, JumpEntry, SoundEvent};
use crate::score::{BarlineKind, Note, ObjId, Rest, Score, TimeUnits, Volta};

/// Per-instrument scan state
struct ScanState {
    context: MeasureContext,
    /// Sounding pitch carried through an unfinished tie, per voice. A tie
    /// can cross a barline, where the accidental context has already been
    /// reset, so the continuation must not recompute its pitch.
    tied_pitches: HashMap<usize, u8>,
    channel: u8,
    /// Measure of the most recent start-repeat sign (score start if none)
    repeat_start: usize,
}

pub(crate) struct TableBuilder<'a> {
    score: &'a Score,
    time_map: TimeMap,
    events: Vec<SoundEvent>,
    jumps: Vec<JumpEntry>,
    channels: Vec<u8>,
    /// Measures whose end-repeat barline has already produced a jump.
    /// Repeat structure is score-global; the first instrument that carries
    /// the marking wins and the others do not duplicate it.
    repeat_handled: HashSet<usize>,
    /// Measures whose opening volta bracket has already produced a jump
    volta_handled: HashSet<usize>,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn build(score: &'a Score) -> PlaybackTable {
        let mut builder = TableBuilder {
            score,
            time_map: TimeMap::build(score),
            events: Vec::new(),
            jumps: Vec::new(),
            channels: Vec::new(),
            repeat_handled: HashSet::new(),
            volta_handled: HashSet::new(),
        };

        builder.program_sounds_for_instruments();
        builder.create_events();
        builder.sort_by_time();
        let measures = builder.create_measures_table();
        builder.bind_jumps(&measures);
        let anacrusis = builder.time_map.anacrusis_missing_time();
        builder.close_table();

        PlaybackTable::from_parts(
            builder.events,
            measures,
            builder.jumps,
            builder.channels,
            anacrusis,
        )
    }

    /// Phase 1a: one program-change event at time 0 per instrument sound.
    /// Channel uniqueness across instruments is guaranteed upstream.
    fn program_sounds_for_instruments(&mut self) {
        let score = self.score;
        for instrument in &score.instruments {
            for sound in &instrument.sounds {
                self.channels.push(sound.channel);
                self.events.push(SoundEvent::new(
                    0.0,
                    0,
                    EventKind::ProgramChange {
                        channel: sound.channel,
                        program: sound.program,
                    },
                ));
            }
        }
    }

    /// Phase 1b: scan every instrument's content in time order
    fn create_events(&mut self) {
        for index in 0..self.score.instruments.len() {
            self.scan_instrument(index);
        }
    }

    fn scan_instrument(&mut self, index: usize) {
        let score = self.score;
        let instrument = &score.instruments[index];
        let mut state = ScanState {
            context: MeasureContext::new(),
            tied_pitches: HashMap::new(),
            channel: instrument.sounds.first().map(|s| s.channel).unwrap_or(0),
            repeat_start: 0,
        };

        let cursor = ContentCursor::new(score, index, &self.time_map);
        for item in cursor {
            match item {
                // Clefs affect layout only
                ContentItem::Clef { .. } => {}
                ContentItem::KeyChange { key, .. } => state.context.set_key(key),
                ContentItem::TimeChange {
                    time_signature,
                    time,
                    measure,
                } => {
                    state.context.set_time_signature(time_signature);
                    self.events.push(SoundEvent::new(
                        time,
                        measure,
                        EventKind::RhythmChange {
                            pulses: time_signature.num_pulses(),
                            measure_duration: time_signature.measure_duration(),
                        },
                    ));
                }
                ContentItem::Note {
                    note,
                    time,
                    measure,
                    voice,
                    obj,
                } => self.add_note_events(&mut state, note, time, measure, voice, obj),
                ContentItem::Rest {
                    rest,
                    time,
                    measure,
                    obj,
                    ..
                } => self.add_rest_events(rest, time, measure, obj),
                ContentItem::Barline {
                    kind,
                    time,
                    measure,
                    next_volta,
                    next_repeat_start,
                } => {
                    // Accidentals hold only within one measure
                    state.context.reset_accidentals();
                    if kind == BarlineKind::RepeatEnd {
                        self.add_repeat_jump(time, measure, state.repeat_start);
                    }
                    if let Some(volta) = next_volta {
                        self.add_volta_jump(time, measure, volta);
                    }
                    if next_repeat_start {
                        state.repeat_start = measure + 1;
                    }
                }
            }
        }
    }

    /// Sound-on/off pair plus a highlight-on/off pair for one note. A tied
    /// continuation keeps the previous sound running: no new sound-on, and
    /// no sound-off until the tie chain ends. Highlights follow every
    /// notehead regardless, so visual tracking works through ties.
    fn add_note_events(
        &mut self,
        state: &mut ScanState,
        note: &Note,
        time: TimeUnits,
        measure: usize,
        voice: usize,
        obj: ObjId,
    ) {
        state.context.update_accidentals(note);

        let pitch = if note.tie_prev {
            match state.tied_pitches.get(&voice) {
                Some(pitch) => *pitch,
                None => state.context.sounding_pitch(note),
            }
        } else {
            state.context.sounding_pitch(note)
        };
        let end = time + note.time_units();

        if !note.tie_prev {
            let position = time - self.time_map.start_of(measure);
            let volume = state.context.compute_volume(position);
            self.events.push(SoundEvent::new(
                time,
                measure,
                EventKind::SoundOn {
                    channel: state.channel,
                    pitch,
                    volume,
                    step: note.step,
                },
            ));
        }
        self.events
            .push(SoundEvent::new(time, measure, EventKind::HighlightOn { obj }));

        if note.tie_next {
            state.tied_pitches.insert(voice, pitch);
        } else {
            state.tied_pitches.remove(&voice);
            self.events.push(SoundEvent::new(
                end,
                measure,
                EventKind::SoundOff {
                    channel: state.channel,
                    pitch,
                },
            ));
        }
        self.events
            .push(SoundEvent::new(end, measure, EventKind::HighlightOff { obj }));
    }

    /// Rests produce highlight events only, so the visual cursor keeps
    /// moving through silence
    fn add_rest_events(&mut self, rest: &Rest, time: TimeUnits, measure: usize, obj: ObjId) {
        self.events
            .push(SoundEvent::new(time, measure, EventKind::HighlightOn { obj }));
        self.events.push(SoundEvent::new(
            time + rest.time_units(),
            measure,
            EventKind::HighlightOff { obj },
        ));
    }

    /// End-repeat barline: jump back to the most recent start-repeat
    /// measure, one extra pass
    fn add_repeat_jump(&mut self, time: TimeUnits, measure: usize, target: usize) {
        if !self.repeat_handled.insert(measure) {
            return;
        }
        let jump = self.jumps.len();
        self.jumps.push(JumpEntry::new(target, 1));
        self.events
            .push(SoundEvent::new(time, measure, EventKind::Jump { jump }));
    }

    /// Numbered volta bracket opening at the next measure: a jump that
    /// skips the bracket once its ending passes are spent, landing on the
    /// measure after the bracket's alternate ending.
    fn add_volta_jump(&mut self, time: TimeUnits, measure: usize, volta: &Volta) {
        // Unnumbered continuations are a landing area, not something to skip
        if volta.endings.is_empty() {
            return;
        }
        let opening = measure + 1;
        if !self.volta_handled.insert(opening) {
            return;
        }

        let target = opening + volta.num_measures;
        let entry = if volta.num_measures > 0 && target < self.score.num_measures() {
            JumpEntry::new(target, volta.endings.len() as u32)
        } else {
            // Malformed bracket (empty span, or running past the end of the
            // score): a degenerate jump that never fires
            JumpEntry::new(target, 0)
        };
        let jump = self.jumps.len();
        self.jumps.push(entry);
        self.events
            .push(SoundEvent::new(time, measure, EventKind::Jump { jump }));
    }

    /// Phase 2: the single global ordering point. Stable, so events sharing
    /// a tick and a priority keep their scan order and construction stays
    /// deterministic.
    fn sort_by_time(&mut self) {
        self.events
            .sort_by_key(|event| (event.time, event.kind.priority()));
    }

    /// Phase 3a: one entry per measure, pointing at the first event
    /// belonging to it. A measure with no events repeats the previous
    /// measure's entry, keeping the index monotonically non-decreasing.
    fn create_measures_table(&self) -> Vec<usize> {
        let num_measures = self.score.num_measures();
        let mut measures = Vec::with_capacity(num_measures);
        let mut index = 0;
        for m in 0..num_measures {
            while index < self.events.len() && self.events[index].measure < m {
                index += 1;
            }
            if index < self.events.len() && self.events[index].measure == m {
                measures.push(index);
            } else {
                measures.push(measures.last().copied().unwrap_or(0));
            }
        }
        measures
    }

    /// Phase 3b: resolve every jump to a concrete event index. Target
    /// indices are only stable after the sort. Degenerate entries are bound
    /// to their own jump event so no entry is ever left unresolved.
    fn bind_jumps(&mut self, measures: &[usize]) {
        let mut own_event = vec![0usize; self.jumps.len()];
        for (index, event) in self.events.iter().enumerate() {
            if let EventKind::Jump { jump } = event.kind {
                own_event[jump] = index;
            }
        }
        for (jump, entry) in self.jumps.iter_mut().enumerate() {
            match measures.get(entry.target_measure()) {
                Some(&first) if entry.times_required() > 0 => entry.bind(first),
                _ => entry.bind(own_event[jump]),
            }
        }
    }

    /// Phase 3c: terminal sentinel. It reuses the last tick; its kind
    /// priority places it after every real event at that instant.
    fn close_table(&mut self) {
        let (time, measure) = match self.events.last() {
            Some(event) => (event.time, event.measure),
            None => (0, 0),
        };
        self.events
            .push(SoundEvent::at_ticks(time, measure, EventKind::EndOfTable));
    }
}
