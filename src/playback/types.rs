//! Event and jump record definitions
//!
//! A [`SoundEvent`] is one instant of playback behavior at an absolute tick
//! position. Its payload is a tagged variant per event kind, so reading a
//! field that does not belong to the kind is impossible. The variant order
//! doubles as the sort priority when two events share a tick: a sound-off
//! sorts before a sound-on at the same instant (no audible gap between
//! adjacent notes), and a jump sorts before the note-on it redirects away
//! from.
//!
//! A [`JumpEntry`] is one control-flow rule for repeats and volta brackets.
//! Its structural fields (`target_measure`, `times_required`, `bound_event`)
//! are fixed once the table is built; the runtime counters live in a
//! separate atomic cell so a player can advance them while other threads
//! read the table. The atomics use relaxed ordering and provide no
//! synchronization between consumers: a single playback consumer at a time
//! is the contract, and callers that scrub while playing must serialize.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::score::{ObjId, Step, TimeUnits};

/// Payload of a [`SoundEvent`], one variant per event kind.
///
/// Declaration order is priority order: when two events share a tick, the
/// earlier variant fires first and the end-of-table sentinel fires last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Program a sound: assign an instrument program to a channel
    ProgramChange { channel: u8, program: u8 },
    /// Sound off
    SoundOff { channel: u8, pitch: u8 },
    /// Remove visual highlight; no effect on sound
    HighlightOff { obj: ObjId },
    /// Change in rhythm (time signature)
    RhythmChange {
        pulses: u32,
        measure_duration: TimeUnits,
    },
    /// Jump in playback (repeat sign, volta bracket). The payload indexes
    /// the table's jumps collection.
    Jump { jump: usize },
    /// Sound on
    SoundOn {
        channel: u8,
        pitch: u8,
        volume: u8,
        step: Step,
    },
    /// Add visual highlight; no effect on sound
    HighlightOn { obj: ObjId },
    /// End of table sentinel
    EndOfTable,
}

impl EventKind {
    /// Tie-break rank for events sharing a tick; lower fires first
    pub fn priority(&self) -> u8 {
        match self {
            EventKind::ProgramChange { .. } => 1,
            EventKind::SoundOff { .. } => 2,
            EventKind::HighlightOff { .. } => 3,
            EventKind::RhythmChange { .. } => 4,
            EventKind::Jump { .. } => 5,
            EventKind::SoundOn { .. } => 6,
            EventKind::HighlightOn { .. } => 7,
            EventKind::EndOfTable => 8,
        }
    }
}

/// One discrete playback event at an absolute tick position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundEvent {
    /// Absolute tick from score start, rounded from continuous time units
    pub time: u64,
    /// 0-based measure number containing the originating notation
    pub measure: usize,
    pub kind: EventKind,
}

impl SoundEvent {
    pub(crate) fn new(time: TimeUnits, measure: usize, kind: EventKind) -> Self {
        Self {
            time: (time + 0.5) as u64,
            measure,
            kind,
        }
    }

    pub(crate) fn at_ticks(time: u64, measure: usize, kind: EventKind) -> Self {
        Self {
            time,
            measure,
            kind,
        }
    }
}

/// Runtime playback state of a jump, separate from the immutable descriptor
#[derive(Debug)]
struct JumpState {
    applied: AtomicU32,
    active: AtomicBool,
}

/// One possible control-flow jump during playback.
///
/// The builder creates and binds entries; it never executes them. A playback
/// consumer reading the table decides whether to follow a jump from
/// `is_active()` and `bound_event()`, and records passes through
/// `set_times_applied()`. Once the applied count reaches `times_required`
/// the entry deactivates permanently (until `reset()`).
#[derive(Debug)]
pub struct JumpEntry {
    target_measure: usize,
    times_required: u32,
    bound_event: Option<usize>,
    state: JumpState,
}

impl JumpEntry {
    /// A jump with `times_required == 0` is degenerate: it never fires and
    /// starts out inactive. The builder uses this for malformed markup.
    pub(crate) fn new(target_measure: usize, times_required: u32) -> Self {
        Self {
            target_measure,
            times_required,
            bound_event: None,
            state: JumpState {
                applied: AtomicU32::new(0),
                active: AtomicBool::new(times_required > 0),
            },
        }
    }

    /// Measure number playback jumps to when this entry fires
    pub fn target_measure(&self) -> usize {
        self.target_measure
    }

    /// Number of times this jump fires before it is permanently disabled
    pub fn times_required(&self) -> u32 {
        self.times_required
    }

    /// Number of times the consumer has executed this jump so far
    pub fn times_applied(&self) -> u32 {
        self.state.applied.load(Ordering::Relaxed)
    }

    /// False once the jump is exhausted (or degenerate from the start)
    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Relaxed)
    }

    /// Index of the event this jump lands on. `Some` for every entry once
    /// the table is built; a degenerate entry is bound to its own jump
    /// event.
    pub fn bound_event(&self) -> Option<usize> {
        self.bound_event
    }

    /// Records that the consumer has executed this jump `times` times in
    /// total; deactivates the entry once the budget is spent.
    pub fn set_times_applied(&self, times: u32) {
        self.state.applied.store(times, Ordering::Relaxed);
        if times >= self.times_required {
            self.state.active.store(false, Ordering::Relaxed);
        }
    }

    /// Restores the pristine pre-playback state so the table can be
    /// replayed without rebuilding.
    pub fn reset(&self) {
        self.state.applied.store(0, Ordering::Relaxed);
        self.state
            .active
            .store(self.times_required > 0, Ordering::Relaxed);
    }

    pub(crate) fn bind(&mut self, event: usize) {
        self.bound_event = Some(event);
    }

    /// Human-readable one-line rendering, for tooling and tests
    pub fn dump_entry(&self) -> String {
        format!(
            "jump to measure {}, times required: {}, applied: {}, {}, event: {}",
            self.target_measure,
            self.times_required,
            self.times_applied(),
            if self.is_active() { "active" } else { "inactive" },
            match self.bound_event {
                Some(event) => event.to_string(),
                None => "unbound".to_string(),
            }
        )
    }
}
