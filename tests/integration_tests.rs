//! Integration tests for the playback timeline engine
//!
//! Builds tables from complete multi-instrument scores and checks the
//! whole-pipeline guarantees: global ordering, measure seeking, jump
//! resolution, and deterministic reconstruction.

use segno::{
    create_table, BarlineKind, Duration, Element, EventKind, Instrument, KeySignature, Measure,
    Note, Rest, Score, SoundInfo, Step, TimeSignature, Volta,
};

fn note(step: Step, octave: i8, duration: Duration) -> Element {
    Element::Note(Note::new(step, octave, duration))
}

/// A small two-instrument piece: a pickup measure, a repeated phrase with
/// first and second endings, and a closing measure.
fn two_part_song() -> Score {
    let mut melody = Instrument::new(
        "Melody",
        SoundInfo {
            channel: 0,
            program: 73,
        },
    );
    melody.measures = vec![
        // Pickup: a single upbeat quarter under 4/4
        Measure {
            key: Some(KeySignature::new(1)),
            time: Some(TimeSignature::new(4, 4)),
            voices: vec![vec![note(Step::D, 4, Duration::Quarter)]],
            ..Measure::default()
        },
        Measure {
            repeat_start: true,
            voices: vec![vec![
                note(Step::G, 4, Duration::Quarter),
                note(Step::A, 4, Duration::Quarter),
                note(Step::B, 4, Duration::Half),
            ]],
            ..Measure::default()
        },
        // First ending, closed by the repeat sign
        Measure {
            volta: Some(Volta {
                endings: vec![1],
                num_measures: 1,
            }),
            voices: vec![vec![
                note(Step::A, 4, Duration::Half),
                note(Step::D, 4, Duration::Half),
            ]],
            barline: BarlineKind::RepeatEnd,
            ..Measure::default()
        },
        // Second ending
        Measure {
            volta: Some(Volta {
                endings: vec![],
                num_measures: 1,
            }),
            voices: vec![vec![note(Step::G, 4, Duration::Whole)]],
            barline: BarlineKind::Final,
            ..Measure::default()
        },
    ];

    let mut bass = Instrument::new(
        "Bass",
        SoundInfo {
            channel: 1,
            program: 32,
        },
    );
    bass.measures = vec![
        Measure {
            time: Some(TimeSignature::new(4, 4)),
            voices: vec![vec![Element::Rest(Rest::new(Duration::Quarter))]],
            ..Measure::default()
        },
        Measure {
            voices: vec![vec![
                note(Step::G, 2, Duration::Half),
                note(Step::D, 3, Duration::Half),
            ]],
            ..Measure::default()
        },
        Measure {
            voices: vec![vec![note(Step::D, 3, Duration::Whole)]],
            ..Measure::default()
        },
        Measure {
            voices: vec![vec![note(Step::G, 2, Duration::Whole)]],
            ..Measure::default()
        },
    ];

    Score::new(vec![melody, bass])
}

#[test]
fn test_full_song_table_is_globally_ordered() {
    let table = create_table(&two_part_song());

    for pair in table.events().windows(2) {
        let (e1, e2) = (&pair[0], &pair[1]);
        assert!(
            e1.time < e2.time || (e1.time == e2.time && e1.kind.priority() <= e2.kind.priority()),
            "events out of order: {:?} before {:?}",
            e1,
            e2
        );
    }

    // Both instruments were programmed at time 0, before any sound
    let programs: Vec<_> = table
        .events()
        .iter()
        .take_while(|e| matches!(e.kind, EventKind::ProgramChange { .. }))
        .collect();
    assert_eq!(programs.len(), 2);
    assert_eq!(table.channels(), &[0, 1]);
}

#[test]
fn test_full_song_measure_seeking() {
    let table = create_table(&two_part_song());

    assert_eq!(table.num_measures(), 4);
    let mut previous = 0;
    for measure in 0..4 {
        let first = table.first_event_for_measure(measure).unwrap();
        assert!(first >= previous, "measure index must not decrease");
        previous = first;
        // The event a seek lands on belongs to the requested measure
        assert_eq!(table.events()[first].measure, measure);
    }
    assert!(table.first_event_for_measure(4).is_err());
}

#[test]
fn test_full_song_anacrusis() {
    let table = create_table(&two_part_song());

    // The pickup holds one quarter of a 4/4 measure: three beats missing
    assert!(table.is_anacrusis_start());
    assert!((table.anacrusis_missing_time() - 192.0).abs() < 0.01);
}

#[test]
fn test_full_song_jump_resolution() {
    let table = create_table(&two_part_song());

    // One skip over the first ending, one jump back to the repeat start
    assert_eq!(table.num_jumps(), 2);
    let skip = table.jump(0).unwrap();
    assert_eq!(skip.target_measure(), 3);
    assert_eq!(skip.times_required(), 1);
    let back = table.jump(1).unwrap();
    assert_eq!(back.target_measure(), 1);
    assert_eq!(back.times_required(), 1);

    // Every jump is bound to the first event of its target measure
    for jump in table.jumps() {
        let bound = jump.bound_event().expect("jump left unbound");
        assert_eq!(
            bound,
            table.first_event_for_measure(jump.target_measure()).unwrap()
        );
    }
}

#[test]
fn test_full_song_sound_pairing_per_channel() {
    let table = create_table(&two_part_song());

    // Per channel: every sound-on is closed by a matching sound-off before
    // the same pitch starts again
    for channel in [0u8, 1u8] {
        let mut sounding: Vec<u8> = Vec::new();
        for event in table.events() {
            match event.kind {
                EventKind::SoundOn { channel: c, pitch, .. } if c == channel => {
                    assert!(
                        !sounding.contains(&pitch),
                        "pitch {} restarted while sounding on channel {}",
                        pitch,
                        channel
                    );
                    sounding.push(pitch);
                }
                EventKind::SoundOff { channel: c, pitch } if c == channel => {
                    let index = sounding
                        .iter()
                        .position(|&p| p == pitch)
                        .expect("sound-off without a sound-on");
                    sounding.remove(index);
                }
                _ => {}
            }
        }
        assert!(sounding.is_empty(), "unterminated sounds on channel {}", channel);
    }
}

#[test]
fn test_rebuilding_is_deterministic() {
    let score = two_part_song();
    let first = create_table(&score);
    let second = create_table(&score);

    assert_eq!(first.events(), second.events());
    assert_eq!(first.num_jumps(), second.num_jumps());
    for (a, b) in first.jumps().iter().zip(second.jumps()) {
        assert_eq!(a.target_measure(), b.target_measure());
        assert_eq!(a.times_required(), b.times_required());
        assert_eq!(a.bound_event(), b.bound_event());
    }
}

#[test]
fn test_dump_round_trip_is_stable() {
    let score = two_part_song();
    let dump = create_table(&score).dump_midi_events();

    assert_eq!(dump, create_table(&score).dump_midi_events());
    // One line per event plus headers, then one line per measure
    let event_lines = dump.lines().filter(|l| l.contains("channel")).count();
    assert!(event_lines > 0);
    assert!(dump.contains("Measure    0"));
    assert!(dump.contains("Measure    3"));
}

#[test]
fn test_degenerate_scores_build_valid_tables() {
    // No instruments
    let empty = create_table(&Score::default());
    assert_eq!(empty.num_events(), 1);

    // An instrument with sounds but no measures
    let silent = Score::new(vec![Instrument::new(
        "Silent",
        SoundInfo {
            channel: 0,
            program: 0,
        },
    )]);
    let table = create_table(&silent);
    assert_eq!(table.num_measures(), 0);
    assert_eq!(table.channels(), &[0]);
    // Program change plus sentinel
    assert_eq!(table.num_events(), 2);
    assert!(matches!(
        table.events()[table.last_event()].kind,
        EventKind::EndOfTable
    ));
}
