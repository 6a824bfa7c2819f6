//! Integration Tests für Skript-Parser und Sequencer
//!
//! Diese Tests laufen auf dem Host (x86_64) ohne Hardware

mod common;

use common::{BLUE, GREEN, MockLedWriter, OFF, RED};
use effekt_core::sequencer::SubState;
use effekt_core::{
    Command, LoopPolicy, PixelBuffer, Segment, Sequencer, SequencerState, SyntaxErrorKind, parse,
};
use rgb::RGB8;

fn run(source: &str, policy: LoopPolicy, steps: &[f32], length: usize) -> Sequencer<32> {
    let script = parse(source).unwrap();
    let mut seq = Sequencer::new(policy);
    seq.start();
    for &dt in steps {
        seq.tick(&script, dt, length);
    }
    seq
}

// ============================================================================
// Tests: parse()
// ============================================================================

#[test]
fn test_parse_two_command_script() {
    let script = parse("Fill #000000 1 ; SlowFill 0.1 #00FF00 10 #FF0000 10").unwrap();
    assert_eq!(script.len(), 2);

    match &script.commands()[0] {
        Command::Fill { segments } => {
            assert_eq!(segments.as_slice(), &[Segment::new(OFF, 1)]);
        }
        other => panic!("Expected Fill, got {:?}", other),
    }
    match &script.commands()[1] {
        Command::SlowFill { duration, segments } => {
            assert_eq!(*duration, 0.1);
            assert_eq!(
                segments.as_slice(),
                &[Segment::new(GREEN, 10), Segment::new(RED, 10)]
            );
        }
        other => panic!("Expected SlowFill, got {:?}", other),
    }
}

#[test]
fn test_parse_keeps_source_text() {
    let source = "slide 0.5 -2;";
    let script = parse(source).unwrap();
    assert_eq!(script.source(), source);
    assert_eq!(
        script.commands(),
        &[Command::Slide {
            period: 0.5,
            offset: -2
        }]
    );
}

#[test]
fn test_parse_empty_script_is_neutral() {
    assert!(parse("").unwrap().is_empty());
    assert!(parse(" ; ;# nur Kommentar").unwrap().is_empty());
}

#[test]
fn test_parse_error_reports_token_position() {
    let source = "Fill #FF0000 1; Blink 1";
    let err = parse(source).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::UnknownVerb);
    assert_eq!(err.token.as_str(), "Blink");
    assert_eq!(&source[err.position..err.position + 5], "Blink");
}

#[test]
fn test_parse_rejects_bad_values() {
    assert_eq!(
        parse("Fill #GG0000 1").unwrap_err().kind,
        SyntaxErrorKind::InvalidColor
    );
    assert_eq!(
        parse("Fill #FF0000 0").unwrap_err().kind,
        SyntaxErrorKind::OutOfRange
    );
    assert_eq!(
        parse("Slide 0 1").unwrap_err().kind,
        SyntaxErrorKind::OutOfRange
    );
    assert_eq!(
        parse("SlowFill abc #FF0000 1").unwrap_err().kind,
        SyntaxErrorKind::InvalidNumber
    );
    assert_eq!(
        parse("Slide 1").unwrap_err().kind,
        SyntaxErrorKind::MissingArgument
    );
}

// ============================================================================
// Tests: Sequencer
// ============================================================================

#[test]
fn test_completed_slowfill_has_exact_segments() {
    let seq = run(
        "SlowFill 0.1 #00FF00 10 #FF0000 10",
        LoopPolicy::Hold,
        &[1.0],
        20,
    );
    let frame = seq.frame();
    assert_eq!(frame.len(), 20);
    assert!(frame[..10].iter().all(|&c| c == GREEN));
    assert!(frame[10..].iter().all(|&c| c == RED));
    assert!(seq.is_finished());
}

#[test]
fn test_slowfill_longer_than_strip_is_truncated() {
    // 12 Pixel Segmente auf 8 LEDs: die letzten 4 fallen weg
    let source = "SlowFill 1 #00FF00 6 #FF0000 6";

    let half = run(source, LoopPolicy::Hold, &[0.5], 8);
    assert_eq!(half.frame().len(), 8);
    assert!(half.frame()[..4].iter().all(|&c| c == GREEN));
    assert!(half.frame()[5..].iter().all(|&c| c == OFF));
    assert!(half.is_running());

    let done = run(source, LoopPolicy::Hold, &[2.0], 8);
    assert_eq!(done.frame().len(), 8);
    assert!(done.frame()[..6].iter().all(|&c| c == GREEN));
    assert_eq!(&done.frame()[6..], &[RED, RED]);
    assert!(done.is_finished());
}

#[test]
fn test_strip_shrinks_below_slowfill_progress() {
    let script = parse("SlowFill 4 #0000FF 8").unwrap();
    let mut seq: Sequencer<32> = Sequencer::new(LoopPolicy::Hold);
    seq.start();

    // 0.5 s pro Pixel: nach 2.5 s sind 5 Pixel fertig
    seq.tick(&script, 2.5, 8);
    match seq.state() {
        SequencerState::Running {
            sub_state: SubState::Filling { pixel, .. },
            ..
        } => assert_eq!(pixel, 5),
        other => panic!("Expected Filling, got {:?}", other),
    }

    // Strip schrumpft auf 4, der Fortschritt liegt jetzt dahinter
    assert!(seq.tick(&script, 0.5, 4));
    assert_eq!(seq.frame(), &[BLUE; 4]);
    assert!(seq.is_running());

    seq.tick(&script, 1.0, 4);
    assert!(seq.is_finished());
    assert_eq!(seq.frame(), &[BLUE; 4]);
}

#[test]
fn test_slowfill_reveals_pixel_by_pixel() {
    // 4 Pixel über 4 s: nach 2.5 s sind 2 fertig, Pixel 2 halb überblendet
    let seq = run("SlowFill 4 #0000FF 4", LoopPolicy::Hold, &[1.0, 1.5], 4);
    let frame = seq.frame();
    assert_eq!(frame[0], BLUE);
    assert_eq!(frame[1], BLUE);
    assert_eq!(frame[2], RGB8::new(0, 0, 128));
    assert_eq!(frame[3], OFF);
    assert!(seq.is_running());
}

#[test]
fn test_fill_pattern_repeats_over_strip() {
    let seq = run("Fill #FF0000 2 #0000FF 1", LoopPolicy::Hold, &[0.0], 7);
    assert_eq!(seq.frame(), &[RED, RED, BLUE, RED, RED, BLUE, RED]);
}

#[test]
fn test_slide_rotates_per_period() {
    let seq = run(
        "Fill #FF0000 1 #000000 3; Slide 1 1",
        LoopPolicy::Hold,
        &[2.5],
        4,
    );
    // zwei volle Perioden → um 2 nach rechts
    assert_eq!(seq.frame(), &[OFF, OFF, RED, OFF]);
    match seq.state() {
        SequencerState::Running {
            command_index,
            sub_state: SubState::Sliding { rotations },
            ..
        } => {
            assert_eq!(command_index, 1);
            assert_eq!(rotations, 2);
        }
        other => panic!("Expected Sliding, got {:?}", other),
    }
}

#[test]
fn test_restart_policy_wraps_once_per_tick() {
    let seq = run(
        "Fill #FF0000 1; Fill #00FF00 1",
        LoopPolicy::Restart,
        &[1.0, 1.0],
        2,
    );
    assert!(seq.is_running());
    assert_eq!(seq.frame(), &[GREEN, GREEN]);
}

#[test]
fn test_hold_policy_keeps_last_frame() {
    let seq = run("Fill #00FF00 1", LoopPolicy::Hold, &[1.0, 1.0, 1.0], 3);
    assert_eq!(seq.state(), SequencerState::Finished);
    assert_eq!(seq.frame(), &[GREEN; 3]);
}

#[test]
fn test_coverage_mismatch_is_reported() {
    let script = parse("SlowFill 1 #FF0000 5").unwrap();
    let mismatch = script.coverage_mismatch(8).unwrap();
    assert_eq!(mismatch.covered, 5);
    assert_eq!(mismatch.length, 8);
    assert!(script.coverage_mismatch(5).is_none());
}

#[test]
fn test_reparse_of_source_renders_identical_first_frame() {
    let source = "Fill #102030 3 #FF2800 2; SlowFill 2 #00FF00 4 #0000FF 4; Slide 0.5 3";
    let first = parse(source).unwrap();
    let second = parse(first.source()).unwrap();
    assert_eq!(first, second);

    let a = run(first.source(), LoopPolicy::Hold, &[0.7], 10);
    let b = run(second.source(), LoopPolicy::Hold, &[0.7], 10);
    assert_eq!(a.frame(), b.frame());
}

// ============================================================================
// Tests: PixelBuffer
// ============================================================================

#[test]
fn test_write_beyond_length_is_ignored() {
    let mut strip: PixelBuffer<MockLedWriter, 8> = PixelBuffer::new(MockLedWriter::new(), 8, 1.0);
    strip.set_length(4).unwrap();

    strip.write(4, RED);
    strip.write(7, RED);
    strip.write(usize::MAX, RED);
    assert_eq!(strip.colors(), &[OFF; 4]);
    assert_eq!(strip.len(), 4);

    strip.write(3, RED);
    assert_eq!(strip.colors(), &[OFF, OFF, OFF, RED]);

    // Wieder verlängert: die ignorierten Schreibzugriffe tauchen nicht auf
    strip.set_length(8).unwrap();
    assert_eq!(&strip.colors()[4..], &[OFF; 4]);
}
