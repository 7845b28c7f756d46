//! Render requests: rewrite, synthesize, trim and persist.

mod helpers;

use approx::assert_relative_eq;
use helpers::tolerances::*;
use helpers::*;
use retimbre::prelude::*;
use retimbre::score::Event;
use retimbre::Score;

fn program_changes(bytes: &[u8]) -> Vec<(u8, u8)> {
    let score = Score::parse(bytes).unwrap();
    score
        .tracks
        .iter()
        .flat_map(|t| t.events.iter())
        .filter_map(|e| match e.event {
            Event::ProgramChange { channel, program } => Some((channel.index(), program)),
            _ => None,
        })
        .collect()
}

#[test]
fn render_trims_to_reference_duration() {
    let bench = TestBench::new();
    bench.seed(2.0);
    let fakes = FakeTools::new(FakeTool::synth(3.0));
    let session = bench.session(&fakes);

    let report = session.render("violin").unwrap();

    assert_eq!(report.instrument, Instrument::Violin);
    assert_relative_eq!(report.reference_duration, 2.0);
    assert_relative_eq!(report.original_duration, 3.0);
    assert_relative_eq!(report.adjusted_duration, 2.0);

    let (original, rate) = read_wav_fixture(&bench.slot(Slot::Original));
    let (adjusted, _) = read_wav_fixture(&bench.slot(Slot::Adjusted));
    assert_eq!(rate, TEST_SAMPLE_RATE);
    assert_eq!(original.len(), 3 * TEST_SAMPLE_RATE as usize);
    assert_eq!(adjusted.len(), 2 * TEST_SAMPLE_RATE as usize);

    // Synthesized at half amplitude, persisted normalized
    assert_relative_eq!(peak(&original), 1.0, epsilon = FLOAT_EPSILON);
    assert_eq!(&original[..adjusted.len()], &adjusted[..]);
    assert_eq!(fakes.synthesizer.calls(), 1);
    assert!(bench.leftovers().is_empty());
}

#[test]
fn render_never_pads_short_output() {
    let bench = TestBench::new();
    bench.seed(2.0);
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    let report = session.render("flute").unwrap();

    assert_relative_eq!(report.adjusted_duration, 1.0);
    let (adjusted, _) = read_wav_fixture(&bench.slot(Slot::Adjusted));
    assert_eq!(adjusted.len(), TEST_SAMPLE_RATE as usize);
}

#[test]
fn synthesizer_sees_rewritten_score() {
    let bench = TestBench::new();
    bench.seed(1.0);
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    session.render("Violin").unwrap();

    let captured = fakes.synthesizer.captured();
    assert_eq!(captured.len(), 1);

    // Lead channel gets the violin, the drum channel nothing
    assert_eq!(program_changes(&captured[0]), vec![(0, 40)]);

    let score = Score::parse(&captured[0]).unwrap();
    let first = &score.tracks[0].events[0];
    assert_eq!(first.delta, 0);
    assert_eq!(first.event.bpm(), Some(120.0));
    assert_eq!(score.count_events(|e| e.is_tempo()), 1);

    // The persisted score is the one that was rendered
    let persisted = std::fs::read(bench.slot(Slot::Score)).unwrap();
    assert_eq!(persisted, captured[0]);
}

#[test]
fn rerender_replaces_instrument() {
    let bench = TestBench::new();
    bench.seed(1.0);
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    session.render("violin").unwrap();
    let first = std::fs::read(bench.slot(Slot::Score)).unwrap();
    session.render("violin").unwrap();
    let second = std::fs::read(bench.slot(Slot::Score)).unwrap();
    assert_eq!(first, second);

    session.render("tuba").unwrap();
    let tuba = std::fs::read(bench.slot(Slot::Score)).unwrap();
    assert_eq!(program_changes(&tuba), vec![(0, 58)]);
}

#[test]
fn unknown_instrument_leaves_workspace_untouched() {
    let bench = TestBench::new();
    bench.seed(1.0);
    let before = std::fs::read(bench.slot(Slot::Score)).unwrap();
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    let err = session.render("banjo").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(std::fs::read(bench.slot(Slot::Score)).unwrap(), before);
    assert!(!bench.slot(Slot::Original).exists());
    assert_eq!(fakes.total_calls(), 0);
}

#[test]
fn render_without_score_is_not_found() {
    let bench = TestBench::new();
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    let err = session.render("piano").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fakes.total_calls(), 0);
}

#[test]
fn missing_soundbank_is_not_found() {
    let bench = TestBench::new();
    bench.seed(1.0);
    std::fs::remove_file(&bench.config.soundbank).unwrap();
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    let err = session.render("piano").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fakes.synthesizer.calls(), 0);
}

#[test]
fn synthesis_failure_persists_nothing() {
    let bench = TestBench::new();
    bench.seed(1.0);
    let before = std::fs::read(bench.slot(Slot::Score)).unwrap();
    let fakes = FakeTools::new(FakeTool::failing("synthesizer"));
    let session = bench.session(&fakes);

    let err = session.render("cello").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert_eq!(err.stage(), Some(retimbre::Stage::Synthesis));
    assert!(err.to_string().contains("simulated failure"));

    assert_eq!(std::fs::read(bench.slot(Slot::Score)).unwrap(), before);
    assert!(!bench.slot(Slot::Original).exists());
    assert!(!bench.slot(Slot::Adjusted).exists());
    assert!(bench.leftovers().is_empty());
}

#[test]
fn render_writes_configured_bit_depth() {
    let mut bench = TestBench::new();
    bench.config = bench.config.clone().wav_bit_depth(BitDepth::Int16);
    bench.seed(1.0);
    let fakes = FakeTools::new(FakeTool::synth(1.0));
    let session = bench.session(&fakes);

    session.render("kalimba").unwrap();

    let reader = hound::WavReader::open(bench.slot(Slot::Adjusted)).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Int);

    let (adjusted, _) = read_wav_fixture(&bench.slot(Slot::Adjusted));
    assert!((peak(&adjusted) - 1.0).abs() <= 2.0 * INT16_EPSILON);
}
