//! Whole-frame behaviour through the public API, against an in-memory port.

use std::time::Duration;

use dj_midi::{MidiEmitter, MidiMessage, RecordingOut};
use gesture_dj::app::{AppConfig, AppState};
use gesture_dj::classifier::{Classifier, GestureLabel};
use gesture_dj::landmark::{synthesize, Frame, Handedness, Pose};
use gesture_dj::source::{JsonLinesSource, LandmarkSource};

fn at(ms: u64) -> Duration { Duration::from_millis(ms) }

fn note(n: u8) -> MidiMessage {
    MidiMessage::NoteOn { channel: 0, note: n, velocity: 127 }
}

#[test]
fn play_trigger_scenario() {
    let mut classifier = Classifier::default();
    let mut emitter = MidiEmitter::new(RecordingOut::new(), 0);
    let left = synthesize(Pose::OpenPalm, Handedness::Left, 0.2);

    for t in [0, 300, 700] {
        let label = classifier.process(&left, at(t), &mut emitter).unwrap();
        assert_eq!(label, GestureLabel::Play);
    }
    assert_eq!(emitter.output().messages(), vec![note(60), note(60)]);
}

#[test]
fn left_play_does_not_hold_back_right() {
    let mut app = AppState::new(&AppConfig::default());
    let mut emitter = MidiEmitter::new(RecordingOut::new(), 0);
    let left  = synthesize(Pose::OpenPalm, Handedness::Left,  0.2);
    let right = synthesize(Pose::OpenPalm, Handedness::Right, 0.2);

    app.process_frame(&Frame::new(vec![left.clone()]), at(0), &mut emitter).unwrap();
    app.process_frame(&Frame::new(vec![left, right]), at(100), &mut emitter).unwrap();

    assert_eq!(emitter.output().messages(), vec![note(60), note(70)]);
    assert_eq!(app.overlay(Handedness::Left),  "L: PLAY");
    assert_eq!(app.overlay(Handedness::Right), "R: PLAY");
}

#[test]
fn volume_and_low_eq_stay_apart_at_every_height() {
    let mut app = AppState::new(&AppConfig::default());
    let mut emitter = MidiEmitter::new(RecordingOut::new(), 0);

    for step in 0..=10 {
        let y = step as f32 / 10.0;
        emitter.output_mut().clear();
        let frame = Frame::new(vec![
            synthesize(Pose::ThumbPinky, Handedness::Left,  y),
            synthesize(Pose::PinkyOnly,  Handedness::Right, y),
        ]);
        app.process_frame(&frame, at(0), &mut emitter).unwrap();

        let controllers: Vec<u8> = emitter.output().messages().iter()
            .map(|m| match m {
                MidiMessage::ControlChange { controller, .. } => *controller,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(controllers, vec![1, 12], "height {}", y);
    }
}

#[test]
fn json_frames_drive_the_controller() {
    // Build a frame line from a synthesized hand so the geometry is valid.
    let hand = synthesize(Pose::IndexMiddle, Handedness::Right, 0.0);
    let points: Vec<String> = hand.landmarks.iter()
        .map(|p| format!(r#"{{"x":{},"y":{}}}"#, p.x, p.y))
        .collect();
    let line = format!(
        r#"{{"hands":[{{"handedness":"Right","score":0.99,"landmarks":[{}]}}]}}"#,
        points.join(","),
    );

    let mut source = JsonLinesSource::from_reader(std::io::Cursor::new(line.into_bytes()));
    let mut app = AppState::new(&AppConfig::default());
    let mut emitter = MidiEmitter::new(RecordingOut::new(), 0);

    let frame = source.next_frame().unwrap().unwrap();
    app.process_frame(&frame, at(0), &mut emitter).unwrap();
    assert!(source.next_frame().unwrap().is_none());

    assert_eq!(app.label(Handedness::Right), Some(GestureLabel::HighEq));
    assert_eq!(emitter.output().messages(), vec![
        MidiMessage::ControlChange { channel: 0, controller: 14, value: 127 },
    ]);
}
