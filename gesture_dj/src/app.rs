//! Top-level frame loop.
//!
//! `AppState` owns the `Classifier` and the per-hand overlay labels.  `run`
//! drives capture → classify → emit → render once per frame on a single
//! thread until the window closes, the user quits, or the landmark stream
//! ends.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, info, warn};

use dj_midi::{open_first_output, MidiEmitter, MidiError, MidiOut};

use crate::classifier::{Classifier, GestureLabel, DEFAULT_PLAY_INTERVAL};
use crate::landmark::{Frame, Handedness};
use crate::source::{
    JsonLinesSource, LandmarkSource, SimInput, SimLandmarkSource,
    DEFAULT_MAX_HANDS, DEFAULT_MIN_CONFIDENCE,
};
use crate::visualizer::Visualizer;

/// Overlay text for a hand that is not in frame.
pub const NO_HAND: &str = "-";

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where landmark frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Keyboard-driven hands (no camera needed).
    Simulated,
    /// JSON-lines frames piped into stdin.
    Stdin,
    /// JSON-lines frames from a detector process we launch.
    Command(String),
}

impl SourceKind {
    pub fn describe(&self) -> String {
        match self {
            SourceKind::Simulated    => "keyboard simulation".to_string(),
            SourceKind::Stdin        => "stdin".to_string(),
            SourceKind::Command(cmd) => format!("detector `{}`", cmd),
        }
    }
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub source:           SourceKind,
    pub midi_client_name: String,
    pub channel:          u8,
    /// Minimum gap between PLAY notes from one hand.
    pub play_interval:    Duration,
    pub min_confidence:   f32,
    pub max_hands:        usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source:           SourceKind::Simulated,
            midi_client_name: "gesture_dj".to_string(),
            channel:          0,
            play_interval:    DEFAULT_PLAY_INTERVAL,
            min_confidence:   DEFAULT_MIN_CONFIDENCE,
            max_hands:        DEFAULT_MAX_HANDS,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    classifier: Classifier,
    /// Label per hand in the last processed frame; `None` = not in frame.
    labels:     [Option<GestureLabel>; 2],
    frames:     u64,
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Self {
        AppState {
            classifier: Classifier::new(cfg.play_interval),
            labels:     [None; 2],
            frames:     0,
            status:     format!("Ready - source: {}", cfg.source.describe()),
        }
    }

    /// Classify every hand in `frame` and send its MIDI.  Hands missing from
    /// the frame fall back to [`NO_HAND`].  A send failure aborts the frame.
    pub fn process_frame<O: MidiOut>(
        &mut self,
        frame:   &Frame,
        now:     Duration,
        emitter: &mut MidiEmitter<O>,
    ) -> Result<(), MidiError> {
        let mut seen = [None; 2];
        for obs in &frame.hands {
            let label = self.classifier.process(obs, now, emitter)?;
            seen[obs.handedness.index()] = Some(label);
        }

        for hand in Handedness::ALL {
            let (before, after) = (self.labels[hand.index()], seen[hand.index()]);
            if before != after {
                debug!("{} hand: {} -> {}", hand.as_str(), label_text(before), label_text(after));
            }
        }

        self.labels = seen;
        self.frames += 1;
        Ok(())
    }

    pub fn label(&self, hand: Handedness) -> Option<GestureLabel> {
        self.labels[hand.index()]
    }

    /// `"L: <label>"` / `"R: <label>"`.
    pub fn overlay(&self, hand: Handedness) -> String {
        let prefix = match hand {
            Handedness::Left  => "L",
            Handedness::Right => "R",
        };
        format!("{}: {}", prefix, label_text(self.label(hand)))
    }

    pub fn frames(&self) -> u64 { self.frames }

    pub fn classifier(&self) -> &Classifier { &self.classifier }
}

fn label_text(label: Option<GestureLabel>) -> &'static str {
    label.map_or(NO_HAND, |l| l.as_str())
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

fn open_source(cfg: &AppConfig) -> anyhow::Result<(Box<dyn LandmarkSource>, Option<Sender<SimInput>>)> {
    match &cfg.source {
        SourceKind::Simulated => {
            let (sim, tx) = SimLandmarkSource::new();
            let src: Box<dyn LandmarkSource> = Box::new(sim);
            Ok((src, Some(tx)))
        }
        SourceKind::Stdin => {
            let src: Box<dyn LandmarkSource> = Box::new(
                JsonLinesSource::stdin()
                    .with_min_confidence(cfg.min_confidence)
                    .with_max_hands(cfg.max_hands),
            );
            Ok((src, None))
        }
        SourceKind::Command(cmd) => {
            let src: Box<dyn LandmarkSource> = Box::new(
                JsonLinesSource::spawn(cmd)?
                    .with_min_confidence(cfg.min_confidence)
                    .with_max_hands(cfg.max_hands),
            );
            Ok((src, None))
        }
    }
}

/// Run the full application.
///
/// The MIDI port is opened first; without one the controller refuses to
/// start.  A failed or finished landmark stream ends the loop normally.  A
/// failed MIDI send is returned as an error.
///
/// Input is polled once per frame, before the source is read.  With
/// [`SourceKind::Stdin`] or [`SourceKind::Command`] the read blocks until the
/// tracker writes its next line, so a stalled tracker also stalls the window
/// and its quit keys.
pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    // ── MIDI ──────────────────────────────────────────────────────────────
    let out = open_first_output(&cfg.midi_client_name)
        .context("cannot start without a MIDI output port")?;
    let port = out.port_name().to_string();
    let mut emitter = MidiEmitter::new(out, cfg.channel);

    // ── Landmark source + window ──────────────────────────────────────────
    let (mut source, sim_tx) = open_source(&cfg)?;
    let mut vis = Visualizer::new(sim_tx)
        .map_err(anyhow::Error::msg)
        .context("failed to open the display window")?;

    let mut app = AppState::new(&cfg);
    app.status = format!("MIDI: {}  |  source: {}", port, cfg.source.describe());
    info!("Running with {} ({})", cfg.source.describe(), port);

    // ── Main loop ─────────────────────────────────────────────────────────
    let start = Instant::now();
    while vis.is_open() {
        if !vis.poll_input() { break; }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Landmark stream ended");
                break;
            }
            Err(e) => {
                warn!("Frame capture failed, stopping: {}", e);
                break;
            }
        };

        app.process_frame(&frame, start.elapsed(), &mut emitter)
            .context("MIDI output failed")?;

        vis.render(
            &frame,
            &app.overlay(Handedness::Left),
            &app.overlay(Handedness::Right),
            &app.status,
        );
    }

    info!("Stopped after {} frames", app.frames());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{synthesize, Pose};
    use dj_midi::{MidiMessage, RecordingOut};

    fn make_app() -> (AppState, MidiEmitter<RecordingOut>) {
        (AppState::new(&AppConfig::default()), MidiEmitter::new(RecordingOut::new(), 0))
    }

    #[test]
    fn overlays_start_empty() {
        let (app, _) = make_app();
        assert_eq!(app.overlay(Handedness::Left),  "L: -");
        assert_eq!(app.overlay(Handedness::Right), "R: -");
    }

    #[test]
    fn both_hands_classified_in_one_frame() {
        let (mut app, mut e) = make_app();
        let frame = Frame::new(vec![
            synthesize(Pose::IndexOnly,  Handedness::Left,  0.5),
            synthesize(Pose::ThumbPinky, Handedness::Right, 0.5),
        ]);
        app.process_frame(&frame, Duration::ZERO, &mut e).unwrap();
        assert_eq!(app.overlay(Handedness::Left),  "L: MID EQ");
        assert_eq!(app.overlay(Handedness::Right), "R: VOLUME");
        assert_eq!(e.output().messages(), vec![
            MidiMessage::ControlChange { channel: 0, controller: 3,  value: 64 },
            MidiMessage::ControlChange { channel: 0, controller: 11, value: 64 },
        ]);
    }

    #[test]
    fn hand_leaving_frame_resets_label() {
        let (mut app, mut e) = make_app();
        let both = Frame::new(vec![
            synthesize(Pose::Fist,     Handedness::Left,  0.5),
            synthesize(Pose::OpenPalm, Handedness::Right, 0.5),
        ]);
        app.process_frame(&both, Duration::ZERO, &mut e).unwrap();
        assert_eq!(app.label(Handedness::Right), Some(GestureLabel::Play));

        app.process_frame(&Frame::default(), Duration::from_millis(30), &mut e).unwrap();
        assert_eq!(app.label(Handedness::Left),  None);
        assert_eq!(app.label(Handedness::Right), None);
        assert_eq!(app.frames(), 2);
    }

    #[test]
    fn play_held_across_frames_throttled() {
        let (mut app, mut e) = make_app();
        let frame = Frame::new(vec![synthesize(Pose::OpenPalm, Handedness::Left, 0.3)]);
        // 60 fps for one second.
        for i in 0..60u64 {
            app.process_frame(&frame, Duration::from_millis(i * 16), &mut e).unwrap();
        }
        // Triggers at 0 ms and the first frame past 600 ms (608 ms).
        assert_eq!(e.output().raw().len(), 2);
        assert_eq!(
            app.classifier().throttle().last_play(Handedness::Left),
            Some(Duration::from_millis(608)),
        );
    }

    #[test]
    fn send_failure_surfaces() {
        let (mut app, mut e) = make_app();
        e.output_mut().close();
        let frame = Frame::new(vec![synthesize(Pose::IndexMiddle, Handedness::Left, 0.5)]);
        assert!(app.process_frame(&frame, Duration::ZERO, &mut e).is_err());
    }

    #[test]
    fn default_config_matches_controller() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.source, SourceKind::Simulated);
        assert_eq!(cfg.play_interval, Duration::from_millis(600));
        assert_eq!(cfg.max_hands, 2);
        assert_eq!(cfg.channel, 0);
    }
}
