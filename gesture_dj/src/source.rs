//! Landmark sources — where each frame's hands come from.
//!
//! The frame loop only sees [`LandmarkSource::next_frame`].  Two sources
//! exist:
//!
//! * [`JsonLinesSource`] — an external hand tracker writes one JSON object
//!   per frame, either on our stdin or on the stdout of a child process.
//! * [`SimLandmarkSource`] — keyboard simulation; the visualizer forwards
//!   [`SimInput`]s and this source synthesises matching landmarks.
//!
//! ## JSON-lines frame format
//!
//! ```text
//! {"hands":[{"handedness":"Left","score":0.93,"landmarks":[{"x":0.41,"y":0.77}, …21 points]}]}
//! ```
//!
//! `score` and any extra per-point fields (`z`, `visibility`) are optional.
//! A frame may carry `"error":"…"` instead of hands.  Lines that do not start
//! with `{` (banners such as `READY`) are skipped.

use std::io::{self, BufRead, BufReader, StdinLock};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::landmark::{synthesize, Frame, HandObservation, Handedness, Landmark, Pose, LANDMARK_COUNT};

/// Default minimum detection score for a hand to be used.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
/// Default maximum number of hands kept per frame.
pub const DEFAULT_MAX_HANDS: usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// SourceError / LandmarkSource
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("landmark stream read failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed landmark frame: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to start detector `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("detector command is empty")]
    EmptyCommand,
}

/// Produces one [`Frame`] per call.  `Ok(None)` means the stream ended.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct PointJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    #[serde(default)]
    score: Option<f32>,
    landmarks: Vec<PointJson>,
}

#[derive(Deserialize, Debug)]
struct FrameJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Reads JSON-lines frames from any buffered reader.
pub struct JsonLinesSource<R> {
    reader:         R,
    line:           String,
    min_confidence: f32,
    max_hands:      usize,
    /// Detector process when we spawned it; killed on drop.
    child:          Option<Child>,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn from_reader(reader: R) -> Self {
        JsonLinesSource {
            reader,
            line:           String::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_hands:      DEFAULT_MAX_HANDS,
            child:          None,
        }
    }

    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands;
        self
    }

    fn build_frame(&self, parsed: FrameJson) -> Frame {
        if let Some(err) = parsed.error {
            warn!("detector error: {}", err);
            return Frame::default();
        }

        let mut hands = Vec::with_capacity(parsed.hands.len().min(self.max_hands));
        for hand in parsed.hands {
            if hands.len() == self.max_hands { break; }

            if let Some(score) = hand.score {
                if score < self.min_confidence {
                    debug!("{} hand below confidence ({:.2})", hand.handedness, score);
                    continue;
                }
            }
            let Some(handedness) = Handedness::from_label(&hand.handedness) else {
                warn!("unknown handedness {:?}, hand dropped", hand.handedness);
                continue;
            };
            let points: Vec<Landmark> = hand.landmarks.iter()
                .map(|p| Landmark::new(p.x, p.y))
                .collect();
            let Ok(landmarks) = <[Landmark; LANDMARK_COUNT]>::try_from(points) else {
                warn!("expected {} landmarks, got {}", LANDMARK_COUNT, hand.landmarks.len());
                continue;
            };
            hands.push(HandObservation::new(handedness, landmarks));
        }
        Frame::new(hands)
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let text = self.line.trim();
            if !text.starts_with('{') {
                if !text.is_empty() {
                    debug!("detector: {}", text);
                }
                continue;
            }
            let parsed: FrameJson = serde_json::from_str(text)?;
            return Ok(Some(self.build_frame(parsed)));
        }
    }
}

impl JsonLinesSource<StdinLock<'static>> {
    /// Frames piped into this process.
    pub fn stdin() -> Self {
        info!("Reading landmark frames from stdin");
        Self::from_reader(io::stdin().lock())
    }
}

impl JsonLinesSource<BufReader<ChildStdout>> {
    /// Launch `command` (whitespace-separated program and arguments) and read
    /// frames from its stdout.  Its stderr is passed through.
    pub fn spawn(command: &str) -> Result<Self, SourceError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(SourceError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SourceError::Spawn { command: command.to_string(), source })?;

        let stdout = child.stdout.take().ok_or_else(|| SourceError::Spawn {
            command: command.to_string(),
            source:  io::Error::new(io::ErrorKind::BrokenPipe, "no stdout"),
        })?;

        info!("Started detector `{}` (pid {})", command, child.id());
        let mut source = Self::from_reader(BufReader::new(stdout));
        source.child = Some(child);
        Ok(source)
    }
}

impl<R> Drop for JsonLinesSource<R> {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard-driven hands
// ════════════════════════════════════════════════════════════════════════════

/// Input events from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Show `hand` in `pose`.
    SetPose(Handedness, Pose),
    /// Take `hand` out of frame.
    Hide(Handedness),
    /// Move the wrist by `dy` (negative = up).
    Move(Handedness, f32),
}

const SIM_MIN_Y:     f32 = 0.25;
const SIM_MAX_Y:     f32 = 0.95;
const SIM_START_Y:   f32 = 0.60;

#[derive(Clone, Copy, Debug)]
struct SimHand {
    pose:    Option<Pose>,
    wrist_y: f32,
}

/// Synthesises a frame from the current simulated hand states.
pub struct SimLandmarkSource {
    rx:    Receiver<SimInput>,
    hands: [SimHand; 2],
}

impl SimLandmarkSource {
    /// A source plus the sender the window feeds.  Both hands start as fists.
    pub fn new() -> (Self, Sender<SimInput>) {
        let (tx, rx) = mpsc::channel();
        let hand = SimHand { pose: Some(Pose::Fist), wrist_y: SIM_START_Y };
        (SimLandmarkSource { rx, hands: [hand; 2] }, tx)
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::SetPose(h, pose) => self.hands[h.index()].pose = Some(pose),
            SimInput::Hide(h)          => self.hands[h.index()].pose = None,
            SimInput::Move(h, dy)      => {
                let hand = &mut self.hands[h.index()];
                hand.wrist_y = (hand.wrist_y + dy).clamp(SIM_MIN_Y, SIM_MAX_Y);
            }
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            match self.rx.try_recv() {
                Ok(input)                       => self.apply(input),
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Ok(None),
            }
        }
        let hands = Handedness::ALL.iter()
            .filter_map(|&h| {
                let sim = self.hands[h.index()];
                sim.pose.map(|pose| synthesize(pose, h, sim.wrist_y))
            })
            .collect();
        Ok(Some(Frame::new(hands)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hand_json(label: &str, score: f32, points: usize) -> String {
        let pts: Vec<String> = (0..points)
            .map(|i| format!(r#"{{"x":{:.3},"y":0.5,"z":-0.01}}"#, i as f32 / 21.0))
            .collect();
        format!(r#"{{"handedness":"{}","score":{},"landmarks":[{}]}}"#, label, score, pts.join(","))
    }

    fn source(text: String) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::from_reader(Cursor::new(text.into_bytes()))
    }

    // ── JSON lines ────────────────────────────────────────────────────────
    #[test]
    fn parses_two_hands() {
        let line = format!(r#"{{"hands":[{},{}]}}"#, hand_json("Left", 0.9, 21), hand_json("Right", 0.8, 21));
        let mut src = source(line + "\n");
        let frame = src.next_frame().unwrap().unwrap();
        assert_eq!(frame.hands.len(), 2);
        assert_eq!(frame.hands[0].handedness, Handedness::Left);
        assert_eq!(frame.hands[1].handedness, Handedness::Right);
        assert!((frame.hands[0].landmarks[20].x - 20.0 / 21.0).abs() < 1e-3);
    }

    #[test]
    fn eof_is_end_of_stream() {
        let mut src = source(String::new());
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn frames_arrive_in_order() {
        let second = format!(r#"{{"hands":[{}]}}"#, hand_json("Right", 0.95, 21));
        let text = format!("{}\n{}\n", r#"{"hands":[]}"#, second);
        let mut src = source(text);
        assert!(src.next_frame().unwrap().unwrap().hands.is_empty());
        assert_eq!(src.next_frame().unwrap().unwrap().hands.len(), 1);
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn low_confidence_hand_dropped() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json("Left", 0.5, 21));
        let mut src = source(line);
        assert!(src.next_frame().unwrap().unwrap().hands.is_empty());
    }

    #[test]
    fn confidence_threshold_adjustable() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json("Left", 0.5, 21));
        let mut src = source(line).with_min_confidence(0.4);
        assert_eq!(src.next_frame().unwrap().unwrap().hands.len(), 1);
    }

    #[test]
    fn missing_score_accepted() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json("Right", 0.9, 21))
            .replace(r#""score":0.9,"#, "");
        assert!(!line.contains("score"));
        let mut src = source(line);
        assert_eq!(src.next_frame().unwrap().unwrap().hands.len(), 1);
    }

    #[test]
    fn wrong_landmark_count_dropped() {
        let line = format!(r#"{{"hands":[{},{}]}}"#, hand_json("Left", 0.9, 20), hand_json("Right", 0.9, 21));
        let mut src = source(line);
        let frame = src.next_frame().unwrap().unwrap();
        assert_eq!(frame.hands.len(), 1);
        assert_eq!(frame.hands[0].handedness, Handedness::Right);
    }

    #[test]
    fn unknown_handedness_dropped() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json("Both", 0.9, 21));
        let mut src = source(line);
        assert!(src.next_frame().unwrap().unwrap().hands.is_empty());
    }

    #[test]
    fn max_hands_respected() {
        let h = hand_json("Left", 0.9, 21);
        let line = format!(r#"{{"hands":[{},{},{}]}}"#, h, h, h);
        let mut src = source(line).with_max_hands(2);
        assert_eq!(src.next_frame().unwrap().unwrap().hands.len(), 2);
    }

    #[test]
    fn detector_error_gives_empty_frame() {
        let mut src = source(r#"{"error":"camera busy"}"#.to_string());
        assert_eq!(src.next_frame().unwrap(), Some(Frame::default()));
    }

    #[test]
    fn banner_lines_skipped() {
        let mut src = source("READY\n\n{\"hands\":[]}\n".to_string());
        assert_eq!(src.next_frame().unwrap(), Some(Frame::default()));
    }

    #[test]
    fn malformed_json_is_error() {
        let mut src = source("{\"hands\": [\n".to_string());
        assert!(matches!(src.next_frame(), Err(SourceError::Parse(_))));
    }

    #[test]
    fn empty_command_rejected() {
        assert!(matches!(JsonLinesSource::spawn("   "), Err(SourceError::EmptyCommand)));
    }

    // ── simulation ────────────────────────────────────────────────────────
    #[test]
    fn sim_starts_with_two_fists() {
        let (mut sim, _tx) = SimLandmarkSource::new();
        let frame = sim.next_frame().unwrap().unwrap();
        assert_eq!(frame.hands.len(), 2);
        assert_eq!(frame.hands[0], synthesize(Pose::Fist, Handedness::Left, SIM_START_Y));
    }

    #[test]
    fn sim_applies_inputs() {
        let (mut sim, tx) = SimLandmarkSource::new();
        tx.send(SimInput::SetPose(Handedness::Right, Pose::OpenPalm)).unwrap();
        tx.send(SimInput::Hide(Handedness::Left)).unwrap();
        tx.send(SimInput::Move(Handedness::Right, -5.0)).unwrap();
        let frame = sim.next_frame().unwrap().unwrap();
        assert_eq!(frame.hands, vec![synthesize(Pose::OpenPalm, Handedness::Right, SIM_MIN_Y)]);
    }

    #[test]
    fn sim_ends_when_window_gone() {
        let (mut sim, tx) = SimLandmarkSource::new();
        drop(tx);
        assert!(sim.next_frame().unwrap().is_none());
    }
}
