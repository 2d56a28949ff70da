//! Gesture classification — one hand's landmarks → a [`GestureLabel`] and at
//! most one MIDI message.
//!
//! The decision table is evaluated in a fixed order; the first matching row
//! wins:
//!
//! | # | Fingers (I M R P) | Thumb | Label | MIDI |
//! |---|---|---|---|---|
//! | 1 | `. . . .` | any | `NULL` | — |
//! | 2 | `| | | |` | out | `PLAY` | note-on 60+offset (throttled) |
//! | 3 | `. . . |` | out | `VOLUME` | CC 1+offset = height |
//! | 4 | `. . . |` | in  | `LOW EQ` | CC 2+offset = height |
//! | 5 | `| . . .` | any | `MID EQ` | CC 3+offset = height |
//! | 6 | `| | . .` | any | `HIGH EQ` | CC 4+offset = height |
//! | 7 | anything else | any | `NULL` | — |
//!
//! The classifier never reads a clock: the caller passes `now` as the time
//! elapsed since the frame loop started.

use std::fmt;
use std::time::Duration;

use dj_midi::{MidiEmitter, MidiError, MidiOut, DATA_MAX};

use crate::landmark::{joints, HandObservation, Handedness, Landmark, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// MIDI mapping
// ════════════════════════════════════════════════════════════════════════════

/// Note sent for PLAY on the left deck.
pub const PLAY_NOTE:        u8 = 60;
pub const VOLUME_CC:        u8 = 1;
pub const LOW_EQ_CC:        u8 = 2;
pub const MID_EQ_CC:        u8 = 3;
pub const HIGH_EQ_CC:       u8 = 4;
/// Added to every note/controller number for the right hand.
pub const RIGHT_DECK_OFFSET: u8 = 10;

/// Minimum gap between two PLAY notes from the same hand.
pub const DEFAULT_PLAY_INTERVAL: Duration = Duration::from_millis(600);

/// Routes each hand to its own deck.
pub fn deck_offset(hand: Handedness) -> u8 {
    match hand {
        Handedness::Left  => 0,
        Handedness::Right => RIGHT_DECK_OFFSET,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Derived hand features
// ════════════════════════════════════════════════════════════════════════════

const FINGER_TIPS: [usize; 4] = [
    joints::INDEX_TIP, joints::MIDDLE_TIP, joints::RING_TIP, joints::PINKY_TIP,
];

/// Extended flags for index, middle, ring and pinky.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FingerState(pub [bool; 4]);

impl FingerState {
    /// A finger is up when its tip is strictly higher on screen (smaller `y`)
    /// than the joint two positions below it.
    pub fn from_landmarks(lm: &[Landmark; LANDMARK_COUNT]) -> Self {
        FingerState(FINGER_TIPS.map(|tip| lm[tip].y < lm[tip - 2].y))
    }
}

/// Thumb tip pointing away from the palm.  The comparison flips by hand so
/// both hands agree after the mirror flip.
pub fn thumb_out(obs: &HandObservation) -> bool {
    let tip   = obs.landmarks[joints::THUMB_TIP].x;
    let joint = obs.landmarks[joints::THUMB_IP].x;
    match obs.handedness {
        Handedness::Right => tip < joint,
        Handedness::Left  => tip > joint,
    }
}

/// Vertical wrist position as a 0–127 control value; higher hand → larger.
pub fn height_value(wrist_y: f32) -> u8 {
    let v = ((1.0 - wrist_y) * DATA_MAX as f32).round();
    dj_midi::clamp_data(v)
}

// ════════════════════════════════════════════════════════════════════════════
// GestureLabel
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    Null,
    Play,
    Volume,
    LowEq,
    MidEq,
    HighEq,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::Null   => "NULL",
            GestureLabel::Play   => "PLAY",
            GestureLabel::Volume => "VOLUME",
            GestureLabel::LowEq  => "LOW EQ",
            GestureLabel::MidEq  => "MID EQ",
            GestureLabel::HighEq => "HIGH EQ",
        }
    }

    /// Left-deck controller number for the continuous labels.
    pub fn controller(&self) -> Option<u8> {
        match self {
            GestureLabel::Volume => Some(VOLUME_CC),
            GestureLabel::LowEq  => Some(LOW_EQ_CC),
            GestureLabel::MidEq  => Some(MID_EQ_CC),
            GestureLabel::HighEq => Some(HIGH_EQ_CC),
            GestureLabel::Null | GestureLabel::Play => None,
        }
    }

    /// The fixed decision table over (finger vector, thumb).
    pub fn from_features(fingers: FingerState, thumb_out: bool) -> Self {
        match (fingers.0, thumb_out) {
            ([false, false, false, false], _)  => GestureLabel::Null,
            ([true,  true,  true,  true ], true) => GestureLabel::Play,
            ([false, false, false, true ], true) => GestureLabel::Volume,
            ([false, false, false, true ], false) => GestureLabel::LowEq,
            ([true,  false, false, false], _)  => GestureLabel::MidEq,
            ([true,  true,  false, false], _)  => GestureLabel::HighEq,
            _ => GestureLabel::Null,
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Emission — the side effect decided by classification
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emission {
    NoteOn        { note: u8 },
    ControlChange { controller: u8, value: u8 },
}

impl Emission {
    pub fn send<O: MidiOut>(&self, emitter: &mut MidiEmitter<O>) -> Result<(), MidiError> {
        match *self {
            Emission::NoteOn { note } => emitter.send_note_on(note),
            Emission::ControlChange { controller, value } =>
                emitter.send_control_change(controller, f32::from(value)),
        }
    }
}

/// Result of classifying one hand in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub hand:     Handedness,
    pub label:    GestureLabel,
    pub emission: Option<Emission>,
}

// ════════════════════════════════════════════════════════════════════════════
// ThrottleState
// ════════════════════════════════════════════════════════════════════════════

/// Last PLAY trigger time per hand.  `None` until the hand first triggers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrottleState {
    last_play: [Option<Duration>; 2],
}

impl ThrottleState {
    pub fn last_play(&self, hand: Handedness) -> Option<Duration> {
        self.last_play[hand.index()]
    }

    /// More than `interval` has passed since this hand last triggered.
    pub fn ready(&self, hand: Handedness, now: Duration, interval: Duration) -> bool {
        match self.last_play(hand) {
            None       => true,
            Some(last) => now.saturating_sub(last) > interval,
        }
    }

    /// Record a trigger.  Never moves a hand's timestamp backwards.
    pub fn record(&mut self, hand: Handedness, now: Duration) {
        let slot = &mut self.last_play[hand.index()];
        *slot = Some(slot.map_or(now, |last| last.max(now)));
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Classifier {
    throttle:      ThrottleState,
    play_interval: Duration,
}

impl Default for Classifier {
    fn default() -> Self { Classifier::new(DEFAULT_PLAY_INTERVAL) }
}

impl Classifier {
    pub fn new(play_interval: Duration) -> Self {
        Classifier { throttle: ThrottleState::default(), play_interval }
    }

    pub fn throttle(&self) -> &ThrottleState { &self.throttle }

    /// Label one hand and decide its MIDI message.
    ///
    /// Only a PLAY that passes the throttle touches state; the label is PLAY
    /// either way.
    pub fn classify(&mut self, obs: &HandObservation, now: Duration) -> Classification {
        let hand    = obs.handedness;
        let fingers = FingerState::from_landmarks(&obs.landmarks);
        let label   = GestureLabel::from_features(fingers, thumb_out(obs));
        let offset  = deck_offset(hand);

        let emission = match label {
            GestureLabel::Null => None,
            GestureLabel::Play => {
                if self.throttle.ready(hand, now, self.play_interval) {
                    self.throttle.record(hand, now);
                    Some(Emission::NoteOn { note: PLAY_NOTE + offset })
                } else {
                    None
                }
            }
            continuous => continuous.controller().map(|cc| Emission::ControlChange {
                controller: cc + offset,
                value:      height_value(obs.wrist().y),
            }),
        };

        Classification { hand, label, emission }
    }

    /// Classify and send.  Send failures are returned untouched.
    pub fn process<O: MidiOut>(
        &mut self,
        obs:     &HandObservation,
        now:     Duration,
        emitter: &mut MidiEmitter<O>,
    ) -> Result<GestureLabel, MidiError> {
        let c = self.classify(obs, now);
        if let Some(emission) = c.emission {
            emission.send(emitter)?;
        }
        Ok(c.label)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
