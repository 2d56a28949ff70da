//! Hand landmark model — the 21-joint layout produced by MediaPipe-style
//! hand trackers, plus canonical pose synthesis for simulation and tests.
//!
//! Coordinates are normalised to the (already mirrored) frame: `x` grows to
//! the right, `y` grows downward, both nominally in 0.0–1.0.

// ════════════════════════════════════════════════════════════════════════════
// Joint indices
// ════════════════════════════════════════════════════════════════════════════

/// Number of landmarks in one hand record.
pub const LANDMARK_COUNT: usize = 21;

pub mod joints {
    pub const WRIST:       usize = 0;
    pub const THUMB_CMC:   usize = 1;
    pub const THUMB_MCP:   usize = 2;
    pub const THUMB_IP:    usize = 3;
    pub const THUMB_TIP:   usize = 4;
    pub const INDEX_MCP:   usize = 5;
    pub const INDEX_PIP:   usize = 6;
    pub const INDEX_DIP:   usize = 7;
    pub const INDEX_TIP:   usize = 8;
    pub const MIDDLE_MCP:  usize = 9;
    pub const MIDDLE_PIP:  usize = 10;
    pub const MIDDLE_DIP:  usize = 11;
    pub const MIDDLE_TIP:  usize = 12;
    pub const RING_MCP:    usize = 13;
    pub const RING_PIP:    usize = 14;
    pub const RING_DIP:    usize = 15;
    pub const RING_TIP:    usize = 16;
    pub const PINKY_MCP:   usize = 17;
    pub const PINKY_PIP:   usize = 18;
    pub const PINKY_DIP:   usize = 19;
    pub const PINKY_TIP:   usize = 20;
}

/// Skeleton edges between joints, for drawing.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),  (1, 2),   (2, 3),   (3, 4),
    (0, 5),  (5, 6),   (6, 7),   (7, 8),
    (5, 9),  (9, 10),  (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

// ════════════════════════════════════════════════════════════════════════════
// Landmark / Handedness / HandObservation / Frame
// ════════════════════════════════════════════════════════════════════════════

/// How far past the frame edge `to_pixel` may place a point, as a fraction
/// of the frame size.
const PIXEL_MARGIN: f32 = 0.5;

/// A normalised 2D joint position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self { Landmark { x, y } }

    /// Pixel position in a `width × height` frame.  Points far outside the
    /// frame are pulled in to within half a frame of its edge.
    pub fn to_pixel(&self, width: usize, height: usize) -> (isize, isize) {
        (scale_axis(self.x, width), scale_axis(self.y, height))
    }
}

fn scale_axis(v: f32, size: usize) -> isize {
    let size = size as f32;
    let margin = size * PIXEL_MARGIN;
    // NaN survives `clamp` and casts to 0.
    (v * size).clamp(-margin, size + margin) as isize
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness { Left, Right }

impl Handedness {
    pub const ALL: [Handedness; 2] = [Handedness::Left, Handedness::Right];

    /// Parse the tracker's label.  Exactly `"Left"` or `"Right"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Left"  => Some(Handedness::Left),
            "Right" => Some(Handedness::Right),
            _       => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left  => "Left",
            Handedness::Right => "Right",
        }
    }

    /// Slot in per-hand tables.
    pub fn index(&self) -> usize {
        match self {
            Handedness::Left  => 0,
            Handedness::Right => 1,
        }
    }
}

/// One detected hand in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub handedness: Handedness,
    pub landmarks:  [Landmark; LANDMARK_COUNT],
}

impl HandObservation {
    pub fn new(handedness: Handedness, landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        HandObservation { handedness, landmarks }
    }

    pub fn wrist(&self) -> Landmark { self.landmarks[joints::WRIST] }
}

/// All hands detected in one captured frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub hands: Vec<HandObservation>,
}

impl Frame {
    pub fn new(hands: Vec<HandObservation>) -> Self { Frame { hands } }

    pub fn hand(&self, handedness: Handedness) -> Option<&HandObservation> {
        self.hands.iter().find(|h| h.handedness == handedness)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pose synthesis
// ════════════════════════════════════════════════════════════════════════════

/// The hand shapes the controller recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pose {
    Fist,
    OpenPalm,
    PinkyOnly,
    ThumbPinky,
    IndexOnly,
    IndexMiddle,
}

impl Pose {
    pub const ALL: [Pose; 6] = [
        Pose::Fist, Pose::OpenPalm, Pose::PinkyOnly,
        Pose::ThumbPinky, Pose::IndexOnly, Pose::IndexMiddle,
    ];

    /// Extended flags for index, middle, ring, pinky.
    pub fn fingers(&self) -> [bool; 4] {
        match self {
            Pose::Fist        => [false, false, false, false],
            Pose::OpenPalm    => [true,  true,  true,  true ],
            Pose::PinkyOnly   => [false, false, false, true ],
            Pose::ThumbPinky  => [false, false, false, true ],
            Pose::IndexOnly   => [true,  false, false, false],
            Pose::IndexMiddle => [true,  true,  false, false],
        }
    }

    pub fn thumb_out(&self) -> bool {
        matches!(self, Pose::OpenPalm | Pose::ThumbPinky)
    }
}

/// Build a hand showing `pose` with its wrist at height `wrist_y`.
pub fn synthesize(pose: Pose, handedness: Handedness, wrist_y: f32) -> HandObservation {
    synthesize_raw(pose.fingers(), pose.thumb_out(), handedness, wrist_y)
}

/// Build a hand from an arbitrary finger vector and thumb state.
///
/// Extended fingers have their tip above the PIP joint; curled ones fold
/// the tip back below it.  The thumb sits on the side that makes
/// [`crate::classifier::thumb_out`] agree with `thumb_out` for `handedness`.
pub fn synthesize_raw(
    fingers:    [bool; 4],
    thumb_out:  bool,
    handedness: Handedness,
    wrist_y:    f32,
) -> HandObservation {
    // After the mirror flip the right hand's thumb points left on screen.
    let (cx, side) = match handedness {
        Handedness::Left  => (0.30_f32,  1.0_f32),
        Handedness::Right => (0.70_f32, -1.0_f32),
    };

    let mut lm = [Landmark::default(); LANDMARK_COUNT];
    lm[joints::WRIST] = Landmark::new(cx, wrist_y);

    // ── thumb ─────────────────────────────────────────────────────────────
    let (ip_dx, tip_dx) = if thumb_out { (0.08, 0.12) } else { (0.06, 0.03) };
    lm[joints::THUMB_CMC] = Landmark::new(cx + side * 0.03, wrist_y - 0.03);
    lm[joints::THUMB_MCP] = Landmark::new(cx + side * 0.05, wrist_y - 0.06);
    lm[joints::THUMB_IP]  = Landmark::new(cx + side * ip_dx,  wrist_y - 0.08);
    lm[joints::THUMB_TIP] = Landmark::new(cx + side * tip_dx, wrist_y - 0.10);

    // ── fingers: MCP, PIP, DIP, TIP offsets above the wrist ───────────────
    const EXTENDED: [f32; 4] = [0.10, 0.14, 0.17, 0.20];
    const CURLED:   [f32; 4] = [0.10, 0.13, 0.11, 0.09];

    for (f, &up) in fingers.iter().enumerate() {
        let x    = cx + side * (0.03 - 0.03 * f as f32);
        let base = joints::INDEX_MCP + 4 * f;
        let rise = if up { EXTENDED } else { CURLED };
        for (j, dy) in rise.iter().enumerate() {
            lm[base + j] = Landmark::new(x, wrist_y - dy);
        }
    }

    HandObservation::new(handedness, lm)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
