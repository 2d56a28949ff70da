//! Software-rendered display using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ L: PLAY                                       │
//! │ R: HIGH EQ                                    │
//! │                                               │
//! │        (left hand)          (right hand)      │
//! │         skeleton              skeleton        │
//! │                                               │
//! │ status bar                                    │
//! │ key legend                                    │
//! └───────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::landmark::{Frame, Handedness, Pose, HAND_CONNECTIONS};
use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:        usize = 640;
pub const WIN_H:        usize = 480;
pub const WINDOW_TITLE: &str  = "Gesture DJ Controller";

/// Overlay anchors (top-left of the text).
pub const LEFT_LABEL_POS:  (usize, usize) = (10, 40);
pub const RIGHT_LABEL_POS: (usize, usize) = (10, 90);

const LABEL_SCALE:  usize = 4;
const STATUS_Y:     usize = WIN_H - 36;
const BG_COLOR:     u32   = 0xFF101418;
const TEXT_BG:      u32   = 0xFF0F3460;
const LEFT_COLOR:   u32   = 0xFF00FF00;   // green
const RIGHT_COLOR:  u32   = 0xFF0000FF;   // blue
const BONE_COLOR:   u32   = 0xFFEEEEEE;
const JOINT_COLOR:  u32   = 0xFFFF3030;

/// Step per key repeat when raising/lowering a simulated hand.
const SIM_STEP: f32 = 0.02;

const LEFT_POSE_KEYS: [Key; 6] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5, Key::Key6,
];
const RIGHT_POSE_KEYS: [Key; 6] = [
    Key::Z, Key::X, Key::C, Key::V, Key::B, Key::N,
];

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the framebuffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    pub buf: Vec<u32>,
    w:       usize,
    h:       usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn clear(&mut self) { self.buf.fill(BG_COLOR); }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.buf[y as usize * self.w + x as usize] = color;
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    /// Bresenham line, clipped per pixel.
    pub fn draw_line(&mut self, (x0, y0): (isize, isize), (x1, y1): (isize, isize), color: u32) {
        let dx =  (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    pub fn draw_dot(&mut self, (cx, cy): (isize, isize), r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Minimal bitmap font — 3×5 glyphs, each pixel drawn as a
    /// `scale × scale` block.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32, scale: usize) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > self.w { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    /// Present only in simulation mode.
    sim_tx: Option<Sender<SimInput>>,
}

impl Visualizer {
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self, String> {
        let mut window = Window::new(
            WINDOW_TITLE,
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            sim_tx,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Check the exit keys and forward simulation keys.  Returns false when
    /// the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            return false;
        }

        let Some(tx) = self.sim_tx.as_ref() else { return true };
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        let mut inputs = Vec::new();
        for (hand, keys) in [(Handedness::Left, LEFT_POSE_KEYS), (Handedness::Right, RIGHT_POSE_KEYS)] {
            for (key, pose) in keys.iter().zip(Pose::ALL) {
                if one_shot(*key) {
                    inputs.push(SimInput::SetPose(hand, pose));
                }
            }
        }
        if one_shot(Key::Key0) { inputs.push(SimInput::Hide(Handedness::Left)); }
        if one_shot(Key::M)    { inputs.push(SimInput::Hide(Handedness::Right)); }

        if held(Key::W)    { inputs.push(SimInput::Move(Handedness::Left,  -SIM_STEP)); }
        if held(Key::S)    { inputs.push(SimInput::Move(Handedness::Left,   SIM_STEP)); }
        if held(Key::Up)   { inputs.push(SimInput::Move(Handedness::Right, -SIM_STEP)); }
        if held(Key::Down) { inputs.push(SimInput::Move(Handedness::Right,  SIM_STEP)); }

        for input in inputs {
            let _ = tx.send(input);
        }
        true
    }

    /// Render one frame.
    pub fn render(&mut self, frame: &Frame, left_label: &str, right_label: &str, status: &str) {
        draw_scene(&mut self.canvas, frame, left_label, right_label, status, self.sim_tx.is_some());
        self.window.update_with_buffer(&self.canvas.buf, WIN_W, WIN_H).ok();
    }
}

/// Everything but the final present, so it runs without a window.
pub fn draw_scene(
    canvas:      &mut Canvas,
    frame:       &Frame,
    left_label:  &str,
    right_label: &str,
    status:      &str,
    simulated:   bool,
) {
    canvas.clear();

    // ── Hand skeletons ────────────────────────────────────────────────────
    for hand in &frame.hands {
        let px: Vec<(isize, isize)> = hand.landmarks.iter()
            .map(|lm| lm.to_pixel(WIN_W, WIN_H))
            .collect();
        for &(a, b) in HAND_CONNECTIONS.iter() {
            canvas.draw_line(px[a], px[b], BONE_COLOR);
        }
        for &p in &px {
            canvas.draw_dot(p, 3, JOINT_COLOR);
        }
    }

    // ── Per-hand overlays ─────────────────────────────────────────────────
    let (lx, ly) = LEFT_LABEL_POS;
    let (rx, ry) = RIGHT_LABEL_POS;
    canvas.draw_label(left_label,  lx, ly, LEFT_COLOR,  LABEL_SCALE);
    canvas.draw_label(right_label, rx, ry, RIGHT_COLOR, LABEL_SCALE);

    // ── Status bar ────────────────────────────────────────────────────────
    canvas.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
    canvas.draw_label(status, 10, STATUS_Y + 8, 0xFFEEEEEE, 1);

    // ── Key legend ────────────────────────────────────────────────────────
    let legend = if simulated {
        "L: 1-6 pose  W/S move  0 hide    R: Z-N pose  up/down move  M hide    Q quit"
    } else {
        "Q quit"
    };
    canvas.draw_label(legend, 10, WIN_H - 14, 0xFF888888, 1);
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{joints, synthesize};

    #[test]
    fn line_hits_both_endpoints() {
        let mut c = Canvas::new(20, 20);
        c.draw_line((1, 2), (15, 9), 0xFFFFFFFF);
        assert_eq!(c.pixel(1, 2),  Some(0xFFFFFFFF));
        assert_eq!(c.pixel(15, 9), Some(0xFFFFFFFF));
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut c = Canvas::new(10, 10);
        c.draw_line((-5, -5), (30, 30), 0xFF00FF00);
        c.draw_dot((0, 0), 4, 0xFF00FF00);
        assert_eq!(c.buf.len(), 100);
        assert_eq!(c.pixel(10, 10), None);
    }

    #[test]
    fn label_drawn_at_anchor() {
        let mut c = Canvas::new(WIN_W, WIN_H);
        // 'L' has its top-left bit set.
        c.draw_label("L: PLAY", 10, 40, LEFT_COLOR, LABEL_SCALE);
        assert_eq!(c.pixel(10, 40), Some(LEFT_COLOR));
        assert_eq!(c.pixel(9, 40),  Some(BG_COLOR));
    }

    #[test]
    fn scene_draws_overlays_and_joints() {
        let mut c = Canvas::new(WIN_W, WIN_H);
        let hand  = synthesize(crate::landmark::Pose::OpenPalm, Handedness::Right, 0.8);
        let wrist = hand.landmarks[joints::WRIST].to_pixel(WIN_W, WIN_H);
        let frame = Frame::new(vec![hand]);
        draw_scene(&mut c, &frame, "L: -", "R: PLAY", "ok", true);

        assert_eq!(c.pixel(LEFT_LABEL_POS.0,  LEFT_LABEL_POS.1),  Some(LEFT_COLOR));
        assert_eq!(c.pixel(RIGHT_LABEL_POS.0, RIGHT_LABEL_POS.1), Some(RIGHT_COLOR));
        assert_eq!(c.pixel(wrist.0 as usize, wrist.1 as usize), Some(JOINT_COLOR));
    }

    #[test]
    fn scene_survives_far_out_landmarks() {
        let mut c = Canvas::new(WIN_W, WIN_H);
        let mut hand = synthesize(crate::landmark::Pose::OpenPalm, Handedness::Left, 0.5);
        hand.landmarks[joints::INDEX_TIP] = crate::landmark::Landmark::new(1.0e30, -1.0e30);
        hand.landmarks[joints::PINKY_TIP] = crate::landmark::Landmark::new(-1.0e5, 1.0e5);
        let wrist = hand.landmarks[joints::WRIST].to_pixel(WIN_W, WIN_H);
        draw_scene(&mut c, &Frame::new(vec![hand]), "L: PLAY", "R: -", "ok", false);

        assert_eq!(c.buf.len(), WIN_W * WIN_H);
        assert_eq!(c.pixel(wrist.0 as usize, wrist.1 as usize), Some(JOINT_COLOR));
        assert_eq!(c.pixel(LEFT_LABEL_POS.0, LEFT_LABEL_POS.1), Some(LEFT_COLOR));
    }

    #[test]
    fn unknown_glyph_falls_back() {
        assert_eq!(char_glyph('€'), [0, 0, 0b010, 0, 0]);
    }
}
