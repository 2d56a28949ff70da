//! # dj_midi
//!
//! Fire-and-forget MIDI output for gesture-driven DJ control.
//!
//! * [`MidiMessage`] — the two message kinds the controller sends
//!   (note-on for triggers, control-change for continuous parameters).
//! * [`MidiOut`] — transport seam; [`MidirOut`] talks to a real port,
//!   [`RecordingOut`] keeps everything in memory.
//! * [`MidiEmitter`] — clamps values and sends on one fixed channel.
//!
//! There is no acknowledgment, retry or queuing.  A failed send is returned
//! to the caller as [`MidiError::Send`] and is expected to end the process.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dj_midi::{open_first_output, MidiEmitter};
//!
//! let out = open_first_output("gesture_dj").unwrap();
//! let mut emitter = MidiEmitter::new(out, 0);
//! emitter.send_note_on(60).unwrap();               // play deck A
//! emitter.send_control_change(1, 96.4).unwrap();   // volume → 96
//! ```

use midir::{MidiOutput, MidiOutputConnection};

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

/// Largest value a MIDI data byte can carry.
pub const DATA_MAX: u8 = 127;

/// Velocity used for every trigger note.
pub const TRIGGER_VELOCITY: u8 = 127;

const NOTE_ON:        u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;

// ════════════════════════════════════════════════════════════════════════════
// MidiError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init failed: {0}")]
    Init(String),
    #[error("no MIDI output ports found")]
    NoPorts,
    #[error("failed to connect to MIDI port {port}: {reason}")]
    Connect { port: String, reason: String },
    #[error("MIDI send failed: {0}")]
    Send(String),
}

// ════════════════════════════════════════════════════════════════════════════
// MidiMessage
// ════════════════════════════════════════════════════════════════════════════

/// A channel voice message as sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn        { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// Status byte followed by the two data bytes.
    ///
    /// The channel is masked to 4 bits and data bytes to 7 bits, so a
    /// malformed field can never produce a stray status byte.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                [NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange { channel, controller, value } =>
                [CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F],
        }
    }

    /// Decode a 3-byte note-on or control-change.  Anything else is `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let [status, a, b] = <[u8; 3]>::try_from(bytes).ok()?;
        let channel = status & 0x0F;
        match status & 0xF0 {
            NOTE_ON        => Some(MidiMessage::NoteOn { channel, note: a, velocity: b }),
            CONTROL_CHANGE => Some(MidiMessage::ControlChange { channel, controller: a, value: b }),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — transport abstraction
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can put raw MIDI bytes on a port.
pub trait MidiOut {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError>;
}

// ── midir backend ─────────────────────────────────────────────────────────

/// A live connection to a system MIDI output port.
pub struct MidirOut {
    conn:      MidiOutputConnection,
    port_name: String,
}

impl MidirOut {
    pub fn port_name(&self) -> &str { &self.port_name }
}

impl MidiOut for MidirOut {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.conn.send(bytes).map_err(|e| MidiError::Send(e.to_string()))
    }
}

// ── in-memory backend ─────────────────────────────────────────────────────

/// Records every message instead of sending it.
///
/// After [`RecordingOut::close`] every send fails, which mimics a port that
/// disappeared while the controller was running.
#[derive(Debug, Default)]
pub struct RecordingOut {
    sent:   Vec<Vec<u8>>,
    closed: bool,
}

impl RecordingOut {
    pub fn new() -> Self { Self::default() }

    pub fn close(&mut self) { self.closed = true; }

    /// Raw byte strings in send order.
    pub fn raw(&self) -> &[Vec<u8>] { &self.sent }

    /// Sent messages decoded back into [`MidiMessage`]s.
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.sent.iter().filter_map(|b| MidiMessage::from_bytes(b)).collect()
    }

    pub fn clear(&mut self) { self.sent.clear(); }
}

impl MidiOut for RecordingOut {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        if self.closed {
            return Err(MidiError::Send("port closed".to_string()));
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Port selection
// ════════════════════════════════════════════════════════════════════════════

/// Names of all MIDI output ports, in system enumeration order.
pub fn list_output_ports(client_name: &str) -> Result<Vec<String>, MidiError> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| MidiError::Init(e.to_string()))?;
    let names = midi_out.ports().iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    Ok(names)
}

/// Open the first MIDI output port the system reports.
///
/// Fails with [`MidiError::NoPorts`] when there is nothing to connect to;
/// on Linux a virtual port can be created with `modprobe snd-virmidi`, on
/// macOS with the IAC driver, on Windows with loopMIDI.
pub fn open_first_output(client_name: &str) -> Result<MidirOut, MidiError> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| MidiError::Init(e.to_string()))?;

    let ports = midi_out.ports();
    let port  = ports.first().ok_or(MidiError::NoPorts)?;
    let port_name = midi_out.port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());

    if ports.len() > 1 {
        log::debug!("{} MIDI output ports available, using the first", ports.len());
    }

    let conn = midi_out.connect(port, "gesture-dj-out")
        .map_err(|e| MidiError::Connect { port: port_name.clone(), reason: e.to_string() })?;

    log::info!("Connected MIDI: {}", port_name);
    Ok(MidirOut { conn, port_name })
}

// ════════════════════════════════════════════════════════════════════════════
// MidiEmitter
// ════════════════════════════════════════════════════════════════════════════

/// Sends control-change and note-on messages on one fixed channel.
pub struct MidiEmitter<O: MidiOut> {
    out:     O,
    channel: u8,
}

impl<O: MidiOut> MidiEmitter<O> {
    pub fn new(out: O, channel: u8) -> Self {
        MidiEmitter { out, channel: channel & 0x0F }
    }

    pub fn channel(&self) -> u8 { self.channel }

    pub fn output(&self) -> &O { &self.out }

    pub fn output_mut(&mut self) -> &mut O { &mut self.out }

    /// Clamp `value` to 0–127, truncate it, and send a control-change.
    pub fn send_control_change(&mut self, controller: u8, value: f32) -> Result<(), MidiError> {
        self.send(&MidiMessage::ControlChange {
            channel:    self.channel,
            controller,
            value:      clamp_data(value),
        })
    }

    /// Send a note-on at full velocity.
    pub fn send_note_on(&mut self, note: u8) -> Result<(), MidiError> {
        self.send(&MidiMessage::NoteOn {
            channel:  self.channel,
            note,
            velocity: TRIGGER_VELOCITY,
        })
    }

    pub fn send(&mut self, msg: &MidiMessage) -> Result<(), MidiError> {
        log::trace!("midi out {:?}", msg);
        self.out.send(&msg.to_bytes())
    }
}

/// Clamp to the 7-bit data range and truncate toward zero.  NaN maps to 0.
pub fn clamp_data(value: f32) -> u8 {
    if value.is_nan() { return 0; }
    value.clamp(0.0, DATA_MAX as f32) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
