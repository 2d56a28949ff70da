//! # gesture_dj
//!
//! Hand-landmark gesture controller for DJ software.  Each frame's hands are
//! classified into a fixed set of poses and turned into MIDI note-on and
//! control-change messages, with the left and right hand driving separate
//! decks.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Label | Left deck | Right deck |
//! |---|---|---|---|
//! | Fist | `NULL` | — | — |
//! | Open palm, thumb out | `PLAY` | note 60 | note 70 |
//! | Thumb + pinky | `VOLUME` | CC 1 | CC 11 |
//! | Pinky only | `LOW EQ` | CC 2 | CC 12 |
//! | Index only | `MID EQ` | CC 3 | CC 13 |
//! | Index + middle | `HIGH EQ` | CC 4 | CC 14 |
//!
//! Control values follow wrist height: top of frame = 127, bottom = 0.
//! PLAY fires at most once per 0.6 s per hand.
//!
//! ## Landmark sources
//!
//! * (default) — **Simulation mode**: keyboard keys pose two virtual hands.
//! * `--stdin` / `--detector <CMD>` — JSON-lines frames from an external
//!   hand tracker (see [`source`]).
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `1`–`6` | Left hand: fist, palm, pinky, thumb+pinky, index, index+middle |
//! | `Z` `X` `C` `V` `B` `N` | Right hand: same poses |
//! | `W` / `S` | Raise / lower left hand |
//! | `Up` / `Down` | Raise / lower right hand |
//! | `0` / `M` | Hide left / right hand |
//! | `Q` | Quit |

pub mod landmark;
pub mod classifier;
pub mod source;
pub mod visualizer;
pub mod app;
