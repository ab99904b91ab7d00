// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Core types for padcast scripts

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;
use std::time::Duration;

/// Set of concurrently pressed buttons, laid out as the pad's report bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Buttons(pub u16);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);
    pub const Y: Buttons = Buttons(0x0001);
    pub const B: Buttons = Buttons(0x0002);
    pub const A: Buttons = Buttons(0x0004);
    pub const X: Buttons = Buttons(0x0008);
    pub const L: Buttons = Buttons(0x0010);
    pub const R: Buttons = Buttons(0x0020);
    pub const ZL: Buttons = Buttons(0x0040);
    pub const ZR: Buttons = Buttons(0x0080);
    pub const MINUS: Buttons = Buttons(0x0100);
    pub const PLUS: Buttons = Buttons(0x0200);
    pub const LCLICK: Buttons = Buttons(0x0400);
    pub const RCLICK: Buttons = Buttons(0x0800);
    pub const HOME: Buttons = Buttons(0x1000);
    pub const CAPTURE: Buttons = Buttons(0x2000);

    // Order matters for display only
    pub const NAMED: [(&'static str, Buttons); 14] = [
        ("Y", Buttons::Y),
        ("B", Buttons::B),
        ("A", Buttons::A),
        ("X", Buttons::X),
        ("L", Buttons::L),
        ("R", Buttons::R),
        ("ZL", Buttons::ZL),
        ("ZR", Buttons::ZR),
        ("MINUS", Buttons::MINUS),
        ("PLUS", Buttons::PLUS),
        ("LCLICK", Buttons::LCLICK),
        ("RCLICK", Buttons::RCLICK),
        ("HOME", Buttons::HOME),
        ("CAPTURE", Buttons::CAPTURE),
    ];

    pub fn from_name(name: &str) -> Option<Buttons> {
        let upper = name.to_ascii_uppercase();
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, b)| *b)
    }

    pub fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    fn bitor_assign(&mut self, rhs: Buttons) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Display for Buttons {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(_, b)| self.contains(*b))
            .map(|(n, _)| *n)
            .collect();
        write!(f, "{}", names.join("+"))
    }
}

/// Analog stick position. Each axis runs 0..=255 with 128 at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stick {
    pub x: u8,
    pub y: u8,
}

impl Stick {
    pub const MIN: u8 = 0;
    pub const CENTER: u8 = 128;
    pub const MAX: u8 = 255;

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub const fn center() -> Self {
        Self::new(Self::CENTER, Self::CENTER)
    }
}

impl Default for Stick {
    fn default() -> Self {
        Self::center()
    }
}

/// Directional pad value, numbered clockwise from up as the report expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Hat {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    #[default]
    Center = 8,
}

impl Hat {
    pub fn from_name(name: &str) -> Option<Hat> {
        let hat = match name.to_ascii_lowercase().as_str() {
            "up" => Hat::Up,
            "up-right" => Hat::UpRight,
            "right" => Hat::Right,
            "down-right" => Hat::DownRight,
            "down" => Hat::Down,
            "down-left" => Hat::DownLeft,
            "left" => Hat::Left,
            "up-left" => Hat::UpLeft,
            "center" => Hat::Center,
            _ => return None,
        };
        Some(hat)
    }
}

/// One controller state, held for `duration` poll ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub buttons: Buttons,
    pub left: Stick,
    pub right: Stick,
    pub hat: Hat,
    pub duration: u32,
}

impl Frame {
    /// Buttons and left stick only; right stick and hat rest.
    pub const fn new(buttons: Buttons, left: Stick, duration: u32) -> Self {
        Self {
            buttons,
            left,
            right: Stick::center(),
            hat: Hat::Center,
            duration,
        }
    }

    pub const fn press(buttons: Buttons, duration: u32) -> Self {
        Self::new(buttons, Stick::center(), duration)
    }

    pub const fn wait(duration: u32) -> Self {
        Self::new(Buttons::NONE, Stick::center(), duration)
    }

    pub const fn tilt(x: u8, y: u8, duration: u32) -> Self {
        Self::new(Buttons::NONE, Stick::new(x, y), duration)
    }

    /// Everything at rest for a single tick.
    pub const fn neutral() -> Self {
        Self::wait(1)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Named, read-only list of frames. Cloning shares the frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub frames: Arc<[Frame]>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, frames: impl Into<Arc<[Frame]>>) -> Self {
        Self {
            name: name.into(),
            frames: frames.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Repeat target for a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Fixed(u32),
    // base + the program's rotating slot counter
    Slot { base: u32 },
}

impl Count {
    pub fn resolve(self, slot: u32) -> u32 {
        match self {
            Count::Fixed(n) => n,
            Count::Slot { base } => base.saturating_add(slot),
        }
    }
}

impl std::fmt::Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Fixed(n) => write!(f, "{}", n),
            Count::Slot { base } => write!(f, "slot+{}", base),
        }
    }
}

/// Repetition applied to a sequence when it runs as a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopSpec {
    #[default]
    Once,
    Full {
        count: Count,
    },
    // [0, start) once, [start, end) `count` times, [end, len) once
    Partial {
        start: usize,
        end: usize,
        count: Count,
    },
}

impl std::fmt::Display for LoopSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopSpec::Once => write!(f, "once"),
            LoopSpec::Full { count } => write!(f, "loop x{}", count),
            LoopSpec::Partial { start, end, count } => {
                write!(f, "loop {}..{} x{}", start, end, count)
            }
        }
    }
}

/// Where control goes once a phase completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Successor {
    #[default]
    Next,
    Goto(usize),
    // Jump back and rotate the slot counter modulo `slots`
    Wrap { to: usize, slots: u32 },
}

impl std::fmt::Display for Successor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Successor::Next => write!(f, "next"),
            Successor::Goto(i) => write!(f, "goto {}", i),
            Successor::Wrap { to, slots } => write!(f, "wrap to {} ({} slots)", to, slots),
        }
    }
}

/// A phase as authored: the sequence is referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpec {
    pub sequence: String,
    pub looping: LoopSpec,
    pub successor: Successor,
}

impl PhaseSpec {
    pub fn new(sequence: impl Into<String>, looping: LoopSpec, successor: Successor) -> Self {
        Self {
            sequence: sequence.into(),
            looping,
            successor,
        }
    }
}

/// A phase with its sequence resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub sequence: Sequence,
    pub looping: LoopSpec,
    pub successor: Successor,
}

/// Ordered, cyclic list of phases. Only built through [`Program::new`],
/// so every instance has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub(crate) phases: Vec<Phase>,
}

impl Program {
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    // Time between poll ticks
    pub poll_interval: Duration,
    // Jitter as a fraction (0.0 to 1.0) of poll_interval
    pub jitter: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(8), // 125 Hz
            jitter: 0.0,                             // No jitter
        }
    }
}

/// Playback settings a script may override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub poll_interval: Option<Duration>,
    pub jitter: Option<f64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut PlaybackConfig) {
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(jitter) = self.jitter {
            config.jitter = jitter;
        }
    }
}

/// Result of parsing a script file.
#[derive(Debug)]
pub struct Script {
    pub config: ConfigOverrides,
    pub sequences: Vec<Sequence>,
    pub phases: Vec<PhaseSpec>,
}
