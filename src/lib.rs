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

//! Scripted playback of controller input
//!
//! A script is a library of timed frame sequences and a cyclic program of
//! phases built from them. The sequencer turns that program into one frame
//! per poll tick; the transport drives it at a fixed cadence.

pub mod error;
pub mod library;
pub mod logging;
pub mod parser;
pub mod report;
pub mod sequencer;
pub mod sink;
pub mod transport;
pub mod types;

pub use error::ScriptError;
pub use library::{ScriptLibrary, builtin};
pub use parser::parse_script;
pub use report::InputReport;
pub use sequencer::{EngineState, Sequencer, Tick, next_frame, next_tick};
pub use transport::Transport;
pub use types::{
    Buttons, Count, Frame, Hat, LoopSpec, Phase, PhaseSpec, PlaybackConfig, Program, Sequence,
    Stick, Successor,
};
