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

//! Sequencer engine
//!
//! Turns a validated program into one frame per poll tick. A frame with
//! duration D is emitted once and then echoed D - 1 times before the step
//! cursor moves on.

use tracing::debug;

use crate::types::{Frame, LoopSpec, Program, Successor};

/// Mutable playback position. Only [`next_tick`] changes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    phase: usize,
    step: usize,
    loop_count: u32,
    echoes: u32,
    slot: u32,
    // Most recent fresh tick, replayed while echoes remain
    last: Tick,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn echoes(&self) -> u32 {
        self.echoes
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn last_frame(&self) -> &Frame {
        &self.last.frame
    }

    pub fn is_holding(&self) -> bool {
        self.echoes > 0
    }
}

/// What one poll tick produced, and where in the program it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    pub frame: Frame,
    pub phase: usize,
    pub step: usize,
    pub loop_count: u32,
    pub slot: u32,
    // Replay of the previous frame rather than a fresh step
    pub held: bool,
}

/// Produces the next frame and advances `state`.
pub fn next_frame(program: &Program, state: &mut EngineState) -> Frame {
    next_tick(program, state).frame
}

/// Like [`next_frame`], but also reports the cursor the frame came from.
///
/// `program` must have passed [`Program::validate`]; indices are trusted.
pub fn next_tick(program: &Program, state: &mut EngineState) -> Tick {
    if state.echoes > 0 {
        state.echoes -= 1;
        return Tick {
            held: true,
            ..state.last
        };
    }

    let phase = &program.phases[state.phase];
    let frames = &phase.sequence.frames;
    debug_assert!(state.step < frames.len(), "step cursor out of range");

    let step = frames[state.step];
    let tick = Tick {
        frame: step,
        phase: state.phase,
        step: state.step,
        loop_count: state.loop_count,
        slot: state.slot,
        held: false,
    };
    state.echoes = step.duration.saturating_sub(1);

    if advance(phase.looping, frames.len(), state) {
        complete_phase(program, state);
    }

    state.last = tick;
    tick
}

/// Moves the step cursor. Returns true when the phase has finished.
fn advance(looping: LoopSpec, len: usize, state: &mut EngineState) -> bool {
    state.step += 1;
    match looping {
        LoopSpec::Once => {
            if state.step >= len {
                state.step = 0;
                return true;
            }
        }
        LoopSpec::Full { count } => {
            if state.step >= len {
                state.step = 0;
                state.loop_count += 1;
                if state.loop_count >= count.resolve(state.slot) {
                    state.loop_count = 0;
                    return true;
                }
            }
        }
        LoopSpec::Partial { start, end, count } => {
            if state.step == end && state.loop_count + 1 < count.resolve(state.slot) {
                state.step = start;
                state.loop_count += 1;
            }
            if state.step >= len {
                state.step = 0;
                state.loop_count = 0;
                return true;
            }
        }
    }
    false
}

fn complete_phase(program: &Program, state: &mut EngineState) {
    let from = state.phase;
    match program.phases[from].successor {
        Successor::Next => state.phase = from + 1,
        Successor::Goto(to) => state.phase = to,
        Successor::Wrap { to, slots } => {
            state.phase = to;
            state.slot = (state.slot + 1) % slots;
            debug!(from, to, slot = state.slot, "program wrapped");
        }
    }
    state.step = 0;
    state.loop_count = 0;
    debug!(
        from,
        to = state.phase,
        sequence = %program.phases[state.phase].sequence.name,
        "phase complete"
    );
}

/// A program together with its playback state.
#[derive(Debug, Clone)]
pub struct Sequencer {
    program: Program,
    state: EngineState,
}

impl Sequencer {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            state: EngineState::new(),
        }
    }

    pub fn next_frame(&mut self) -> Frame {
        next_frame(&self.program, &mut self.state)
    }

    pub fn next_tick(&mut self) -> Tick {
        next_tick(&self.program, &mut self.state)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }
}
