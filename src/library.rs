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

//! Script library: named sequences plus the program built from them
//!
//! Everything here is checked once, when the library is built. The sequencer
//! relies on that and never re-checks indices during playback.

use tracing::debug;

use crate::error::{Result, ScriptError};
use crate::types::{
    Buttons, Count, Frame, LoopSpec, Phase, PhaseSpec, Program, Script, Sequence, Stick,
    Successor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLibrary {
    sequences: Vec<Sequence>,
    program: Program,
}

impl ScriptLibrary {
    /// Resolves every phase against `sequences` and validates the result.
    pub fn new(sequences: Vec<Sequence>, phases: Vec<PhaseSpec>) -> Result<Self> {
        for (i, sequence) in sequences.iter().enumerate() {
            if sequences[..i].iter().any(|s| s.name == sequence.name) {
                return Err(ScriptError::invalid(format!(
                    "sequence '{}' is defined more than once",
                    sequence.name
                )));
            }
        }

        let mut resolved = Vec::with_capacity(phases.len());
        for spec in phases {
            let sequence = find_sequence(&sequences, &spec.sequence)?.clone();
            resolved.push(Phase {
                sequence,
                looping: spec.looping,
                successor: spec.successor,
            });
        }
        let library = Self {
            sequences,
            program: Program::new(resolved)?,
        };

        debug!(
            sequences = library.sequences.len(),
            phases = library.program.len(),
            "script library loaded"
        );
        Ok(library)
    }

    pub fn get_sequence(&self, name: &str) -> Result<&Sequence> {
        find_sequence(&self.sequences, name)
    }

    pub fn get_program(&self) -> &Program {
        &self.program
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn into_program(self) -> Program {
        self.program
    }
}

fn find_sequence<'a>(sequences: &'a [Sequence], name: &str) -> Result<&'a Sequence> {
    sequences
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ScriptError::UnknownSequence(name.to_string()))
}

impl Program {
    /// Fails with `InvalidProgram` unless `phases` passes [`Program::validate`].
    pub fn new(phases: Vec<Phase>) -> Result<Self> {
        let program = Self { phases };
        program.validate()?;
        Ok(program)
    }

    /// Checks every structural invariant the sequencer depends on.
    ///
    /// Takes `&self`, so running it again on a valid program changes nothing.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(ScriptError::invalid("program has no phases"));
        }

        let last = self.phases.len() - 1;
        for (index, phase) in self.phases.iter().enumerate() {
            let name = &phase.sequence.name;
            let len = phase.sequence.len();

            if len == 0 {
                return Err(ScriptError::invalid(format!(
                    "phase {} uses empty sequence '{}'",
                    index, name
                )));
            }

            if let Some(step) = phase.sequence.frames.iter().position(|f| f.duration == 0) {
                return Err(ScriptError::invalid(format!(
                    "sequence '{}' step {} has zero duration",
                    name, step
                )));
            }

            match phase.looping {
                LoopSpec::Once => {}
                LoopSpec::Full { count } => check_count(index, count)?,
                LoopSpec::Partial { start, end, count } => {
                    if start >= end || end > len {
                        return Err(ScriptError::invalid(format!(
                            "phase {} loop range {}..{} is not within '{}' (length {})",
                            index, start, end, name, len
                        )));
                    }
                    check_count(index, count)?;
                }
            }

            match phase.successor {
                Successor::Next if index == last => {
                    return Err(ScriptError::invalid(format!(
                        "last phase {} has no successor to advance to",
                        index
                    )));
                }
                Successor::Next => {}
                Successor::Goto(to) | Successor::Wrap { to, .. } if to > last => {
                    return Err(ScriptError::invalid(format!(
                        "phase {} refers to missing phase {}",
                        index, to
                    )));
                }
                Successor::Wrap { slots: 0, .. } => {
                    return Err(ScriptError::invalid(format!(
                        "phase {} wraps with zero slots",
                        index
                    )));
                }
                Successor::Goto(_) | Successor::Wrap { .. } => {}
            }
        }
        Ok(())
    }
}

fn check_count(index: usize, count: Count) -> Result<()> {
    // Slot counts only grow from their base
    if count.resolve(0) == 0 {
        return Err(ScriptError::invalid(format!(
            "phase {} repeats zero times",
            index
        )));
    }
    Ok(())
}

impl Script {
    pub fn into_library(self) -> Result<ScriptLibrary> {
        ScriptLibrary::new(self.sequences, self.phases)
    }
}

const BUTTON_DURATION: u32 = 10;

/// The egg hatching automation.
///
/// Starts by syncing the controller, then repeatedly collects an egg from the
/// day-care lady, recalls to the front of the house and bikes up and down the
/// road. The number of menu steps taken inside `get_egg` grows with the slot
/// counter so each cycle deposits the egg into the next party slot.
pub fn builtin() -> Result<ScriptLibrary> {
    let press = |b: Buttons| Frame::press(b, BUTTON_DURATION);

    let sync_controller = Sequence::new(
        "sync_controller",
        vec![
            Frame::wait(75),
            press(Buttons::L | Buttons::R),
            Frame::wait(75),
            press(Buttons::L | Buttons::R),
            Frame::wait(75),
            press(Buttons::A),
            Frame::wait(75),
            press(Buttons::A),
        ],
    );

    let recall = Sequence::new(
        "recall",
        vec![
            Frame::wait(75),
            press(Buttons::X),
            Frame::wait(75),
            press(Buttons::A),
            // Wait for the map
            Frame::wait(300),
            Frame::tilt(170, Stick::CENTER, 25),
            Frame::wait(75),
            press(Buttons::A),
            Frame::wait(75),
            press(Buttons::A),
            // Wait for the recall to finish
            Frame::wait(300),
        ],
    );

    let bike_big = Sequence::new(
        "bike_big",
        vec![
            Frame::tilt(Stick::MAX, Stick::CENTER, 75),
            Frame::new(Buttons::B, Stick::new(Stick::MAX, Stick::CENTER), BUTTON_DURATION),
        ],
    );

    let bike = Sequence::new("bike", vec![Frame::tilt(Stick::MAX, Stick::CENTER, 100)]);

    let break_egg = Sequence::new("break_egg", vec![Frame::wait(75), press(Buttons::B)]);

    // A-A-B-A-B ends the conversation cleanly whether or not an egg is waiting
    let get_egg = Sequence::new(
        "get_egg",
        vec![
            Frame::wait(300),
            press(Buttons::PLUS),
            Frame::tilt(Stick::MIN, Stick::MIN, 300),
            press(Buttons::A),
            Frame::wait(75),
            press(Buttons::A),
            // New egg jingle
            Frame::wait(600),
            press(Buttons::B),
            Frame::wait(200),
            press(Buttons::A),
            Frame::wait(75),
            press(Buttons::B),
            Frame::wait(300),
            // Party menu cursor down, repeated once per slot
            Frame::tilt(Stick::CENTER, Stick::MAX, 25),
            Frame::wait(75),
            press(Buttons::A),
            Frame::wait(300),
            press(Buttons::A),
            Frame::wait(200),
            press(Buttons::A),
            Frame::wait(200),
            // Back on the bike
            press(Buttons::PLUS),
        ],
    );

    let phases = vec![
        PhaseSpec::new("sync_controller", LoopSpec::Once, Successor::Next),
        PhaseSpec::new(
            "get_egg",
            LoopSpec::Partial {
                start: 13,
                end: 15,
                count: Count::Slot { base: 1 },
            },
            Successor::Next,
        ),
        // Avoids the old man on the bridge
        PhaseSpec::new("recall", LoopSpec::Once, Successor::Next),
        PhaseSpec::new(
            "bike_big",
            LoopSpec::Full {
                count: Count::Fixed(55),
            },
            Successor::Next,
        ),
        PhaseSpec::new("recall", LoopSpec::Once, Successor::Wrap { to: 1, slots: 5 }),
    ];

    ScriptLibrary::new(
        vec![sync_controller, get_egg, recall, bike_big, bike, break_egg],
        phases,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(name: &str, len: usize) -> Sequence {
        Sequence::new(name, vec![Frame::wait(1); len])
    }

    fn once(name: &str, successor: Successor) -> PhaseSpec {
        PhaseSpec::new(name, LoopSpec::Once, successor)
    }

    fn expect_invalid<T: std::fmt::Debug>(result: Result<T>) {
        match result {
            Err(ScriptError::InvalidProgram(_)) => {}
            other => panic!("Expected InvalidProgram, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_is_valid() {
        let library = builtin().unwrap();
        let program = library.get_program();
        assert_eq!(program.len(), 5);
        assert_eq!(library.get_sequence("get_egg").unwrap().len(), 22);
        assert_eq!(library.get_sequence("sync_controller").unwrap().len(), 8);
        assert_eq!(library.get_sequence("recall").unwrap().len(), 11);
        assert_eq!(library.sequences().len(), 6);
        assert_eq!(
            program.phases()[4].successor,
            Successor::Wrap { to: 1, slots: 5 }
        );
    }

    #[test]
    fn test_unknown_sequence() {
        let library = builtin().unwrap();
        assert_eq!(
            library.get_sequence("catch_shiny"),
            Err(ScriptError::UnknownSequence("catch_shiny".to_string()))
        );

        let result = ScriptLibrary::new(
            vec![seq("a", 1)],
            vec![once("b", Successor::Goto(0))],
        );
        assert_eq!(
            result,
            Err(ScriptError::UnknownSequence("b".to_string()))
        );
    }

    #[test]
    fn test_partial_range_rejected() {
        for (start, end) in [(2, 2), (3, 2), (0, 5)] {
            let result = ScriptLibrary::new(
                vec![seq("a", 4)],
                vec![PhaseSpec::new(
                    "a",
                    LoopSpec::Partial {
                        start,
                        end,
                        count: Count::Fixed(2),
                    },
                    Successor::Goto(0),
                )],
            );
            expect_invalid(result);
        }
    }

    #[test]
    fn test_partial_range_at_end_accepted() {
        let result = ScriptLibrary::new(
            vec![seq("a", 4)],
            vec![PhaseSpec::new(
                "a",
                LoopSpec::Partial {
                    start: 0,
                    end: 4,
                    count: Count::Fixed(2),
                },
                Successor::Goto(0),
            )],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_dangling_successors_rejected() {
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 1)],
            vec![once("a", Successor::Next)],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 1)],
            vec![once("a", Successor::Goto(1))],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 1)],
            vec![once("a", Successor::Wrap { to: 3, slots: 2 })],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 1)],
            vec![once("a", Successor::Wrap { to: 0, slots: 0 })],
        ));
    }

    #[test]
    fn test_degenerate_programs_rejected() {
        expect_invalid(ScriptLibrary::new(vec![seq("a", 1)], vec![]));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 0)],
            vec![once("a", Successor::Goto(0))],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![Sequence::new("a", vec![Frame::wait(0)])],
            vec![once("a", Successor::Goto(0))],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 1), seq("a", 2)],
            vec![once("a", Successor::Goto(0))],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 2)],
            vec![PhaseSpec::new(
                "a",
                LoopSpec::Full {
                    count: Count::Fixed(0),
                },
                Successor::Goto(0),
            )],
        ));
        expect_invalid(ScriptLibrary::new(
            vec![seq("a", 2)],
            vec![PhaseSpec::new(
                "a",
                LoopSpec::Full {
                    count: Count::Slot { base: 0 },
                },
                Successor::Goto(0),
            )],
        ));
    }

    #[test]
    fn test_revalidation_is_a_no_op() {
        let library = builtin().unwrap();
        let before = library.clone();
        for _ in 0..3 {
            assert!(library.get_program().validate().is_ok());
        }
        assert_eq!(library, before);
    }

    #[test]
    fn test_program_new_rejects_zero_slot_wrap() {
        let phase = Phase {
            sequence: Sequence::new("a", vec![Frame::wait(1)]),
            looping: LoopSpec::Once,
            successor: Successor::Wrap { to: 0, slots: 0 },
        };
        expect_invalid(Program::new(vec![phase.clone()]));

        let phase = Phase {
            successor: Successor::Wrap { to: 0, slots: 1 },
            ..phase
        };
        let program = Program::new(vec![phase]).unwrap();
        assert_eq!(program.phases().len(), 1);
    }
}
