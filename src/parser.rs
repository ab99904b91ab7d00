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

//! Script parser for padcast files
//!
//! Parses scripts with the format:
//! - @ directives (poll, jitter, sequence, phase, goto, wrap)
//! - # comments
//! - $ frame lines, belonging to the most recent sequence

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alphanumeric1, char, space0, space1},
    combinator::{map, map_opt, opt, value},
    multi::separated_list1,
};
use std::time::Duration;

use crate::error::{Result, ScriptError};
use crate::types::{
    Buttons, ConfigOverrides, Count, Frame, Hat, LoopSpec, PhaseSpec, Script, Sequence, Stick,
    Successor,
};

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Poll(Duration),
    Jitter(f64),
    Sequence(String),
    Frame(Frame),
    Phase {
        sequence: String,
        count: Option<Count>,
        range: Option<(usize, usize)>,
    },
    Then(Successor),
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

fn parse_index(input: &str) -> IResult<&str, usize> {
    map(nom::character::complete::u32, |n| n as usize).parse(input)
}

fn directive<'a>(name: &'static str, input: &'a str) -> IResult<&'a str, &'a str> {
    let (input, _) = tag("@")(input)?;
    let (input, _) = space0(input)?;
    tag(name)(input)
}

fn parse_poll(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("poll:", input)?;
    let (input, millis) = nom::character::complete::u64(input)?;
    Ok((input, Line::Poll(Duration::from_millis(millis))))
}

fn parse_jitter(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("jitter:", input)?;
    let (input, value) = nom::number::complete::double(input)?;
    Ok((input, Line::Jitter(value)))
}

fn parse_sequence(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("sequence:", input)?;
    let (input, name) = parse_name(input)?;
    Ok((input, Line::Sequence(name.to_string())))
}

fn parse_count(input: &str) -> IResult<&str, Count> {
    alt((
        map(
            (tag("slot+"), nom::character::complete::u32),
            |(_, base)| Count::Slot { base },
        ),
        map(nom::character::complete::u32, Count::Fixed),
    ))
    .parse(input)
}

fn parse_loop(input: &str) -> IResult<&str, Count> {
    let (input, _) = space1(input)?;
    let (input, _) = tag("loop:")(input)?;
    parse_count(input)
}

fn parse_range(input: &str) -> IResult<&str, (usize, usize)> {
    let (input, _) = space1(input)?;
    let (input, _) = tag("range:")(input)?;
    let (input, start) = parse_index(input)?;
    let (input, _) = tag("..")(input)?;
    let (input, end) = parse_index(input)?;
    Ok((input, (start, end)))
}

fn parse_phase(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("phase:", input)?;
    let (input, name) = parse_name(input)?;
    let (input, count) = opt(parse_loop).parse(input)?;
    let (input, range) = opt(parse_range).parse(input)?;
    Ok((
        input,
        Line::Phase {
            sequence: name.to_string(),
            count,
            range,
        },
    ))
}

fn parse_goto(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("goto:", input)?;
    let (input, to) = parse_index(input)?;
    Ok((input, Line::Then(Successor::Goto(to))))
}

fn parse_wrap(input: &str) -> IResult<&str, Line> {
    let (input, _) = directive("wrap:", input)?;
    let (input, to) = parse_index(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("slots:")(input)?;
    let (input, slots) = nom::character::complete::u32(input)?;
    Ok((input, Line::Then(Successor::Wrap { to, slots })))
}

fn parse_directive(input: &str) -> IResult<&str, Line> {
    alt((
        parse_poll,
        parse_jitter,
        parse_sequence,
        parse_phase,
        parse_goto,
        parse_wrap,
    ))
    .parse(input)
}

fn parse_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char('#')(input)?;
    let (input, _) = nom::character::complete::not_line_ending(input)?;
    Ok((input, ()))
}

fn parse_buttons(input: &str) -> IResult<&str, Buttons> {
    alt((
        value(Buttons::NONE, char('-')),
        map(
            separated_list1(char('+'), map_opt(alphanumeric1, Buttons::from_name)),
            |buttons| buttons.into_iter().fold(Buttons::NONE, |acc, b| acc | b),
        ),
    ))
    .parse(input)
}

fn parse_axis(input: &str) -> IResult<&str, u8> {
    alt((
        value(Stick::MIN, tag("min")),
        value(Stick::CENTER, tag("center")),
        value(Stick::MAX, tag("max")),
        nom::character::complete::u8,
    ))
    .parse(input)
}

fn parse_stick<'a>(key: &'static str, input: &'a str) -> IResult<&'a str, Stick> {
    let (input, _) = space1(input)?;
    let (input, _) = tag(key)(input)?;
    let (input, x) = parse_axis(input)?;
    let (input, _) = char(',')(input)?;
    let (input, y) = parse_axis(input)?;
    Ok((input, Stick::new(x, y)))
}

fn parse_hat(input: &str) -> IResult<&str, Hat> {
    let (input, _) = space1(input)?;
    let (input, _) = tag("hat:")(input)?;
    map_opt(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '-'),
        Hat::from_name,
    )
    .parse(input)
}

fn parse_frame(input: &str) -> IResult<&str, Line> {
    let (input, _) = char('$')(input)?;
    let (input, _) = space0(input)?;
    let (input, buttons) = parse_buttons(input)?;
    let (input, left) = opt(|i| parse_stick("ls:", i)).parse(input)?;
    let (input, right) = opt(|i| parse_stick("rs:", i)).parse(input)?;
    let (input, hat) = opt(parse_hat).parse(input)?;
    let (input, _) = space1(input)?;
    let (input, duration) = nom::character::complete::u32(input)?;

    Ok((
        input,
        Line::Frame(Frame {
            buttons,
            left: left.unwrap_or_default(),
            right: right.unwrap_or_default(),
            hat: hat.unwrap_or_default(),
            duration,
        }),
    ))
}

fn parse_line(input: &str) -> IResult<&str, Option<Line>> {
    alt((
        map(parse_directive, Some),
        value(None, parse_comment),
        map(parse_frame, Some),
    ))
    .parse(input)
}

fn phase_looping(
    line: usize,
    count: Option<Count>,
    range: Option<(usize, usize)>,
) -> Result<LoopSpec> {
    match (count, range) {
        (None, None) => Ok(LoopSpec::Once),
        (Some(count), None) => Ok(LoopSpec::Full { count }),
        (Some(count), Some((start, end))) => Ok(LoopSpec::Partial { start, end, count }),
        (None, Some(_)) => Err(ScriptError::parse(line, "range: requires a loop: count")),
    }
}

pub fn parse_script(input: &str) -> Result<Script> {
    let mut config = ConfigOverrides::default();
    let mut sequences: Vec<(String, Vec<Frame>)> = Vec::new();
    let mut phases: Vec<PhaseSpec> = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let line_num = line_num + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let parsed = match parse_line(trimmed) {
            Ok((remaining, parsed)) => {
                let rest = remaining.trim();
                if !rest.is_empty() && !rest.starts_with('#') {
                    return Err(ScriptError::parse(
                        line_num,
                        format!("Unexpected text after command: '{}'", rest),
                    ));
                }
                parsed
            }
            Err(e) => {
                return Err(ScriptError::parse(line_num, format!("Parse error: {}", e)));
            }
        };

        match parsed {
            None => {}
            Some(Line::Poll(interval)) => config.poll_interval = Some(interval),
            Some(Line::Jitter(jitter)) => {
                if !(0.0..=1.0).contains(&jitter) {
                    return Err(ScriptError::parse(
                        line_num,
                        format!("Jitter {} is outside 0.0..=1.0", jitter),
                    ));
                }
                config.jitter = Some(jitter);
            }
            Some(Line::Sequence(name)) => sequences.push((name, Vec::new())),
            Some(Line::Frame(frame)) => match sequences.last_mut() {
                Some((_, frames)) => frames.push(frame),
                None => {
                    return Err(ScriptError::parse(
                        line_num,
                        "Frame appears before any @ sequence",
                    ));
                }
            },
            Some(Line::Phase {
                sequence,
                count,
                range,
            }) => {
                let looping = phase_looping(line_num, count, range)?;
                phases.push(PhaseSpec::new(sequence, looping, Successor::Next));
            }
            Some(Line::Then(successor)) => match phases.last_mut() {
                Some(phase) => phase.successor = successor,
                None => {
                    return Err(ScriptError::parse(
                        line_num,
                        "Successor appears before any @ phase",
                    ));
                }
            },
        }
    }

    Ok(Script {
        config,
        sequences: sequences
            .into_iter()
            .map(|(name, frames)| Sequence::new(name, frames))
            .collect(),
        phases,
    })
}
