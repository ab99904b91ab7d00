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

//! Destinations for the frames produced each poll tick

use anyhow::{Context, Result};
use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::Write;

use crate::report::InputReport;
use crate::sequencer::Tick;

/// Controller-facing channel the transport delivers to.
pub trait FrameSink {
    fn send(&mut self, tick: &Tick) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one hex-encoded input report per tick.
pub struct HexSink<W: Write> {
    writer: W,
}

impl<W: Write> HexSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for HexSink<W> {
    fn send(&mut self, tick: &Tick) -> Result<()> {
        let report = InputReport::encode(&tick.frame);
        writeln!(self.writer, "{}", report.to_hex()).context("Failed to write report")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush reports")
    }
}

/// Redraws a single status line on the terminal as frames change.
pub struct MonitorSink<W: Write> {
    out: W,
    ticks: u64,
}

impl<W: Write> MonitorSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, ticks: 0 }
    }
}

impl<W: Write> FrameSink for MonitorSink<W> {
    fn send(&mut self, tick: &Tick) -> Result<()> {
        self.ticks += 1;
        // Held frames look identical, skip the redraw
        if tick.held {
            return Ok(());
        }

        let frame = &tick.frame;
        let line = format!(
            "tick {:>8}  phase {:>2} step {:>3} loop {:>3} slot {}  [{:<12}] L({:>3},{:>3}) R({:>3},{:>3}) hat {:?} x{}",
            self.ticks,
            tick.phase,
            tick.step,
            tick.loop_count,
            tick.slot,
            frame.buttons.to_string(),
            frame.left.x,
            frame.left.y,
            frame.right.x,
            frame.right.y,
            frame.hat,
            frame.duration,
        );
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )
        .context("Failed to draw monitor line")?;
        self.out.flush().context("Failed to flush terminal")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        queue!(self.out, Print("\n")).context("Failed to draw monitor line")?;
        self.out.flush().context("Failed to flush terminal")
    }
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn send(&mut self, _tick: &Tick) -> Result<()> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn send(&mut self, tick: &Tick) -> Result<()> {
        (**self).send(tick)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Buttons, Frame};

    fn tick(frame: Frame, held: bool) -> Tick {
        Tick {
            frame,
            held,
            ..Tick::default()
        }
    }

    #[test]
    fn test_hex_sink_writes_one_line_per_tick() {
        let mut sink = HexSink::new(Vec::new());
        sink.send(&tick(Frame::press(Buttons::B, 2), false)).unwrap();
        sink.send(&tick(Frame::press(Buttons::B, 2), true)).unwrap();
        sink.finish().unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "02 00 08 80 80 80 80 00");
        assert_eq!(lines[0], lines[1]);
    }

    #[test]
    fn test_monitor_sink_skips_held_ticks() {
        let mut out = Vec::new();
        {
            let mut sink = MonitorSink::new(&mut out);
            sink.send(&tick(Frame::press(Buttons::A, 3), false)).unwrap();
            let drawn = sink.out.len();
            sink.send(&tick(Frame::press(Buttons::A, 3), true)).unwrap();
            assert_eq!(sink.out.len(), drawn);
            assert_eq!(sink.ticks, 2);
        }
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("[A"));
    }
}
