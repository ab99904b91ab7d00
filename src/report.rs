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

//! HID input report layout for the pad
//!
//! Eight bytes: button mask (little-endian u16), hat, LX, LY, RX, RY and a
//! vendor byte that is always zero.

use crate::types::Frame;

pub const REPORT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport([u8; REPORT_LEN]);

impl InputReport {
    pub fn encode(frame: &Frame) -> Self {
        let [lo, hi] = frame.buttons.0.to_le_bytes();
        Self([
            lo,
            hi,
            frame.hat as u8,
            frame.left.x,
            frame.left.y,
            frame.right.x,
            frame.right.y,
            0,
        ])
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&Frame> for InputReport {
    fn from(frame: &Frame) -> Self {
        Self::encode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Buttons, Hat, Stick};

    #[test]
    fn test_neutral_report() {
        let report = InputReport::encode(&Frame::neutral());
        assert_eq!(report.as_bytes(), &[0, 0, 8, 128, 128, 128, 128, 0]);
    }

    #[test]
    fn test_button_bytes_little_endian() {
        let report = InputReport::encode(&Frame::press(Buttons::A | Buttons::PLUS, 10));
        assert_eq!(report.as_bytes()[0], 0x04);
        assert_eq!(report.as_bytes()[1], 0x02);
    }

    #[test]
    fn test_sticks_and_hat() {
        let frame = Frame {
            buttons: Buttons::NONE,
            left: Stick::new(Stick::MAX, Stick::MIN),
            right: Stick::new(10, 20),
            hat: Hat::Left,
            duration: 1,
        };
        let report = InputReport::from(&frame);
        assert_eq!(report.to_hex(), "00 00 06 ff 00 0a 14 00");
    }
}
