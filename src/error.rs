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

//! Errors raised while loading a script. All of them are fatal at startup.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown sequence '{0}'")]
    UnknownSequence(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),
}

impl ScriptError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ScriptError::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ScriptError::InvalidProgram(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
