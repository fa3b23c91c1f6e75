// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::PathBuf;

/// Typed error for settings and processing folder resolution so callers can
/// tell a missing folder apart from a malformed config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("processing folder '{name}' does not exist in {}", .root.display())]
    MissingProcessingFolder {
        name: String,
        root: PathBuf,
        siblings: Vec<String>,
    },

    #[error("default_note {0} is outside the MIDI range 0-127")]
    DefaultNoteOutOfRange(u8),

    #[error("no audio file extensions configured")]
    NoExtensions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
