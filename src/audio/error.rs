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

/// Raised when a sample's frame count can't be read from its container.
#[derive(Debug, thiserror::Error)]
pub enum FrameCountError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: unreadable audio container: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },

    #[error("{}: no audio track found", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("{}: container does not report a frame count", .0.display())]
    UnknownLength(PathBuf),
}
