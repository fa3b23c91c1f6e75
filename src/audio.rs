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
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

mod error;

pub use self::error::FrameCountError;

/// Reads the number of sample frames in an audio file.
pub trait FrameCounter {
    fn frame_count(&self, path: &Path) -> Result<u64, FrameCountError>;
}

/// Reads frame counts from container headers using symphonia. Nothing is
/// decoded, and the file is closed before returning.
pub struct SymphoniaFrameCounter;

impl FrameCounter for SymphoniaFrameCounter {
    fn frame_count(&self, path: &Path) -> Result<u64, FrameCountError> {
        let file = File::open(path).map_err(|source| FrameCountError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|source| FrameCountError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| FrameCountError::NoAudioTrack(path.to_path_buf()))?;

        track
            .codec_params
            .n_frames
            .ok_or_else(|| FrameCountError::UnknownLength(path.to_path_buf()))
    }
}

/// Returns true if the path has one of the given extensions, ignoring case.
pub fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Lists the audio files directly inside a folder, sorted by file name so that
/// runs are repeatable.
pub fn list_audio_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if is_audio_file(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
