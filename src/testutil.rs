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
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes a silent 16-bit WAV file holding the given number of frames.
pub fn write_wav(path: &Path, channels: u16, frames: usize) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    for _ in 0..frames * usize::from(channels) {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Creates a patch folder holding mono samples with the given names and frame
/// counts.
pub fn write_patch_folder(dir: &Path, samples: &[(&str, usize)]) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    for (name, frames) in samples {
        write_wav(&dir.join(name), 1, *frames)?;
    }
    Ok(())
}
