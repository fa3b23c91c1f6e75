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
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::audio::{FrameCountError, FrameCounter};
use crate::notes::{self, extract_note, NoteError, NoteParser, UnmappedNote};
use crate::prefix::{common_prefix, strippable_prefix};

/// The note a sample plays back at its recorded pitch. Transposes are relative
/// to this.
pub const REFERENCE_NOTE: i32 = 60;

/// Frames per length unit and the scale applied to it when bucketing.
const BUCKET_FRAMES: f64 = 100_000.0;
const BUCKET_SCALE: f64 = 2.5;

/// Classifies a frame count into a coarse length bucket.
pub fn length_bucket(frame_count: u64) -> u64 {
    ((frame_count as f64 / BUCKET_FRAMES) * BUCKET_SCALE).floor() as u64
}

/// Which sample's frame count stands in for the whole folder when bucketing.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepresentativeLength {
    /// The last sample in enumeration order.
    #[default]
    Last,
    /// The first sample in enumeration order.
    First,
    /// The longest sample.
    Max,
}

impl RepresentativeLength {
    /// Folds the next sample's frame count into the current representative.
    pub fn select(self, current: Option<u64>, frame_count: u64) -> u64 {
        match (self, current) {
            (_, None) | (RepresentativeLength::Last, Some(_)) => frame_count,
            (RepresentativeLength::First, Some(current)) => current,
            (RepresentativeLength::Max, Some(current)) => current.max(frame_count),
        }
    }
}

/// An audio file found in a patch folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    name: String,
    path: PathBuf,
    frame_count: u64,
}

impl SampleFile {
    /// Reads the file's frame count.
    pub fn read(path: &Path, counter: &dyn FrameCounter) -> Result<SampleFile, FrameCountError> {
        Ok(SampleFile {
            name: file_name(path),
            path: path.to_path_buf(),
            frame_count: counter.frame_count(path)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
impl SampleFile {
    /// Creates a sample without touching the disk (test only).
    pub fn new(name: &str, frame_count: u64) -> SampleFile {
        SampleFile {
            name: name.to_string(),
            path: PathBuf::from(name),
            frame_count,
        }
    }
}

/// The upper end of the key range a zone covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeTop {
    /// Covers notes up to and including this one.
    Bounded(u8),
    /// Covers every note above the previous zone.
    OpenAbove,
}

/// One sample's assignment on the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    start_frame: u64,
    end_frame: u64,
    top_note: u8,
    transpose: i32,
    range_top: RangeTop,
    file_name: String,
}

impl Zone {
    /// Creates a zone spanning the whole sample, topped at the given note.
    pub fn new(sample: SampleFile, top_note: u8) -> Zone {
        Zone {
            start_frame: 0,
            end_frame: sample.frame_count,
            top_note,
            transpose: REFERENCE_NOTE - i32::from(top_note),
            range_top: RangeTop::Bounded(top_note),
            file_name: sample.name,
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn end_frame(&self) -> u64 {
        self.end_frame
    }

    pub fn top_note(&self) -> u8 {
        self.top_note
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    pub fn range_top(&self) -> RangeTop {
        self.range_top
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True for zero-length samples, which produce no sound.
    pub fn is_degenerate(&self) -> bool {
        self.end_frame <= self.start_frame
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top = match self.range_top {
            RangeTop::Bounded(note) => notes::note_name(note),
            RangeTop::OpenAbove => "open".to_string(),
        };
        write!(
            f,
            "{} (top: {}, transpose: {}, frames: {}-{})",
            self.file_name, top, self.transpose, self.start_frame, self.end_frame
        )
    }
}

/// Orders zones by ascending top note into the final keyboard split. The sort
/// is stable, so zones sharing a top note keep their input order, and only the
/// last zone is left open above.
pub fn sort_and_finalize(mut zones: Vec<Zone>) -> Vec<Zone> {
    zones.sort_by_key(Zone::top_note);

    let last = zones.len().saturating_sub(1);
    for (index, zone) in zones.iter_mut().enumerate() {
        zone.range_top = if index == last {
            RangeTop::OpenAbove
        } else {
            RangeTop::Bounded(zone.top_note)
        };
    }
    zones
}

/// A per-file failure while building a folder's zones.
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error(transparent)]
    FrameCount(#[from] FrameCountError),

    #[error("{file}: {source}")]
    Note {
        file: String,
        #[source]
        source: NoteError,
    },
}

/// The unsorted zones of a folder along with its representative length.
#[derive(Debug, Default)]
pub struct Ranges {
    zones: Vec<Zone>,
    representative_frames: Option<u64>,
    unmapped: Vec<String>,
}

impl Ranges {
    #[cfg(test)]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn into_zones(self) -> Vec<Zone> {
        self.zones
    }

    /// The frame count that classifies the folder. None if no sample was read.
    pub fn representative_frames(&self) -> Option<u64> {
        self.representative_frames
    }

    /// The folder's length bucket. None if no sample was read.
    pub fn bucket(&self) -> Option<u64> {
        self.representative_frames.map(length_bucket)
    }

    /// Samples left out because their names carry no note.
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }
}

/// Builds a zone for every sample in a folder.
pub struct RangeBuilder<'a> {
    counter: &'a dyn FrameCounter,
    parser: &'a dyn NoteParser,
    representative: RepresentativeLength,
    unmapped: UnmappedNote,
    default_note: u8,
}

impl<'a> RangeBuilder<'a> {
    pub fn new(
        counter: &'a dyn FrameCounter,
        parser: &'a dyn NoteParser,
        representative: RepresentativeLength,
        unmapped: UnmappedNote,
        default_note: u8,
    ) -> Self {
        RangeBuilder {
            counter,
            parser,
            representative,
            unmapped,
            default_note,
        }
    }

    /// Reads every file in order. A frame count failure fails the folder rather
    /// than leaving a hole in the split; note failures follow the unmapped note
    /// policy.
    pub fn build(&self, files: &[PathBuf]) -> Result<Ranges, RangeError> {
        let stems: Vec<String> = files.iter().map(|file| file_stem(file)).collect();
        let shared = common_prefix(&stems);
        let prefix = strippable_prefix(&shared);
        debug!(prefix, "Stripping common file name prefix");

        let mut ranges = Ranges::default();
        for path in files {
            let sample = SampleFile::read(path, self.counter)?;
            debug!(
                path = %sample.path().display(),
                frames = sample.frame_count(),
                "Read sample"
            );
            ranges.representative_frames = Some(
                self.representative
                    .select(ranges.representative_frames, sample.frame_count()),
            );

            let top_note = match extract_note(sample.name(), prefix, self.parser) {
                Ok(note) => note,
                Err(e) => match self.unmapped {
                    UnmappedNote::Skip => {
                        warn!(file = sample.name(), err = %e, "Leaving out sample with no note");
                        ranges.unmapped.push(sample.name().to_string());
                        continue;
                    }
                    UnmappedNote::Abort => {
                        return Err(RangeError::Note {
                            file: sample.name().to_string(),
                            source: e,
                        })
                    }
                    UnmappedNote::Default => {
                        warn!(
                            file = sample.name(),
                            note = self.default_note,
                            err = %e,
                            "Mapping sample with no note to the default note"
                        );
                        self.default_note
                    }
                },
            };

            let zone = Zone::new(sample, top_note);
            if zone.is_degenerate() {
                warn!(file = zone.file_name(), "Sample has no frames");
            }
            debug!(zone = %zone, "Built zone");
            ranges.zones.push(zone);
        }

        Ok(ranges)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
