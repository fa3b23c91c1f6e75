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
use std::collections::BTreeMap;
use std::fmt;

use crate::pipeline::FolderOutcome;

/// Counts of what happened to each folder in a run, and how many folders fell
/// into each length bucket. Kept per run and passed around explicitly so that
/// runs over different folders can be merged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    buckets: BTreeMap<u64, usize>,
    emitted: usize,
    skipped: usize,
    empty: usize,
    unmapped: usize,
    deleted: usize,
    failed: Vec<String>,
}

impl RunStats {
    /// Records a folder that was processed to completion.
    pub fn record(&mut self, outcome: &FolderOutcome) {
        match outcome {
            FolderOutcome::Emitted { bucket, .. } => {
                *self.buckets.entry(*bucket).or_default() += 1;
                self.emitted += 1;
            }
            FolderOutcome::Skipped { bucket, deleted } => {
                *self.buckets.entry(*bucket).or_default() += 1;
                self.skipped += 1;
                if *deleted {
                    self.deleted += 1;
                }
            }
            FolderOutcome::Unmapped { bucket } => {
                *self.buckets.entry(*bucket).or_default() += 1;
                self.unmapped += 1;
            }
            FolderOutcome::Empty => self.empty += 1,
        }
    }

    /// Records a folder that failed part way through.
    pub fn record_failure(&mut self, folder: &str) {
        self.failed.push(folder.to_string());
    }

    /// Merge another run's statistics into this one.
    pub fn merge(&mut self, other: RunStats) {
        for (bucket, count) in other.buckets {
            *self.buckets.entry(bucket).or_default() += count;
        }
        self.emitted += other.emitted;
        self.skipped += other.skipped;
        self.empty += other.empty;
        self.unmapped += other.unmapped;
        self.deleted += other.deleted;
        self.failed.extend(other.failed);
    }
}

#[cfg(test)]
impl RunStats {
    /// Folder counts per length bucket.
    pub fn buckets(&self) -> &BTreeMap<u64, usize> {
        &self.buckets
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn empty(&self) -> usize {
        self.empty
    }

    pub fn unmapped(&self) -> usize {
        self.unmapped
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Length buckets:")?;
        if self.buckets.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for (bucket, count) in &self.buckets {
            writeln!(f, "  {:>3}: {} folder(s)", bucket, count)?;
        }
        write!(
            f,
            "Emitted: {}, skipped: {}, empty: {}, failed: {}",
            self.emitted,
            self.skipped,
            self.empty,
            self.failed.len()
        )?;
        if self.unmapped > 0 {
            write!(f, "\nFolders without mapped samples: {}", self.unmapped)?;
        }
        if self.deleted > 0 {
            write!(f, "\nDeleted skipped folders: {}", self.deleted)?;
        }
        if !self.failed.is_empty() {
            write!(f, "\nFailed folders: {}", self.failed.join(", "))?;
        }
        Ok(())
    }
}
