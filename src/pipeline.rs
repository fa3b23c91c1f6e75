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
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::audio::{self, FrameCounter};
use crate::config::Settings;
use crate::envelope::ReleasePolicy;
use crate::notes::NoteParser;
use crate::patch::{DeploymentPath, Patch, Template, TemplateError};
use crate::stats::RunStats;
use crate::util;
use crate::zones::{sort_and_finalize, RangeBuilder, RangeError};

/// Errors that stop a single folder, or the run when listing the processing
/// folder itself fails.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{}: {source}", .folder.display())]
    List {
        folder: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{folder}: {source}")]
    Ranges {
        folder: String,
        #[source]
        source: RangeError,
    },

    #[error("{folder}: {source}")]
    Assemble {
        folder: String,
        #[source]
        source: TemplateError,
    },

    #[error("{}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("deleting {}: {source}", .folder.display())]
    Cleanup {
        folder: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What became of a folder that was processed to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    /// A patch document was written.
    Emitted { bucket: u64 },
    /// The folder didn't pass the length gate.
    Skipped { bucket: u64, deleted: bool },
    /// The folder passed the length gate but none of its samples had a note.
    /// Never deleted.
    Unmapped { bucket: u64 },
    /// The folder held no audio files.
    Empty,
}

/// Only folders whose length bucket is strictly above the minimum are emitted.
pub fn passes_gate(bucket: u64, min_bucket: u64) -> bool {
    bucket > min_bucket
}

/// Turns each subfolder of a processing folder into a patch document. Folders
/// are handled one at a time, and each file within a folder in name order, so
/// that the folder's length bucket is repeatable.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    template: &'a Template,
    counter: &'a dyn FrameCounter,
    parser: Box<dyn NoteParser>,
    release: ReleasePolicy,
    target_folder: &'a str,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        template: &'a Template,
        counter: &'a dyn FrameCounter,
        target_folder: &'a str,
    ) -> Self {
        Pipeline {
            settings,
            template,
            counter,
            parser: settings.note_convention().parser(),
            release: ReleasePolicy::new(settings.release()),
            target_folder,
        }
    }

    /// Processes every patch folder. A failing folder is logged and counted, and
    /// the run moves on to the next one.
    pub fn run(&self, processing_dir: &Path) -> Result<RunStats, PipelineError> {
        let output_dir = self.settings.output_dir();
        if !output_dir.is_dir() {
            info!(dir = %output_dir.display(), "Creating output directory");
            fs::create_dir_all(&output_dir).map_err(|source| PipelineError::Write {
                path: output_dir.clone(),
                source,
            })?;
        }

        let mut stats = RunStats::default();
        for folder in patch_folders(processing_dir)? {
            stats.merge(self.folder_stats(&folder));
        }

        Ok(stats)
    }

    /// Processes one folder and reports it as a run of its own.
    fn folder_stats(&self, folder: &Path) -> RunStats {
        let mut stats = RunStats::default();
        match self.process_folder(folder) {
            Ok(outcome) => stats.record(&outcome),
            Err(e) => {
                let name = util::filename_display(folder);
                error!(folder = name, err = %e, "Failed to build patch");
                stats.record_failure(name);
            }
        }
        stats
    }

    /// Builds, gates and writes the patch for a single folder.
    pub fn process_folder(&self, folder: &Path) -> Result<FolderOutcome, PipelineError> {
        let name = util::filename_display(folder);
        let files = audio::list_audio_files(folder, self.settings.extensions()).map_err(|source| {
            PipelineError::List {
                folder: folder.to_path_buf(),
                source,
            }
        })?;
        if files.is_empty() {
            warn!(folder = name, "No audio files found");
            return Ok(FolderOutcome::Empty);
        }

        let builder = RangeBuilder::new(
            self.counter,
            self.parser.as_ref(),
            self.settings.representative_length(),
            self.settings.unmapped_note(),
            self.settings.default_note(),
        );
        let ranges = builder
            .build(&files)
            .map_err(|source| PipelineError::Ranges {
                folder: name.to_string(),
                source,
            })?;
        if !ranges.unmapped().is_empty() {
            warn!(
                folder = name,
                samples = ?ranges.unmapped(),
                "Samples without a note were left out of the patch"
            );
        }
        let bucket = ranges.bucket().unwrap_or_default();
        debug!(
            folder = name,
            frames = ?ranges.representative_frames(),
            bucket,
            "Classified folder length"
        );
        let patch = Patch::new(
            name,
            sort_and_finalize(ranges.into_zones()),
            self.release.release_for(name).clone(),
        );

        if !passes_gate(bucket, self.settings.min_bucket()) {
            info!(
                folder = name,
                bucket,
                min_bucket = self.settings.min_bucket(),
                "Skipping patch below the length gate"
            );
            let deleted = self.settings.delete_skipped() && delete_folder(folder);
            return Ok(FolderOutcome::Skipped { bucket, deleted });
        }
        if patch.zones().is_empty() {
            warn!(folder = name, bucket, "Skipping patch with no mapped samples");
            return Ok(FolderOutcome::Unmapped { bucket });
        }

        let document = self.emit(&patch)?;
        info!(
            folder = name,
            bucket,
            zones = patch.zones().len(),
            release = %patch.release(),
            document = %document.display(),
            "Wrote patch"
        );
        Ok(FolderOutcome::Emitted { bucket })
    }

    fn emit(&self, patch: &Patch) -> Result<PathBuf, PipelineError> {
        let paths = DeploymentPath::new(self.settings.samples_root(), self.target_folder);
        let document = self
            .template
            .assemble(patch, &paths)
            .map_err(|source| PipelineError::Assemble {
                folder: patch.name().to_string(),
                source,
            })?;

        let extension = self.settings.output_extension();
        let file_name = if extension.is_empty() {
            patch.name().to_string()
        } else {
            format!("{}.{}", patch.name(), extension)
        };
        let path = self.settings.output_dir().join(file_name);
        fs::write(&path, document).map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Lists the patch folders in a processing folder, sorted by name.
fn patch_folders(processing_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let list_error = |source: io::Error| PipelineError::List {
        folder: processing_dir.to_path_buf(),
        source,
    };

    let mut folders = Vec::new();
    for entry in fs::read_dir(processing_dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        if !entry.file_type().map_err(list_error)?.is_dir() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            warn!(folder = %path.display(), "Skipping folder whose name isn't valid UTF-8");
            continue;
        };
        if util::is_ignored_folder(name) {
            continue;
        }
        folders.push(path);
    }
    folders.sort();
    Ok(folders)
}

/// Deletes a skipped folder's samples. A failure is logged and the run carries on.
fn delete_folder(folder: &Path) -> bool {
    match fs::remove_dir_all(folder) {
        Ok(()) => {
            warn!(folder = %folder.display(), "Deleted skipped source folder");
            true
        }
        Err(source) => {
            let err = PipelineError::Cleanup {
                folder: folder.to_path_buf(),
                source,
            };
            error!(err = %err, "Failed to delete skipped source folder");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::audio::SymphoniaFrameCounter;
    use crate::config::Overrides;
    use crate::testutil::write_patch_folder;

    fn settings(root: &Path, min_bucket: u64, delete_skipped: bool) -> Settings {
        Settings::load(
            None,
            &Overrides {
                root: Some(root.to_path_buf()),
                template: None,
                min_bucket: Some(min_bucket),
                delete_skipped,
            },
        )
        .unwrap()
    }

    fn run(settings: &Settings, processing_folder: &str) -> RunStats {
        let template = Template::builtin().unwrap();
        let pipeline = Pipeline::new(settings, &template, &SymphoniaFrameCounter, "Keys");
        pipeline
            .run(&settings.processing_dir(processing_folder).unwrap())
            .unwrap()
    }

    #[test]
    fn test_passes_gate() {
        assert!(!passes_gate(0, 0));
        assert!(passes_gate(1, 0));
        assert!(!passes_gate(3, 3));
        assert!(passes_gate(4, 3));
        assert!(!passes_gate(2, 3));
    }

    #[test]
    fn test_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        write_patch_folder(
            &root.path().join("Kit").join("Piano"),
            &[("Piano_A3.wav", 50_000), ("Piano_C4.wav", 220_000)],
        )
        .unwrap();
        let settings = settings(root.path(), 0, false);

        let stats = run(&settings, "Kit");

        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.buckets(), &BTreeMap::from([(5, 1)]));
        assert!(stats.failed().is_empty());

        let document = fs::read_to_string(root.path().join("XML").join("Piano.XML")).unwrap();
        let a3 = document
            .find("<sampleRange rangeTopNote=\"57\" fileName=\"SAMPLES/Keys/Piano/Piano_A3.wav\" transpose=\"3\">")
            .expect("A3 zone");
        let c4 = document
            .find("<sampleRange fileName=\"SAMPLES/Keys/Piano/Piano_C4.wav\" transpose=\"0\">")
            .expect("C4 zone");
        assert!(a3 < c4);
        assert!(document.contains("<zone startSamplePos=\"0\" endSamplePos=\"50000\"/>"));
        assert!(document.contains("<zone startSamplePos=\"0\" endSamplePos=\"220000\"/>"));
        assert!(document.contains("release=\"0xC0000000\" />"));
    }

    #[test]
    fn test_gate_boundary() {
        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        // Bucket 1, exactly the minimum.
        write_patch_folder(&kit.join("Short"), &[("48_C3.wav", 79_999)]).unwrap();
        // Bucket 2, one above it.
        write_patch_folder(&kit.join("Long"), &[("48_C3.wav", 80_000)]).unwrap();
        let settings = settings(root.path(), 1, false);

        let stats = run(&settings, "Kit");

        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.buckets(), &BTreeMap::from([(1, 1), (2, 1)]));
        assert!(root.path().join("XML").join("Long.XML").is_file());
        assert!(!root.path().join("XML").join("Short.XML").exists());
        // Skipped folders are left alone unless deletion is enabled.
        assert!(kit.join("Short").is_dir());
    }

    #[test]
    fn test_delete_skipped() {
        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        write_patch_folder(&kit.join("Short"), &[("48_C3.wav", 100)]).unwrap();
        write_patch_folder(&kit.join("Long"), &[("48_C3.wav", 100_000)]).unwrap();
        let settings = settings(root.path(), 0, true);

        let template = Template::builtin().unwrap();
        let pipeline = Pipeline::new(&settings, &template, &SymphoniaFrameCounter, "Keys");

        assert_eq!(
            pipeline.process_folder(&kit.join("Short")).unwrap(),
            FolderOutcome::Skipped {
                bucket: 0,
                deleted: true
            }
        );
        assert!(!kit.join("Short").exists());
        assert!(kit.join("Long").is_dir());
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        write_patch_folder(&kit.join("Good"), &[("48_C3.wav", 100_000)]).unwrap();
        fs::create_dir_all(kit.join("Broken")).unwrap();
        fs::write(kit.join("Broken").join("48_C3.wav"), b"not audio").unwrap();
        fs::create_dir_all(kit.join("Empty")).unwrap();
        fs::write(kit.join("Empty").join("readme.txt"), b"no samples").unwrap();
        write_patch_folder(&kit.join("_incomplete_Bass"), &[("48_C3.wav", 100_000)]).unwrap();
        write_patch_folder(&kit.join(".hidden"), &[("48_C3.wav", 100_000)]).unwrap();
        let settings = settings(root.path(), 0, false);

        let stats = run(&settings, "Kit");

        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.empty(), 1);
        assert_eq!(stats.failed(), &["Broken".to_string()]);
        assert!(root.path().join("XML").join("Good.XML").is_file());
        assert!(!root.path().join("XML").join("Broken.XML").exists());
        assert!(!root.path().join("XML").join("_incomplete_Bass.XML").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_folders_with_unreadable_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        write_patch_folder(&kit.join("Good"), &[("48_C3.wav", 100_000)]).unwrap();
        for name in [&b"Bad\xff"[..], &b"Bad\xfe"[..]] {
            write_patch_folder(&kit.join(OsStr::from_bytes(name)), &[("48_C3.wav", 100_000)])
                .unwrap();
        }
        let settings = settings(root.path(), 0, true);

        let stats = run(&settings, "Kit");

        assert_eq!(stats.emitted(), 1);
        assert!(stats.failed().is_empty());
        assert_eq!(stats.buckets(), &BTreeMap::from([(2, 1)]));
        let written: Vec<_> = fs::read_dir(root.path().join("XML"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(written, vec![OsStr::new("Good.XML").to_os_string()]);
        assert!(kit.join(OsStr::from_bytes(b"Bad\xff")).is_dir());
    }

    #[test]
    fn test_unmapped_samples_only() {
        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        write_patch_folder(&kit.join("Noise"), &[("Noise_Hiss.wav", 100_000)]).unwrap();
        let settings = settings(root.path(), 0, false);

        let template = Template::builtin().unwrap();
        let pipeline = Pipeline::new(&settings, &template, &SymphoniaFrameCounter, "Keys");

        assert_eq!(
            pipeline.process_folder(&kit.join("Noise")).unwrap(),
            FolderOutcome::Unmapped { bucket: 2 }
        );
    }

    #[test]
    fn test_unmapped_folders_are_never_deleted() {
        let root = tempfile::tempdir().unwrap();
        let kit = root.path().join("Kit");
        write_patch_folder(
            &kit.join("Vox"),
            &[("Vox_Ahh.wav", 220_000), ("Vox_Ooh.wav", 220_000)],
        )
        .unwrap();
        let settings = settings(root.path(), 0, true);

        let stats = run(&settings, "Kit");

        assert_eq!(stats.unmapped(), 1);
        assert_eq!(stats.skipped(), 0);
        assert_eq!(stats.deleted(), 0);
        assert_eq!(stats.buckets(), &BTreeMap::from([(5, 1)]));
        assert!(kit.join("Vox").join("Vox_Ahh.wav").is_file());
        assert!(kit.join("Vox").join("Vox_Ooh.wav").is_file());
        assert!(!root.path().join("XML").join("Vox.XML").exists());
    }
}
