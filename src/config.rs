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
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::notes::{NoteConvention, UnmappedNote, MAX_NOTE};
use crate::zones::RepresentativeLength;

mod error;
mod release;

pub use self::error::ConfigError;
pub use self::release::ReleaseConfig;
#[cfg(test)]
pub use self::release::ReleaseRule;

/// Settings applied before any user supplied file.
const DEFAULTS: &str = include_str!("config/defaults.yaml");

/// Values given on the command line. These win over both the defaults and the
/// config file.
#[derive(Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub min_bucket: Option<u64>,
    pub delete_skipped: bool,
}

/// The settings for a patch generation run.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    /// The directory processing folders are resolved against.
    root: PathBuf,
    /// The sample root on the device, prefixed to every zone's file name.
    samples_root: String,
    /// The output directory, relative to the root.
    output_dir: PathBuf,
    /// The extension given to generated patch documents.
    output_extension: String,
    /// An optional patch template. The built-in synth template is used if unset.
    template: Option<PathBuf>,
    /// Audio file extensions to pick up, matched case-insensitively.
    extensions: Vec<String>,
    /// How note numbers are read out of sample file names.
    note_convention: NoteConvention,
    /// What to do with samples whose name carries no note.
    unmapped_note: UnmappedNote,
    /// The note given to unmapped samples when `unmapped_note` is `default`.
    default_note: u8,
    /// Which sample's length classifies the folder.
    representative_length: RepresentativeLength,
    /// Folders must score strictly above this bucket to be emitted.
    min_bucket: u64,
    /// Deletes the source folder of every skipped patch. Destructive.
    delete_skipped: bool,
    /// Release time naming conventions.
    release: ReleaseConfig,
}

impl Settings {
    /// Loads settings from the built-in defaults, an optional YAML file and the
    /// command line overrides, in that order.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Yaml));
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).format(FileFormat::Yaml).required(true));
        }
        if let Some(root) = &overrides.root {
            builder = builder.set_override("root", root.to_string_lossy().to_string())?;
        }
        if let Some(template) = &overrides.template {
            builder = builder.set_override("template", template.to_string_lossy().to_string())?;
        }
        if let Some(min_bucket) = overrides.min_bucket {
            builder = builder.set_override("min_bucket", i64::try_from(min_bucket).unwrap_or(i64::MAX))?;
        }
        if overrides.delete_skipped {
            builder = builder.set_override("delete_skipped", true)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_note > MAX_NOTE {
            return Err(ConfigError::DefaultNoteOutOfRange(self.default_note));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }

    /// Resolves the processing folder against the root. If it doesn't exist the
    /// error carries the folders that do, so the user can pick one.
    pub fn processing_dir(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let dir = self.root.join(name);
        if dir.is_dir() {
            return Ok(dir);
        }

        let mut siblings = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                siblings.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        siblings.sort();

        Err(ConfigError::MissingProcessingFolder {
            name: name.to_string(),
            root: self.root.clone(),
            siblings,
        })
    }

    /// The directory patch documents are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    pub fn samples_root(&self) -> &str {
        &self.samples_root
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn note_convention(&self) -> NoteConvention {
        self.note_convention
    }

    pub fn unmapped_note(&self) -> UnmappedNote {
        self.unmapped_note
    }

    pub fn default_note(&self) -> u8 {
        self.default_note
    }

    pub fn representative_length(&self) -> RepresentativeLength {
        self.representative_length
    }

    pub fn min_bucket(&self) -> u64 {
        self.min_bucket
    }

    pub fn delete_skipped(&self) -> bool {
        self.delete_skipped
    }

    pub fn release(&self) -> &ReleaseConfig {
        &self.release
    }
}

#[cfg(test)]
impl Settings {
    /// Layers the given YAML over the defaults (test only).
    pub fn from_yaml(yaml: &str) -> Settings {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Yaml))
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        settings.validate().unwrap();
        settings
    }
}
