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
use crate::envelope::ReleaseTime;
use crate::zones::Zone;

mod template;

pub use self::template::{Template, TemplateError};

/// One output patch, built from one folder of samples.
#[derive(Debug, Clone)]
pub struct Patch {
    name: String,
    zones: Vec<Zone>,
    release: ReleaseTime,
}

impl Patch {
    /// Creates a patch. The zones are expected in their final, sorted order.
    pub fn new(name: &str, zones: Vec<Zone>, release: ReleaseTime) -> Self {
        Patch {
            name: name.to_string(),
            zones,
            release,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn release(&self) -> &ReleaseTime {
        &self.release
    }
}

/// Builds the sample paths written into patches. The device reads samples from
/// `<samples root>/<target folder>/<patch>/<file>`, which need not match where
/// they sit locally.
pub struct DeploymentPath<'a> {
    samples_root: &'a str,
    target_folder: &'a str,
}

impl<'a> DeploymentPath<'a> {
    pub fn new(samples_root: &'a str, target_folder: &'a str) -> Self {
        DeploymentPath {
            samples_root,
            target_folder,
        }
    }

    pub fn sample_path(&self, patch_name: &str, file_name: &str) -> String {
        [self.samples_root, self.target_folder, patch_name, file_name]
            .iter()
            .map(|part| part.trim_matches('/'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}
