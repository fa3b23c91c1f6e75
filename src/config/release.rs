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
use serde::Deserialize;

/// A YAML representation of the release time conventions.
#[derive(Deserialize, Clone, Debug)]
pub struct ReleaseConfig {
    /// The release value used when no rule matches the folder name.
    default: String,

    /// Rules checked in order. The first one whose `contains` text appears in
    /// the folder name wins.
    #[serde(default)]
    rules: Vec<ReleaseRule>,
}

impl ReleaseConfig {
    /// Gets the fallback release value.
    pub fn default_release(&self) -> &str {
        &self.default
    }

    /// Gets the naming rules.
    pub fn rules(&self) -> &[ReleaseRule] {
        &self.rules
    }
}

/// Maps folder names containing some text to a release value.
#[derive(Deserialize, Clone, Debug)]
pub struct ReleaseRule {
    contains: String,
    release: String,
}

impl ReleaseRule {
    #[cfg(test)]
    pub fn new(contains: &str, release: &str) -> Self {
        ReleaseRule {
            contains: contains.to_string(),
            release: release.to_string(),
        }
    }

    pub fn contains(&self) -> &str {
        &self.contains
    }

    pub fn release(&self) -> &str {
        &self.release
    }
}

#[cfg(test)]
impl ReleaseConfig {
    pub fn new(default: &str, rules: Vec<ReleaseRule>) -> Self {
        ReleaseConfig {
            default: default.to_string(),
            rules,
        }
    }
}
