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

use crate::config::ReleaseConfig;

/// An envelope release value, written verbatim into the patch document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTime(String);

impl ReleaseTime {
    pub fn new(value: &str) -> Self {
        ReleaseTime(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Picks a release time from a folder's name. A name that matches no rule is
/// the common case and gets the default.
pub struct ReleasePolicy {
    default: ReleaseTime,
    rules: Vec<(String, ReleaseTime)>,
}

impl ReleasePolicy {
    pub fn new(config: &ReleaseConfig) -> Self {
        ReleasePolicy {
            default: ReleaseTime::new(config.default_release()),
            rules: config
                .rules()
                .iter()
                .map(|rule| (rule.contains().to_lowercase(), ReleaseTime::new(rule.release())))
                .collect(),
        }
    }

    /// Returns the release of the first rule whose text appears in the name,
    /// ignoring case.
    pub fn release_for(&self, name: &str) -> &ReleaseTime {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|(contains, _)| name.contains(contains.as_str()))
            .map(|(_, release)| release)
            .unwrap_or(&self.default)
    }
}
