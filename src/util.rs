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
use std::path::Path;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Returns true for folders that are never turned into patches: hidden folders
/// and ones marked as incomplete.
pub fn is_ignored_folder(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("_incomplete_")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::util::{filename_display, is_ignored_folder};

    #[test]
    fn test_filename_display() {
        assert_eq!("Piano", filename_display(Path::new("Kit/Piano")));
        assert_eq!("Piano_C4.wav", filename_display(Path::new("Piano_C4.wav")));
        assert_eq!("unreadable file name", filename_display(Path::new("/")));
    }

    #[test]
    fn test_is_ignored_folder() {
        assert!(is_ignored_folder(".git"));
        assert!(is_ignored_folder("_incomplete_Piano"));
        assert!(!is_ignored_folder("Piano"));
        assert!(!is_ignored_folder("_Piano"));
    }
}
