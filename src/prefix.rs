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
use crate::notes::SEPARATORS;

/// Returns the longest literal prefix shared by every name, compared character
/// by character. Empty input, or names that differ in their first character,
/// give an empty prefix.
pub fn common_prefix<S: AsRef<str>>(names: &[S]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    let first = first.as_ref();
    let mut others: Vec<_> = rest.iter().map(|name| name.as_ref().chars()).collect();

    let mut end = 0;
    for (index, c) in first.char_indices() {
        if others.iter_mut().any(|chars| chars.next() != Some(c)) {
            break;
        }
        end = index + c.len_utf8();
    }
    first[..end].to_string()
}

/// Cuts a common prefix back to just after its last token separator, so that
/// the part of a note token shared by all names (the `C` in `Piano_C3` and
/// `Piano_C4`) stays attached to the note.
pub fn strippable_prefix(prefix: &str) -> &str {
    match prefix.rfind(SEPARATORS) {
        Some(index) => &prefix[..=index],
        None => "",
    }
}
