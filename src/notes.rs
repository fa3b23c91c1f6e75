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

use serde::Deserialize;

/// The highest valid MIDI note.
pub const MAX_NOTE: u8 = 127;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Characters that separate tokens in a sample file name. Dashes are left out
/// since they also mark negative octaves.
pub const SEPARATORS: &[char] = &['_', ' ', '.', '(', ')', '[', ']', ','];

/// Why a note couldn't be read from a file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("no note token found in '{0}'")]
    NotFound(String),

    #[error("note {value} in '{suffix}' is outside the MIDI range 0-127")]
    OutOfRange { suffix: String, value: i64 },
}

/// Reads a MIDI note number from the variable part of a sample file name.
pub trait NoteParser {
    fn parse_note(&self, suffix: &str) -> Result<u8, NoteError>;
}

/// The file naming conventions that can be selected in the settings.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteConvention {
    /// A bare note number, e.g. `48_C3.wav`.
    Number,
    /// A note name with octave, e.g. `Piano_Csharp4.wav`.
    Name,
    /// A leading note number as the recorder writes it (`61_Csharp4.wav`),
    /// otherwise a note name.
    #[default]
    Hybrid,
}

impl NoteConvention {
    /// Creates the parser for this convention.
    pub fn parser(self) -> Box<dyn NoteParser> {
        match self {
            NoteConvention::Number => Box::new(NumberParser),
            NoteConvention::Name => Box::new(NameParser),
            NoteConvention::Hybrid => Box::new(HybridParser),
        }
    }
}

/// What happens to a sample whose file name has no recognizable note.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedNote {
    /// Leave the sample out of the patch and log a warning.
    #[default]
    Skip,
    /// Fail the whole folder.
    Abort,
    /// Map the sample to the configured default note.
    Default,
}

/// Strips the extension and the shared prefix from a file name and parses what
/// remains.
pub fn extract_note(file_name: &str, prefix: &str, parser: &dyn NoteParser) -> Result<u8, NoteError> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    parser.parse_note(stem.strip_prefix(prefix).unwrap_or(stem))
}

/// Converts a MIDI note number into its name, e.g. 60 -> C4.
pub fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 1;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

fn tokens(suffix: &str) -> impl Iterator<Item = &str> {
    suffix
        .split(SEPARATORS)
        .filter(|token| !token.is_empty())
}

fn checked(suffix: &str, value: i64) -> Result<u8, NoteError> {
    u8::try_from(value)
        .ok()
        .filter(|note| *note <= MAX_NOTE)
        .ok_or_else(|| NoteError::OutOfRange {
            suffix: suffix.to_string(),
            value,
        })
}

/// Reads the first all-digit token.
pub struct NumberParser;

impl NoteParser for NumberParser {
    fn parse_note(&self, suffix: &str) -> Result<u8, NoteError> {
        let token = tokens(suffix)
            .flat_map(|token| token.split('-'))
            .find(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| NoteError::NotFound(suffix.to_string()))?;

        // Anything longer than this is out of range anyway.
        let value = token.parse::<i64>().unwrap_or(i64::MAX);
        checked(suffix, value)
    }
}

/// Reads the first token that spells a note name with an octave, where C4 is 60.
/// Sharps may be written `#`, `s` or `sharp`, flats `b` or `flat`.
pub struct NameParser;

impl NoteParser for NameParser {
    fn parse_note(&self, suffix: &str) -> Result<u8, NoteError> {
        for token in tokens(suffix) {
            // "C-1" is a valid name, so only fall back to splitting on dashes
            // when the whole token doesn't parse.
            let value = parse_note_name(token)
                .or_else(|| token.split('-').find_map(parse_note_name));
            if let Some(value) = value {
                return checked(suffix, value);
            }
        }
        Err(NoteError::NotFound(suffix.to_string()))
    }
}

/// Reads the leading token as a note number when it is all digits, and
/// otherwise hands over to [`NameParser`]. Digits later in the name are take
/// or round-robin counters and never count as a note.
pub struct HybridParser;

impl NoteParser for HybridParser {
    fn parse_note(&self, suffix: &str) -> Result<u8, NoteError> {
        match tokens(suffix).next() {
            Some(token) if token.chars().all(|c| c.is_ascii_digit()) => {
                checked(suffix, token.parse::<i64>().unwrap_or(i64::MAX))
            }
            _ => NameParser.parse_note(suffix),
        }
    }
}

/// Parses a whole token as a note name, returning the unchecked note number.
fn parse_note_name(token: &str) -> Option<i64> {
    let mut chars = token.chars();
    let pitch_class: i64 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();

    let octave_start = rest
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .unwrap_or(rest.len());
    let (accidental, octave) = rest.split_at(octave_start);
    let offset = match accidental.to_ascii_lowercase().as_str() {
        "" => 0,
        "#" | "s" | "sharp" => 1,
        "b" | "flat" => -1,
        _ => return None,
    };

    let digits = octave.strip_prefix('-').unwrap_or(octave);
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let octave: i64 = octave.parse().ok()?;

    Some((octave + 1) * 12 + pitch_class + offset)
}
