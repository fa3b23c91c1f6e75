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
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{DeploymentPath, Patch};
use crate::envelope::ReleaseTime;
use crate::zones::RangeTop;

const SAMPLE_RANGES: &str = "sampleRanges";
const ENVELOPE: &str = "envelope1";
const RELEASE: &str = "release";

/// The synth template used when none is configured.
const BUILTIN: &str = include_str!("../../templates/synth.XML");

/// Errors loading a template or writing a patch document from it.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("malformed template attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("template has no <{0}> element")]
    MissingElement(&'static str),

    #[error("writing patch document: {0}")]
    Write(#[from] std::io::Error),
}

/// A parsed patch template. It's parsed once and then shared by every patch;
/// assembling never changes it.
#[derive(Debug, Clone)]
pub struct Template {
    events: Vec<Event<'static>>,
}

impl Template {
    /// Loads a template from disk.
    pub fn load(path: &Path) -> Result<Template, TemplateError> {
        let xml = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Template::parse(&xml)
    }

    /// Parses the built-in synth template.
    pub fn builtin() -> Result<Template, TemplateError> {
        Template::parse(BUILTIN)
    }

    /// Parses a template. It must hold a sample range collection and an
    /// envelope to receive the release time.
    pub fn parse(xml: &str) -> Result<Template, TemplateError> {
        let mut reader = Reader::from_str(xml);
        let mut events = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Eof => break,
                event => events.push(event.into_owned()),
            }
        }

        let template = Template { events };
        for name in [SAMPLE_RANGES, ENVELOPE] {
            if !template.has_element(name) {
                return Err(TemplateError::MissingElement(name));
            }
        }
        Ok(template)
    }

    fn has_element(&self, name: &str) -> bool {
        self.events.iter().any(|event| {
            matches!(event, Event::Start(e) | Event::Empty(e) if e.name().as_ref() == name.as_bytes())
        })
    }

    /// Produces the patch document: a copy of the template with the sample
    /// ranges replaced by the patch's zones and the envelope release set.
    /// Everything else is copied through as it was read.
    pub fn assemble(&self, patch: &Patch, paths: &DeploymentPath<'_>) -> Result<Vec<u8>, TemplateError> {
        let mut writer = Writer::new(Vec::new());
        let mut indent = String::new();
        let mut ranges_indent = String::new();
        // Nesting depth inside the template's own sample ranges, which are dropped.
        let mut skipping = 0usize;

        for event in &self.events {
            if skipping > 0 {
                match event {
                    Event::Start(_) => skipping += 1,
                    Event::End(end) => {
                        skipping -= 1;
                        if skipping == 0 {
                            write_ranges(&mut writer, patch, paths, &ranges_indent)?;
                            writer.write_event(Event::End(end.clone()))?;
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(e) if is_named(e, SAMPLE_RANGES) => {
                    writer.write_event(Event::Start(e.clone()))?;
                    ranges_indent = indent.clone();
                    skipping = 1;
                }
                Event::Empty(e) if is_named(e, SAMPLE_RANGES) => {
                    writer.write_event(Event::Start(e.clone()))?;
                    write_ranges(&mut writer, patch, paths, &indent)?;
                    writer.write_event(Event::End(e.to_end()))?;
                }
                Event::Start(e) if is_named(e, ENVELOPE) => {
                    writer.write_event(Event::Start(with_release(e, patch.release())?))?;
                }
                Event::Empty(e) if is_named(e, ENVELOPE) => {
                    writer.write_event(Event::Empty(with_release(e, patch.release())?))?;
                }
                Event::Text(text) => {
                    if let Some(line_indent) = trailing_indent(text) {
                        indent = line_indent;
                    }
                    writer.write_event(Event::Text(text.clone()))?;
                }
                event => writer.write_event(event.clone())?,
            }
        }

        Ok(writer.into_inner())
    }
}

fn is_named(element: &BytesStart<'_>, name: &str) -> bool {
    element.name().as_ref() == name.as_bytes()
}

/// Returns the whitespace after the last newline of a text node, if the node
/// ends in indentation.
fn trailing_indent(text: &BytesText<'_>) -> Option<String> {
    let raw: &[u8] = text;
    let newline = raw.iter().rposition(|b| *b == b'\n')?;
    let tail = &raw[newline + 1..];
    tail.iter()
        .all(|b| *b == b' ' || *b == b'\t')
        .then(|| String::from_utf8_lossy(tail).into_owned())
}

/// Copies an element with its release attribute set. Only the attribute value
/// changes; the element's other attributes and layout are kept as written.
fn with_release(
    element: &BytesStart<'_>,
    release: &ReleaseTime,
) -> Result<BytesStart<'static>, TemplateError> {
    for attribute in element.attributes() {
        attribute?;
    }

    let raw = String::from_utf8_lossy(element).into_owned();
    let name_len = element.name().as_ref().len();
    let value = escape(release.as_str());
    let content = match attribute_value_span(&raw, name_len, RELEASE) {
        Some((start, end)) => format!("{}{}{}", &raw[..start], value, &raw[end..]),
        None => {
            let attributes = raw.trim_end();
            format!(
                "{attributes} {RELEASE}=\"{value}\"{}",
                &raw[attributes.len()..]
            )
        }
    };
    Ok(BytesStart::from_content(content, name_len))
}

/// Finds the byte range of an attribute's value, between its quotes, in the raw
/// content of a start tag.
fn attribute_value_span(raw: &str, name_len: usize, key: &str) -> Option<(usize, usize)> {
    let bytes = raw.as_bytes();
    let skip_whitespace = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let mut i = name_len;
    loop {
        let key_start = skip_whitespace(i);
        let mut key_end = key_start;
        while key_end < bytes.len() && !bytes[key_end].is_ascii_whitespace() && bytes[key_end] != b'=' {
            key_end += 1;
        }

        i = skip_whitespace(key_end);
        if bytes.get(i) != Some(&b'=') {
            return None;
        }
        i = skip_whitespace(i + 1);
        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_end = value_start + raw[value_start..].find(char::from(quote))?;

        if &raw[key_start..key_end] == key {
            return Some((value_start, value_end));
        }
        i = value_end + 1;
    }
}

/// Writes one sample range per zone. The last zone carries no top note, so it
/// covers everything above the zone before it.
fn write_ranges<W: Write>(
    writer: &mut Writer<W>,
    patch: &Patch,
    paths: &DeploymentPath<'_>,
    indent: &str,
) -> Result<(), TemplateError> {
    if patch.zones().is_empty() {
        return Ok(());
    }

    for zone in patch.zones() {
        writer.write_event(Event::Text(BytesText::from_escaped(format!("\n{indent}\t"))))?;

        let mut range = BytesStart::new("sampleRange");
        if let RangeTop::Bounded(note) = zone.range_top() {
            range.push_attribute(("rangeTopNote", note.to_string().as_str()));
        }
        range.push_attribute((
            "fileName",
            paths.sample_path(patch.name(), zone.file_name()).as_str(),
        ));
        range.push_attribute(("transpose", zone.transpose().to_string().as_str()));
        writer.write_event(Event::Start(range))?;

        writer.write_event(Event::Text(BytesText::from_escaped(format!("\n{indent}\t\t"))))?;
        let mut samples = BytesStart::new("zone");
        samples.push_attribute(("startSamplePos", zone.start_frame().to_string().as_str()));
        samples.push_attribute(("endSamplePos", zone.end_frame().to_string().as_str()));
        writer.write_event(Event::Empty(samples))?;

        writer.write_event(Event::Text(BytesText::from_escaped(format!("\n{indent}\t"))))?;
        writer.write_event(Event::End(BytesEnd::new("sampleRange")))?;
    }
    writer.write_event(Event::Text(BytesText::from_escaped(format!("\n{indent}"))))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::{sort_and_finalize, SampleFile, Zone};

    fn zone(name: &str, frames: u64, note: u8) -> Zone {
        Zone::new(SampleFile::new(name, frames), note)
    }

    fn piano() -> Patch {
        Patch::new(
            "Piano",
            sort_and_finalize(vec![
                zone("Piano_C4.wav", 2_200, 60),
                zone("Piano_A3.wav", 500, 57),
            ]),
            ReleaseTime::new("0xC0000000"),
        )
    }

    fn assemble(template: &Template, patch: &Patch) -> String {
        let paths = DeploymentPath::new("SAMPLES", "Keys");
        String::from_utf8(template.assemble(patch, &paths).unwrap()).unwrap()
    }

    /// Drops the first span from `start` up to and including the next `end`.
    fn cut(doc: &str, start: &str, end: &str) -> String {
        let from = doc.find(start).unwrap();
        let after = from + start.len();
        let to = after + doc[after..].find(end).unwrap() + end.len();
        format!("{}{}", &doc[..from], &doc[to..])
    }

    fn outside_injected_fields(doc: &str) -> String {
        let doc = cut(doc, "<sampleRanges>", "</sampleRanges>");
        let envelope = doc.find("<envelope1").unwrap();
        format!(
            "{}{}",
            &doc[..envelope],
            cut(&doc[envelope..], "release=\"", "\"")
        )
        .trim_end()
        .to_string()
    }

    #[test]
    fn test_assemble_sample_ranges() {
        let template = Template::builtin().unwrap();
        let doc = assemble(&template, &piano());

        let expected = concat!(
            "<sampleRanges>\n",
            "\t\t\t<sampleRange rangeTopNote=\"57\" fileName=\"SAMPLES/Keys/Piano/Piano_A3.wav\" transpose=\"3\">\n",
            "\t\t\t\t<zone startSamplePos=\"0\" endSamplePos=\"500\"/>\n",
            "\t\t\t</sampleRange>\n",
            "\t\t\t<sampleRange fileName=\"SAMPLES/Keys/Piano/Piano_C4.wav\" transpose=\"0\">\n",
            "\t\t\t\t<zone startSamplePos=\"0\" endSamplePos=\"2200\"/>\n",
            "\t\t\t</sampleRange>\n",
            "\t\t</sampleRanges>"
        );
        assert!(doc.contains(expected), "{}", doc);
        assert!(!doc.contains("TEMPLATE/60_C4.wav"));
        assert!(doc.contains("release=\"0xC0000000\" />"));

        // The result is still a well formed template.
        let reparsed = Template::parse(&doc).unwrap();
        assert!(reparsed.has_element("sampleRange"));
    }

    #[test]
    fn test_assemble_preserves_everything_else() {
        let template = Template::builtin().unwrap();
        let doc = assemble(&template, &piano());

        assert_eq!(
            outside_injected_fields(BUILTIN),
            outside_injected_fields(&doc)
        );
        // Envelope2 keeps its own release.
        assert!(doc.contains("release=\"0xE6666654\" />"));
        assert!(doc.contains(concat!(
            "\t\t<envelope1\n",
            "\t\t\tattack=\"0x80000000\"\n",
            "\t\t\tdecay=\"0xE6666654\"\n",
            "\t\t\tsustain=\"0x7FFFFFFF\"\n",
            "\t\t\trelease=\"0xC0000000\" />"
        )));
    }

    #[test]
    fn test_with_release_keeps_the_element_as_written() {
        let release = ReleaseTime::new("0xC0000000");
        let content = |element: &BytesStart<'_>| String::from_utf8(element.to_vec()).unwrap();

        let element = BytesStart::from_content(
            "envelope1\n\tname='release=\"x\"'\n\trelease = '0x2' ",
            "envelope1".len(),
        );
        assert_eq!(
            content(&with_release(&element, &release).unwrap()),
            "envelope1\n\tname='release=\"x\"'\n\trelease = '0xC0000000' "
        );

        let element = BytesStart::from_content("envelope1 attack=\"1\" ", "envelope1".len());
        assert_eq!(
            content(&with_release(&element, &release).unwrap()),
            "envelope1 attack=\"1\" release=\"0xC0000000\" "
        );

        let element = BytesStart::from_content("envelope1", "envelope1".len());
        assert_eq!(
            content(&with_release(&element, &release).unwrap()),
            "envelope1 release=\"0xC0000000\""
        );
    }

    #[test]
    fn test_assemble_is_independent_per_patch() {
        let template = Template::builtin().unwrap();
        let first = assemble(&template, &piano());

        let organ = Patch::new(
            "Organ",
            sort_and_finalize(vec![zone("Organ_C2.wav", 100, 36)]),
            ReleaseTime::new("0x00000000"),
        );
        let second = assemble(&template, &organ);

        assert!(!second.contains("Piano"));
        assert!(second.contains("<sampleRange fileName=\"SAMPLES/Keys/Organ/Organ_C2.wav\" transpose=\"24\">"));
        assert_eq!(first, assemble(&template, &piano()));
    }

    #[test]
    fn test_assemble_escapes_file_names() {
        let template = Template::builtin().unwrap();
        let patch = Patch::new(
            "R&B",
            sort_and_finalize(vec![zone("Keys_C4.wav", 10, 60)]),
            ReleaseTime::new("0x80000000"),
        );
        let doc = assemble(&template, &patch);
        assert!(doc.contains("fileName=\"SAMPLES/Keys/R&amp;B/Keys_C4.wav\""));
    }

    #[test]
    fn test_assemble_minimal_template() {
        let template = Template::parse(
            "<sound><osc1><sampleRanges/></osc1><envelope1 attack=\"1\"></envelope1></sound>",
        )
        .unwrap();
        let doc = assemble(&template, &piano());

        assert!(doc.starts_with("<sound><osc1><sampleRanges>\n\t<sampleRange rangeTopNote=\"57\""));
        assert!(doc.ends_with("\t</sampleRange>\n</sampleRanges></osc1><envelope1 attack=\"1\" release=\"0xC0000000\"></envelope1></sound>"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Template::parse("<sound><envelope1/></sound>"),
            Err(TemplateError::MissingElement("sampleRanges"))
        ));
        assert!(matches!(
            Template::parse("<sound><sampleRanges/></sound>"),
            Err(TemplateError::MissingElement("envelope1"))
        ));
        assert!(matches!(
            Template::parse("<sound><sampleRanges></sound>"),
            Err(TemplateError::Parse(_))
        ));
        assert!(matches!(
            Template::load(&PathBuf::from("/nonexistent/SYNT000.XML")),
            Err(TemplateError::Read { .. })
        ));
    }
}
