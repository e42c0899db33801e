//! XKB rules registry (`rules/evdev.xml` and friends)
//!
//! The registry is owned by the host system. It is opened, edited in memory
//! and written back in full by consuming the [`RegistryDocument`]. There is
//! no locking: two installers racing on the same file lose one update.
//!
//! Edits stream the document through an XML reader and writer, so markup the
//! installer does not touch (qualified attributes such as `xml:lang`,
//! comments, the DOCTYPE) is written back as it was read. Each install
//! appends, at the end of every `layoutList` child of the root:
//!
//! ```text
//! <layout>
//!   <configItem>
//!     <name>us_split_v3</name>
//!     <shortDescription>U_SA_3</shortDescription>
//!     <description>USA Split v3</description>
//!     <languageList><iso639Id>eng</iso639Id></languageList>
//!     <countryList><iso3166Id>US</iso3166Id></countryList>
//!   </configItem>
//! </layout>
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use xml::reader::XmlEvent as ReaderEvent;
use xml::writer::XmlEvent as WriterEvent;
use xml::{EmitterConfig, EventReader, EventWriter, ParserConfig};

use crate::error::{InstallerError, Result};
use crate::layout::LayoutDescriptor;

const LAYOUT_LIST: &str = "layoutList";

/// Element path from the root to a layout's name
const LAYOUT_NAME: [&str; 4] = [LAYOUT_LIST, "layout", "configItem", "name"];

/// A registry document loaded for editing
#[derive(Debug)]
pub struct RegistryDocument {
    path: PathBuf,
    content: Vec<u8>,
    outline: Outline,
}

/// What the installer needs to know about a parsed registry
#[derive(Debug, Default)]
struct Outline {
    layout_lists: usize,
    layout_names: Vec<String>,
}

impl RegistryDocument {
    /// Read and parse the registry at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read(&path).map_err(|e| InstallerError::io(&path, e))?;
        let outline = scan(&path, &content)?;

        tracing::debug!(
            "Parsed registry {} ({} layout list(s))",
            path.display(),
            outline.layout_lists
        );
        Ok(Self {
            path,
            content,
            outline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of `layoutList` nodes directly under the root
    pub fn layout_list_count(&self) -> usize {
        self.outline.layout_lists
    }

    /// `configItem/name` of every layout in every layout list, in document order
    pub fn layout_names(&self) -> &[String] {
        &self.outline.layout_names
    }

    /// Append a descriptor named `name` to every layout list.
    ///
    /// Returns how many lists were updated. Existing entries with the same
    /// name are left alone, so repeated installs produce duplicates.
    pub fn append_layout(&mut self, name: &str, layout: &LayoutDescriptor) -> Result<usize> {
        if self.outline.layout_lists == 0 {
            tracing::warn!("No <{}> found in {}", LAYOUT_LIST, self.path.display());
            return Ok(0);
        }

        let (content, updated) = splice(&self.path, &self.content, name, layout)?;
        self.outline = scan(&self.path, &content)?;
        self.content = content;
        Ok(updated)
    }

    /// Write the document back over the file it was read from
    pub fn save(self) -> Result<()> {
        fs::write(&self.path, &self.content).map_err(|e| InstallerError::io(&self.path, e))?;
        tracing::debug!("Wrote registry {}", self.path.display());
        Ok(())
    }
}

fn event_reader(content: &[u8]) -> EventReader<&[u8]> {
    ParserConfig::new()
        .ignore_comments(false)
        .create_reader(content)
}

fn parse_error(path: &Path, error: xml::reader::Error) -> InstallerError {
    InstallerError::RegistryParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn write_error(path: &Path, error: xml::writer::Error) -> InstallerError {
    InstallerError::RegistryWrite {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

/// True when the open elements below the root are exactly `path`
fn at_path(stack: &[String], path: &[&str]) -> bool {
    stack.len() == path.len() + 1 && stack[1..].iter().zip(path).all(|(open, want)| open == want)
}

/// Parse the whole document, counting layout lists and collecting layout names
fn scan(path: &Path, content: &[u8]) -> Result<Outline> {
    let mut outline = Outline::default();
    let mut stack: Vec<String> = Vec::new();
    let mut name: Option<String> = None;

    for event in event_reader(content) {
        match event.map_err(|e| parse_error(path, e))? {
            ReaderEvent::StartElement { name: element, .. } => {
                stack.push(element.local_name);
                if at_path(&stack, &[LAYOUT_LIST]) {
                    outline.layout_lists += 1;
                } else if at_path(&stack, &LAYOUT_NAME) {
                    name = Some(String::new());
                }
            }
            ReaderEvent::Characters(text) | ReaderEvent::CData(text) => {
                if let Some(name) = name.as_mut() {
                    name.push_str(&text);
                }
            }
            ReaderEvent::EndElement { .. } => {
                if let Some(name) = name.take() {
                    outline.layout_names.push(name);
                }
                stack.pop();
            }
            _ => {}
        }
    }
    Ok(outline)
}

/// Copy `content` event by event, inserting the layout before the closing
/// tag of every `layoutList` directly under the root
fn splice(
    path: &Path,
    content: &[u8],
    name: &str,
    layout: &LayoutDescriptor,
) -> Result<(Vec<u8>, usize)> {
    let mut reader = event_reader(content);
    let mut writer = EmitterConfig::new()
        .autopad_comments(false)
        .pad_self_closing(false)
        .create_writer(Vec::new());
    let mut depth = 0usize;
    let mut updated = 0;

    loop {
        let event = reader.next().map_err(|e| parse_error(path, e))?;
        match &event {
            ReaderEvent::EndDocument => break,
            ReaderEvent::StartElement { .. } => {
                if depth == 0 {
                    // The reader has no DOCTYPE event; it is complete once the root opens
                    if let Some(doctype) = reader.doctype() {
                        let doctype = format!("\n{}", doctype);
                        writer.inner_mut().extend_from_slice(doctype.as_bytes());
                    }
                    writer.inner_mut().push(b'\n');
                }
                depth += 1;
            }
            ReaderEvent::EndElement { name: element } => {
                if depth == 2 && element.local_name == LAYOUT_LIST {
                    write_layout(&mut writer, name, layout).map_err(|e| write_error(path, e))?;
                    updated += 1;
                }
                depth -= 1;
            }
            ReaderEvent::Comment(_) | ReaderEvent::ProcessingInstruction { .. } if depth == 0 => {
                writer.inner_mut().push(b'\n');
            }
            _ => {}
        }

        if let Some(output) = event.as_writer_event() {
            writer.write(output).map_err(|e| write_error(path, e))?;
        }
    }

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok((output, updated))
}

/// Emit the `<layout>` element for one descriptor
fn write_layout<W: Write>(
    writer: &mut EventWriter<W>,
    name: &str,
    layout: &LayoutDescriptor,
) -> xml::writer::Result<()> {
    writer.write(WriterEvent::start_element("layout"))?;
    writer.write(WriterEvent::start_element("configItem"))?;
    write_text(writer, "name", name)?;
    write_text(writer, "shortDescription", &layout.short_description)?;
    write_text(writer, "description", &layout.long_description)?;
    write_list(writer, "languageList", "iso639Id", &layout.language_tag)?;
    if let Some(country) = &layout.country_tag {
        write_list(writer, "countryList", "iso3166Id", country)?;
    }
    writer.write(WriterEvent::end_element())?;

    if layout.variant_list {
        writer.write(WriterEvent::start_element("variantList"))?;
        writer.write(WriterEvent::end_element())?;
    }
    writer.write(WriterEvent::end_element())
}

fn write_text<W: Write>(
    writer: &mut EventWriter<W>,
    element: &str,
    text: &str,
) -> xml::writer::Result<()> {
    writer.write(WriterEvent::start_element(element))?;
    writer.write(WriterEvent::characters(text))?;
    writer.write(WriterEvent::end_element())
}

fn write_list<W: Write>(
    writer: &mut EventWriter<W>,
    list: &str,
    item: &str,
    text: &str,
) -> xml::writer::Result<()> {
    writer.write(WriterEvent::start_element(list))?;
    write_text(writer, item, text)?;
    writer.write(WriterEvent::end_element())
}
