//! Converts Markdown documents to HTML, separating out the optional metadata
//! block at the top of the document.

use crate::htmlrenderer;
use crate::link;
use log::{debug, warn};
use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Maps element names (e.g. `p`, `table`) to the CSS class that every
/// opening tag of that element receives.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClassMap(pub BTreeMap<String, String>);

impl ClassMap {
    /// Loads a class mapping from a JSON object file. A missing file is not
    /// worth mentioning; a broken one is warned about. Either way the result
    /// is an empty mapping.
    pub fn load(path: &Path) -> ClassMap {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No class mapping at {}", path.display());
                return ClassMap::default();
            }
            Err(e) => {
                warn!(
                    "Cannot open classes file {}: {} - not setting custom classes for elements",
                    path.display(),
                    e
                );
                return ClassMap::default();
            }
        };
        match ClassMap::from_reader(io::BufReader::new(file)) {
            Ok(classes) => {
                debug!(
                    "Loaded custom classes for {} element(s) from {}",
                    classes.0.len(),
                    path.display()
                );
                classes
            }
            Err(e) => {
                warn!(
                    "Cannot parse classes file {}: {} - not setting custom classes for elements",
                    path.display(),
                    e
                );
                ClassMap::default()
            }
        }
    }

    pub fn from_reader<R: io::Read>(r: R) -> serde_json::Result<ClassMap> {
        serde_json::from_reader(r)
    }
}

/// Knobs for [`Converter`].
#[derive(Clone, Debug)]
pub struct ConverterOptions {
    /// Enables GitHub-style tables.
    pub tables: bool,

    /// Enables `~~strikethrough~~`.
    pub strikethrough: bool,

    /// Gives every heading a slug `id`.
    pub header_ids: bool,

    /// Splits a leading `---`-fenced block of `key: value` lines off as metadata.
    pub metadata_block: bool,

    /// CSS classes injected into the output, keyed by element name.
    pub output_extensions: ClassMap,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            tables: true,
            strikethrough: true,
            header_ids: false,
            metadata_block: true,
            output_extensions: ClassMap::default(),
        }
    }
}

/// The result of converting one document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Converted {
    pub html: String,

    /// Metadata fields with lower-cased keys. Empty when the document has no
    /// metadata block.
    pub metadata: HashMap<String, String>,
}

/// Converts Markdown to HTML with a fixed set of [`ConverterOptions`].
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    pub fn new(options: ConverterOptions) -> Converter {
        Converter { options }
    }

    /// Converts `markdown` into HTML plus its metadata fields.
    pub fn to_html(&self, markdown: &str) -> Result<Converted> {
        let markdown = markdown.strip_prefix('\u{feff}').unwrap_or(markdown);
        let (metadata, body) = match self.options.metadata_block {
            true => match split_metadata(markdown) {
                Some((block, body)) => (parse_metadata(block), body),
                None => (HashMap::new(), markdown),
            },
            false => (HashMap::new(), markdown),
        };

        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TASKLISTS);
        if self.options.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.options.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }

        let mut html = String::with_capacity(body.len() * 3 / 2);
        htmlrenderer::push_html(
            &mut html,
            Parser::new_ext(body, options).map(convert_event),
            &self.options.output_extensions.0,
            self.options.header_ids,
        )?;
        Ok(Converted { html, metadata })
    }
}

fn convert_tag(tag: Tag) -> Tag {
    // Links from one document to another name the `.md` source; they need
    // to name the rendered `.html` page instead.
    match tag {
        Tag::Link(link_type @ LinkType::Email, url, title) => {
            Tag::Link(link_type, url, title)
        }
        Tag::Link(link_type, url, title) => {
            Tag::Link(link_type, CowStr::from(link::convert(&url)), title)
        }
        Tag::Image(link_type, url, title) => {
            Tag::Image(link_type, CowStr::from(link::convert(&url)), title)
        }
        _ => tag,
    }
}

fn convert_event(ev: Event) -> Event {
    match ev {
        Event::Start(tag) => Event::Start(convert_tag(tag)),
        _ => ev,
    }
}

/// Splits a document into its metadata block and body. The block must open
/// on the first line with a `---` fence and close with another `---` line;
/// otherwise the document has no metadata.
fn split_metadata(input: &str) -> Option<(&str, &str)> {
    const FENCE: &str = "---";

    let mut lines = input.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FENCE {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Some((&input[yaml_start..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parses a metadata block into string fields. A block that reads as a YAML
/// mapping keeps its scalar values as text and drops sequences, mappings and
/// nulls. Anything else is read as plain `key: value` lines, so a title such
/// as `Rust: a retrospective` survives.
fn parse_metadata(block: &str) -> HashMap<String, String> {
    use serde_yaml::Value;

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    if block.trim().is_empty() {
        return HashMap::new();
    }
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Null) => HashMap::new(),
        Ok(Value::Mapping(mapping)) => mapping
            .iter()
            .filter_map(|(key, value)| Some((scalar(key)?.to_lowercase(), scalar(value)?)))
            .collect(),
        Ok(_) => parse_metadata_lines(block),
        Err(err) => {
            debug!("Reading metadata block as plain lines: {}", err);
            parse_metadata_lines(block)
        }
    }
}

/// Reads each line as a key and a value split at the first `:`. Lines
/// without a colon or with an empty key are ignored.
fn parse_metadata_lines(block: &str) -> HashMap<String, String> {
    block
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            match key.is_empty() {
                true => None,
                false => Some((key.to_lowercase(), value.trim().to_owned())),
            }
        })
        .collect()
}

/// The result of a fallible conversion.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O errors while rendering.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
