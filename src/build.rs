//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output site: loading templates, copying the
//! template's static directory, rendering every Markdown document in the
//! input tree to its own page ([`crate::markdown`], [`crate::template`]),
//! copying every other file across untouched, and finally writing the
//! listing page from the collected posts ([`crate::post`]).
//!
//! Setup problems and a failure to write the listing page abort the build
//! with an [`Error`]. A problem with a single document or asset is logged and
//! that file is skipped.

use crate::config::Config;
use crate::extract::{extract, is_listed};
use crate::markdown::{ClassMap, Converter, ConverterOptions, Error as ConvertError};
use crate::post::{Post, Registry};
use crate::template::{expand, render_page};
use log::{debug, error, info};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

/// Counts of what a build did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Markdown documents written as pages, listed or not.
    pub rendered: usize,

    /// Non-Markdown files copied from the input tree.
    pub copied: usize,

    /// Documents and assets skipped because of an error.
    pub skipped: usize,

    /// Posts on the listing page.
    pub listed: usize,
}

/// Builds the site described by `config`. See the module docs for the steps
/// and for which failures are fatal.
pub fn build_site(config: &Config) -> Result<Summary> {
    let page_template = load_template(&config.page_template(), "post")?;
    let listing_template = load_template(&config.listing_template(), "posts list")?;
    let converter = Converter::new(ConverterOptions {
        output_extensions: ClassMap::load(&config.classes_file()),
        ..ConverterOptions::default()
    });

    if let Err(err) = fs::read_dir(&config.input_directory) {
        return Err(Error::OpenInputDirectory {
            path: config.input_directory.clone(),
            err,
        });
    }

    if !config.output_directory.is_dir() {
        fs::create_dir_all(&config.output_directory).map_err(|err| {
            Error::CreateOutputDirectory {
                path: config.output_directory.clone(),
                err,
            }
        })?;
        debug!("Created output directory {}", config.output_directory.display());
    }

    let static_directory = config.static_directory();
    if static_directory.is_dir() {
        info!("Copying static files from template...");
        copy_dir(&static_directory, &config.output_directory).map_err(|err| {
            Error::CopyStatic {
                path: static_directory.clone(),
                err,
            }
        })?;
    }

    let writer = PageWriter {
        config,
        converter: &converter,
        template: &page_template,
    };
    let mut registry = Registry::new();
    let mut summary = Summary::default();

    let output_directory = config.output_directory.clone();
    let entries = WalkDir::new(&config.input_directory)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        // Don't feed our own output back in when it lives under the input.
        .filter_entry(move |entry| entry.path() != output_directory);

    for result in entries {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                error!("Cannot read input entry: {} - skipping", e);
                summary.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        // strip_prefix() shouldn't fail since every entry is under the root
        let relative = match entry.path().strip_prefix(&config.input_directory) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        if is_markdown(relative) {
            match writer.write_document(entry.path(), relative) {
                Ok(post) => {
                    summary.rendered += 1;
                    if let Some(post) = post {
                        registry.insert(post);
                    }
                }
                Err(e) => {
                    error!(" - {} - skipping", e);
                    summary.skipped += 1;
                }
            }
        } else {
            match copy_asset(entry.path(), &config.output_directory.join(relative)) {
                Ok(()) => summary.copied += 1,
                Err(e) => {
                    error!(" - {}", e);
                    summary.skipped += 1;
                }
            }
        }
    }

    summary.listed = registry.len();
    if registry.is_empty() {
        info!("No posts found, the listing will be empty");
    }
    let posts = registry.finalize();

    let listing_path = config.listing_output();
    debug!("Writing posts list file {}...", listing_path.display());
    fs::write(&listing_path, expand(&listing_template, &posts)).map_err(|err| {
        Error::WriteListing {
            path: listing_path.clone(),
            err,
        }
    })?;

    Ok(summary)
}

/// Renders Markdown documents into pages with the page template.
struct PageWriter<'a> {
    config: &'a Config,
    converter: &'a Converter,
    template: &'a str,
}

impl PageWriter<'_> {
    /// Converts, templates and writes one document. Returns the document's
    /// [`Post`] unless it is kept off the listing.
    fn write_document(&self, source: &Path, relative: &Path) -> DocumentResult<Option<Post>> {
        info!("Converting {}...", source.display());
        let markdown = fs::read_to_string(source).map_err(|err| DocumentError::Read {
            path: source.to_owned(),
            err,
        })?;
        let converted = self
            .converter
            .to_html(&markdown)
            .map_err(|err| DocumentError::Convert {
                path: source.to_owned(),
                err,
            })?;
        debug!(" - Metadata: {:?}", converted.metadata);

        let post = extract(
            &link(relative),
            &converted.html,
            &converted.metadata,
            fs::metadata(source).and_then(|m| m.modified()),
        );
        debug!(" - Post title: {}", post.title);
        debug!(" - Post date: {}", post.display_date);

        let output_path = self.config.page_output(relative);
        if let Some(dir) = output_path.parent() {
            if !dir.is_dir() {
                fs::create_dir_all(dir).map_err(|err| DocumentError::CreateDirectory {
                    path: dir.to_owned(),
                    err,
                })?;
                debug!(" - Created output directory {}", dir.display());
            }
        }

        fs::write(
            &output_path,
            render_page(self.template, &post.title, &converted.html),
        )
        .map_err(|err| DocumentError::Write {
            path: output_path.clone(),
            err,
        })?;
        debug!(" - Output file {} written successfully", output_path.display());

        let stem = relative
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();
        Ok(match is_listed(&stem) {
            true => Some(post),
            false => None,
        })
    }
}

fn load_template(path: &Path, kind: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            debug!("Loaded {} template from {}", kind, path.display());
            Ok(contents)
        }
        Err(err) => Err(Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        }),
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(MARKDOWN_EXTENSION))
        .unwrap_or(false)
}

/// The listing link for a document: its output path relative to the output
/// root, joined with `/` whatever the platform.
fn link(relative: &Path) -> String {
    relative
        .with_extension("html")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_asset(source: &Path, dest: &Path) -> DocumentResult<()> {
    info!("Copying {}...", source.display());
    let copy = || -> io::Result<()> {
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::copy(source, dest)?;
        Ok(())
    };
    copy().map_err(|err| DocumentError::Copy {
        from: source.to_owned(),
        to: dest.to_owned(),
        err,
    })
}

/// Recursively copies the contents of `src` into `dst`, merging with
/// whatever `dst` already holds.
fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    for result in WalkDir::new(src).min_depth(1) {
        let entry = result?;
        // strip_prefix() shouldn't fail since `src` is the walk root
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            fs::create_dir_all(dst.join(relative))?;
        } else {
            if let Some(dir) = dst.join(relative).parent() {
                fs::create_dir_all(dir)?;
            }
            fs::copy(entry.path(), dst.join(relative))?;
        }
    }

    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for fatal build problems. Any of these stops the build.
#[derive(Debug)]
pub enum Error {
    /// Returned when a required template file can't be read.
    OpenTemplateFile { path: PathBuf, err: io::Error },

    /// Returned when the input directory can't be read.
    OpenInputDirectory { path: PathBuf, err: io::Error },

    /// Returned when the output directory can't be created.
    CreateOutputDirectory { path: PathBuf, err: io::Error },

    /// Returned when the template's static directory can't be copied.
    CopyStatic { path: PathBuf, err: io::Error },

    /// Returned when the listing page can't be written.
    WriteListing { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Cannot open template file {}: {}", path.display(), err)
            }
            Error::OpenInputDirectory { path, err } => {
                write!(f, "Cannot open input directory {}: {}", path.display(), err)
            }
            Error::CreateOutputDirectory { path, err } => {
                write!(f, "Cannot create output directory {}: {}", path.display(), err)
            }
            Error::CopyStatic { path, err } => {
                write!(f, "Cannot copy static files from {}: {}", path.display(), err)
            }
            Error::WriteListing { path, err } => {
                write!(f, "Cannot write posts list file {}: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { err, .. } => Some(err),
            Error::OpenInputDirectory { err, .. } => Some(err),
            Error::CreateOutputDirectory { err, .. } => Some(err),
            Error::CopyStatic { err, .. } => Some(err),
            Error::WriteListing { err, .. } => Some(err),
        }
    }
}

type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// A problem with one input file. The file is skipped and the build goes on.
#[derive(Debug)]
pub enum DocumentError {
    /// Returned when a document can't be read.
    Read { path: PathBuf, err: io::Error },

    /// Returned when a document can't be converted to HTML.
    Convert { path: PathBuf, err: ConvertError },

    /// Returned when a page's output directory can't be created.
    CreateDirectory { path: PathBuf, err: io::Error },

    /// Returned when a page can't be written.
    Write { path: PathBuf, err: io::Error },

    /// Returned when an asset can't be copied.
    Copy {
        from: PathBuf,
        to: PathBuf,
        err: io::Error,
    },
}

impl fmt::Display for DocumentError {
    /// Implements [`fmt::Display`] for [`DocumentError`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DocumentError::Read { path, err } => {
                write!(f, "Cannot read {}: {}", path.display(), err)
            }
            DocumentError::Convert { path, err } => {
                write!(f, "Cannot convert {}: {}", path.display(), err)
            }
            DocumentError::CreateDirectory { path, err } => {
                write!(f, "Cannot create output directory {}: {}", path.display(), err)
            }
            DocumentError::Write { path, err } => {
                write!(f, "Cannot write output file {}: {}", path.display(), err)
            }
            DocumentError::Copy { from, to, err } => write!(
                f,
                "Cannot copy file {} to {}: {}",
                from.display(),
                to.display(),
                err
            ),
        }
    }
}

impl std::error::Error for DocumentError {
    /// Implements [`std::error::Error`] for [`DocumentError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Read { err, .. } => Some(err),
            DocumentError::Convert { err, .. } => Some(err),
            DocumentError::CreateDirectory { err, .. } => Some(err),
            DocumentError::Write { err, .. } => Some(err),
            DocumentError::Copy { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_markdown() {
        assert!(is_markdown(Path::new("post.md")));
        assert!(is_markdown(Path::new("notes/POST.MD")));
        assert!(!is_markdown(Path::new("image.png")));
        assert!(!is_markdown(Path::new("md")));
        assert!(!is_markdown(Path::new("post.markdown")));
    }

    #[test]
    fn test_link() {
        assert_eq!("post1.html", link(Path::new("post1.md")));
        assert_eq!("notes/2021/post.html", link(&Path::new("notes").join("2021").join("post.md")));
    }

    #[test]
    fn test_copy_dir_merges() -> io::Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        fs::create_dir_all(src.path().join("css"))?;
        fs::write(src.path().join("css/site.css"), "body {}")?;
        fs::write(src.path().join("favicon.ico"), [0u8, 1, 2])?;
        fs::write(dst.path().join("keep.txt"), "kept")?;

        copy_dir(src.path(), dst.path())?;

        assert_eq!("body {}", fs::read_to_string(dst.path().join("css/site.css"))?);
        assert_eq!(vec![0u8, 1, 2], fs::read(dst.path().join("favicon.ico"))?);
        assert_eq!("kept", fs::read_to_string(dst.path().join("keep.txt"))?);
        Ok(())
    }
}
