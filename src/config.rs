//! Defines [`Config`], the set of directories a build reads from and writes
//! to. It is built once at startup and passed by reference from then on.

use std::path::{Path, PathBuf};

/// Environment variable naming the input directory.
pub const INPUT_VAR: &str = "MD_INPUT";

/// Environment variable naming the template directory.
pub const TEMPLATE_VAR: &str = "MD_TEMPLATE";

/// Environment variable naming the output directory.
pub const OUTPUT_VAR: &str = "MD_OUTPUT";

const DEFAULT_INPUT: &str = "input";
const DEFAULT_TEMPLATE: &str = "template";
const DEFAULT_OUTPUT: &str = "output";

const PAGE_TEMPLATE: &str = "post.html";
const LISTING_TEMPLATE: &str = "posts.html";
const CLASSES_FILE: &str = "classes.json";
const STATIC_DIRECTORY: &str = "static";
const LISTING_OUTPUT: &str = "posts.html";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The tree of Markdown documents and assets to render.
    pub input_directory: PathBuf,

    /// Holds `post.html`, `posts.html`, and optionally `classes.json` and a
    /// `static/` directory.
    pub template_directory: PathBuf,

    /// Where the rendered site is written.
    pub output_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_directory: PathBuf::from(DEFAULT_INPUT),
            template_directory: PathBuf::from(DEFAULT_TEMPLATE),
            output_directory: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl Config {
    /// Reads `MD_INPUT`, `MD_TEMPLATE` and `MD_OUTPUT`, defaulting each unset
    /// or empty variable to `input`, `template` or `output`.
    pub fn from_env() -> Config {
        Config::from_lookup(|key| std::env::var_os(key).map(PathBuf::from))
    }

    /// Like [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let var = |key: &str, default: &str| match lookup(key) {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => PathBuf::from(default),
        };
        Config {
            input_directory: var(INPUT_VAR, DEFAULT_INPUT),
            template_directory: var(TEMPLATE_VAR, DEFAULT_TEMPLATE),
            output_directory: var(OUTPUT_VAR, DEFAULT_OUTPUT),
        }
    }

    /// The template for individual pages.
    pub fn page_template(&self) -> PathBuf {
        self.template_directory.join(PAGE_TEMPLATE)
    }

    /// The template for the listing page.
    pub fn listing_template(&self) -> PathBuf {
        self.template_directory.join(LISTING_TEMPLATE)
    }

    /// The optional element-to-class mapping.
    pub fn classes_file(&self) -> PathBuf {
        self.template_directory.join(CLASSES_FILE)
    }

    /// The optional tree copied verbatim into the output root.
    pub fn static_directory(&self) -> PathBuf {
        self.template_directory.join(STATIC_DIRECTORY)
    }

    /// Where the listing page is written.
    pub fn listing_output(&self) -> PathBuf {
        self.output_directory.join(LISTING_OUTPUT)
    }

    /// Where the rendered page for `relative` (a path under the input
    /// directory) is written.
    pub fn page_output(&self, relative: &Path) -> PathBuf {
        self.output_directory.join(relative.with_extension("html"))
    }
}
