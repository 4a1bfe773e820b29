//! Rewrites links between documents. Every Markdown source is rendered to an
//! `.html` file at the same relative location, so a relative link to
//! `other.md` must point at `other.html` in the output.

use url::{ParseError, Url};

const MARKDOWN_EXTENSION: &str = ".md";
const HTML_EXTENSION: &str = ".html";

/// Converts a link destination from its source form to its output form.
/// Absolute URLs (anything with a scheme) and links to non-Markdown targets
/// are returned unchanged; a query or fragment is carried over.
pub fn convert(dest: &str) -> String {
    match Url::parse(dest) {
        Err(ParseError::RelativeUrlWithoutBase) => convert_relative(dest),
        _ => dest.to_owned(),
    }
}

fn convert_relative(dest: &str) -> String {
    let split = dest.find(|c: char| c == '?' || c == '#').unwrap_or(dest.len());
    let (path, suffix) = dest.split_at(split);

    let stem_len = path.len().saturating_sub(MARKDOWN_EXTENSION.len());
    match path.is_char_boundary(stem_len)
        && path.len() > MARKDOWN_EXTENSION.len()
        && path[stem_len..].eq_ignore_ascii_case(MARKDOWN_EXTENSION)
    {
        true => format!("{}{}{}", &path[..stem_len], HTML_EXTENSION, suffix),
        false => dest.to_owned(),
    }
}
