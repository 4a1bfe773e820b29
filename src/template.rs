//! Literal-token templating for the two kinds of output page.
//!
//! Post pages are rendered with [`render_page`], which fills the `${TITLE}`
//! and `${CONTENT}` tokens. The listing page is rendered with [`expand`],
//! which finds every `${ITEM:<fragment>}` placeholder and replaces it with
//! one copy of `<fragment>` per post, filling the `$DATE`, `$LINK` and
//! `$TITLE` tokens from each post in turn. Everything outside a placeholder
//! is copied through verbatim.

use crate::post::Post;

const TITLE_TOKEN: &str = "${TITLE}";
const CONTENT_TOKEN: &str = "${CONTENT}";

const ITEM_OPEN: &str = "${ITEM:";
const ITEM_CLOSE: char = '}';

const DATE_FIELD: &str = "$DATE";
const LINK_FIELD: &str = "$LINK";
const TITLE_FIELD: &str = "$TITLE";

/// Renders a post page, replacing every `${TITLE}` with `title` and every
/// `${CONTENT}` with `content`. Substituted text is not rescanned, so a
/// title containing `${CONTENT}` comes out literally.
pub fn render_page(template: &str, title: &str, content: &str) -> String {
    substitute(template, &[(TITLE_TOKEN, title), (CONTENT_TOKEN, content)])
}

/// A `${ITEM:<fragment>}` span found in a listing template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte offset of the `$` that opens the placeholder.
    pub start: usize,

    /// Byte length of the whole placeholder, braces included.
    pub len: usize,

    /// The text between `${ITEM:` and the first following `}`.
    pub fragment: &'a str,
}

impl<'a> Placeholder<'a> {
    fn end(&self) -> usize {
        self.start + self.len
    }

    /// Instantiates the fragment once per post, in order.
    fn expand(&self, posts: &[Post]) -> String {
        let mut out = String::new();
        for post in posts {
            out.push_str(&substitute(
                self.fragment,
                &[
                    (DATE_FIELD, post.display_date.as_str()),
                    (LINK_FIELD, post.link.as_str()),
                    (TITLE_FIELD, post.title.as_str()),
                ],
            ));
        }
        out
    }
}

/// Scans `template` left to right for non-overlapping placeholders. The
/// fragment stops at the first `}`, so fragments cannot contain one and
/// placeholders do not nest.
pub fn placeholders(template: &str) -> Placeholders<'_> {
    Placeholders {
        template,
        offset: 0,
    }
}

/// Iterator returned by [`placeholders`].
pub struct Placeholders<'a> {
    template: &'a str,
    offset: usize,
}

impl<'a> Iterator for Placeholders<'a> {
    type Item = Placeholder<'a>;

    fn next(&mut self) -> Option<Placeholder<'a>> {
        let rest = &self.template[self.offset..];
        let start = self.offset + rest.find(ITEM_OPEN)?;
        let fragment_start = start + ITEM_OPEN.len();

        // Without a closing brace no later opener can match either.
        let fragment_len = match self.template[fragment_start..].find(ITEM_CLOSE) {
            Some(len) => len,
            None => {
                self.offset = self.template.len();
                return None;
            }
        };

        let placeholder = Placeholder {
            start,
            len: ITEM_OPEN.len() + fragment_len + 1,
            fragment: &self.template[fragment_start..fragment_start + fragment_len],
        };
        self.offset = placeholder.end();
        Some(placeholder)
    }
}

/// Renders the listing template against `posts`, which should already be in
/// display order. A template with no placeholders is returned unchanged and
/// an empty `posts` makes every placeholder vanish.
pub fn expand(template: &str, posts: &[Post]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut copied = 0;
    for placeholder in placeholders(template) {
        out.push_str(&template[copied..placeholder.start]);
        out.push_str(&placeholder.expand(posts));
        copied = placeholder.end();
    }
    out.push_str(&template[copied..]);
    out
}

/// Replaces every occurrence of each token with its value in one
/// left-to-right pass. Tokens are matched at each position in the order
/// given; inserted values are never scanned again.
fn substitute(text: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find('$') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match replacements
            .iter()
            .find(|(token, _)| rest.starts_with(token))
        {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push('$');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
