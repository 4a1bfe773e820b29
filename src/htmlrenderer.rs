//! Implements a custom [`push_html`] so that output can be decorated while it
//! is rendered: configured CSS classes are attached to opening tags, headings
//! can carry slug IDs, and image alt text is collected properly.
//! [`pulldown_cmark::html::push_html`] offers no hook for any of these.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::io;

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(&'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(&'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// A heading whose opening tag is held back until its text (and so its ID)
/// is known.
struct PendingHeading {
    level: u32,
    text: String,
    html: String,
}

/// An image whose alt text is still being collected.
struct PendingImage<'a> {
    dest: CowStr<'a>,
    title: CowStr<'a>,
    alt: String,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private [`HtmlWriter`
/// struct](https://github.com/raphlinus/pulldown-cmark/blob/bf0a1a4938dbd2ec41c3add069b3d361d11731f4/src/html.rs#L36-L50).
pub(crate) struct HtmlRenderer<'a, 'c> {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// CSS classes to attach, keyed by element name.
    classes: &'c BTreeMap<String, String>,

    /// Whether headings get `id` attributes.
    header_ids: bool,

    /// How many times each heading ID has been handed out.
    used_ids: HashMap<String, usize>,

    heading: Option<PendingHeading>,
    image: Option<PendingImage<'a>>,
}

impl<'a, 'c> HtmlRenderer<'a, 'c> {
    pub(crate) fn new(classes: &'c BTreeMap<String, String>, header_ids: bool) -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            classes,
            header_ids,
            used_ids: HashMap::new(),
            heading: None,
            image: None,
        }
    }

    pub(crate) fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        match self.heading.take() {
            None => self.render(w, event),
            Some(heading) => match event {
                Event::End(Tag::Heading(_)) => self.finish_heading(w, heading),
                event => {
                    let mut heading = heading;
                    if let Event::Text(text) | Event::Code(text) = &event {
                        heading.text.push_str(text);
                    }
                    let result = self.render(&mut heading.html, event);
                    self.heading = Some(heading);
                    result
                }
            },
        }
    }

    fn render<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        if self.image.is_some() {
            return match event {
                Event::End(Tag::Image(..)) => match self.image.take() {
                    Some(image) => self.finish_image(w, image),
                    None => Ok(()),
                },
                Event::Text(text) | Event::Code(text) => {
                    if let Some(image) = &mut self.image {
                        image.alt.push_str(&text);
                    }
                    Ok(())
                }
                _ => Ok(()),
            };
        }

        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => {
                self.open_classed(w, "sup", "footnote-reference", "")?;
                write!(
                    w,
                    "<a href=\"#{}\">{}</a></sup>",
                    EscapeHtml(&name),
                    EscapeHtml(&name),
                )
            }
            Event::HardBreak => self.void(w, "br", ""),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => self.void(w, "hr", ""),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => self.void(
                w,
                "input",
                match checked {
                    true => r#" disabled="" type="checkbox" checked="""#,
                    false => r#" disabled="" type="checkbox""#,
                },
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    /// Writes an opening tag, adding the configured class for `element`.
    /// `attributes` must already be escaped and start with a space.
    fn open<W: StrWrite>(&self, w: &mut W, element: &str, attributes: &str) -> io::Result<()> {
        self.tag(w, element, None, attributes, ">")
    }

    /// Like [`HtmlRenderer::open`] for elements that carry a class of their
    /// own. The configured class and `class` share one attribute.
    fn open_classed<W: StrWrite>(
        &self,
        w: &mut W,
        element: &str,
        class: &str,
        attributes: &str,
    ) -> io::Result<()> {
        self.tag(w, element, Some(class), attributes, ">")
    }

    /// Like [`HtmlRenderer::open`] but for elements without content.
    fn void<W: StrWrite>(&self, w: &mut W, element: &str, attributes: &str) -> io::Result<()> {
        self.tag(w, element, None, attributes, " />")
    }

    fn tag<W: StrWrite>(
        &self,
        w: &mut W,
        element: &str,
        class: Option<&str>,
        attributes: &str,
        end: &str,
    ) -> io::Result<()> {
        let class = match (self.classes.get(element), class) {
            (Some(mapped), Some(own)) => Some(format!("{} {}", mapped, own)),
            (Some(mapped), None) => Some(mapped.clone()),
            (None, own) => own.map(str::to_owned),
        };
        match class {
            Some(class) => write!(
                w,
                r#"<{} class="{}"{}{}"#,
                element,
                EscapeHtml(&class),
                attributes,
                end
            ),
            None => write!(w, "<{}{}{}", element, attributes, end),
        }
    }

    fn on_start<W: StrWrite>(&mut self, w: &mut W, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => self.open(w, "blockquote", ""),
            Tag::CodeBlock(kind) => {
                self.open(w, "pre", "")?;
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info.split(' ').next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };
                match lang.is_empty() {
                    true => self.open(w, "code", ""),
                    false => self.open_classed(w, "code", &format!("language-{}", lang), ""),
                }
            }
            Tag::Emphasis => self.open(w, "em", ""),
            Tag::FootnoteDefinition(name) => {
                self.open_classed(
                    w,
                    "div",
                    "footnote-definition",
                    &format!(r#" id="{}""#, EscapeHtml(&name)),
                )?;
                write!(w, "{}. &nbsp;", EscapeHtml(&name))
            }
            Tag::Heading(level) => match self.header_ids {
                true => {
                    self.heading = Some(PendingHeading {
                        level,
                        text: String::new(),
                        html: String::new(),
                    });
                    Ok(())
                }
                false => self.open(w, &format!("h{}", level), ""),
            },
            Tag::Image(_link_type, dest, title) => {
                self.image = Some(PendingImage {
                    dest,
                    title,
                    alt: String::new(),
                });
                Ok(())
            }
            Tag::Item => self.open(w, "li", ""),
            Tag::Link(LinkType::Email, dest, title) => self.open(
                w,
                "a",
                &link_attributes("mailto:", &dest, &title),
            ),
            Tag::Link(_link_type, dest, title) => {
                self.open(w, "a", &link_attributes("", &dest, &title))
            }
            Tag::List(None) => self.open(w, "ul", ""),
            Tag::List(Some(1)) => self.open(w, "ol", ""),
            Tag::List(Some(start)) => {
                self.open(w, "ol", &format!(r#" start="{}""#, start))
            }
            Tag::Paragraph => self.open(w, "p", ""),
            Tag::Strikethrough => self.open(w, "del", ""),
            Tag::Strong => self.open(w, "strong", ""),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                self.open(w, "table", "")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                self.open(w, "thead", "")?;
                self.open(w, "tr", "")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                self.open(w, "tr", "")
            }
            Tag::TableCell => self.open(
                w,
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                },
            ),
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>\n"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Heading(level) => write!(w, "</h{}>\n", level),
            Tag::Image(_, _, _) => Ok(()), // handled in `render`
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(_, _, _) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => {
                self.table_state = TableState::Head;
                w.write_str("</tbody></table>\n")
            }
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead>")?;
                self.open(w, "tbody", "")
            }
            Tag::TableRow => w.write_str("</tr>\n"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_code<W: StrWrite>(&mut self, w: &mut W, s: CowStr) -> io::Result<()> {
        self.open(w, "code", "")?;
        write!(w, "{}</code>", EscapeHtml(&s))
    }

    fn finish_heading<W: StrWrite>(&mut self, w: &mut W, heading: PendingHeading) -> io::Result<()> {
        let id = self.unique_id(&heading.text);
        let element = format!("h{}", heading.level);
        self.open(w, &element, &format!(r#" id="{}""#, EscapeHtml(&id)))?;
        w.write_str(&heading.html)?;
        write!(w, "</{}>\n", element)
    }

    fn finish_image<W: StrWrite>(&mut self, w: &mut W, image: PendingImage) -> io::Result<()> {
        let mut attributes = format!(
            r#" src="{}" alt="{}""#,
            EscapeHref(&image.dest),
            EscapeHtml(&image.alt),
        );
        if !image.title.is_empty() {
            attributes.push_str(&format!(r#" title="{}""#, EscapeHtml(&image.title)));
        }
        self.void(w, "img", &attributes)
    }

    /// Slugifies heading text into an ID, suffixing `-1`, `-2`, ... on
    /// repeats within the document.
    fn unique_id(&mut self, text: &str) -> String {
        let mut base = slug::slugify(text);
        if base.is_empty() {
            base = String::from("section");
        }
        let seen = self.used_ids.entry(base.clone()).or_insert(0);
        let id = match *seen {
            0 => base,
            n => format!("{}-{}", base, n),
        };
        *seen += 1;
        id
    }
}

fn link_attributes(scheme: &str, dest: &str, title: &str) -> String {
    let mut attributes = format!(r#" href="{}{}""#, scheme, EscapeHref(dest));
    if !title.is_empty() {
        attributes.push_str(&format!(r#" title="{}""#, EscapeHtml(title)));
    }
    attributes
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html`, decorating tags with `classes` and,
/// when `header_ids` is set, giving headings slug IDs.
pub fn push_html<'a, I>(
    out: &mut String,
    events: I,
    classes: &BTreeMap<String, String>,
    header_ids: bool,
) -> io::Result<()>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new(classes, header_ids);
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pulldown_cmark::{Options, Parser};

    fn render(markdown: &str, classes: &[(&str, &str)], header_ids: bool) -> String {
        let classes: BTreeMap<String, String> = classes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        let mut out = String::new();
        push_html(
            &mut out,
            Parser::new_ext(markdown, options),
            &classes,
            header_ids,
        )
        .unwrap();
        out
    }

    #[test]
    fn test_plain_paragraph() {
        assert_eq!("<p>Hello <em>world</em></p>\n", render("Hello *world*", &[], false));
    }

    #[test]
    fn test_classes_on_exact_elements() {
        assert_eq!(
            "<p class=\"para\">a</p>\n<pre><code>b\n</code></pre>\n",
            render("a\n\n    b", &[("p", "para")], false),
        );
    }

    #[test]
    fn test_class_on_void_element() {
        assert_eq!(
            "<hr class=\"rule\" />",
            render("***", &[("hr", "rule")], false),
        );
    }

    #[test]
    fn test_mapped_class_merges_with_language_class() {
        assert_eq!(
            "<pre><code class=\"hl language-rust\">fn x() {}\n</code></pre>\n",
            render("```rust\nfn x() {}\n```", &[("code", "hl")], false),
        );
        assert_eq!(
            "<pre><code class=\"language-rust\">fn x() {}\n</code></pre>\n",
            render("```rust\nfn x() {}\n```", &[], false),
        );
    }

    #[test]
    fn test_mapped_class_merges_with_footnote_classes() {
        let got = render("a[^n]\n\n[^n]: b", &[("sup", "ref"), ("div", "note")], false);
        assert!(got.contains("<sup class=\"ref footnote-reference\"><a href=\"#n\">n</a></sup>"));
        assert!(got.contains("<div class=\"note footnote-definition\" id=\"n\">"));
        assert_eq!(2, got.matches("class=").count());
    }

    #[test]
    fn test_heading_without_ids() {
        assert_eq!(
            "<h2 class=\"t\">Hi <code>x</code></h2>\n",
            render("## Hi `x`", &[("h2", "t")], false),
        );
    }

    #[test]
    fn test_heading_ids_are_unique() {
        assert_eq!(
            "<h1 id=\"intro\">Intro</h1>\n<h2 id=\"intro-1\">Intro</h2>\n<h2 id=\"section\">!!</h2>\n",
            render("# Intro\n## Intro\n## !!", &[], true),
        );
    }

    #[test]
    fn test_image_alt_text() {
        assert_eq!(
            "<p><img src=\"cat.png\" alt=\"a cat\" title=\"Cat\" /></p>\n",
            render("![a *cat*](cat.png \"Cat\")", &[], false),
        );
    }

    #[test]
    fn test_strikethrough_and_link() {
        assert_eq!(
            "<p><del>old</del> <a href=\"https://example.org/\">new</a></p>\n",
            render("~~old~~ [new](https://example.org/)", &[], false),
        );
    }

    #[test]
    fn test_table() {
        assert_eq!(
            "<table><thead><tr><th>a</th><th align=\"right\">b</th></tr></thead>\
             <tbody class=\"body\"><tr><td>1</td><td align=\"right\">2</td></tr>\n</tbody></table>\n",
            render("| a | b |\n|---|--:|\n| 1 | 2 |", &[("tbody", "body")], false),
        );
    }
}
