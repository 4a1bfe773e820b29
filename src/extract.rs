//! Derives a [`Post`] from a converted document: the title comes from the
//! `title` metadata field or the first heading, and the date comes from the
//! `date` metadata field or the source file's modification time.
//!
//! Every fallback here is a warning, never an error. A document with no
//! title gets an empty one, and a document with no usable date is stamped
//! with the time of the build.

use crate::post::Post;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::SystemTime;

/// The format for [`Post::display_date`], e.g. `Mon Apr 16 2021`.
pub const DISPLAY_DATE_FORMAT: &str = "%a %b %d %Y";

const TITLE_FIELD: &str = "title";
const DATE_FIELD: &str = "date";

const UNLISTED_STEM: &str = "index";

/// Builds the listing record for one document.
///
/// * `link` is the rendered page's path relative to the output root.
/// * `html` and `metadata` are the converter's output for the document.
/// * `modified` is the source file's modification time, or the error from
///   trying to read it.
pub fn extract(
    link: &str,
    html: &str,
    metadata: &HashMap<String, String>,
    modified: io::Result<SystemTime>,
) -> Post {
    let title = resolve_title(metadata, html);
    if title.is_empty() {
        warn!(" - No title found for `{}`", link);
    }

    let date = resolve_date(metadata, modified, Utc::now);
    Post {
        timestamp: date.timestamp_millis(),
        display_date: date.format(DISPLAY_DATE_FORMAT).to_string(),
        link: link.to_owned(),
        title,
    }
}

/// Returns false for documents that are rendered but kept off the listing,
/// i.e. those whose file stem is `index` in any case.
pub fn is_listed(file_stem: &str) -> bool {
    !file_stem.eq_ignore_ascii_case(UNLISTED_STEM)
}

/// Prefers a non-empty `title` metadata field, then the text of the first
/// heading in `html`, then the empty string.
pub fn resolve_title(metadata: &HashMap<String, String>, html: &str) -> String {
    match metadata.get(TITLE_FIELD) {
        Some(title) if !title.is_empty() => title.clone(),
        _ => first_heading(html).map(strip_tags).unwrap_or_default(),
    }
}

/// Prefers the `date` metadata field, then the file modification time. A
/// date that can't be parsed or read falls back to `now()`.
pub fn resolve_date(
    metadata: &HashMap<String, String>,
    modified: io::Result<SystemTime>,
    now: impl FnOnce() -> DateTime<Utc>,
) -> DateTime<Utc> {
    match metadata.get(DATE_FIELD) {
        Some(date) => match parse_date(date) {
            Some(date) => date,
            None => {
                warn!(" - Cannot parse date `{}`, using the current time", date);
                now()
            }
        },
        None => match modified {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                warn!(
                    " - Cannot read modification time ({}), using the current time",
                    e
                );
                now()
            }
        },
    }
}

/// Parses a metadata date. Values without an offset are taken as UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    const NAIVE_DATE_TIMES: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    const NAIVE_DATES: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(input) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIMES {
        if let Ok(date) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }
    for format in NAIVE_DATES {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_hms_opt(0, 0, 0).map(|d| Utc.from_utc_datetime(&d));
        }
    }
    None
}

/// Finds the inner HTML of the earliest `<h1>`..`<h6>` element. Tag names
/// match without regard to ASCII case.
fn first_heading(html: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    let mut from = 0;
    while let Some(i) = lower[from..].find("<h") {
        let open = from + i;
        from = open + 2;

        let level = match bytes.get(open + 2).copied() {
            Some(b @ b'1'..=b'6') => b as char,
            _ => continue,
        };
        match bytes.get(open + 3).copied() {
            Some(b'>') | Some(b'/') => {}
            Some(b) if b.is_ascii_whitespace() => {}
            _ => continue,
        }

        let inner_start = open + 3 + lower[open + 3..].find('>')? + 1;
        let close = format!("</h{}>", level);
        return match lower[inner_start..].find(&close) {
            Some(len) => Some(&html[inner_start..inner_start + len]),
            None => None,
        };
    }
    None
}

/// Removes every `<...>` span, leaving the text between tags.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                // An unclosed `<` is text.
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        let date = NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap();
        Utc.from_utc_datetime(&date)
    }

    fn fixed_now() -> DateTime<Utc> {
        utc(2000, 1, 1, 12, 0)
    }

    #[test]
    fn test_title_prefers_metadata() {
        assert_eq!(
            "A",
            resolve_title(&metadata(&[("title", "A")]), "<h2>B</h2>"),
        );
    }

    #[test]
    fn test_title_empty_metadata_falls_back_to_heading() {
        assert_eq!(
            "B",
            resolve_title(&metadata(&[("title", "")]), "<h2>B</h2>"),
        );
    }

    #[test]
    fn test_title_strips_nested_markup() {
        assert_eq!(
            "Hello World",
            resolve_title(&HashMap::new(), "<h1>Hello <em>World</em></h1>"),
        );
    }

    #[test]
    fn test_title_uses_earliest_heading_of_any_level() {
        assert_eq!(
            "Sub",
            resolve_title(
                &HashMap::new(),
                "<p>intro</p>\n<h3 id=\"sub\">Sub</h3>\n<h1>Main</h1>",
            ),
        );
    }

    #[test]
    fn test_title_ignores_head_and_hr() {
        assert_eq!(
            "Real",
            resolve_title(
                &HashMap::new(),
                "<head></head><hr /><header>x</header><H2 class=\"t\">Real</H2>",
            ),
        );
    }

    #[test]
    fn test_title_missing() {
        assert_eq!("", resolve_title(&HashMap::new(), "<p>no heading</p>"));
        assert_eq!("", resolve_title(&HashMap::new(), "<h1>unclosed"));
    }

    #[test]
    fn test_strip_tags_unclosed() {
        assert_eq!("a < b", strip_tags("a <i>< b"));
    }

    #[test]
    fn test_parse_date_formats() {
        let midnight = utc(2021, 4, 16, 0, 0);
        assert_eq!(Some(midnight), parse_date("2021-04-16"));
        assert_eq!(Some(midnight), parse_date("2021/04/16"));
        assert_eq!(Some(midnight), parse_date(" 2021-04-16T00:00:00Z "));
        assert_eq!(
            Some(utc(2021, 4, 16, 7, 30)),
            parse_date("2021-04-16T09:30:00+02:00"),
        );
        assert_eq!(
            Some(utc(2021, 4, 16, 7, 30)),
            parse_date("Fri, 16 Apr 2021 09:30:00 +0200"),
        );
        assert_eq!(Some(utc(2021, 4, 16, 9, 30)), parse_date("2021-04-16 09:30"));
        assert_eq!(None, parse_date("last tuesday"));
    }

    #[test]
    fn test_date_prefers_metadata() {
        let modified = Ok(UNIX_EPOCH + Duration::from_secs(86_400));
        assert_eq!(
            utc(2021, 4, 16, 0, 0),
            resolve_date(&metadata(&[("date", "2021-04-16")]), modified, fixed_now),
        );
    }

    #[test]
    fn test_date_falls_back_to_modified() {
        let modified = Ok(UNIX_EPOCH + Duration::from_secs(86_400));
        assert_eq!(
            utc(1970, 1, 2, 0, 0),
            resolve_date(&HashMap::new(), modified, fixed_now),
        );
    }

    #[test]
    fn test_date_unparseable_uses_now() {
        let modified = Ok(UNIX_EPOCH);
        assert_eq!(
            fixed_now(),
            resolve_date(&metadata(&[("date", "soon")]), modified, fixed_now),
        );
    }

    #[test]
    fn test_date_unreadable_mtime_uses_now() {
        let modified = Err(io::Error::new(io::ErrorKind::Other, "no mtime"));
        assert_eq!(fixed_now(), resolve_date(&HashMap::new(), modified, fixed_now));
    }

    #[test]
    fn test_extract() {
        let post = extract(
            "notes/hello.html",
            "<h1>Hello</h1><p>body</p>",
            &metadata(&[("date", "2021-04-16")]),
            Ok(UNIX_EPOCH),
        );
        assert_eq!(
            Post {
                timestamp: 1_618_531_200_000,
                display_date: String::from("Fri Apr 16 2021"),
                link: String::from("notes/hello.html"),
                title: String::from("Hello"),
            },
            post,
        );
    }

    #[test]
    fn test_is_listed() {
        assert!(is_listed("post1"));
        assert!(is_listed("indexes"));
        assert!(!is_listed("index"));
        assert!(!is_listed("INDEX"));
        assert!(!is_listed("Index"));
    }
}
