//! Text cleanup before it reaches the Bot API.
//!
//! Telegram's HTML mode accepts a small tag set and rejects the whole call on
//! anything else, so HTML text is reduced to that set first. Paragraphs and
//! line breaks become newlines.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use switchboard_core::ParseMode;

/// Tags kept in HTML text. `p` and `br` are turned into newlines afterwards.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "a", "b", "i", "u", "s", "strong", "strike", "em", "del", "code", "pre",
];

fn comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<\?.*?\?>").expect("comment pattern is valid"))
}

fn tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?([a-z][a-z0-9]*)\b[^>]*/?>").expect("tag pattern is valid")
    })
}

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(?:p|br)\s?/?>").expect("line break pattern is valid"))
}

fn paragraph_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</p>").expect("paragraph pattern is valid"))
}

/// Removes every tag outside [`ALLOWED_TAGS`], along with comments and
/// processing instructions. `&nbsp;` becomes a plain space.
fn strip_tags(text: &str) -> String {
    let text = text.replace("&nbsp;", " ");
    let text = comment().replace_all(&text, "");
    tag()
        .replace_all(&text, |caps: &Captures<'_>| {
            let name = caps[1].to_ascii_lowercase();
            if ALLOWED_TAGS.contains(&name.as_str()) {
                caps[0].to_owned()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Prepares `text` for the given parse mode. Markdown text passes through.
pub fn prepare_text(text: &str, parse_mode: ParseMode) -> Cow<'_, str> {
    match parse_mode {
        ParseMode::Html => {
            let text = strip_tags(text);
            let text = line_break().replace_all(&text, "\n");
            Cow::Owned(paragraph_end().replace_all(&text, "").into_owned())
        }
        ParseMode::Markdown | ParseMode::MarkdownV2 => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_become_newlines() {
        let text = prepare_text("one<br/>two<BR>three<br />four", ParseMode::Html);
        assert_eq!(text, "one\ntwo\nthree\nfour");
        assert_eq!(prepare_text("<p>one</p><p>two</p>", ParseMode::Html), "\none\ntwo");
    }

    #[test]
    fn test_unsupported_tags_are_stripped() {
        let text = prepare_text(
            r#"<div class="card"><b>Total</b>: <span>42</span></div>"#,
            ParseMode::Html,
        );
        assert_eq!(text, "<b>Total</b>: 42");
        assert_eq!(
            prepare_text(r#"<a href="https://x.io">link</a>"#, ParseMode::Html),
            r#"<a href="https://x.io">link</a>"#
        );
    }

    #[test]
    fn test_comments_and_nbsp() {
        let text = prepare_text("a&nbsp;b<!-- note -->c<?php echo 1; ?>", ParseMode::Html);
        assert_eq!(text, "a bc");
    }

    #[test]
    fn test_markdown_passes_through() {
        let raw = "<div>*bold*</div><br>";
        assert!(matches!(prepare_text(raw, ParseMode::Markdown), Cow::Borrowed(t) if t == raw));
        assert_eq!(prepare_text(raw, ParseMode::MarkdownV2), raw);
    }
}
