//! Idempotent `#tag` annotation of rendered message text.
//!
//! A message carries at most one tag group: a run of `#token` markers at the
//! start of a line, terminated by a line break (`\n` or `<br>`) or the end of
//! the text.
//!
//! ```text
//! add_tag("Order received", "paid")        -> "#paid\n\nOrder received"
//! add_tag("#paid\n\nOrder received", "sent") -> "#paid #sent\n\nOrder received"
//! add_tag("#paid #sent\n\n...", "paid")      -> unchanged
//! ```

use std::sync::OnceLock;

use regex::Regex;

fn tag_group() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(#[^\s#<]+(?:[ \t]+#[^\s#<]+)*)[ \t]*(?:\r?\n|<br\s*/?>|$)")
            .expect("tag group pattern is valid")
    })
}

/// Normalizes a tag into a single token without the leading `#`.
///
/// Characters that would end a token are replaced with `_`.
fn normalize(tag: &str) -> String {
    tag.trim()
        .trim_start_matches('#')
        .chars()
        .map(|c| if c.is_whitespace() || c == '#' || c == '<' { '_' } else { c })
        .collect()
}

/// Ensures the tag group of `text` contains `tag`.
///
/// Without a tag group, a new group holding only `tag` is prepended followed
/// by a blank line. A group that already lists the tag is left alone;
/// otherwise the tag is appended after the last tag of the group. Everything
/// else is preserved byte for byte. An empty tag leaves the text unchanged.
pub fn add_tag(text: &str, tag: &str) -> String {
    let tag = normalize(tag);
    if tag.is_empty() {
        return text.to_owned();
    }
    let marker = format!("#{tag}");

    let Some(group) = tag_group().captures(text).and_then(|c| c.get(1)) else {
        return format!("{marker}\n\n{text}");
    };

    if group.as_str().split_whitespace().any(|t| t == marker) {
        return text.to_owned();
    }

    let mut tagged = String::with_capacity(text.len() + marker.len() + 1);
    tagged.push_str(&text[..group.end()]);
    tagged.push(' ');
    tagged.push_str(&marker);
    tagged.push_str(&text[group.end()..]);
    tagged
}

/// Returns the tags of the first tag group, without their `#`.
pub fn tags(text: &str) -> Vec<&str> {
    tag_group()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|group| {
            group
                .as_str()
                .split_whitespace()
                .map(|t| t.trim_start_matches('#'))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_group_when_missing() {
        assert_eq!(add_tag("Order received", "paid"), "#paid\n\nOrder received");
    }

    #[test]
    fn test_idempotent() {
        for text in ["Order received", "#a\n\nbody", "#a #b<br/>body", ""] {
            let once = add_tag(text, "x");
            assert_eq!(add_tag(&once, "x"), once, "text: {text:?}");
        }
    }

    #[test]
    fn test_two_tags_share_one_group() {
        let tagged = add_tag(&add_tag("Order received", "x"), "y");
        assert_eq!(tagged, "#x #y\n\nOrder received");
        assert_eq!(tags(&tagged), vec!["x", "y"]);
        assert_eq!(tagged.matches('#').count(), 2);
    }

    #[test]
    fn test_appends_inside_html_group() {
        let text = "#new<br/><br/>Order <b>#17</b>";
        assert_eq!(add_tag(text, "paid"), "#new #paid<br/><br/>Order <b>#17</b>");
    }

    #[test]
    fn test_group_at_end_of_text() {
        assert_eq!(add_tag("body\n#a", "b"), "body\n#a #b");
    }

    #[test]
    fn test_inline_hash_is_not_a_group() {
        assert_eq!(add_tag("Issue #17 fixed", "done"), "#done\n\nIssue #17 fixed");
    }

    #[test]
    fn test_tag_is_normalized() {
        assert_eq!(add_tag("body", "in work"), "#in_work\n\nbody");
        assert_eq!(add_tag("body", "  "), "body");
        assert_eq!(add_tag("body", "##vip"), "#vip\n\nbody");
    }
}
