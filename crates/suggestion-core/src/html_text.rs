//! Plain-text projections of note HTML.
//!
//! These are lenient, regex-driven passes: anything they do not recognize is
//! treated as text, so malformed markup degrades instead of failing.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b[^>]*>.*?</pre\s*>|<code\b[^>]*>.*?</code\s*>").unwrap()
});

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>.*?</a\s*>").unwrap());

static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .unwrap()
});

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|blockquote|tr|pre|ul|ol|table)\s*>").unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)</?[a-zA-Z][^>]*>").unwrap());

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap());

static MEDIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:img|video|audio|iframe|embed|object|canvas|svg|hr|input)\b").unwrap()
});

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:ul|ol)\b[^>]*>(.*?)</(?:ul|ol)\s*>").unwrap());

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)(?:</li\s*>|$)").unwrap());

/// Named entities that show up in editor output. Unknown names are left as-is.
pub fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "hellip" => "\u{2026}",
        "middot" => "\u{b7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        _ => return None,
    })
}

/// Replace character references. Invalid code points are kept verbatim.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
        } else {
            named_entity(body).map(String::from)
        };
        decoded.unwrap_or_else(|| caps[0].to_string())
    })
}

fn strip_tags(html: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(html, |caps: &Captures| format!("{}\n", &caps[0]));
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped).into_owned()
}

/// Text a reader sees: tags removed, `<br>` and block ends turned into newlines.
pub fn visible_text(html: &str) -> String {
    let without_hidden = HIDDEN_RE.replace_all(html, "");
    strip_tags(&without_hidden)
}

/// Text used for keyword scanning and readability: like [`visible_text`], but
/// code blocks, inline code and anchors are removed entirely.
pub fn raw_text(html: &str) -> String {
    let without_hidden = HIDDEN_RE.replace_all(html, "");
    let without_code = CODE_RE.replace_all(&without_hidden, "");
    let without_anchors = ANCHOR_RE.replace_all(&without_code, "");
    strip_tags(&without_anchors)
}

/// True when the fragment embeds non-text content such as images.
pub fn has_media(html: &str) -> bool {
    MEDIA_RE.is_match(html)
}

/// True when a fragment renders to nothing: no visible text and no media.
pub fn is_blank(html: &str) -> bool {
    !has_media(html) && visible_text(html).trim().is_empty()
}

/// Visible text of every item, per list, in document order.
pub fn list_items(html: &str) -> Vec<Vec<String>> {
    LIST_RE
        .captures_iter(html)
        .map(|list| {
            LIST_ITEM_RE
                .captures_iter(&list[1])
                .map(|item| visible_text(&item[1]))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#54620;&#xAE00;"), "한글");
        assert_eq!(decode_entities("&nbsp;"), "\u{a0}");
    }

    #[test]
    fn keeps_unknown_entities() {
        assert_eq!(decode_entities("&bogus; &#xFFFFFF;"), "&bogus; &#xFFFFFF;");
    }

    #[test]
    fn visible_text_turns_breaks_into_newlines() {
        let text = visible_text("<p>one<br>two</p><p>three</p>");
        assert_eq!(text, "one\ntwo\nthree\n");
    }

    #[test]
    fn raw_text_strips_code_and_anchors() {
        let html = r#"<p>See <a href="?title=B">B</a> and <code>let x</code> here</p><pre>fn main() {}</pre>"#;
        let text = raw_text(html);
        assert!(!text.contains('B'), "anchor text leaked: {text:?}");
        assert!(!text.contains("let x"), "inline code leaked: {text:?}");
        assert!(!text.contains("fn main"), "code block leaked: {text:?}");
        assert!(text.contains("See"));
        assert!(text.contains("here"));
    }

    #[test]
    fn malformed_markup_degrades_to_text() {
        assert_eq!(visible_text("a < b and <p unterminated"), "a < b and <p unterminated");
    }

    #[test]
    fn blank_detection_respects_media() {
        assert!(is_blank("<p> </p><p>&nbsp;</p>"));
        assert!(!is_blank(r#"<p><img src="x.png"></p>"#));
        assert!(!is_blank("<p>x</p>"));
    }

    #[test]
    fn collects_list_items() {
        let lists = list_items("<ul><li>a</li><li> </li></ul><ol><li></li></ol>");
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0], vec!["a".to_string(), " ".to_string()]);
        assert_eq!(lists[1], vec![String::new()]);
    }
}
