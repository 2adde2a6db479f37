use crate::html_text;
use crate::model::{ExternalLink, InternalLink, Link};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Compile regex once, reuse across calls
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b[^>]*>.*?</pre\s*>|<code\b[^>]*>.*?</code\s*>").unwrap()
});

pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// Build the query-string href the wiki uses for note and paragraph links.
pub fn internal_href(title: &str, paragraph: Option<&str>, section: Option<&str>) -> String {
    let mut href = format!("?title={}", urlencoding::encode(title));
    if let Some(paragraph) = paragraph {
        href.push_str("&paragraph=");
        href.push_str(&urlencoding::encode(paragraph));
    }
    if let Some(section) = section {
        href.push_str("&section=");
        href.push_str(&urlencoding::encode(section));
    }
    href
}

/// Byte ranges inside `<pre>` or `<code>`.
fn build_excluded_ranges(html: &str) -> Vec<(usize, usize)> {
    CODE_RE.find_iter(html).map(|m| (m.start(), m.end())).collect()
}

/// Returns true if the byte offset falls within any excluded range.
fn is_excluded(offset: usize, excluded: &[(usize, usize)]) -> bool {
    excluded.iter().any(|&(start, end)| offset >= start && offset < end)
}

/// Classifies anchors as links to notes of this wiki or to anything else.
///
/// A link is internal when its href resolves against `base` to the same
/// origin and carries a non-empty `title` query parameter.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base: Url,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
        }
    }
}

impl LinkExtractor {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Extract every anchor of `html` in document order. Anchors inside code
    /// blocks and inline code are ignored.
    pub fn extract_links(&self, html: &str, origin: &str) -> Vec<Link> {
        let excluded = build_excluded_ranges(html);
        let mut links = Vec::new();

        for cap in ANCHOR_RE.captures_iter(html) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            if is_excluded(full_match.start(), &excluded) {
                continue;
            }
            let Some(href) = HREF_RE.captures(&cap[1]).and_then(|h| {
                h.get(1)
                    .or_else(|| h.get(2))
                    .or_else(|| h.get(3))
                    .map(|m| m.as_str().to_string())
            }) else {
                continue;
            };
            let name = html_text::visible_text(&cap[2])
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            links.push(self.classify(&name, &href, origin));
        }

        links
    }

    /// Internal links only.
    pub fn extract_internal_links(&self, html: &str, origin: &str) -> Vec<InternalLink> {
        self.extract_links(html, origin)
            .into_iter()
            .filter_map(|link| match link {
                Link::Internal(link) => Some(link),
                Link::External(_) => None,
            })
            .collect()
    }

    /// Classify one anchor. Hrefs that fail to parse are external with the raw string.
    pub fn classify(&self, name: &str, href: &str, origin: &str) -> Link {
        let raw = html_text::decode_entities(href.trim());
        let external = || {
            Link::External(ExternalLink {
                name: name.to_string(),
                url: href.to_string(),
                origin: origin.to_string(),
            })
        };

        let url = match self.base.join(&raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Unparseable href {:?} in {:?}: {}", href, origin, e);
                return external();
            }
        };
        if url.origin() != self.base.origin() {
            return external();
        }

        let mut title = None;
        let mut paragraph = None;
        let mut section = None;
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "title" => &mut title,
                "paragraph" => &mut paragraph,
                "section" => &mut section,
                _ => continue,
            };
            if slot.is_none() && !value.trim().is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        match title {
            Some(title) => Link::Internal(InternalLink {
                name: name.to_string(),
                title,
                paragraph,
                section,
                origin: origin.to_string(),
            }),
            None => external(),
        }
    }
}
