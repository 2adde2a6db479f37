//! Heading-based decomposition of a note into addressable paragraphs.
//!
//! The output is a flat list in document order that stands in for a tree:
//! a paragraph's descendants are exactly the contiguous run of following
//! paragraphs whose path starts with `path + ","`. The first entry is always
//! the synthetic root (level 0, empty title and path) holding any content
//! before the first heading.
//!
//! Decomposition is lossless: the root description followed by every
//! paragraph's `header + description` reproduces the input byte for byte.

use crate::html_text;
use crate::path_codec::{self, Segment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_MAX_SECTION_DEPTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub path: String,
    pub title: String,
    /// Nesting depth: 0 for the root, otherwise the number of path segments.
    pub level: usize,
    /// Heading rank (`h1` = 1 .. `h6` = 6). 0 for the root.
    pub rank: u8,
    /// Verbatim heading markup. Empty for the root.
    pub header: String,
    /// Verbatim markup between this heading and the next one.
    pub description: String,
    /// Ancestor title that tells this paragraph apart from same-titled ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_section: Option<String>,
}

impl Paragraph {
    fn root() -> Self {
        Self {
            path: String::new(),
            title: String::new(),
            level: 0,
            rank: 0,
            header: String::new(),
            description: String::new(),
            auto_section: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }
}

/// Decompose with the default disambiguation depth.
pub fn decompose(html: &str) -> Vec<Paragraph> {
    decompose_with_depth(html, DEFAULT_MAX_SECTION_DEPTH)
}

pub fn decompose_with_depth(html: &str, max_section_depth: usize) -> Vec<Paragraph> {
    let mut builder = Builder::new();
    for node in top_level_nodes(html) {
        match node {
            Node::Heading { rank, raw, inner } => builder.open(rank, heading_title(inner), raw),
            Node::Content(raw) => builder.append(raw),
        }
    }
    let mut paragraphs = builder.paragraphs;
    assign_auto_sections(&mut paragraphs, max_section_depth);
    paragraphs
}

/// Concatenate a paragraph (optionally with its own heading) and all of its
/// descendants, in order. `None` when no paragraph has `path`.
pub fn paragraph_description(
    paragraphs: &[Paragraph],
    path: &str,
    include_own_header: bool,
) -> Option<String> {
    let idx = paragraphs.iter().position(|p| p.path == path)?;
    let own = &paragraphs[idx];
    let mut out = String::new();
    if include_own_header {
        out.push_str(&own.header);
    }
    out.push_str(&own.description);
    for p in descendants(paragraphs, idx) {
        out.push_str(&p.header);
        out.push_str(&p.description);
    }
    Some(out)
}

/// Strict descendants of the paragraph at `idx`.
pub fn descendants(paragraphs: &[Paragraph], idx: usize) -> &[Paragraph] {
    let Some(own) = paragraphs.get(idx) else {
        return &[];
    };
    let len = paragraphs[idx + 1..]
        .iter()
        .take_while(|p| path_codec::is_descendant(&p.path, &own.path))
        .count();
    &paragraphs[idx + 1..idx + 1 + len]
}

// ---------------------------------------------------------------------------
// Section disambiguation
// ---------------------------------------------------------------------------

/// Title of the ancestor `depth` levels above the paragraph at `path`.
fn ancestor_title(path: &str, depth: usize) -> Option<String> {
    let segments = path_codec::split_path(path);
    if segments.len() <= depth {
        return None;
    }
    Segment::parse(segments[segments.len() - 1 - depth])
        .ok()
        .map(|s| s.title)
}

/// Give every paragraph whose title occurs more than once the nearest
/// ancestor title that separates it from the others.
///
/// Depth 1 (the parent) is assigned to every colliding paragraph. Deeper
/// ancestors only replace it for paragraphs they actually separate, and the
/// walk stops once nothing collides or no ancestors remain. Paragraphs that
/// still collide after the walk are true duplicates and keep equal values.
pub fn assign_auto_sections(paragraphs: &mut [Paragraph], max_depth: usize) {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, p) in paragraphs.iter().enumerate() {
        if !p.is_root() {
            groups.entry(p.title.as_str()).or_default().push(i);
        }
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().filter(|g| g.len() > 1).collect();
    groups.sort();

    for group in groups {
        let mut chains: HashMap<usize, Vec<Option<String>>> =
            group.iter().map(|&i| (i, Vec::new())).collect();
        let mut pending = group;

        for depth in 1..=max_depth {
            if pending.len() < 2 {
                break;
            }
            let mut any_ancestor = false;
            for &i in &pending {
                let ancestor = ancestor_title(&paragraphs[i].path, depth);
                any_ancestor |= ancestor.is_some();
                chains.entry(i).or_default().push(ancestor);
            }
            if !any_ancestor {
                break;
            }

            let colliding: Vec<usize> = pending
                .iter()
                .copied()
                .filter(|&i| pending.iter().filter(|&&j| chains[&j] == chains[&i]).count() > 1)
                .collect();

            for &i in &pending {
                if depth == 1 || !colliding.contains(&i) {
                    if let Some(Some(ancestor)) = chains[&i].last() {
                        paragraphs[i].auto_section = Some(ancestor.clone());
                    }
                }
            }
            pending = colliding;
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Frame {
    rank: u8,
    segment: String,
}

struct Builder {
    stack: Vec<Frame>,
    paragraphs: Vec<Paragraph>,
    /// (parent path, title) -> number of headings seen so far.
    sibling_counts: HashMap<(String, String), usize>,
}

impl Builder {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            paragraphs: vec![Paragraph::root()],
            sibling_counts: HashMap::new(),
        }
    }

    fn current_path(&self) -> String {
        path_codec::join_path(&self.stack.iter().map(|f| &f.segment).collect::<Vec<_>>())
    }

    fn open(&mut self, rank: u8, title: String, raw: &str) {
        while self.stack.last().is_some_and(|f| f.rank >= rank) {
            self.stack.pop();
        }
        let parent = self.current_path();
        let counter = self
            .sibling_counts
            .entry((parent.clone(), title.clone()))
            .or_insert(0);
        let segment = Segment::new(title.clone(), *counter).to_string();
        *counter += 1;

        self.stack.push(Frame { rank, segment });
        let path = self.current_path();
        debug_assert!(
            path_codec::is_descendant(&path, &parent),
            "path {path:?} does not extend its parent {parent:?}"
        );

        self.paragraphs.push(Paragraph {
            path,
            title,
            level: self.stack.len(),
            rank,
            header: raw.to_string(),
            description: String::new(),
            auto_section: None,
        });
    }

    fn append(&mut self, raw: &str) {
        if let Some(last) = self.paragraphs.last_mut() {
            last.description.push_str(raw);
        }
    }
}

fn heading_title(inner: &str) -> String {
    html_text::visible_text(inner)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Top-level scanner
// ---------------------------------------------------------------------------

enum Node<'a> {
    /// `inner` still carries the closing tag; only its visible text is used.
    Heading { rank: u8, raw: &'a str, inner: &'a str },
    Content(&'a str),
}

#[derive(Debug, PartialEq)]
enum TagKind {
    Open { name: String, self_closing: bool },
    Close { name: String },
    /// Comments, doctypes, processing instructions.
    Markup,
}

#[derive(Debug)]
struct Tag {
    kind: TagKind,
    /// Byte offset just past the closing `>`.
    end: usize,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn heading_rank(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Offset just past the `>` that ends the tag starting at `at`. Quotes only
/// count when they open an attribute value.
fn find_tag_end(html: &str, at: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut prev = '<';
    for (i, c) in html[at..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if prev == '=' => quote = Some(c),
                '>' => return Some(at + i + 1),
                _ => {}
            },
        }
        if !c.is_whitespace() {
            prev = c;
        }
    }
    None
}

/// Parse the tag starting at `at` (which must be a `<`). `None` means the
/// `<` is literal text.
fn scan_tag(html: &str, at: usize) -> Option<Tag> {
    let rest = &html[at..];
    if rest.starts_with("<!--") {
        let end = rest.find("-->").map(|i| at + i + 3).unwrap_or(html.len());
        return Some(Tag {
            kind: TagKind::Markup,
            end,
        });
    }
    let bytes = rest.as_bytes();
    let (is_close, name_start) = match bytes.get(1) {
        Some(b'/') => (true, 2),
        Some(b'!') | Some(b'?') => {
            let end = find_tag_end(html, at)?;
            return Some(Tag {
                kind: TagKind::Markup,
                end,
            });
        }
        _ => (false, 1),
    };
    if !bytes.get(name_start).is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = rest[name_start..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b':')
        .count();
    let name = rest[name_start..name_start + name_len].to_ascii_lowercase();
    let end = find_tag_end(html, at)?;
    let kind = if is_close {
        TagKind::Close { name }
    } else {
        let self_closing = html[at..end - 1].trim_end().ends_with('/');
        TagKind::Open { name, self_closing }
    };
    Some(Tag { kind, end })
}

/// Offset just past the element opened by a tag named `name` whose start tag
/// ends at `from`. Unclosed elements run to the end of input.
fn element_end(html: &str, from: usize, name: &str) -> usize {
    if RAW_TEXT_ELEMENTS.contains(&name) {
        let lower = html[from..].to_ascii_lowercase();
        return match lower.find(&format!("</{name}")) {
            Some(i) => find_tag_end(html, from + i).unwrap_or(html.len()),
            None => html.len(),
        };
    }

    let closes_on_heading = name == "p" || heading_rank(name).is_some();
    let mut stack = vec![name.to_string()];
    let mut pos = from;
    while let Some(i) = html[pos..].find('<') {
        let at = pos + i;
        let Some(tag) = scan_tag(html, at) else {
            pos = at + 1;
            continue;
        };
        match &tag.kind {
            TagKind::Open { name: inner, .. }
                if stack.len() == 1
                    && closes_on_heading
                    && (heading_rank(inner).is_some() || (name == "p" && inner == "p")) =>
            {
                // Implicitly closed, as a browser would.
                return at;
            }
            TagKind::Open {
                name: inner,
                self_closing,
            } => {
                if RAW_TEXT_ELEMENTS.contains(&inner.as_str()) {
                    pos = element_end(html, tag.end, inner);
                    continue;
                }
                if !self_closing && !is_void(inner) {
                    stack.push(inner.clone());
                }
            }
            TagKind::Close { name: inner } => {
                if let Some(idx) = stack.iter().rposition(|n| n == inner) {
                    stack.truncate(idx);
                    if stack.is_empty() {
                        return tag.end;
                    }
                }
            }
            TagKind::Markup => {}
        }
        pos = tag.end;
    }
    html.len()
}

fn top_level_nodes(html: &str) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut pos = 0;
    while pos < html.len() {
        let Some(lt) = html[pos..].find('<').map(|i| pos + i) else {
            nodes.push(Node::Content(&html[pos..]));
            break;
        };
        if lt > pos {
            nodes.push(Node::Content(&html[pos..lt]));
            pos = lt;
            continue;
        }

        let Some(tag) = scan_tag(html, pos) else {
            let next = html[pos + 1..]
                .find('<')
                .map(|i| pos + 1 + i)
                .unwrap_or(html.len());
            tracing::trace!("literal '<' at byte {pos} kept as text");
            nodes.push(Node::Content(&html[pos..next]));
            pos = next;
            continue;
        };

        match &tag.kind {
            TagKind::Open {
                name,
                self_closing: false,
            } if !is_void(name) => {
                let end = element_end(html, tag.end, name);
                let raw = &html[pos..end];
                match heading_rank(name) {
                    Some(rank) => nodes.push(Node::Heading {
                        rank,
                        raw,
                        inner: &html[tag.end..end],
                    }),
                    None => nodes.push(Node::Content(raw)),
                }
                pos = end;
            }
            _ => {
                nodes.push(Node::Content(&html[pos..tag.end]));
                pos = tag.end;
            }
        }
    }
    nodes
}
