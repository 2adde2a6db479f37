//! Paragraph path encoding.
//!
//! A path is a `,`-separated chain of segments, one per ancestor heading,
//! ending with the paragraph's own heading. The root paragraph has the empty
//! path. Each segment is `<ordinal>.<token>` where `token` is the URL-safe,
//! unpadded base64 of the heading title and `ordinal` counts earlier siblings
//! with the same title under the same parent. Neither part can contain `,`,
//! and a segment is never empty, so `path + ","` is a strict prefix of every
//! descendant path and of nothing else.

use crate::error::PathError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::fmt;

pub const SEPARATOR: char = ',';

/// Encode arbitrary text into a separator-free token.
pub fn encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Exact inverse of [`encode`]. Malformed input is an error.
pub fn decode(token: &str) -> Result<String, PathError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| PathError::InvalidEncoding {
            segment: token.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|_| PathError::InvalidUtf8(token.to_string()))
}

/// One decoded step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub title: String,
    pub ordinal: usize,
}

impl Segment {
    pub fn new(title: impl Into<String>, ordinal: usize) -> Self {
        Self {
            title: title.into(),
            ordinal,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let (ordinal, token) = raw
            .split_once('.')
            .ok_or_else(|| PathError::MissingOrdinal(raw.to_string()))?;
        if ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PathError::InvalidOrdinal(raw.to_string()));
        }
        let ordinal = ordinal
            .parse()
            .map_err(|_| PathError::InvalidOrdinal(raw.to_string()))?;
        Ok(Self {
            title: decode(token)?,
            ordinal,
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ordinal, encode(&self.title))
    }
}

/// Join already-encoded segments into a path.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a path into its encoded segments. The root path has none.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(SEPARATOR).collect()
    }
}

/// Decode every segment of a path.
pub fn decode_path(path: &str) -> Result<Vec<Segment>, PathError> {
    split_path(path).into_iter().map(Segment::parse).collect()
}

/// Number of segments, which equals the paragraph's level.
pub fn depth(path: &str) -> usize {
    split_path(path).len()
}

/// Path of the enclosing paragraph. The parent of a top-level path is the root `""`.
pub fn parent_path(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// True when `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}
