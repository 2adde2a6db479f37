use serde::{Deserialize, Serialize};

/// A note as delivered by the storage layer. Immutable for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    /// Unique key across the collection. `Parent/Child` titles name a sub note.
    pub title: String,
    /// Rich-text body as HTML. May be empty.
    pub description: String,
    /// Opaque version marker. Only ever compared for equality.
    pub updated: String,
}

impl Note {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        updated: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            updated: updated.into(),
        }
    }

    /// Title of the parent note, taken from everything before the last `/`.
    pub fn parent_title(&self) -> Option<&str> {
        parent_title_of(&self.title)
    }
}

/// Splits `Parent/Child` into `Parent`. Titles without a `/` (or with an empty
/// parent part) have no parent.
pub fn parent_title_of(title: &str) -> Option<&str> {
    let (parent, child) = title.rsplit_once('/')?;
    if parent.trim().is_empty() || child.trim().is_empty() {
        return None;
    }
    Some(parent)
}

/// One reported issue, attributed to a note and optionally to a paragraph path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn note(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: None,
            message: message.into(),
        }
    }

    pub fn paragraph(
        title: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            path: Some(path.into()),
            message: message.into(),
        }
    }
}

/// Findings folded by `(title, path)` for the suggestion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingGroup {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub messages: Vec<String>,
}

/// A link to another note in the same wiki.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalLink {
    /// Display text of the anchor.
    pub name: String,
    /// Title of the linked note.
    pub title: String,
    /// Title of the linked paragraph, if the link targets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    /// Disambiguating section (an `autoSection`), or the paragraph title on legacy links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Title of the note containing the anchor.
    pub origin: String,
}

impl InternalLink {
    /// True when both links name the same target the same way. `origin` is ignored.
    pub fn is_equivalent(&self, other: &InternalLink) -> bool {
        self.name == other.name
            && self.title == other.title
            && self.paragraph == other.paragraph
            && self.section == other.section
    }

    /// True when the display text differs from the linked title.
    pub fn is_alias(&self) -> bool {
        !self.name.trim().is_empty() && self.name.to_lowercase() != self.title.to_lowercase()
    }

    /// Paragraph-level target of the link, if any. Legacy links only carry `section`.
    pub fn targets_paragraph(&self) -> bool {
        self.paragraph.is_some() || self.section.is_some()
    }
}

/// A link to anything that is not a note of this wiki.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalLink {
    pub name: String,
    pub url: String,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Link {
    Internal(InternalLink),
    External(ExternalLink),
}

impl Link {
    pub fn origin(&self) -> &str {
        match self {
            Link::Internal(link) => &link.origin,
            Link::External(link) => &link.origin,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Link::Internal(link) => &link.name,
            Link::External(link) => &link.name,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalLink> {
        match self {
            Link::Internal(link) => Some(link),
            Link::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_title_splits_on_last_slash() {
        assert_eq!(parent_title_of("Parent/Child"), Some("Parent"));
        assert_eq!(parent_title_of("A/B/C"), Some("A/B"));
        assert_eq!(parent_title_of("Plain"), None);
    }

    #[test]
    fn parent_title_ignores_empty_parts() {
        assert_eq!(parent_title_of("/Child"), None);
        assert_eq!(parent_title_of("Parent/"), None);
    }

    #[test]
    fn alias_detection_is_case_insensitive() {
        let link = InternalLink {
            name: "rust".into(),
            title: "Rust".into(),
            paragraph: None,
            section: None,
            origin: "Notes".into(),
        };
        assert!(!link.is_alias());

        let alias = InternalLink {
            name: "ferris".into(),
            ..link
        };
        assert!(alias.is_alias());
    }

    #[test]
    fn link_serializes_with_type_tag() {
        let link = Link::External(ExternalLink {
            name: "docs".into(),
            url: "https://example.com".into(),
            origin: "Notes".into(),
        });
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "external");
        assert_eq!(json["url"], "https://example.com");
    }

    #[test]
    fn finding_without_path_omits_field() {
        let json = serde_json::to_string(&Finding::note("A", "Isolated note")).unwrap();
        assert_eq!(json, r#"{"title":"A","message":"Isolated note"}"#);
    }
}
