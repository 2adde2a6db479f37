use crate::paragraph::Paragraph;
use crate::path_codec;
use std::collections::HashMap;
use std::ops::Range;

/// Lookup tables over one decomposed note.
///
/// The paragraph list stays the canonical representation; this index maps
/// paths and titles back to positions in it so tree-style queries do not
/// rescan the list.
#[derive(Debug, Default, Clone)]
pub struct ParagraphIndex {
    /// Forward map: path -> position in the paragraph list.
    by_path: HashMap<String, usize>,
    /// Title -> positions, in document order.
    by_title: HashMap<String, Vec<usize>>,
}

impl ParagraphIndex {
    pub fn new(paragraphs: &[Paragraph]) -> Self {
        let mut by_path = HashMap::with_capacity(paragraphs.len());
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, p) in paragraphs.iter().enumerate() {
            by_path.insert(p.path.clone(), i);
            if !p.is_root() {
                by_title.entry(p.title.clone()).or_default().push(i);
            }
        }
        Self { by_path, by_title }
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Position of the enclosing paragraph. The root has no parent.
    pub fn parent_of(&self, path: &str) -> Option<usize> {
        if path.is_empty() {
            return None;
        }
        self.position(path_codec::parent_path(path))
    }

    /// Positions of the direct children, in document order.
    pub fn children_of(&self, paragraphs: &[Paragraph], path: &str) -> Vec<usize> {
        let depth = path_codec::depth(path);
        self.descendant_range(paragraphs, path)
            .filter(|&i| paragraphs[i].level == depth + 1)
            .collect()
    }

    /// Positions of every strict descendant. Empty for unknown paths.
    pub fn descendant_range(&self, paragraphs: &[Paragraph], path: &str) -> Range<usize> {
        let Some(start) = self.position(path) else {
            return 0..0;
        };
        let len = paragraphs[start + 1..]
            .iter()
            .take_while(|p| path_codec::is_descendant(&p.path, path))
            .count();
        start + 1..start + 1 + len
    }

    /// Positions of headings titled `title`.
    pub fn with_title(&self, title: &str) -> &[usize] {
        self.by_title.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a link naming `paragraph` (and optionally a disambiguating
    /// `section`) resolves to a heading of this note.
    ///
    /// Legacy links carry only `section`, which then names the paragraph.
    pub fn resolves(
        &self,
        paragraphs: &[Paragraph],
        paragraph: Option<&str>,
        section: Option<&str>,
    ) -> bool {
        match (paragraph, section) {
            (Some(title), None) => !self.with_title(title).is_empty(),
            (Some(title), Some(section)) => self
                .with_title(title)
                .iter()
                .any(|&i| paragraphs[i].auto_section.as_deref() == Some(section)),
            (None, Some(legacy)) => !self.with_title(legacy).is_empty(),
            (None, None) => true,
        }
    }
}
