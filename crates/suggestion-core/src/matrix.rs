//! Checks over one ordered (source, target) pair of notes.

use crate::model::Finding;
use crate::problem_cache::{MatrixEntry, MatrixSource, ProblemSource};
use std::collections::HashSet;

/// Right-hand side of a pair. Dangling link titles and missing parents are
/// analyzed as unloaded targets.
#[derive(Debug, Clone, Copy)]
pub enum MatrixTarget<'a> {
    Loaded(&'a ProblemSource),
    Unloaded(&'a str),
}

impl<'a> MatrixTarget<'a> {
    pub fn title(&self) -> &'a str {
        match *self {
            MatrixTarget::Loaded(source) => &source.title,
            MatrixTarget::Unloaded(title) => title,
        }
    }

    pub fn updated(&self) -> Option<&'a str> {
        match *self {
            MatrixTarget::Loaded(source) => Some(&source.updated),
            MatrixTarget::Unloaded(_) => None,
        }
    }
}

pub fn analyze_pair(source: &ProblemSource, target: MatrixTarget<'_>) -> MatrixEntry {
    let title = target.title();
    let mut record = Vec::new();
    if source.title == title {
        return MatrixEntry {
            record,
            matrix_source: MatrixSource {
                updated: target.updated().map(str::to_string),
                is_reverse_link: false,
                is_sub_note: false,
            },
        };
    }

    let is_parent = source.parent_title.as_deref() == Some(title);
    let mut is_reverse_link = false;

    match target {
        MatrixTarget::Unloaded(_) => {
            for _ in source.links.iter().filter(|l| l.title == title) {
                record.push(Finding::note(&source.title, format!("Unknown note link({title})")));
            }
            if is_parent && source.has_content {
                record.push(empty_parent(title, &source.title));
            }
        }
        MatrixTarget::Loaded(target) => {
            is_reverse_link = target.links_to(&source.title);

            for link in source.links.iter().filter(|l| l.title == title) {
                let paragraph = link.paragraph.as_deref().or(link.section.as_deref());
                let Some(paragraph) = paragraph else {
                    continue;
                };
                if !target
                    .index
                    .resolves(&target.paragraphs, link.paragraph.as_deref(), link.section.as_deref())
                {
                    record.push(Finding::note(
                        &source.title,
                        format!("Unknown paragraph link({title} ▶ {paragraph})"),
                    ));
                }
            }
            if is_parent && source.has_content && !target.has_content {
                record.push(empty_parent(title, &source.title));
            }

            unlinked_title(source, target, &mut record);
            unlinked_aliases(source, target, &mut record);
        }
    }

    MatrixEntry {
        record,
        matrix_source: MatrixSource {
            updated: target.updated().map(str::to_string),
            is_reverse_link,
            is_sub_note: title
                .strip_prefix(source.title.as_str())
                .is_some_and(|rest| rest.starts_with('/')),
        },
    }
}

fn empty_parent(parent: &str, child: &str) -> Finding {
    Finding::note(parent, format!("Empty parent note({child})"))
}

/// The target mentions the source's title without linking it.
fn unlinked_title(source: &ProblemSource, target: &ProblemSource, record: &mut Vec<Finding>) {
    if target.parent_title.as_deref() == Some(source.title.as_str()) {
        return;
    }
    let already_linked = target.links.iter().any(|l| {
        l.title == source.title || l.name.to_lowercase() == source.title.to_lowercase()
    });
    if already_linked {
        return;
    }
    if contains_keyword(&target.raw, &source.title) {
        record.push(Finding::note(
            &target.title,
            format!("Unlinked note keyword({})", source.title),
        ));
    }
}

/// The target mentions a display name the source uses for some third note.
fn unlinked_aliases(source: &ProblemSource, target: &ProblemSource, record: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    for link in source.links.iter().filter(|l| l.is_alias()) {
        if link.title == source.title
            || link.title == target.title
            || target.parent_title.as_deref() == Some(link.title.as_str())
        {
            continue;
        }
        if target.links.iter().any(|l| l.is_equivalent(link)) {
            continue;
        }
        if !seen.insert((link.title.as_str(), link.name.as_str())) {
            continue;
        }
        if contains_keyword(&target.raw, &link.name) {
            record.push(Finding::note(
                &target.title,
                format!("Unlinked note keyword({} → {})", link.title, link.name),
            ));
        }
    }
}

/// Case-insensitive search for `keyword` as a standalone token.
///
/// A boundary is only required at ends of the keyword that are ASCII word
/// characters. Scripts without ASCII word boundaries, such as Hangul, match
/// as plain substrings, so Korean particles attached to a title still count.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let check_start = keyword.chars().next().is_some_and(is_ascii_word);
    let check_end = keyword.chars().next_back().is_some_and(is_ascii_word);

    // Overlapping candidates count: step one char past a rejected match.
    let mut from = 0;
    while let Some(offset) = text[from..].find(keyword.as_str()) {
        let start = from + offset;
        let end = start + keyword.len();
        let before_ok = !check_start || !text[..start].chars().next_back().is_some_and(is_ascii_word);
        let after_ok = !check_end || !text[end..].chars().next().is_some_and(is_ascii_word);
        if before_ok && after_ok {
            return true;
        }
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
