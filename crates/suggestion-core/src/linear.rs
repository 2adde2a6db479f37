//! Checks that only need one note.

use crate::config::EngineConfig;
use crate::html_text;
use crate::model::Finding;
use crate::paragraph::{self, Paragraph};
use crate::problem_cache::ProblemSource;
use crate::readability;
use std::collections::HashSet;

pub const EMPTY_PARAGRAPH: &str = "Empty paragraph";
pub const EMPTY_LIST: &str = "Empty list";
pub const DUPLICATE_PARAGRAPHS: &str = "Duplicate paragraphs";

pub fn analyze_note(source: &ProblemSource, config: &EngineConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let at = |p: &Paragraph, message: String| {
        if p.is_root() {
            Finding::note(&source.title, message)
        } else {
            Finding::paragraph(&source.title, &p.path, message)
        }
    };

    for (i, p) in source.paragraphs.iter().enumerate() {
        if !p.is_root() && is_empty_paragraph(&source.paragraphs, p) {
            findings.push(at(p, EMPTY_PARAGRAPH.to_string()));
        }
        if has_empty_list(&p.description) {
            findings.push(at(p, EMPTY_LIST.to_string()));
        }
        if !p.is_root() && has_later_duplicate(&source.paragraphs, i) {
            findings.push(at(p, DUPLICATE_PARAGRAPHS.to_string()));
        }
        for line in duplicate_lines(&p.description, config.duplicate_line_min_len) {
            findings.push(at(p, format!("Duplicate contents({line})")));
        }
    }

    let score = readability::score(&source.raw);
    if score > config.readability_threshold {
        findings.push(Finding::note(
            &source.title,
            format!("Low readability({score:.1})"),
        ));
    }

    findings
}

/// Own body and every subsection render to nothing.
fn is_empty_paragraph(paragraphs: &[Paragraph], p: &Paragraph) -> bool {
    paragraph::paragraph_description(paragraphs, &p.path, false)
        .is_some_and(|body| html_text::is_blank(&body))
}

fn has_empty_list(body: &str) -> bool {
    html_text::list_items(body)
        .iter()
        .any(|items| items.iter().all(|item| item.trim().is_empty()))
}

/// Another heading later in the note has the same title and section.
fn has_later_duplicate(paragraphs: &[Paragraph], idx: usize) -> bool {
    let own = &paragraphs[idx];
    paragraphs
        .iter()
        .rposition(|p| !p.is_root() && p.title == own.title && p.auto_section == own.auto_section)
        .is_some_and(|last| last != idx)
}

/// Lines of one body that occur again further down, each reported once.
/// Only lines with a space and more than `min_len` chars are considered.
fn duplicate_lines(body: &str, min_len: usize) -> Vec<String> {
    let text = html_text::visible_text(body);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.contains(' ') && l.chars().count() > min_len)
        .collect();

    let mut reported = HashSet::new();
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let last = lines.iter().rposition(|l| l == line);
        if last != Some(i) && reported.insert(*line) {
            out.push(line.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_parser::LinkExtractor;
    use crate::model::Note;

    fn analyze(description: &str) -> Vec<Finding> {
        let note = Note::new("id", "X", description, "1");
        let config = EngineConfig::default();
        let source = ProblemSource::build(&note, &LinkExtractor::default(), &config);
        analyze_note(&source, &config)
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    // === empty paragraph ===

    #[test]
    fn empty_heading_is_empty_paragraph() {
        let findings = analyze("<h2></h2>");
        assert_eq!(messages(&findings), vec![EMPTY_PARAGRAPH]);
        let paragraphs = paragraph::decompose("<h2></h2>");
        assert_eq!(findings[0].path.as_deref(), Some(paragraphs[1].path.as_str()));
    }

    #[test]
    fn heading_with_filled_subsection_is_not_empty() {
        let findings = analyze("<h1>A</h1><h2>B</h2><p>body</p>");
        assert!(findings.is_empty(), "got {findings:?}");
    }

    #[test]
    fn image_only_body_is_not_empty() {
        let findings = analyze(r#"<h1>A</h1><p><img src="x.png"></p>"#);
        assert!(findings.is_empty(), "got {findings:?}");
    }

    #[test]
    fn empty_root_is_not_reported() {
        assert!(analyze("").is_empty());
    }

    // === empty list ===

    #[test]
    fn list_of_blank_items_is_reported() {
        let findings = analyze("<h1>A</h1><p>text</p><ul><li> </li><li></li></ul>");
        assert_eq!(messages(&findings), vec![EMPTY_LIST]);
    }

    #[test]
    fn list_in_root_is_reported_on_note() {
        let findings = analyze("<ol><li><br></li></ol>");
        assert_eq!(findings, vec![Finding::note("X", EMPTY_LIST)]);
    }

    #[test]
    fn list_with_text_is_fine() {
        assert!(analyze("<ul><li></li><li>one</li></ul>").is_empty());
    }

    // === duplicate paragraphs ===

    #[test]
    fn repeated_heading_reported_once() {
        let findings = analyze("<h2>A</h2>x<h2>A</h2>y");
        assert_eq!(messages(&findings), vec![DUPLICATE_PARAGRAPHS]);
        let paragraphs = paragraph::decompose("<h2>A</h2>x<h2>A</h2>y");
        assert_eq!(findings[0].path.as_deref(), Some(paragraphs[1].path.as_str()));
    }

    #[test]
    fn same_title_in_different_sections_is_fine() {
        let findings = analyze("<h1>X</h1><h2>Notes</h2>a<h1>Y</h1><h2>Notes</h2>b");
        assert!(findings.is_empty(), "got {findings:?}");
    }

    // === duplicate contents ===

    #[test]
    fn repeated_line_reported_once() {
        let findings = analyze("<p>same line here</p><p>other text</p><p>same line here</p><p>same line here</p>");
        assert_eq!(messages(&findings), vec!["Duplicate contents(same line here)"]);
    }

    #[test]
    fn short_or_single_word_lines_are_ignored() {
        assert!(analyze("<p>a b</p><p>a b</p><p>singleword</p><p>singleword</p>").is_empty());
    }

    #[test]
    fn lines_in_different_paragraphs_are_not_duplicates() {
        assert!(analyze("<h1>A</h1><p>shared text</p><h1>B</h1><p>shared text</p>").is_empty());
    }

    // === readability ===

    #[test]
    fn dense_prose_is_low_readability() {
        let findings = analyze(
            "<p>Institutional interoperability considerations necessitate comprehensive \
             organizational documentation regarding administrative responsibilities \
             and international regulatory obligations affecting multinational corporations</p>",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.starts_with("Low readability("));
        assert_eq!(findings[0].path, None);
    }

    #[test]
    fn plain_prose_passes() {
        assert!(analyze("<p>The cat sat. The dog ran.</p>").is_empty());
    }
}
