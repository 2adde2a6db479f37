//! One full analysis pass over a note collection.

use crate::matrix::MatrixTarget;
use crate::model::{Finding, FindingGroup, Note};
use crate::problem_cache::{CacheState, ProblemCache};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub const ISOLATED_NOTE: &str = "Isolated note";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub notes: usize,
    pub recomputed_notes: usize,
    pub pairs: usize,
    pub recomputed_pairs: usize,
    pub findings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassOutput {
    pub findings: Vec<Finding>,
    pub stats: PassStats,
}

impl PassOutput {
    pub fn groups(&self) -> Vec<FindingGroup> {
        group_findings(&self.findings)
    }

    /// Grouped findings as the JSON array the suggestion list renders.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.groups())
    }
}

/// Run every check over `notes`, reusing whatever `cache` still holds.
///
/// `boards` maps note ids to the number of boards the note is pinned to; it
/// only feeds the isolation check. Notes missing from it count as on no board.
/// Notes whose title already appeared earlier in `notes` are skipped.
pub fn run_pass(
    cache: &mut ProblemCache,
    notes: &[Note],
    boards: &HashMap<String, usize>,
) -> PassOutput {
    let mut stats = PassStats::default();
    let mut findings = Vec::new();

    let mut loaded: Vec<&Note> = Vec::with_capacity(notes.len());
    let mut titles: HashSet<&str> = HashSet::with_capacity(notes.len());
    for note in notes {
        if !titles.insert(note.title.as_str()) {
            tracing::warn!("Duplicate note title {:?} (id {}), skipping", note.title, note.id);
            continue;
        }
        if cache.refresh(note) != CacheState::Valid {
            stats.recomputed_notes += 1;
        }
        loaded.push(note);
    }
    stats.notes = loaded.len();

    for note in &loaded {
        if let Some(record) = cache.record(&note.title) {
            findings.extend(record.iter().cloned());
        }
    }

    let sources: Vec<_> = loaded
        .iter()
        .filter_map(|note| cache.source(&note.title))
        .collect();

    for source in &sources {
        let mut reverse_links = 0;
        let mut sub_notes = 0;

        for target in &sources {
            if Arc::ptr_eq(source, target) {
                continue;
            }
            let Some((entry, recomputed)) =
                cache.matrix(&source.title, MatrixTarget::Loaded(target))
            else {
                continue;
            };
            stats.pairs += 1;
            stats.recomputed_pairs += usize::from(recomputed);
            reverse_links += usize::from(entry.matrix_source.is_reverse_link);
            sub_notes += usize::from(entry.matrix_source.is_sub_note);
            findings.extend(entry.record.iter().cloned());
        }

        // Dangling link targets and a missing parent, in a stable order.
        let unloaded: BTreeSet<&str> = source
            .links
            .iter()
            .map(|l| l.title.as_str())
            .chain(source.parent_title.as_deref())
            .filter(|t| !titles.contains(t))
            .collect();
        for title in unloaded {
            let Some((entry, recomputed)) = cache.matrix(&source.title, MatrixTarget::Unloaded(title))
            else {
                continue;
            };
            stats.pairs += 1;
            stats.recomputed_pairs += usize::from(recomputed);
            findings.extend(entry.record.iter().cloned());
        }

        let on_boards = boards.get(&source.id).copied().unwrap_or(0);
        if source.has_content
            && on_boards == 0
            && reverse_links == 0
            && sub_notes == 0
            && source.parent_title.is_none()
        {
            findings.push(Finding::note(&source.title, ISOLATED_NOTE));
        }
    }

    let pruned = cache.retain_titles(&titles);
    if pruned > 0 {
        tracing::debug!("Pruned {} note(s) no longer in the collection", pruned);
    }

    stats.findings = findings.len();
    tracing::info!(
        "Suggestion pass for {}: {} notes ({} recomputed), {} pairs ({} recomputed), {} findings",
        cache.tenant(),
        stats.notes,
        stats.recomputed_notes,
        stats.pairs,
        stats.recomputed_pairs,
        stats.findings
    );

    PassOutput { findings, stats }
}

/// Fold findings by `(title, path)` in first-seen order. Repeated messages
/// within one group are kept once.
pub fn group_findings(findings: &[Finding]) -> Vec<FindingGroup> {
    let mut groups: Vec<FindingGroup> = Vec::new();
    let mut positions: HashMap<(&str, Option<&str>), usize> = HashMap::new();

    for finding in findings {
        let key = (finding.title.as_str(), finding.path.as_deref());
        let idx = *positions.entry(key).or_insert_with(|| {
            groups.push(FindingGroup {
                title: finding.title.clone(),
                path: finding.path.clone(),
                messages: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[idx];
        if !group.messages.contains(&finding.message) {
            group.messages.push(finding.message.clone());
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn note(title: &str, description: &str, updated: &str) -> Note {
        Note::new(format!("id-{title}"), title, description, updated)
    }

    fn cache() -> ProblemCache {
        ProblemCache::new("tenant", EngineConfig::default()).unwrap()
    }

    fn has(output: &PassOutput, title: &str, message: &str) -> bool {
        output
            .findings
            .iter()
            .any(|f| f.title == title && f.message == message)
    }

    // === isolation ===

    #[test]
    fn lone_note_is_isolated() {
        let output = run_pass(&mut cache(), &[note("A", "<p>hello</p>", "1")], &HashMap::new());
        assert!(has(&output, "A", ISOLATED_NOTE));
    }

    #[test]
    fn board_membership_prevents_isolation() {
        let boards = HashMap::from([("id-A".to_string(), 1)]);
        let output = run_pass(&mut cache(), &[note("A", "<p>hello</p>", "1")], &boards);
        assert!(!has(&output, "A", ISOLATED_NOTE));
    }

    #[test]
    fn backlinked_note_is_not_isolated() {
        let notes = [
            note("A", "<p>hello</p>", "1"),
            note("B", r#"<p>see <a href="?title=A">it</a></p>"#, "1"),
        ];
        let output = run_pass(&mut cache(), &notes, &HashMap::new());
        assert!(!has(&output, "A", ISOLATED_NOTE));
        assert!(has(&output, "B", ISOLATED_NOTE), "B has no backlinks");
    }

    #[test]
    fn parent_and_child_are_not_isolated() {
        let notes = [
            note("Topic", "<p>overview</p>", "1"),
            note("Topic/Detail", "<p>detail</p>", "1"),
        ];
        let output = run_pass(&mut cache(), &notes, &HashMap::new());
        assert!(!has(&output, "Topic", ISOLATED_NOTE));
        assert!(!has(&output, "Topic/Detail", ISOLATED_NOTE));
    }

    #[test]
    fn blank_note_is_not_isolated() {
        let output = run_pass(&mut cache(), &[note("A", "", "1")], &HashMap::new());
        assert!(output.findings.is_empty());
    }

    // === unloaded targets ===

    #[test]
    fn missing_parent_gets_empty_parent_finding() {
        let output = run_pass(
            &mut cache(),
            &[note("Parent/Child", "<p>content</p>", "1")],
            &HashMap::new(),
        );
        assert!(has(&output, "Parent", "Empty parent note(Parent/Child)"));
    }

    #[test]
    fn dangling_link_reported_once_per_link() {
        let output = run_pass(
            &mut cache(),
            &[note("A", r#"<a href="?title=Z">z</a> and <a href="?title=Z">again</a>"#, "1")],
            &HashMap::new(),
        );
        let count = output
            .findings
            .iter()
            .filter(|f| f.message == "Unknown note link(Z)")
            .count();
        assert_eq!(count, 2);
        let groups = output.groups();
        let a = groups.iter().find(|g| g.title == "A").unwrap();
        assert_eq!(a.messages.iter().filter(|m| *m == "Unknown note link(Z)").count(), 1);
    }

    // === incremental passes ===

    #[test]
    fn second_pass_recomputes_nothing() {
        let mut cache = cache();
        let notes = [
            note("A", r#"<a href="?title=B">B</a>"#, "1"),
            note("B", "<p>b</p>", "1"),
            note("C", r#"<a href="?title=Z">Z</a>"#, "1"),
        ];
        let first = run_pass(&mut cache, &notes, &HashMap::new());
        assert_eq!(first.stats.recomputed_notes, 3);
        assert_eq!(first.stats.pairs, 7);
        assert_eq!(first.stats.recomputed_pairs, 7);

        let second = run_pass(&mut cache, &notes, &HashMap::new());
        assert_eq!(second.stats.recomputed_notes, 0);
        assert_eq!(second.stats.recomputed_pairs, 0);
        assert_eq!(first.findings, second.findings);
    }

    #[test]
    fn editing_one_note_recomputes_its_pairs_only() {
        let mut cache = cache();
        let mut notes = vec![
            note("A", "<p>a</p>", "1"),
            note("B", "<p>b</p>", "1"),
            note("C", "<p>c</p>", "1"),
        ];
        run_pass(&mut cache, &notes, &HashMap::new());

        notes[1] = note("B", "<p>b edited</p>", "2");
        let output = run_pass(&mut cache, &notes, &HashMap::new());
        assert_eq!(output.stats.recomputed_notes, 1);
        // (B, A), (B, C) from B's wiped matrix plus (A, B) and (C, B).
        assert_eq!(output.stats.recomputed_pairs, 4);
    }

    #[test]
    fn removed_notes_are_pruned() {
        let mut cache = cache();
        run_pass(
            &mut cache,
            &[note("A", "<p>a</p>", "1"), note("B", "<p>b</p>", "1")],
            &HashMap::new(),
        );
        run_pass(&mut cache, &[note("A", "<p>a</p>", "1")], &HashMap::new());
        assert_eq!(cache.len(), 1);
        assert!(cache.source("B").is_none());
    }

    #[test]
    fn surviving_note_forgets_pairs_to_removed_notes() {
        let mut cache = cache();
        let mut notes = vec![note("A", "<p>a</p>", "1")];
        notes.extend((0..50).map(|i| note(&format!("N{i}"), "<p>n</p>", "1")));
        run_pass(&mut cache, &notes, &HashMap::new());
        assert_eq!(cache.matrix_len("A"), 50);

        let output = run_pass(&mut cache, &notes[..1], &HashMap::new());
        assert_eq!(output.stats.recomputed_notes, 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.matrix_len("A"), 0);
    }

    #[test]
    fn renamed_note_drops_stale_pairs() {
        let mut cache = cache();
        let a = note("A", r#"<a href="?title=Z">Z</a>"#, "1");
        let b = Note::new("id-B", "B", "<p>b</p>", "1");
        let renamed = Note::new("id-B", "C", "<p>b</p>", "1");

        run_pass(&mut cache, &[a.clone(), b.clone()], &HashMap::new());
        run_pass(&mut cache, &[a.clone(), renamed], &HashMap::new());
        assert!(cache.matrix_entry("A", "B").is_none());
        assert!(cache.matrix_entry("A", "C").is_some());
        assert!(cache.matrix_entry("A", "Z").is_some(), "dangling link target is still referenced");

        // Renamed back with the same marker: (A, B) must not come from before.
        let output = run_pass(&mut cache, &[a, b], &HashMap::new());
        assert_eq!(output.stats.recomputed_notes, 1);
        // (A, B) plus (B, A) from B's fresh entry.
        assert_eq!(output.stats.recomputed_pairs, 2);
    }

    #[test]
    fn duplicate_titles_use_first_note() {
        let mut cache = cache();
        let output = run_pass(
            &mut cache,
            &[note("A", "<p>first</p>", "1"), note("A", "<p>second</p>", "2")],
            &HashMap::new(),
        );
        assert_eq!(output.stats.notes, 1);
        assert_eq!(cache.source("A").unwrap().updated, "1");
    }

    // === grouping ===

    #[test]
    fn json_output_is_grouped() {
        let output = run_pass(&mut cache(), &[note("A", "<h2></h2>", "1")], &HashMap::new());
        let json: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();
        let groups = json.as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["title"], "A");
        assert_eq!(groups[0]["messages"][0], "Empty paragraph");
        assert!(groups[0]["path"].is_string());
    }

    #[test]
    fn groups_by_title_and_path_in_first_seen_order() {
        let findings = vec![
            Finding::note("B", "one"),
            Finding::paragraph("A", "0.QQ", "two"),
            Finding::note("B", "three"),
            Finding::note("A", "four"),
            Finding::paragraph("A", "0.QQ", "two"),
        ];
        let groups = group_findings(&findings);
        assert_eq!(
            groups,
            vec![
                FindingGroup {
                    title: "B".into(),
                    path: None,
                    messages: vec!["one".into(), "three".into()],
                },
                FindingGroup {
                    title: "A".into(),
                    path: Some("0.QQ".into()),
                    messages: vec!["two".into()],
                },
                FindingGroup {
                    title: "A".into(),
                    path: None,
                    messages: vec!["four".into()],
                },
            ]
        );
    }
}
