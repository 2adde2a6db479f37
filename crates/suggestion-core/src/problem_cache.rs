//! Incremental memoization of per-note and per-pair analysis.
//!
//! Validity is decided purely by comparing `updated` markers for equality:
//! - a note entry is valid iff its stored marker equals the note's current one;
//! - a matrix entry (source, target) is valid iff its source entry is valid
//!   and its stored target marker equals the target's current one.
//!
//! A stale note entry is replaced wholesale and its matrix map starts empty.
//! Matrix entries of other sources stay until their own target check fails,
//! or until a pass ends with their target neither loaded nor referenced.
//! Entries are never mutated in place, so an abandoned pass leaves the cache
//! as it was or with strictly fresher entries.

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::html_text;
use crate::link_parser::LinkExtractor;
use crate::linear;
use crate::matrix::{self, MatrixTarget};
use crate::model::{Finding, InternalLink, Note};
use crate::paragraph::{self, Paragraph};
use crate::paragraph_index::ParagraphIndex;
use crate::path_codec;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything the analyzers need to know about one note.
#[derive(Debug, Clone)]
pub struct ProblemSource {
    pub id: String,
    pub title: String,
    pub updated: String,
    /// Plain text with code and anchors removed.
    pub raw: String,
    /// Internal links only, in document order.
    pub links: Vec<InternalLink>,
    pub parent_title: Option<String>,
    /// True when the note renders any text or media.
    pub has_content: bool,
    pub paragraphs: Vec<Paragraph>,
    pub index: ParagraphIndex,
}

impl ProblemSource {
    pub fn build(note: &Note, extractor: &LinkExtractor, config: &EngineConfig) -> Self {
        let mut paragraphs =
            paragraph::decompose_with_depth(&note.description, config.max_section_depth);
        if let Err(reason) = check_paragraphs(&paragraphs) {
            tracing::warn!(
                "Decomposition of {:?} violated an invariant ({}); treating it as one paragraph",
                note.title,
                reason
            );
            debug_assert!(false, "decomposition invariant violated: {reason}");
            paragraphs = paragraph::decompose_with_depth("", config.max_section_depth);
            paragraphs[0].description = note.description.clone();
        }
        let index = ParagraphIndex::new(&paragraphs);

        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            updated: note.updated.clone(),
            raw: html_text::raw_text(&note.description),
            links: extractor.extract_internal_links(&note.description, &note.title),
            parent_title: note.parent_title().map(str::to_string),
            has_content: !html_text::is_blank(&note.description),
            paragraphs,
            index,
        }
    }

    /// Whether any internal link of this note points at `title`.
    pub fn links_to(&self, title: &str) -> bool {
        self.links.iter().any(|l| l.title == title)
    }

    /// Linked to, or named as parent.
    pub fn references(&self, title: &str) -> bool {
        self.links_to(title) || self.parent_title.as_deref() == Some(title)
    }
}

/// Path invariants: unique paths, segment count equal to level, and every
/// path extending its parent's.
fn check_paragraphs(paragraphs: &[Paragraph]) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(paragraphs.len());
    for p in paragraphs {
        if !seen.insert(p.path.as_str()) {
            return Err(format!("duplicate path {:?}", p.path));
        }
        if path_codec::depth(&p.path) != p.level {
            return Err(format!("path {:?} does not have {} segments", p.path, p.level));
        }
        if !p.is_root() && !seen.contains(path_codec::parent_path(&p.path)) {
            return Err(format!("path {:?} precedes its parent", p.path));
        }
    }
    Ok(())
}

/// Pairwise facts kept next to the findings for the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSource {
    /// Target's marker when computed. `None` for unloaded targets.
    pub updated: Option<String>,
    /// The target links back to the source.
    pub is_reverse_link: bool,
    /// The target is a sub note (`Source/...`) of the source.
    pub is_sub_note: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEntry {
    pub record: Vec<Finding>,
    pub matrix_source: MatrixSource,
}

#[derive(Debug)]
struct CachedNote {
    source: Arc<ProblemSource>,
    record: Arc<Vec<Finding>>,
    /// target title -> entry
    matrix: HashMap<String, Arc<MatrixEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Valid,
    Stale,
}

/// Analysis cache for one tenant. Not shared between concurrent passes.
#[derive(Debug)]
pub struct ProblemCache {
    tenant: String,
    config: EngineConfig,
    extractor: LinkExtractor,
    notes: HashMap<String, CachedNote>,
}

impl ProblemCache {
    pub fn new(tenant: impl Into<String>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = config.link_extractor()?;
        Ok(Self {
            tenant: tenant.into(),
            config,
            extractor,
            notes: HashMap::new(),
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop everything when the tenant changes. Returns true if it did.
    pub fn switch_tenant(&mut self, tenant: &str) -> bool {
        if self.tenant == tenant {
            return false;
        }
        tracing::warn!(
            "Tenant switch {:?} -> {:?}: discarding {} cached note(s)",
            self.tenant,
            tenant,
            self.notes.len()
        );
        self.tenant = tenant.to_string();
        self.notes.clear();
        true
    }

    pub fn state(&self, note: &Note) -> CacheState {
        match self.notes.get(&note.title) {
            None => CacheState::Absent,
            Some(cached) if cached.source.updated == note.updated => CacheState::Valid,
            Some(_) => CacheState::Stale,
        }
    }

    /// Bring the entry for `note` up to date. Returns the state it was found in.
    pub fn refresh(&mut self, note: &Note) -> CacheState {
        let state = self.state(note);
        tracing::debug!("Cache {:?} for note {:?}", state, note.title);
        if state == CacheState::Valid {
            return state;
        }

        let source = ProblemSource::build(note, &self.extractor, &self.config);
        let record = linear::analyze_note(&source, &self.config);
        self.notes.insert(
            note.title.clone(),
            CachedNote {
                source: Arc::new(source),
                record: Arc::new(record),
                matrix: HashMap::new(),
            },
        );
        state
    }

    pub fn source(&self, title: &str) -> Option<Arc<ProblemSource>> {
        self.notes.get(title).map(|c| Arc::clone(&c.source))
    }

    /// Linear findings for `title`.
    pub fn record(&self, title: &str) -> Option<Arc<Vec<Finding>>> {
        self.notes.get(title).map(|c| Arc::clone(&c.record))
    }

    /// Cached pair entry, valid or not.
    pub fn matrix_entry(&self, source: &str, target: &str) -> Option<Arc<MatrixEntry>> {
        self.notes.get(source)?.matrix.get(target).cloned()
    }

    pub fn matrix_len(&self, source: &str) -> usize {
        self.notes.get(source).map_or(0, |c| c.matrix.len())
    }

    /// Analysis of the ordered pair (source, target), reusing the cached
    /// entry when the target's marker is unchanged. The flag tells whether
    /// the entry was recomputed. `None` when `source` has no entry.
    pub fn matrix(
        &mut self,
        source: &str,
        target: MatrixTarget<'_>,
    ) -> Option<(Arc<MatrixEntry>, bool)> {
        let cached = self.notes.get_mut(source)?;
        if let Some(entry) = cached.matrix.get(target.title()) {
            if entry.matrix_source.updated.as_deref() == target.updated() {
                return Some((Arc::clone(entry), false));
            }
        }

        let entry = Arc::new(matrix::analyze_pair(&cached.source, target));
        cached
            .matrix
            .insert(target.title().to_string(), Arc::clone(&entry));
        Some((entry, true))
    }

    /// Forget one note, including every pair it is the source of.
    pub fn invalidate(&mut self, title: &str) -> bool {
        self.notes.remove(title).is_some()
    }

    /// Drop notes whose title is not in `titles`, then drop pair entries of
    /// the survivors whose target is neither in `titles` nor still linked or
    /// named as parent by the source.
    pub fn retain_titles(&mut self, titles: &HashSet<&str>) -> usize {
        let before = self.notes.len();
        self.notes.retain(|title, _| titles.contains(title.as_str()));
        for cached in self.notes.values_mut() {
            let CachedNote { source, matrix, .. } = cached;
            matrix.retain(|target, _| {
                titles.contains(target.as_str()) || source.references(target)
            });
        }
        before - self.notes.len()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TenantCaches
// ---------------------------------------------------------------------------

/// One cache per tenant. Each cache sits behind an async mutex so passes
/// against it run one at a time.
pub struct TenantCaches {
    config: EngineConfig,
    caches: DashMap<String, Arc<Mutex<ProblemCache>>>,
}

impl TenantCaches {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            caches: DashMap::new(),
        })
    }

    /// Cache for `tenant`, created on first use.
    pub fn get(&self, tenant: &str) -> Result<Arc<Mutex<ProblemCache>>, ConfigError> {
        if let Some(cache) = self.caches.get(tenant) {
            return Ok(Arc::clone(cache.value()));
        }
        let cache = ProblemCache::new(tenant, self.config.clone())?;
        Ok(Arc::clone(
            self.caches
                .entry(tenant.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(cache)))
                .value(),
        ))
    }

    /// Discard `previous` and hand out a cache for `next`.
    pub fn switch(
        &self,
        previous: &str,
        next: &str,
    ) -> Result<Arc<Mutex<ProblemCache>>, ConfigError> {
        if previous != next {
            self.remove(previous);
        }
        self.get(next)
    }

    pub fn remove(&self, tenant: &str) -> bool {
        self.caches.remove(tenant).is_some()
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        tenants.sort();
        tenants
    }
}
