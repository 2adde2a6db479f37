//! Paragraph decomposition and cross-note consistency analysis behind a
//! wiki's edit suggestions.
//!
//! The crate does no I/O. Callers hand a pass the current note collection and
//! board counts; a [`ProblemCache`] per tenant keeps the work between passes
//! proportional to what changed.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod html_text;
pub mod linear;
pub mod link_parser;
pub mod matrix;
pub mod model;
pub mod paragraph;
pub mod paragraph_index;
pub mod path_codec;
pub mod problem_cache;
pub mod readability;
pub mod scheduler;

pub use aggregator::{group_findings, run_pass, PassOutput, PassStats};
pub use config::EngineConfig;
pub use error::{ConfigError, PathError};
pub use link_parser::{internal_href, LinkExtractor};
pub use matrix::MatrixTarget;
pub use model::{ExternalLink, Finding, FindingGroup, InternalLink, Link, Note};
pub use paragraph::{decompose, paragraph_description, Paragraph};
pub use paragraph_index::ParagraphIndex;
pub use problem_cache::{CacheState, MatrixEntry, MatrixSource, ProblemCache, ProblemSource, TenantCaches};
pub use scheduler::PassScheduler;
