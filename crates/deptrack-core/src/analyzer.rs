use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::resolve::VersionIndex;
use crate::types::{Dependency, DependencyKind, Language, ResolveStatus};

/// One file's analysis result: the dependencies it declares plus whatever
/// opaque metadata the analyzer wants to attach. Replaced wholesale on
/// re-analysis, never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub language: Language,
    /// The file's modification time at the moment it was analyzed.
    pub last_modified: DateTime<Utc>,
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub metadata: Value,
}

impl ParsedFile {
    pub fn new(
        path: impl Into<PathBuf>,
        language: Language,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            language,
            last_modified,
            dependencies: Vec::new(),
            metadata: Value::Null,
        }
    }
}

/// State handed to `classify_dependency`: the graph as it stands and the
/// versions declared so far per dependency name.
pub struct ResolutionContext<'a> {
    pub graph: &'a DependencyGraph,
    pub versions: &'a VersionIndex,
}

/// Capability contract each per-language analyzer must implement.
///
/// Analyzers are external plugins; the engine only sees this trait. An
/// implementation must be shareable across worker threads.
pub trait LanguageAnalyzer: Send + Sync {
    /// The language this analyzer handles.
    fn language(&self) -> Language;

    /// Glob patterns matched against file names during detection,
    /// e.g. `&["*.kt", "*.kts"]`.
    fn file_patterns(&self) -> &[&str];

    /// Parse a source file into its declared dependencies.
    fn parse(&self, path: &Path) -> Result<ParsedFile>;

    /// Classify one declared dependency.
    ///
    /// The default covers the common cases: conflicting version declarations
    /// first, then a graph lookup for internal targets. Language-specific
    /// analyzers override this for anything smarter; a `Circular` return is
    /// advisory only — cycle detection on the graph is authoritative.
    fn classify_dependency(
        &self,
        dep: &Dependency,
        ctx: &ResolutionContext<'_>,
    ) -> ResolveStatus {
        if ctx.versions.has_conflict(&dep.name) {
            return ResolveStatus::VersionConflict;
        }
        match dep.kind {
            DependencyKind::Internal => {
                if ctx.graph.contains_node(&dep.name) {
                    ResolveStatus::Resolved
                } else {
                    ResolveStatus::NotFound
                }
            }
            _ => ResolveStatus::Resolved,
        }
    }
}
