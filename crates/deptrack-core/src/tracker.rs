use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use globset::GlobSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analyzer::{LanguageAnalyzer, ParsedFile};
use crate::cache::FileCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{DependencyGraph, GraphEdge, GraphNode};
use crate::output::{OutputFormat, OutputGenerator};
use crate::registry::{build_globset, LanguageRegistry};
use crate::resolve;
use crate::types::{Language, NodeKind, ResolveStatus};

/// How one file fared during an analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Parsed fresh by its analyzer.
    Analyzed,
    /// Reused from the file cache without invoking the analyzer.
    Cached,
    /// No registered analyzer recognizes the file.
    Skipped,
    /// The analyzer failed or timed out. Recorded, never fatal.
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub language: Language,
    pub status: OutcomeStatus,
    pub dependency_count: usize,
    pub error: Option<String>,
}

/// Aggregate result of an analysis entry point. Always complete: per-file
/// failures are recorded here instead of aborting the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub outcomes: Vec<FileOutcome>,
    /// Files analyzed fresh or served from cache.
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub cache_hits: usize,
    pub dependencies_found: usize,
    /// Edges whose target could not be resolved.
    pub unresolved: usize,
    pub version_conflicts: usize,
}

impl AnalysisSummary {
    fn push(&mut self, outcome: FileOutcome) {
        match outcome.status {
            OutcomeStatus::Analyzed => self.files_processed += 1,
            OutcomeStatus::Cached => {
                self.files_processed += 1;
                self.cache_hits += 1;
            }
            OutcomeStatus::Skipped => self.files_skipped += 1,
            OutcomeStatus::Failed => self.files_failed += 1,
        }
        self.dependencies_found += outcome.dependency_count;
        self.outcomes.push(outcome);
    }

    fn count_resolution(&mut self, graph: &DependencyGraph) {
        self.unresolved = 0;
        self.version_conflicts = 0;
        for edge in graph.edges() {
            match edge.resolution {
                ResolveStatus::NotFound => self.unresolved += 1,
                ResolveStatus::VersionConflict => self.version_conflicts += 1,
                _ => {}
            }
        }
    }
}

/// Orchestrates discovery, per-language parsing, caching, resolution, and
/// graph accumulation.
///
/// Workers only share the graph and the cache, both internally synchronized;
/// merges are commutative by node-id and edge-triple identity, so the final
/// graph content does not depend on scheduling order. Callers must not read
/// the graph until the analysis call returns.
pub struct DependencyTracker {
    registry: LanguageRegistry,
    graph: Arc<DependencyGraph>,
    cache: FileCache,
    config: Config,
    exclude: GlobSet,
    output: Option<Box<dyn OutputGenerator>>,
    initialized: bool,
}

impl DependencyTracker {
    /// A tracker that is not yet ready: `initialize` must run before any
    /// analysis entry point.
    pub fn new() -> Self {
        Self {
            registry: LanguageRegistry::new(),
            graph: Arc::new(DependencyGraph::new()),
            cache: FileCache::new(),
            config: Config::default(),
            exclude: build_globset::<&str>(&[]),
            output: None,
            initialized: false,
        }
    }

    /// Consume externally-loaded configuration and make the tracker ready.
    /// Clears any graph and cache state from a previous configuration.
    pub fn initialize(&mut self, config: Config) -> Result<()> {
        self.exclude = build_globset(&config.exclude);
        self.config = config;
        self.graph.clear();
        self.cache.clear();
        self.initialized = true;
        Ok(())
    }

    pub fn register_parser(&mut self, analyzer: Arc<dyn LanguageAnalyzer>) {
        self.registry.register(analyzer);
    }

    pub fn get_parser(&self, language: Language) -> Option<Arc<dyn LanguageAnalyzer>> {
        self.registry.get(language)
    }

    pub fn detect_language(&self, path: &Path) -> Language {
        self.registry.detect(path)
    }

    /// Shared handle to the dependency graph. Safe to read once the analysis
    /// call that populated it has returned.
    pub fn get_graph(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.graph)
    }

    pub fn set_output_generator(&mut self, generator: Box<dyn OutputGenerator>) {
        self.output = Some(generator);
    }

    /// Persist the file cache for incremental re-analysis across runs.
    pub fn save_cache(&self, path: &Path) -> Result<()> {
        self.cache.save(path)
    }

    /// Replace the file cache with one saved by an earlier run.
    pub fn load_cache(&mut self, path: &Path) -> Result<()> {
        self.cache = FileCache::load(path)?;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Config("tracker is not initialized".to_string()))
        }
    }

    /// Analyze a single file and merge its result into the graph.
    ///
    /// An unknown language is a recorded `Skipped` outcome, not an error; a
    /// missing file is a call-level error.
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisSummary> {
        self.ensure_initialized()?;
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let mut summary = AnalysisSummary::default();
        summary.push(self.analyze_one(path));
        summary.count_resolution(&self.graph);
        Ok(summary)
    }

    /// Recursively analyze every recognizable file under `root`.
    ///
    /// Independent files run on parallel workers when the configuration asks
    /// for it. Per-file failures never abort the scan; the summary lists
    /// every outcome. Edge resolutions are finalized against the complete
    /// graph before the call returns.
    pub fn analyze_directory(&self, root: &Path) -> Result<AnalysisSummary> {
        self.ensure_initialized()?;
        if !root.exists() {
            return Err(Error::FileNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(Error::InvalidParameter(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let files = self.discover_files(root);
        debug!(root = %root.display(), count = files.len(), "discovered files");

        let outcomes: Vec<FileOutcome> = if self.config.parallel {
            files.par_iter().map(|path| self.analyze_one(path)).collect()
        } else {
            files.iter().map(|path| self.analyze_one(path)).collect()
        };

        resolve::finalize(&self.graph);

        let mut summary = AnalysisSummary::default();
        for outcome in outcomes {
            summary.push(outcome);
        }
        summary.count_resolution(&self.graph);
        Ok(summary)
    }

    /// Hand the finished graph to the registered output generator.
    ///
    /// The handle is stable and fully resolved when the generator runs;
    /// rendering itself is the generator's job.
    pub fn generate_output(&self, format: OutputFormat, output_path: &Path) -> Result<()> {
        self.ensure_initialized()?;
        let generator = self
            .output
            .as_deref()
            .ok_or_else(|| Error::Output("no output generator registered".to_string()))?;
        resolve::finalize(&self.graph);
        generator.generate(&self.graph, format, output_path)
    }

    fn discover_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }
        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "directory walk error");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                !self.exclude.is_match(rel)
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    fn analyze_one(&self, path: &Path) -> FileOutcome {
        let language = self.registry.detect(path);
        let Some(analyzer) = self.registry.get(language) else {
            debug!(path = %path.display(), "no analyzer recognizes this file, skipping");
            return FileOutcome {
                path: path.to_path_buf(),
                language: Language::Unknown,
                status: OutcomeStatus::Skipped,
                dependency_count: 0,
                error: None,
            };
        };

        let cached = if self.cache.needs_reanalysis(path) {
            None
        } else {
            self.cache.get(path)
        };
        let from_cache = cached.is_some();
        let mut parsed = match cached {
            Some(parsed) => parsed,
            None => match self.parse_bounded(analyzer.clone(), path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "parse failed");
                    return FileOutcome {
                        path: path.to_path_buf(),
                        language,
                        status: OutcomeStatus::Failed,
                        dependency_count: 0,
                        error: Some(e.to_string()),
                    };
                }
            },
        };
        if !from_cache {
            self.cache.record(parsed.clone());
        }

        resolve::classify_file(&mut parsed, analyzer.as_ref(), &self.graph);
        let dependency_count = parsed.dependencies.len();
        self.merge_into_graph(&parsed);

        FileOutcome {
            path: path.to_path_buf(),
            language,
            status: if from_cache {
                OutcomeStatus::Cached
            } else {
                OutcomeStatus::Analyzed
            },
            dependency_count,
            error: None,
        }
    }

    /// Run the analyzer's parse, bounded by the configured per-file timeout,
    /// so one pathological file cannot stall a whole directory scan.
    fn parse_bounded(&self, analyzer: Arc<dyn LanguageAnalyzer>, path: &Path) -> Result<ParsedFile> {
        let Some(timeout) = self.config.parse_timeout() else {
            return analyzer.parse(path);
        };

        let (sender, receiver) = mpsc::channel();
        let worker_path = path.to_path_buf();
        let worker = thread::Builder::new()
            .name("deptrack-parse".to_string())
            .spawn(move || {
                let _ = sender.send(analyzer.parse(&worker_path));
            })
            .map_err(|e| Error::Concurrency(format!("failed to spawn parse worker: {e}")))?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => {
                let _ = worker.join();
                result
            }
            // The worker is left to finish detached; whatever it eventually
            // produces is dropped with the channel.
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::ParseFailed {
                path: path.to_path_buf(),
                reason: format!("analyzer timed out after {}ms", timeout.as_millis()),
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::ParseFailed {
                path: path.to_path_buf(),
                reason: "parse worker exited without a result".to_string(),
            }),
        }
    }

    fn merge_into_graph(&self, parsed: &ParsedFile) {
        let id = node_id_for(parsed);
        self.graph.add_node(GraphNode {
            id: id.clone(),
            name: id.clone(),
            kind: node_kind_for(parsed),
            path: parsed.path.clone(),
            dependencies: Vec::new(),
            metadata: parsed.metadata.clone(),
        });

        for dep in &parsed.dependencies {
            self.graph.add_edge(GraphEdge {
                from: id.clone(),
                to: dep.name.clone(),
                kind: dep.kind,
                version_constraint: dep.version.clone(),
                resolution: dep.status,
                metadata: dep.metadata.clone(),
            });
        }
    }
}

impl Default for DependencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Node identity for a parsed file: the analyzer's declared `"module"`
/// metadata when present, the file stem otherwise. The id is a module name,
/// not a path — files with the same stem merge into one node.
fn node_id_for(parsed: &ParsedFile) -> String {
    if let Some(module) = parsed.metadata.get("module").and_then(|v| v.as_str()) {
        return module.to_string();
    }
    parsed
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| parsed.path.to_string_lossy().into_owned())
}

/// Node kind: the analyzer's `"kind"` metadata when present and valid,
/// otherwise derived from the language and the file's location.
fn node_kind_for(parsed: &ParsedFile) -> NodeKind {
    if let Some(kind) = parsed.metadata.get("kind").and_then(|v| v.as_str()) {
        if let Ok(kind) = kind.parse() {
            return kind;
        }
    }
    match parsed.language {
        Language::Yaml => NodeKind::Config,
        Language::Sql => NodeKind::Database,
        Language::Proto => NodeKind::Api,
        _ => {
            let has = |name: &str| parsed.path.components().any(|c| c.as_os_str() == name);
            if has("services") || has("service") {
                NodeKind::Service
            } else if has("features") {
                NodeKind::Feature
            } else {
                NodeKind::Library
            }
        }
    }
}
