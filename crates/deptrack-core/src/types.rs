use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Languages the engine can dispatch to a registered analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Kotlin,
    TypeScript,
    Python,
    Go,
    Rust,
    Yaml,
    Sql,
    Proto,
    Unknown,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Kotlin => write!(f, "Kotlin"),
            Language::TypeScript => write!(f, "TypeScript"),
            Language::Python => write!(f, "Python"),
            Language::Go => write!(f, "Go"),
            Language::Rust => write!(f, "Rust"),
            Language::Yaml => write!(f, "YAML"),
            Language::Sql => write!(f, "SQL"),
            Language::Proto => write!(f, "Protocol Buffers"),
            Language::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kind of dependency relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// A reference to another module of this project.
    Internal,
    /// An external package dependency.
    External,
    /// A build system dependency.
    BuildTool,
    /// A configuration dependency.
    Config,
    /// A runtime dependency.
    Runtime,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Internal => write!(f, "internal"),
            DependencyKind::External => write!(f, "external"),
            DependencyKind::BuildTool => write!(f, "build-tool"),
            DependencyKind::Config => write!(f, "config"),
            DependencyKind::Runtime => write!(f, "runtime"),
        }
    }
}

/// Kind of graph-visible unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Service,
    Library,
    Config,
    Database,
    Api,
    Feature,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Service => write!(f, "service"),
            NodeKind::Library => write!(f, "library"),
            NodeKind::Config => write!(f, "config"),
            NodeKind::Database => write!(f, "database"),
            NodeKind::Api => write!(f, "api"),
            NodeKind::Feature => write!(f, "feature"),
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service" => Ok(NodeKind::Service),
            "library" => Ok(NodeKind::Library),
            "config" => Ok(NodeKind::Config),
            "database" => Ok(NodeKind::Database),
            "api" => Ok(NodeKind::Api),
            "feature" => Ok(NodeKind::Feature),
            _ => Err(crate::error::Error::InvalidParameter(format!(
                "unknown node kind: {s}"
            ))),
        }
    }
}

/// Outcome of classifying a declared dependency.
///
/// `Circular` coming from an analyzer is advisory; the graph's own cycle
/// detection is the authoritative answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStatus {
    /// Not classified yet.
    Pending,
    Resolved,
    NotFound,
    VersionConflict,
    Circular,
    Error,
}

impl fmt::Display for ResolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveStatus::Pending => write!(f, "pending"),
            ResolveStatus::Resolved => write!(f, "resolved"),
            ResolveStatus::NotFound => write!(f, "not-found"),
            ResolveStatus::VersionConflict => write!(f, "version-conflict"),
            ResolveStatus::Circular => write!(f, "circular"),
            ResolveStatus::Error => write!(f, "error"),
        }
    }
}

/// A single declared reference extracted from one source file, prior to
/// becoming a graph edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
    pub kind: DependencyKind,
    pub source_file: PathBuf,
    pub line: usize,
    pub status: ResolveStatus,
    /// Opaque per-language payload; never interpreted by the engine.
    #[serde(default)]
    pub metadata: Value,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        kind: DependencyKind,
        source_file: impl Into<PathBuf>,
        line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            version: None,
            kind,
            source_file: source_file.into(),
            line,
            status: ResolveStatus::Pending,
            metadata: Value::Null,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
