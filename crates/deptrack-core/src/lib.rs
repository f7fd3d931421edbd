pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod registry;
pub mod resolve;
pub mod tracker;
pub mod types;

pub use analyzer::{LanguageAnalyzer, ParsedFile, ResolutionContext};
pub use cache::FileCache;
pub use config::Config;
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphEdge, GraphNode};
pub use output::{OutputFormat, OutputGenerator};
pub use registry::LanguageRegistry;
pub use resolve::VersionIndex;
pub use tracker::{AnalysisSummary, DependencyTracker, FileOutcome, OutcomeStatus};
pub use types::*;
