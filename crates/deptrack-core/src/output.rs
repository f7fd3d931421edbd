use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;

/// Render targets for the finished graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Dot,
    Mermaid,
    Html,
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Dot => write!(f, "dot"),
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "dot" => Ok(OutputFormat::Dot),
            "mermaid" => Ok(OutputFormat::Mermaid),
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(Error::InvalidParameter(format!(
                "unknown output format: {s}"
            ))),
        }
    }
}

/// Consumes a finished graph handle and produces a file artifact.
///
/// Rendering implementations live outside the engine; the tracker only
/// guarantees the graph it hands over is stable and fully resolved.
pub trait OutputGenerator: Send + Sync {
    fn generate(
        &self,
        graph: &DependencyGraph,
        format: OutputFormat,
        output_path: &Path,
    ) -> Result<()>;
}
