use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::analyzer::LanguageAnalyzer;
use crate::types::Language;

pub(crate) fn build_globset<S: AsRef<str>>(patterns: &[S]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern.as_ref()) {
            builder.add(glob);
        }
    }
    builder
        .build()
        .unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

struct Registration {
    language: Language,
    matcher: GlobSet,
    analyzer: Arc<dyn LanguageAnalyzer>,
}

/// Maps each language to its registered analyzer and detects languages from
/// file naming conventions.
#[derive(Default)]
pub struct LanguageRegistry {
    entries: Vec<Registration>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register an analyzer under the language it declares.
    ///
    /// Re-registering a language replaces the previous analyzer in place
    /// (last registration wins, original detection priority kept). This is
    /// the override mechanism, not an error.
    pub fn register(&mut self, analyzer: Arc<dyn LanguageAnalyzer>) {
        let language = analyzer.language();
        let registration = Registration {
            language,
            matcher: build_globset(analyzer.file_patterns()),
            analyzer,
        };
        match self.entries.iter_mut().find(|e| e.language == language) {
            Some(existing) => *existing = registration,
            None => self.entries.push(registration),
        }
    }

    /// Detect a file's language from its name. Registered analyzers are
    /// consulted in registration order; first match wins. No match means
    /// `Unknown`, which callers treat as "skip, not fail".
    pub fn detect(&self, path: &Path) -> Language {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Language::Unknown;
        };
        for entry in &self.entries {
            if entry.matcher.is_match(name) {
                return entry.language;
            }
        }
        Language::Unknown
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageAnalyzer>> {
        self.entries
            .iter()
            .find(|e| e.language == language)
            .map(|e| Arc::clone(&e.analyzer))
    }

    /// Registered languages in registration order.
    pub fn languages(&self) -> Vec<Language> {
        self.entries.iter().map(|e| e.language).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
