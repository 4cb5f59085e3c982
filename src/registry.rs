//! Canonical grammar registry.
//!
//! Provides a single, canonical constructor for a fully populated grammar
//! registry shared by production and test code paths.
//!
//! Registry Invariant: the registry is immutable once parsing begins.
//! `register` is for the single-threaded setup phase; afterwards the registry
//! is only read, which is what makes concurrent `parse` calls safe with zero
//! synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::grammar::{builtin, Grammar};

/// Read-only map from language identifier (or alias, or file extension) to a
/// shared [`Grammar`].
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    by_id: HashMap<String, Arc<Grammar>>,
    grammars: Vec<Arc<Grammar>>,
}

impl GrammarRegistry {
    /// An empty registry. Use [`build_default_registry`] for the usual,
    /// fully populated one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a grammar under its id and all of its aliases. Later
    /// registrations win, so a caller can shadow a built-in. Must only be
    /// called during single-threaded setup, before any parsing.
    pub fn register(&mut self, grammar: Grammar) {
        let grammar = Arc::new(grammar);
        self.by_id
            .insert(grammar.language_id.clone(), Arc::clone(&grammar));
        for alias in &grammar.aliases {
            self.by_id.insert(alias.clone(), Arc::clone(&grammar));
        }
        self.grammars.push(grammar);
    }

    /// Resolves a language id or alias. `None` is a recoverable result the
    /// engine turns into an `UnsupportedLanguage` diagnostic.
    pub fn lookup(&self, language_id: &str) -> Option<Arc<Grammar>> {
        self.by_id.get(language_id).cloned()
    }

    /// Resolves a grammar from a filename's extension.
    pub fn for_filename(&self, filename: &str) -> Option<Arc<Grammar>> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?;
        self.grammars
            .iter()
            .find(|g| g.file_extensions.iter().any(|e| e == ext))
            .cloned()
    }

    /// Registered primary language ids, in registration order.
    pub fn language_ids(&self) -> Vec<&str> {
        self.grammars.iter().map(|g| g.language_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

/// Builds a registry holding all built-in grammars.
pub fn build_default_registry() -> GrammarRegistry {
    let mut registry = GrammarRegistry::new();
    for grammar in builtin::all() {
        registry.register(grammar);
    }
    registry
}

static DEFAULT_REGISTRY: Lazy<GrammarRegistry> = Lazy::new(build_default_registry);

/// The process-wide default registry, built once on first use.
pub fn default_registry() -> &'static GrammarRegistry {
    &DEFAULT_REGISTRY
}
