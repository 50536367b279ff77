//! Descriptor-driven engine registry.
//!
//! One generic registry backs the three pluggable families: markup engines
//! (keyed by source extension), template engines (keyed by template
//! extension) and model extractors (keyed by template variable name).
//!
//! ```text
//! descriptor files            catalog (compiled in)          registry
//! ┌────────────────────┐      ┌──────────────────────┐      ┌──────────────┐
//! │ MarkdownEngine=md  │ ───► │ "MarkdownEngine" → fn│ ───► │ md → engine  │
//! │ AsciidocEngine=adoc│      │  (no Asciidoc entry) │      │ adoc → stub  │
//! └────────────────────┘      └──────────────────────┘      └──────────────┘
//! ```
//!
//! An identifier that is missing from the catalog, or whose factory fails,
//! never aborts loading. [`MissingPolicy`] decides whether a stand-in engine
//! is installed (failing on first use) or the keys stay unregistered.

pub mod descriptor;

pub use descriptor::{Descriptor, DescriptorEntry, EngineError};

use crate::log;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::{path::PathBuf, sync::Arc};

/// Builds one engine instance; `Err` carries the reason it is unavailable.
pub type Factory<E> = Box<dyn Fn() -> Result<Arc<E>, String> + Send + Sync>;

/// Compiled-in implementations, addressed by descriptor identifier.
pub struct Catalog<E: ?Sized> {
    factories: FxHashMap<&'static str, Factory<E>>,
}

impl<E: ?Sized> Default for Catalog<E> {
    fn default() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }
}

impl<E: ?Sized> Catalog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory under `identifier`.
    pub fn with(
        mut self,
        identifier: &'static str,
        factory: impl Fn() -> Result<Arc<E>, String> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(identifier, Box::new(factory));
        self
    }

    fn instantiate(&self, identifier: &str) -> Result<Arc<E>, String> {
        match self.factories.get(identifier) {
            Some(factory) => factory(),
            None => Err(format!("no implementation named `{identifier}` in this build")),
        }
    }
}

/// What to do when a descriptor entry cannot be instantiated.
pub enum MissingPolicy<E: ?Sized> {
    /// Register a stand-in built from `(identifier, reason)`.
    Sentinel(fn(&str, &str) -> Arc<E>),
    /// Leave the keys unregistered.
    Skip,
}

struct Registration<E: ?Sized> {
    implementation: String,
    engine: Arc<E>,
}

struct State<E: ?Sized> {
    loaded: bool,
    engines: FxHashMap<String, Registration<E>>,
}

/// Key → engine registry populated from descriptors.
pub struct EngineRegistry<E: ?Sized> {
    kind: &'static str,
    descriptor_name: &'static str,
    builtin: &'static str,
    search_dirs: Vec<PathBuf>,
    catalog: Catalog<E>,
    policy: MissingPolicy<E>,
    state: RwLock<State<E>>,
}

impl<E: ?Sized + Send + Sync> EngineRegistry<E> {
    /// Create an unloaded registry.
    ///
    /// `kind` names the family in log output, `descriptor_name` is the file
    /// searched in plugin folders, `builtin` is the compiled-in descriptor.
    pub fn new(
        kind: &'static str,
        descriptor_name: &'static str,
        builtin: &'static str,
        catalog: Catalog<E>,
        policy: MissingPolicy<E>,
    ) -> Self {
        Self {
            kind,
            descriptor_name,
            builtin,
            search_dirs: Vec::new(),
            catalog,
            policy,
            state: RwLock::new(State {
                loaded: false,
                engines: FxHashMap::default(),
            }),
        }
    }

    /// Also read descriptors from these folders, in order.
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Instantiate every descriptor entry and register it under its keys.
    pub fn load(&self) {
        let descriptors = Descriptor::discover(self.descriptor_name, self.builtin, &self.search_dirs);

        for entry in descriptors.iter().flat_map(|d| &d.entries) {
            let engine = match self.catalog.instantiate(&entry.implementation) {
                Ok(engine) => engine,
                Err(reason) => match &self.policy {
                    MissingPolicy::Sentinel(stand_in) => {
                        log!("warn"; "{} `{}` unavailable: {reason}", self.kind, entry.implementation);
                        stand_in(&entry.implementation, &reason)
                    }
                    MissingPolicy::Skip => continue,
                },
            };

            for key in &entry.keys {
                self.insert(key, &entry.implementation, Arc::clone(&engine));
            }
        }

        self.state.write().loaded = true;
    }

    /// Load once; later calls are no-ops.
    pub fn ensure_loaded(&self) {
        if !self.is_loaded() {
            self.load();
        }
    }

    /// Drop every registration and reload from descriptors.
    pub fn reset(&self) {
        {
            let mut state = self.state.write();
            state.engines.clear();
            state.loaded = false;
        }
        self.load();
    }

    /// Register `engine` under `key`. The last registration for a key wins.
    ///
    /// Descriptors are loaded first, so a hand registration is never
    /// replaced by the lazy load of a later lookup.
    pub fn register(&self, key: &str, implementation: &str, engine: Arc<E>) {
        self.ensure_loaded();
        self.insert(key, implementation, engine);
    }

    fn insert(&self, key: &str, implementation: &str, engine: Arc<E>) {
        let previous = self.state.write().engines.insert(
            key.to_owned(),
            Registration {
                implementation: implementation.to_owned(),
                engine,
            },
        );

        if let Some(previous) = previous {
            log!(
                "warn";
                "{} key `{key}` re-registered: `{}` replaced by `{implementation}`",
                self.kind,
                previous.implementation
            );
        }
    }

    /// Whether an engine is registered for `key`.
    pub fn supports_extension(&self, key: &str) -> bool {
        self.ensure_loaded();
        self.state.read().engines.contains_key(key)
    }

    /// Engine registered for `key`.
    pub fn get(&self, key: &str) -> Option<Arc<E>> {
        self.ensure_loaded();
        self.state
            .read()
            .engines
            .get(key)
            .map(|registration| Arc::clone(&registration.engine))
    }

    /// Implementation identifier registered for `key`.
    pub fn implementation(&self, key: &str) -> Option<String> {
        self.ensure_loaded();
        self.state
            .read()
            .engines
            .get(key)
            .map(|registration| registration.implementation.clone())
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.ensure_loaded();
        let mut keys: Vec<String> = self.state.read().engines.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.ensure_loaded();
        self.state.read().engines.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

// ============================================================================
// Tests
// ============================================================================
