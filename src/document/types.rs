//! Registry of document types.
//!
//! Built-in types are always present; custom types arrive from configuration
//! or data files. Every listener hears about each new type exactly once, which
//! is how the extractor registry learns `<type>s` and the store creates the
//! partition for the type.

use parking_lot::{Mutex, RwLock};
use std::{collections::BTreeSet, sync::Arc};

/// Types every site starts with.
pub const BUILTIN_TYPES: [&str; 5] = ["archive", "feed", "masterindex", "page", "post"];

/// Reacts to newly registered document types.
pub trait DocumentTypeListener: Send + Sync {
    fn added(&self, types: &DocumentTypes, doc_type: &str);
}

type Hook = Box<dyn FnOnce() + Send>;

/// The set of known document types plus its listeners.
pub struct DocumentTypes {
    types: RwLock<BTreeSet<String>>,
    listeners: RwLock<Vec<Arc<dyn DocumentTypeListener>>>,
    before_first_read: Mutex<Option<Hook>>,
}

impl Default for DocumentTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTypes {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(builtin_set()),
            listeners: RwLock::new(Vec::new()),
            before_first_read: Mutex::new(None),
        }
    }

    /// Run `hook` before `document_types` answers for the first time.
    ///
    /// The oven uses it to make sure engine registries are loaded before
    /// anyone enumerates types.
    pub fn before_first_read(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_first_read.lock() = Some(Box::new(hook));
    }

    /// Register a type. Returns `false` if it was already known.
    pub fn add_document_type(&self, doc_type: &str) -> bool {
        if !self.types.write().insert(doc_type.to_owned()) {
            return false;
        }

        // Listeners may query this registry; no lock is held while they run.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.added(self, doc_type);
        }
        true
    }

    /// Known types, sorted.
    pub fn document_types(&self) -> Vec<String> {
        let hook = self.before_first_read.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.types.read().iter().cloned().collect()
    }

    /// Back to the built-ins. Listeners are kept and not notified.
    pub fn reset_document_types(&self) {
        *self.types.write() = builtin_set();
    }

    pub fn contains(&self, doc_type: &str) -> bool {
        self.types.read().contains(doc_type)
    }

    /// Add a listener; adding the same `Arc` twice has no effect.
    pub fn add_listener(&self, listener: Arc<dyn DocumentTypeListener>) {
        let mut listeners = self.listeners.write();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }
}

fn builtin_set() -> BTreeSet<String> {
    BUILTIN_TYPES.iter().map(|t| (*t).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        calls: Mutex<Vec<String>>,
    }

    impl DocumentTypeListener for Counter {
        fn added(&self, types: &DocumentTypes, doc_type: &str) {
            assert!(types.contains(doc_type));
            self.calls.lock().push(doc_type.to_owned());
        }
    }

    #[test]
    fn test_builtin_types() {
        let types = DocumentTypes::new();
        assert_eq!(
            types.document_types(),
            vec!["archive", "feed", "masterindex", "page", "post"]
        );
    }

    #[test]
    fn test_listener_fires_once_per_new_type() {
        let types = DocumentTypes::new();
        let counter = Arc::new(Counter::default());
        types.add_listener(counter.clone());

        assert!(types.add_document_type("project"));
        assert!(!types.add_document_type("project"));
        assert!(!types.add_document_type("post"));

        assert_eq!(*counter.calls.lock(), vec!["project"]);
    }

    #[test]
    fn test_listener_added_twice_is_notified_once() {
        let types = DocumentTypes::new();
        let counter = Arc::new(Counter::default());
        types.add_listener(counter.clone());
        types.add_listener(counter.clone());

        types.add_document_type("recipe");
        assert_eq!(counter.calls.lock().len(), 1);
    }

    #[test]
    fn test_reset_restores_builtins_without_notification() {
        let types = DocumentTypes::new();
        let counter = Arc::new(Counter::default());
        types.add_listener(counter.clone());
        types.add_document_type("project");

        types.reset_document_types();
        assert!(!types.contains("project"));
        assert_eq!(types.document_types().len(), BUILTIN_TYPES.len());
        assert_eq!(counter.calls.lock().len(), 1);

        // Re-adding after reset is a new type again.
        types.add_document_type("project");
        assert_eq!(counter.calls.lock().len(), 2);
    }

    #[test]
    fn test_hook_runs_before_first_read_only() {
        let types = DocumentTypes::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        types.before_first_read(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        types.document_types();
        types.document_types();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
