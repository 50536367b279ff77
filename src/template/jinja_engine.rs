//! MiniJinja templates.
//!
//! The model is handed over as a map object whose entries are resolved on
//! first access and cached for the rest of the render. `db` is exposed as
//! an object with query methods:
//!
//! ```jinja
//! {% for project in db.published("project") %}...{% endfor %}
//! {{ db.by_tag("rust") | length }}
//! ```

use super::{TemplateEngine, TemplateError, error_chain};
use crate::{
    model::{Extracted, LazyModel, ValueAdapter},
    store::ContentStore,
};
use minijinja::{
    Environment, Error, ErrorKind, State, path_loader,
    value::{Enumerator, Object, Value},
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::{fmt, io::Write, path::Path, sync::Arc};

pub struct JinjaEngine {
    env: Environment<'static>,
}

impl JinjaEngine {
    pub fn new(templates_dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_dir));
        Self { env }
    }
}

impl TemplateEngine for JinjaEngine {
    fn render_document(
        &self,
        model: &LazyModel,
        template: &str,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        let render = |err: Error| TemplateError::Render(error_chain(&err));

        let template = self.env.get_template(template).map_err(render)?;
        let context = Value::from_object(JinjaModel {
            model: model.clone(),
            cache: Mutex::default(),
        });
        let output = template.render(context).map_err(render)?;
        writer
            .write_all(output.as_bytes())
            .map_err(|err| TemplateError::Render(error_chain(&err)))
    }
}

// ============================================================================
// Values
// ============================================================================

struct JinjaAdapter;

impl ValueAdapter for JinjaAdapter {
    type Output = Value;

    fn adapt(&self, _key: &str, raw: Extracted) -> Value {
        match raw {
            Extracted::Store(store) => Value::from_object(StoreObject { store }),
            other => Value::from_serialize(other.to_json()),
        }
    }

    fn plain(&self, _key: &str, value: &serde_json::Value) -> Value {
        Value::from_serialize(value)
    }
}

/// Template context backed by a [`LazyModel`].
struct JinjaModel {
    model: LazyModel,
    cache: Mutex<FxHashMap<String, Option<Value>>>,
}

impl fmt::Debug for JinjaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JinjaModel")
            .field("entries", self.model.entries())
            .finish_non_exhaustive()
    }
}

impl Object for JinjaModel {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        if let Some(cached) = self.cache.lock().get(key) {
            return cached.clone();
        }

        let value = self.model.get(key, &JinjaAdapter);
        self.cache.lock().insert(key.to_owned(), value.clone());
        value
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.model.keys().into_iter().map(Value::from).collect())
    }
}

/// The `db` entry.
struct StoreObject {
    store: Arc<dyn ContentStore>,
}

impl fmt::Debug for StoreObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreObject")
            .field("types", &self.store.document_types())
            .finish()
    }
}

impl StoreObject {
    fn argument<'a>(method: &str, args: &'a [Value]) -> Result<&'a str, Error> {
        args.first().and_then(Value::as_str).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("db.{method}() expects one string argument"),
            )
        })
    }
}

impl Object for StoreObject {
    /// `db.<type>`: every document of that type.
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let doc_type = key.as_str()?;
        self.store
            .document_types()
            .iter()
            .any(|known| known == doc_type)
            .then(|| Value::from_serialize(self.store.all_by_type(doc_type)))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.store.document_types().into_iter().map(Value::from).collect())
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        let docs = match method {
            "by_type" => self.store.all_by_type(Self::argument(method, args)?),
            "published" => self.store.published_by_type(Self::argument(method, args)?),
            "by_tag" => self.store.published_by_tag(Self::argument(method, args)?, None),
            "tags" => return Ok(Value::from_serialize(self.store.distinct_tags())),
            _ => {
                return Err(Error::new(
                    ErrorKind::UnknownMethod,
                    format!("db has no method named {method}"),
                ));
            }
        };
        Ok(Value::from_serialize(docs))
    }
}
