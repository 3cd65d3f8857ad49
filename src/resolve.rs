use crate::document::{parse_value, DocumentError};
use crate::loader::{LoadError, ReferenceLoader};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("unresolvable reference \"{reference}\" relative to \"{base}\"")]
    UnresolvableReference { reference: String, base: String },
    #[error("reference \"{reference}\" nests deeper than {limit} levels")]
    RecursionLimit { reference: String, limit: usize },
}

/// Inlines `$ref` nodes, loading other documents through a [`ReferenceLoader`].
///
/// Remote targets are resolved against their own location, so relative references in a
/// referenced file point next to that file. A reference back into a target that is still
/// being expanded is left in place, so recursive schemas stop after one inline copy.
pub struct Resolver<'a> {
    loader: &'a ReferenceLoader,
    max_depth: usize,
}

/// State of one resolution pass.
#[derive(Default)]
struct Pass {
    /// Remote documents already fetched during this pass.
    documents: HashMap<Url, Arc<Value>>,
    /// `location#pointer` of every reference currently being expanded.
    stack: Vec<String>,
    /// Expanded targets by `location#pointer`.
    resolved: HashMap<String, Value>,
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a ReferenceLoader, max_depth: usize) -> Self {
        Self { loader, max_depth }
    }

    pub async fn resolve(&self, mut doc: Value, base: &Url) -> Result<Value, ResolveError> {
        let root = Arc::new(doc.clone());
        let mut pass = Pass::default();

        self.walk(&mut doc, &root, base, false, &mut pass).await?;

        Ok(doc)
    }

    /// `names` is set when the keys of `node` are user-chosen names (`properties`,
    /// `definitions`), which are never treated as opaque keywords.
    fn walk<'b>(
        &'b self,
        node: &'b mut Value,
        root: &'b Arc<Value>,
        base: &'b Url,
        names: bool,
        pass: &'b mut Pass,
    ) -> BoxFuture<'b, Result<(), ResolveError>> {
        Box::pin(async move {
            if let Some(reference) = reference_of(node) {
                if let Some(target) = self.follow(reference, root, base, pass).await? {
                    *node = target;
                }
                return Ok(());
            }

            match node {
                Value::Object(map) => {
                    for (key, child) in map.iter_mut() {
                        if !names && is_opaque(key) {
                            continue;
                        }
                        let child_names = !names && holds_names(key);
                        self.walk(child, root, base, child_names, pass).await?;
                    }
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        self.walk(item, root, base, false, pass).await?;
                    }
                }
                _ => {}
            }

            Ok(())
        })
    }

    /// The expanded target of `reference`, or `None` when it is already being expanded.
    async fn follow(
        &self,
        reference: String,
        root: &Arc<Value>,
        base: &Url,
        pass: &mut Pass,
    ) -> Result<Option<Value>, ResolveError> {
        let unresolvable = || ResolveError::UnresolvableReference {
            reference: reference.clone(),
            base: base.to_string(),
        };

        let (document, pointer) = split_reference(&reference);

        let (location, target_root) = if document.is_empty() {
            let mut location = base.clone();
            location.set_fragment(None);
            (location, Arc::clone(root))
        } else {
            let mut location = base.join(document).map_err(|_| unresolvable())?;
            location.set_fragment(None);
            let target_root = self.document(&location, pass).await?;
            (location, target_root)
        };

        let key = format!("{}#{}", location, pointer);
        if pass.stack.contains(&key) {
            tracing::debug!(reference = %key, "leaving circular reference in place");
            return Ok(None);
        }
        if let Some(target) = pass.resolved.get(&key) {
            return Ok(Some(target.clone()));
        }
        if pass.stack.len() >= self.max_depth {
            tracing::warn!(reference = %key, depth = pass.stack.len(), "reference depth limit");
            return Err(ResolveError::RecursionLimit {
                reference: key,
                limit: self.max_depth,
            });
        }

        let mut target = lookup(&target_root, pointer)
            .cloned()
            .ok_or_else(unresolvable)?;

        pass.stack.push(key.clone());
        let result = self
            .walk(&mut target, &target_root, &location, false, pass)
            .await;
        pass.stack.pop();
        result?;

        pass.resolved.insert(key, target.clone());

        Ok(Some(target))
    }

    async fn document(&self, location: &Url, pass: &mut Pass) -> Result<Arc<Value>, ResolveError> {
        if let Some(doc) = pass.documents.get(location) {
            return Ok(Arc::clone(doc));
        }

        tracing::debug!(%location, "loading referenced document");
        let bytes = self.loader.load(location).await?;
        let doc = Arc::new(parse_value(location, &bytes)?);
        pass.documents.insert(location.clone(), Arc::clone(&doc));

        Ok(doc)
    }
}

fn reference_of(node: &Value) -> Option<String> {
    node.as_object()?
        .get("$ref")?
        .as_str()
        .map(|reference| reference.to_string())
}

/// Example payloads and vendor extensions are free-form.
fn is_opaque(key: &str) -> bool {
    key == "example" || key == "examples" || key.starts_with("x-")
}

fn holds_names(key: &str) -> bool {
    matches!(key, "properties" | "definitions" | "schemas")
}

fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

fn lookup<'v>(root: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() || pointer == "/" {
        Some(root)
    } else if pointer.starts_with('/') {
        root.pointer(pointer)
    } else {
        None
    }
}
