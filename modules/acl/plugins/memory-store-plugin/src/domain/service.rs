//! Collection storage for the in-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use acl_sdk::{Document, FindOneRequest, FindRequest, ID_FIELD, Populate, StoreError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::filter::{lookup, matches, sort_order};
use crate::config::{IdStrategy, MemoryStoreConfig};

type Collections = HashMap<String, Vec<Document>>;

fn id_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Identifier of a reference value: the value itself, or the `_id` of an
/// embedded document.
fn reference_id(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get(ID_FIELD).unwrap_or(&Value::Null),
        other => other,
    }
}

fn project_path(dest: &mut Document, src: &Document, path: &[&str]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let Some(value) = src.get(*head) else {
        return;
    };
    match value {
        Value::Object(inner) if !rest.is_empty() => {
            let entry = dest
                .entry((*head).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                project_path(nested, inner, rest);
            }
        }
        _ => {
            dest.insert((*head).to_owned(), value.clone());
        }
    }
}

/// Applies a select list: inclusions (dotted paths allowed, `_id` implied)
/// or, when every entry starts with `-`, top-level exclusions.
#[must_use]
pub fn project(doc: &Document, select: &[String]) -> Document {
    if select.is_empty() {
        return doc.clone();
    }
    if select.iter().all(|f| f.starts_with('-')) {
        let mut out = doc.clone();
        for field in select {
            out.remove(field.trim_start_matches('-'));
        }
        return out;
    }

    let mut out = Map::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_owned(), id.clone());
    }
    for field in select.iter().filter(|f| !f.starts_with('-')) {
        let path: Vec<&str> = field.split('.').collect();
        project_path(&mut out, doc, &path);
    }
    out
}

/// Documents kept in process memory, one `Vec` per model.
pub struct MemoryStore {
    collections: RwLock<Collections>,
    defaults: HashMap<String, Document>,
    required: HashMap<String, Vec<String>>,
    id_strategy: IdStrategy,
    counter: AtomicU64,
}

impl MemoryStore {
    /// Builds a store seeded with the configured collections.
    ///
    /// Seed documents without an `_id` receive one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if two seed documents of a
    /// collection share an `_id`.
    pub fn from_config(cfg: &MemoryStoreConfig) -> Result<Self, StoreError> {
        let store = Self {
            collections: RwLock::new(HashMap::new()),
            defaults: cfg.defaults.clone(),
            required: cfg.required.clone(),
            id_strategy: cfg.id_strategy,
            counter: AtomicU64::new(0),
        };

        let mut collections = Collections::new();
        for (model, seeds) in &cfg.collections {
            let mut docs: Vec<Document> = Vec::with_capacity(seeds.len());
            for seed in seeds {
                let mut doc = seed.clone();
                if !doc.contains_key(ID_FIELD) {
                    doc.insert(ID_FIELD.to_owned(), Value::String(store.next_id(&docs)));
                }
                ensure_unique(&docs, &doc)?;
                docs.push(doc);
            }
            tracing::debug!(model = %model, documents = docs.len(), "seeded collection");
            collections.insert(model.clone(), docs);
        }
        *store.collections.write() = collections;
        Ok(store)
    }

    fn next_id(&self, existing: &[Document]) -> String {
        loop {
            let id = match self.id_strategy {
                IdStrategy::Uuid => Uuid::new_v4().to_string(),
                IdStrategy::Counter => (self.counter.fetch_add(1, Ordering::Relaxed) + 1).to_string(),
            };
            let taken = existing
                .iter()
                .any(|d| d.get(ID_FIELD).is_some_and(|v| id_key(v) == id));
            if !taken {
                return id;
            }
        }
    }

    fn check_required(&self, model: &str, doc: &Document) -> Vec<String> {
        self.required
            .get(model)
            .into_iter()
            .flatten()
            .filter(|field| lookup(doc, field).iter().all(|v| v.is_null()))
            .map(|field| format!("{field} is required"))
            .collect()
    }

    fn with_defaults(&self, model: &str, doc: Document) -> Document {
        let mut merged = self.defaults.get(model).cloned().unwrap_or_default();
        merged.extend(doc);
        merged
    }

    fn populate(
        collections: &Collections,
        doc: &mut Document,
        spec: &Populate,
    ) -> Result<(), StoreError> {
        let Some(value) = doc.get_mut(&spec.path) else {
            return Ok(());
        };
        let refs = collections
            .get(&spec.model)
            .ok_or_else(|| StoreError::UnknownCollection(spec.model.clone()))?;
        let resolve = |reference: &Value| {
            let id = reference_id(reference);
            refs.iter()
                .find(|r| r.get(ID_FIELD) == Some(id) && matches(r, &spec.filter))
                .map(|r| Value::Object(project(r, &spec.select)))
        };

        *value = match &*value {
            Value::Array(items) => Value::Array(items.iter().filter_map(resolve).collect()),
            Value::Null => Value::Null,
            other => resolve(other).unwrap_or(Value::Null),
        };
        Ok(())
    }

    fn render(
        collections: &Collections,
        doc: &Document,
        select: &[String],
        populate: &[Populate],
    ) -> Result<Document, StoreError> {
        let mut out = project(doc, select);
        for spec in populate {
            Self::populate(collections, &mut out, spec)?;
        }
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn find(&self, model: &str, request: &FindRequest) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        let docs = collection(&collections, model)?;

        let mut hits: Vec<&Document> = docs.iter().filter(|d| matches(d, &request.query)).collect();
        if let Some(sort) = &request.sort {
            hits.sort_by(|a, b| sort_order(a, b, sort));
        }

        let skip = usize::try_from(request.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = request
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        hits.into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| Self::render(&collections, d, &request.select, &request.populate))
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn find_one(
        &self,
        model: &str,
        request: &FindOneRequest,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        collection(&collections, model)?
            .iter()
            .find(|d| matches(d, &request.query))
            .map(|d| Self::render(&collections, d, &request.select, &request.populate))
            .transpose()
    }

    /// Inserts all documents or none of them.
    ///
    /// # Errors
    ///
    /// - `UnknownCollection` for unknown models
    /// - `Validation` if a required field is missing
    /// - `Conflict` if an `_id` is already taken
    pub fn create(&self, model: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let mut collections = self.collections.write();
        let existing = collection_mut(&mut collections, model)?;

        let mut created: Vec<Document> = Vec::with_capacity(docs.len());
        let mut errors = Vec::new();
        for doc in docs {
            let mut doc = self.with_defaults(model, doc);
            if !doc.contains_key(ID_FIELD) {
                let id = self.next_id(existing);
                doc.insert(ID_FIELD.to_owned(), Value::String(id));
            }
            errors.extend(self.check_required(model, &doc));
            ensure_unique(existing, &doc)?;
            ensure_unique(&created, &doc)?;
            created.push(doc);
        }
        if !errors.is_empty() {
            tracing::debug!(model, errors = errors.len(), "create rejected");
            return Err(StoreError::Validation { errors });
        }

        existing.extend(created.iter().cloned());
        tracing::debug!(model, created = created.len(), "documents inserted");
        Ok(created)
    }

    /// Replaces the document with the same `_id`.
    ///
    /// # Errors
    ///
    /// - `UnknownCollection` for unknown models
    /// - `Validation` if a required field is missing
    /// - `Backend` if the document has no `_id` or no longer exists
    pub fn save(&self, model: &str, doc: Document) -> Result<Document, StoreError> {
        let id = doc
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| StoreError::backend("document has no _id"))?;
        let errors = self.check_required(model, &doc);
        if !errors.is_empty() {
            return Err(StoreError::Validation { errors });
        }

        let mut collections = self.collections.write();
        let slot = collection_mut(&mut collections, model)?
            .iter_mut()
            .find(|d| d.get(ID_FIELD) == Some(&id))
            .ok_or_else(|| {
                StoreError::backend(format!("document {} no longer exists", id_key(&id)))
            })?;
        *slot = doc.clone();
        Ok(doc)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn find_one_and_remove(
        &self,
        model: &str,
        query: &Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write();
        let docs = collection_mut(&mut collections, model)?;
        Ok(docs
            .iter()
            .position(|d| matches(d, query))
            .map(|index| docs.remove(index)))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn count(&self, model: &str, query: &Map<String, Value>) -> Result<u64, StoreError> {
        let collections = self.collections.read();
        let count = collection(&collections, model)?
            .iter()
            .filter(|d| matches(d, query))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    /// Distinct values of `field`, array values flattened, in first-seen
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn distinct(
        &self,
        model: &str,
        field: &str,
        query: &Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read();
        let mut values: Vec<Value> = Vec::new();
        for doc in collection(&collections, model)?.iter().filter(|d| matches(d, query)) {
            for value in lookup(doc, field) {
                let items = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for item in items {
                    if !values.contains(item) {
                        values.push(item.clone());
                    }
                }
            }
        }
        Ok(values)
    }

    /// Defaults of `model` plus a fresh `_id`; nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn new_document(&self, model: &str) -> Result<Document, StoreError> {
        let mut doc = self.defaults.get(model).cloned().unwrap_or_default();
        doc.insert(ID_FIELD.to_owned(), self.new_id(model)?);
        Ok(doc)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCollection`] for unknown models.
    pub fn new_id(&self, model: &str) -> Result<Value, StoreError> {
        let collections = self.collections.read();
        let docs = collection(&collections, model)?;
        Ok(Value::String(self.next_id(docs)))
    }
}

fn collection<'c>(collections: &'c Collections, model: &str) -> Result<&'c [Document], StoreError> {
    collections
        .get(model)
        .map(Vec::as_slice)
        .ok_or_else(|| StoreError::UnknownCollection(model.to_owned()))
}

fn collection_mut<'c>(
    collections: &'c mut Collections,
    model: &str,
) -> Result<&'c mut Vec<Document>, StoreError> {
    collections
        .get_mut(model)
        .ok_or_else(|| StoreError::UnknownCollection(model.to_owned()))
}

fn ensure_unique(existing: &[Document], doc: &Document) -> Result<(), StoreError> {
    let Some(id) = doc.get(ID_FIELD) else {
        return Ok(());
    };
    if existing.iter().any(|d| d.get(ID_FIELD) == Some(id)) {
        return Err(StoreError::Conflict(id_key(id)));
    }
    Ok(())
}
