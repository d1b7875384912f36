//! Document store adapter trait.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::models::{Document, FindOneRequest, FindRequest};

/// Adapter between the ACL engine and a concrete document store.
///
/// Every query reaching an implementation has already been routed through
/// the engine's base-query composition; implementations only execute it.
/// Atomicity of `create` and `save` is the implementation's concern.
///
/// ```ignore
/// let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new(cfg));
///
/// let docs = store.find("User", FindRequest::new(query)).await?;
/// ```
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Find all documents matching the request.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown or the backend fails.
    async fn find(&self, model: &str, request: FindRequest) -> Result<Vec<Document>, StoreError>;

    /// Find the first document matching the request.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown or the backend fails.
    async fn find_one(
        &self,
        model: &str,
        request: FindOneRequest,
    ) -> Result<Option<Document>, StoreError>;

    /// Persist new documents, returning them in input order with identifiers
    /// and defaults applied.
    ///
    /// # Errors
    ///
    /// - `Validation` if a document is rejected
    /// - `Conflict` on identifier collisions
    async fn create(&self, model: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError>;

    /// Replace an existing document, matched by its identifier.
    ///
    /// # Errors
    ///
    /// - `Validation` if the document is rejected
    /// - `Backend` if the document no longer exists
    async fn save(&self, model: &str, doc: Document) -> Result<Document, StoreError>;

    /// Remove the first document matching `query` and return it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown or the backend fails.
    async fn find_one_and_remove(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError>;

    /// Count documents matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown or the backend fails.
    async fn count_documents(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<u64, StoreError>;

    /// Distinct values of `field` among documents matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown or the backend fails.
    async fn distinct(
        &self,
        model: &str,
        field: &str,
        query: Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError>;

    /// A new, unsaved document carrying the model defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown.
    async fn new_document(&self, model: &str) -> Result<Document, StoreError>;

    /// A fresh identifier for an embedded sub-document of `model`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection is unknown.
    async fn new_id(&self, model: &str) -> Result<Value, StoreError>;
}
