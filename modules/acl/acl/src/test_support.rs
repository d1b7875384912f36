#![allow(clippy::unwrap_used, clippy::expect_used)]

use acl_sdk::{DataStore, Document, FindOneRequest, FindRequest, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};

#[must_use]
pub fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

#[must_use]
pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_owned()).collect()
}

/// Store for tests that must not reach the store.
pub struct NoStore;

fn unreachable_store() -> StoreError {
    StoreError::backend("store must not be called")
}

#[async_trait]
impl DataStore for NoStore {
    async fn find(&self, _model: &str, _request: FindRequest) -> Result<Vec<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn find_one(
        &self,
        _model: &str,
        _request: FindOneRequest,
    ) -> Result<Option<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn create(&self, _model: &str, _docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn save(&self, _model: &str, _doc: Document) -> Result<Document, StoreError> {
        Err(unreachable_store())
    }

    async fn find_one_and_remove(
        &self,
        _model: &str,
        _query: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn count_documents(
        &self,
        _model: &str,
        _query: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }

    async fn distinct(
        &self,
        _model: &str,
        _field: &str,
        _query: Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        Err(unreachable_store())
    }

    async fn new_document(&self, _model: &str) -> Result<Document, StoreError> {
        Err(unreachable_store())
    }

    async fn new_id(&self, _model: &str) -> Result<Value, StoreError> {
        Err(unreachable_store())
    }
}
