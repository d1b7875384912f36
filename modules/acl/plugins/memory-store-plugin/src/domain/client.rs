use acl_sdk::{DataStore, Document, FindOneRequest, FindRequest, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::service::MemoryStore;

#[async_trait]
impl DataStore for MemoryStore {
    async fn find(&self, model: &str, request: FindRequest) -> Result<Vec<Document>, StoreError> {
        MemoryStore::find(self, model, &request)
    }

    async fn find_one(
        &self,
        model: &str,
        request: FindOneRequest,
    ) -> Result<Option<Document>, StoreError> {
        MemoryStore::find_one(self, model, &request)
    }

    async fn create(&self, model: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        MemoryStore::create(self, model, docs)
    }

    async fn save(&self, model: &str, doc: Document) -> Result<Document, StoreError> {
        MemoryStore::save(self, model, doc)
    }

    async fn find_one_and_remove(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        MemoryStore::find_one_and_remove(self, model, &query)
    }

    async fn count_documents(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        self.count(model, &query)
    }

    async fn distinct(
        &self,
        model: &str,
        field: &str,
        query: Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        MemoryStore::distinct(self, model, field, &query)
    }

    async fn new_document(&self, model: &str) -> Result<Document, StoreError> {
        MemoryStore::new_document(self, model)
    }

    async fn new_id(&self, model: &str) -> Result<Value, StoreError> {
        MemoryStore::new_id(self, model)
    }
}
