#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use acl::hooks::{self, PermissionResolver};
use acl::{
    AclService, FieldPermissions, ModelConfigRegistry, ModelOptions, PermissionSchema,
    RequestContext, RootOption,
};
use acl_sdk::{AclError, DataStore, Document, FindOneRequest, FindRequest, StoreError};
use acl_security::{Access, DocPermissions, PermissionRule, PermissionSet};
use async_trait::async_trait;
use http::HeaderMap;
use memory_store_plugin::{IdStrategy, MemoryStore, MemoryStoreConfig};
use serde_json::{Map, Value, json};

pub const ALICE: &str = "11111111-1111-1111-1111-111111111111";
pub const BOB: &str = "22222222-2222-2222-2222-222222222222";
pub const CAROL: &str = "33333333-3333-3333-3333-333333333333";
pub const DAVE: &str = "44444444-4444-4444-4444-444444444444";
pub const ERIN: &str = "55555555-5555-5555-5555-555555555555";
pub const ADMIN: &str = "99999999-9999-9999-9999-999999999999";

pub const ACME: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
pub const HIDDEN_ORG: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";

pub fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

pub fn caller(user_id: &str, admin: bool) -> PermissionSet {
    PermissionSet::new()
        .with("isAdmin", admin)
        .with("userId", user_id)
}

pub fn user_options() -> ModelOptions {
    ModelOptions::new()
        .with_field(
            "name",
            FieldPermissions::new()
                .list(true)
                .read(true)
                .create(true)
                .update("edit.name"),
        )
        .with_field(
            "role",
            FieldPermissions::new()
                .list("isAdmin")
                .read(true)
                .create("isAdmin")
                .update("isAdmin"),
        )
        .with_field(
            "email",
            FieldPermissions::new()
                .list("owner")
                .read("owner")
                .create(true)
                .update("owner"),
        )
        .with_field(
            "public",
            FieldPermissions::new().list(true).read(true).create(true),
        )
        .with_field("orgs", FieldPermissions::new().list(true).read(true))
        .with_field(
            "bio",
            FieldPermissions::new()
                .list(bio_rule())
                .read(bio_rule())
                .create(true),
        )
        .with_field(
            "statusHistory",
            FieldPermissions::new().read(true).update("isAdmin").sub(
                PermissionSchema::new()
                    .field(
                        "status",
                        FieldPermissions::new()
                            .list(true)
                            .read(true)
                            .create(true)
                            .update(true),
                    )
                    .field("note", FieldPermissions::new().read("isAdmin").create(true)),
            ),
        )
        .with_doc_permissions(hooks::doc_permissions(|doc, p| {
            let is_me = doc.get("_id") == p.prop("userId");
            DocPermissions::new()
                .with("edit.name", is_me)
                .with("owner", is_me)
        }))
        .with_default_base_query(hooks::base_query(|p| {
            if p.has("isAdmin") {
                json!({})
            } else {
                json!({"$or": [{"_id": p.prop("userId")}, {"public": true}]})
            }
        }))
        .with_base_query(Access::Delete, hooks::base_query(|p| json!(p.has("isAdmin"))))
        .with_reference("orgs", "Org")
        .with_default_route_guard(true)
        .with_route_guard(Access::Update, "isAdmin")
        .with_route_guard(Access::Delete, "isAdmin")
}

/// Visible to admins and to the user the document describes.
pub fn bio_rule() -> PermissionRule {
    PermissionRule::predicate(|p, doc| p.has("isAdmin") || doc.granted("owner"))
}

pub fn org_options() -> ModelOptions {
    ModelOptions::new()
        .with_field("name", FieldPermissions::all(true))
        .with_field(
            "secret",
            FieldPermissions::new().list("isAdmin").read("isAdmin"),
        )
        .with_default_base_query(hooks::base_query(|p| {
            if p.has("isAdmin") { json!({}) } else { json!({"public": true}) }
        }))
        .with_default_route_guard(true)
}

pub fn audit_options() -> ModelOptions {
    ModelOptions::new()
        .with_field("action", FieldPermissions::all(true))
        .with_default_base_query(hooks::base_query(|p| json!(p.has("isAdmin"))))
        .with_default_route_guard(true)
}

pub fn store_config() -> MemoryStoreConfig {
    let mut cfg = MemoryStoreConfig::default();
    cfg.collections.insert(
        "User".to_owned(),
        vec![
            obj(json!({
                "_id": ALICE, "name": "alice", "role": "member", "email": "alice@example.com",
                "public": false, "orgs": [ACME, HIDDEN_ORG], "bio": "alice's bio",
                "statusHistory": [{"_id": "s-1", "status": "active", "note": "welcome"}]
            })),
            obj(json!({"_id": BOB, "name": "bob", "role": "member", "email": "bob@example.com", "public": false})),
            obj(json!({"_id": CAROL, "name": "carol", "role": "admin", "email": "carol@example.com", "public": true, "bio": "carol's bio"})),
            obj(json!({"_id": DAVE, "name": "dave", "role": "member", "public": true, "bio": "dave's bio"})),
            obj(json!({"_id": ERIN, "name": "erin", "role": "member", "public": true})),
        ],
    );
    cfg.collections.insert(
        "Org".to_owned(),
        vec![
            obj(json!({"_id": ACME, "name": "acme", "secret": "s3cr3t", "public": true})),
            obj(json!({"_id": HIDDEN_ORG, "name": "hidden", "secret": "x", "public": false})),
        ],
    );
    cfg.collections.insert(
        "Audit".to_owned(),
        vec![obj(json!({"_id": "a-1", "action": "login"}))],
    );
    cfg.defaults
        .insert("User".to_owned(), obj(json!({"public": false})));
    cfg.required.insert("User".to_owned(), vec!["name".to_owned()]);
    cfg.id_strategy = IdStrategy::Counter;
    cfg
}

/// Store wrapper recording how many calls reached the store.
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for CountingStore {
    async fn find(&self, model: &str, request: FindRequest) -> Result<Vec<Document>, StoreError> {
        self.hit();
        DataStore::find(&self.inner, model, request).await
    }

    async fn find_one(
        &self,
        model: &str,
        request: FindOneRequest,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        DataStore::find_one(&self.inner, model, request).await
    }

    async fn create(&self, model: &str, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        self.hit();
        DataStore::create(&self.inner, model, docs).await
    }

    async fn save(&self, model: &str, doc: Document) -> Result<Document, StoreError> {
        self.hit();
        DataStore::save(&self.inner, model, doc).await
    }

    async fn find_one_and_remove(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        DataStore::find_one_and_remove(&self.inner, model, query).await
    }

    async fn count_documents(
        &self,
        model: &str,
        query: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        self.hit();
        DataStore::count_documents(&self.inner, model, query).await
    }

    async fn distinct(
        &self,
        model: &str,
        field: &str,
        query: Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        self.hit();
        DataStore::distinct(&self.inner, model, field, query).await
    }

    async fn new_document(&self, model: &str) -> Result<Document, StoreError> {
        self.hit();
        DataStore::new_document(&self.inner, model).await
    }

    async fn new_id(&self, model: &str) -> Result<Value, StoreError> {
        self.hit();
        DataStore::new_id(&self.inner, model).await
    }
}

/// Permission set from `x-user-id` and `x-admin` headers.
pub struct HeaderResolver;

#[async_trait]
impl PermissionResolver for HeaderResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<PermissionSet, AclError> {
        let Some(user_id) = headers.get("x-user-id").and_then(|v| v.to_str().ok()) else {
            return Ok(PermissionSet::new());
        };
        let admin = headers.get("x-admin").is_some_and(|v| v == "true");
        Ok(caller(user_id, admin))
    }
}

pub struct Fixture {
    pub service: Arc<AclService>,
    pub store: Arc<CountingStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_user_options(user_options())
    }

    pub fn with_user_options(users: ModelOptions) -> Self {
        let registry = Arc::new(ModelConfigRegistry::default());
        registry.set_model_options("User", users).unwrap();
        registry.set_model_options("Org", org_options()).unwrap();
        registry.set_model_options("Audit", audit_options()).unwrap();
        registry
            .set_root_option(RootOption::RootPermissions(Arc::new(HeaderResolver)))
            .unwrap();

        let store = Arc::new(CountingStore::new(
            MemoryStore::from_config(&store_config()).unwrap(),
        ));
        let service = Arc::new(AclService::new(registry, Arc::clone(&store) as Arc<dyn DataStore>));
        Self { service, store }
    }

    pub fn context(&self, permissions: PermissionSet) -> RequestContext {
        self.service.context(permissions)
    }
}
