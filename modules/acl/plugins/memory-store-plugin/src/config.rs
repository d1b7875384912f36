use std::collections::HashMap;

use acl_sdk::Document;
use serde::Deserialize;

/// How the store assigns `_id` to new documents and embedded elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random v4 UUID strings.
    #[default]
    Uuid,
    /// Sequential decimal strings starting at `1`.
    Counter,
}

/// Store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryStoreConfig {
    /// Known collections keyed by model name, with their seed documents.
    pub collections: HashMap<String, Vec<Document>>,

    /// Default values applied to new documents, keyed by model name.
    pub defaults: HashMap<String, Document>,

    /// Fields every persisted document must carry, keyed by model name.
    pub required: HashMap<String, Vec<String>>,

    pub id_strategy: IdStrategy,
}
