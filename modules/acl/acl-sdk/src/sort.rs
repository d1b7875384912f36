use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One key of a sort specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Ordered, multi-key sort specification.
///
/// Accepted shapes: a space-separated string (`"role -name"`) or an object
/// `{field: 1 | -1 | "asc" | "desc"}`. Keys keep the order in which they were
/// given; earlier keys take priority.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sort(Vec<SortKey>);

impl Sort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.push(field.into(), false);
        self
    }

    #[must_use]
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.push(field.into(), true);
        self
    }

    fn push(&mut self, field: String, descending: bool) {
        self.0.retain(|key| key.field != field);
        self.0.push(SortKey { field, descending });
    }

    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Sort {
    fn from(spec: &str) -> Self {
        spec.split_whitespace().fold(Self::new(), |sort, token| {
            match token.strip_prefix('-') {
                Some(field) if !field.is_empty() => sort.desc(field),
                _ => sort.asc(token.trim_start_matches('+')),
            }
        })
    }
}

fn direction(value: &Value) -> Option<bool> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(false),
            Some(-1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Some(false),
            "desc" | "descending" | "-1" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

struct SortVisitor;

impl<'de> Visitor<'de> for SortVisitor {
    type Value = Sort;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sort string or an object of field directions")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Sort, E> {
        Ok(Sort::from(value))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Sort, A::Error> {
        let mut sort = Sort::new();
        while let Some((field, value)) = map.next_entry::<String, Value>()? {
            let descending = direction(&value).ok_or_else(|| {
                de::Error::custom(format!("invalid sort direction for '{field}': {value}"))
            })?;
            sort.push(field, descending);
        }
        Ok(sort)
    }
}

impl<'de> Deserialize<'de> for Sort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SortVisitor)
    }
}

impl Serialize for Sort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = self
            .0
            .iter()
            .map(|key| {
                if key.descending {
                    format!("-{}", key.field)
                } else {
                    key.field.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        serializer.serialize_str(&spec)
    }
}
