//! Mongo-style query evaluation over JSON documents.
//!
//! Supported:
//! - field equality on dotted paths, with implicit array membership
//! - logical `$and`, `$or`, `$nor`
//! - comparison `$eq`, `$ne`, `$in`, `$nin`, `$gt`, `$gte`, `$lt`, `$lte`
//! - `$exists`
//!
//! Unknown operators never match.

use std::cmp::Ordering;

use acl_sdk::{Document, Sort};
use serde_json::{Map, Value};

/// Values found at a dotted `path`, traversing arrays along the way.
#[must_use]
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    let mut segments = path.split('.');
    if let Some(first) = segments.next()
        && let Some(value) = doc.get(first)
    {
        let rest: Vec<&str> = segments.collect();
        collect(value, &rest, &mut out);
    }
    out
}

fn collect<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, tail)) = path.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect(next, tail, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, path, out);
            }
        }
        _ => {}
    }
}

/// Whether `doc` satisfies `query`. An empty query matches everything.
#[must_use]
pub fn matches(doc: &Document, query: &Map<String, Value>) -> bool {
    query.iter().all(|(key, condition)| match key.as_str() {
        "$and" => clauses(condition).all(|q| matches(doc, q)),
        "$or" => clauses(condition).any(|q| matches(doc, q)),
        "$nor" => !clauses(condition).any(|q| matches(doc, q)),
        path => field_matches(&lookup(doc, path), condition),
    })
}

fn clauses(condition: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn is_operator_object(condition: &Value) -> Option<&Map<String, Value>> {
    condition
        .as_object()
        .filter(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

fn field_matches(found: &[&Value], condition: &Value) -> bool {
    match is_operator_object(condition) {
        Some(operators) => operators
            .iter()
            .all(|(op, operand)| operator_matches(found, op, operand)),
        None => equals(found, condition),
    }
}

fn operator_matches(found: &[&Value], op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => equals(found, operand),
        "$ne" => !equals(found, operand),
        "$in" => in_list(found, operand),
        "$nin" => !in_list(found, operand),
        "$gt" => compares(found, operand, |o| o == Ordering::Greater),
        "$gte" => compares(found, operand, |o| o != Ordering::Less),
        "$lt" => compares(found, operand, |o| o == Ordering::Less),
        "$lte" => compares(found, operand, |o| o != Ordering::Greater),
        "$exists" => found.is_empty() != operand.as_bool().unwrap_or(true),
        _ => {
            tracing::debug!(op, "unsupported query operator");
            false
        }
    }
}

/// Equality with array membership; `null` also matches a missing field.
fn equals(found: &[&Value], expected: &Value) -> bool {
    if found.is_empty() {
        return expected.is_null();
    }
    found.iter().any(|value| {
        *value == expected
            || value
                .as_array()
                .is_some_and(|items| items.iter().any(|item| item == expected))
    })
}

fn in_list(found: &[&Value], operand: &Value) -> bool {
    operand
        .as_array()
        .is_some_and(|candidates| candidates.iter().any(|c| equals(found, c)))
}

fn compares(found: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    found.iter().any(|value| match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| compare(item, operand))
            .any(&accept),
        _ => compare(value, operand).is_some_and(&accept),
    })
}

/// Orders two scalars of the same kind; mixed kinds are incomparable.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Orders documents by `sort`; earlier keys take priority.
#[must_use]
pub fn sort_order(a: &Document, b: &Document, sort: &Sort) -> Ordering {
    for key in sort.keys() {
        let left = lookup(a, &key.field).first().copied();
        let right = lookup(b, &key.field).first().copied();
        let ordering = match (left, right) {
            (Some(l), Some(r)) => {
                compare(l, r).unwrap_or_else(|| type_rank(Some(l)).cmp(&type_rank(Some(r))))
            }
            _ => type_rank(left).cmp(&type_rank(right)),
        };
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
