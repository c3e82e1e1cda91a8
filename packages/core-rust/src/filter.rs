//! Filter, update, sort, and projection evaluation for the reference store.
//!
//! Implements the subset of the document query language the in-memory store
//! supports: equality and `$eq $ne $gt $gte $lt $lte $in $nin $exists`
//! comparisons (with dotted paths and `$and` / `$or`), modifier updates
//! (`$set $unset $inc $push`), sort specs, and include/exclude projections.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};

/// Resolves a dotted path (`"a.b.c"`) inside a document.
#[must_use]
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Total order over values used for comparisons and sorting.
///
/// Numbers compare numerically across integer/float representations; values
/// of different types compare by a fixed type rank (null < bool < number <
/// string < array < object), which keeps sorting deterministic.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = compare_values(xi, yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Evaluates `filter` against `doc`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFilter`] for unrecognized `$` operators or
/// malformed operator arguments.
pub fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let hit = match key.as_str() {
            "$and" => logical_list(doc, condition, "$and")?
                .iter()
                .all(|m| *m),
            "$or" => logical_list(doc, condition, "$or")?
                .iter()
                .any(|m| *m),
            _ if key.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unsupported top-level operator `{key}`"
                )));
            }
            path => field_matches(get_path(doc, path), condition)?,
        };
        if !hit {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical_list(doc: &Document, condition: &Value, op: &str) -> StoreResult<Vec<bool>> {
    let Value::Array(clauses) = condition else {
        return Err(StoreError::InvalidFilter(format!("`{op}` expects an array")));
    };
    clauses
        .iter()
        .map(|clause| match clause {
            Value::Object(sub) => matches(doc, sub),
            _ => Err(StoreError::InvalidFilter(format!(
                "`{op}` clauses must be documents"
            ))),
        })
        .collect()
}

/// Evaluates one field condition: either an operator document or an
/// equality comparison.
fn field_matches(actual: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    if let Value::Object(ops) = condition {
        if ops.keys().any(|k| k.starts_with('$')) {
            for (op, arg) in ops {
                if !operator_matches(actual, op, arg)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    // Plain equality. An absent field only equals an explicit null.
    Ok(match actual {
        Some(value) => value == condition,
        None => condition.is_null(),
    })
}

fn operator_matches(actual: Option<&Value>, op: &str, arg: &Value) -> StoreResult<bool> {
    let hit = match op {
        "$exists" => {
            let wanted = arg.as_bool().ok_or_else(|| {
                StoreError::InvalidFilter("`$exists` expects a boolean".to_string())
            })?;
            actual.is_some() == wanted
        }
        "$eq" => actual.unwrap_or(&Value::Null) == arg,
        "$ne" => actual.unwrap_or(&Value::Null) != arg,
        "$in" | "$nin" => {
            let Value::Array(candidates) = arg else {
                return Err(StoreError::InvalidFilter(format!("`{op}` expects an array")));
            };
            let contained = candidates.contains(actual.unwrap_or(&Value::Null));
            if op == "$in" {
                contained
            } else {
                !contained
            }
        }
        "$gt" | "$gte" | "$lt" | "$lte" => {
            let Some(actual) = actual else {
                return Ok(false);
            };
            let ord = compare_values(actual, arg);
            match op {
                "$gt" => ord == Ordering::Greater,
                "$gte" => ord != Ordering::Less,
                "$lt" => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }
        }
        other => {
            return Err(StoreError::InvalidFilter(format!(
                "unsupported operator `{other}`"
            )));
        }
    };
    Ok(hit)
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Applies a modifier document to `doc` in place.
///
/// A document without `$` operators is treated as a full replacement that
/// preserves the existing `_id`. Returns `true` if the document changed.
///
/// # Errors
///
/// Returns [`StoreError::InvalidUpdate`] for unrecognized modifiers, mixed
/// modifier/replacement documents, or malformed modifier arguments.
pub fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<bool> {
    let has_modifiers = update.keys().any(|k| k.starts_with('$'));
    if !has_modifiers {
        let id = doc.get("_id").cloned();
        let mut replacement = update.clone();
        if let Some(id) = id {
            replacement.insert("_id".to_string(), id);
        }
        let changed = *doc != replacement;
        *doc = replacement;
        return Ok(changed);
    }
    if update.keys().any(|k| !k.starts_with('$')) {
        return Err(StoreError::InvalidUpdate(
            "cannot mix modifiers with plain fields".to_string(),
        ));
    }

    let mut changed = false;
    for (op, arg) in update {
        let Value::Object(fields) = arg else {
            return Err(StoreError::InvalidUpdate(format!(
                "`{op}` expects a document"
            )));
        };
        for (path, value) in fields {
            changed |= apply_modifier(doc, op, path, value)?;
        }
    }
    Ok(changed)
}

fn apply_modifier(doc: &mut Document, op: &str, path: &str, value: &Value) -> StoreResult<bool> {
    match op {
        "$set" => {
            let mut slot = resolve_path_mut(doc, path)?;
            let changed = slot.as_ref() != Some(value);
            slot.set(value.clone());
            Ok(changed)
        }
        "$unset" => {
            let mut slot = resolve_path_mut(doc, path)?;
            Ok(slot.remove())
        }
        "$inc" => {
            let mut slot = resolve_path_mut(doc, path)?;
            let next = increment(slot.as_ref(), value)?;
            let changed = slot.as_ref() != Some(&next);
            slot.set(next);
            Ok(changed)
        }
        "$push" => {
            let mut slot = resolve_path_mut(doc, path)?;
            match slot.as_mut() {
                Some(Value::Array(items)) => {
                    items.push(value.clone());
                }
                Some(_) => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "`$push` target `{path}` is not an array"
                    )));
                }
                None => slot.set(Value::Array(vec![value.clone()])),
            }
            Ok(true)
        }
        other => Err(StoreError::InvalidUpdate(format!(
            "unsupported modifier `{other}`"
        ))),
    }
}

/// `$inc` arithmetic. Stays in `i64` while both sides are integral, so large
/// counters keep exact precision; mixed or fractional operands go through
/// `f64`. An absent field starts at zero.
fn increment(current: Option<&Value>, delta: &Value) -> StoreResult<Value> {
    let current = current.cloned().unwrap_or_else(|| Value::from(0));
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => {
            let sum = a
                .checked_add(b)
                .ok_or_else(|| StoreError::InvalidUpdate("`$inc` overflowed".to_string()))?;
            Ok(Value::from(sum))
        }
        _ => {
            let a = current.as_f64().ok_or_else(|| {
                StoreError::InvalidUpdate("`$inc` target is not a number".to_string())
            })?;
            let b = delta.as_f64().ok_or_else(|| {
                StoreError::InvalidUpdate("`$inc` expects a number".to_string())
            })?;
            Ok(Number::from_f64(a + b).map_or(Value::Null, Value::Number))
        }
    }
}

/// Mutable cursor to a dotted-path slot, creating intermediate objects on
/// demand for writes.
struct PathSlot<'a> {
    parent: &'a mut Document,
    key: String,
}

impl PathSlot<'_> {
    fn as_ref(&self) -> Option<&Value> {
        self.parent.get(&self.key)
    }

    fn as_mut(&mut self) -> Option<&mut Value> {
        self.parent.get_mut(&self.key)
    }

    fn set(&mut self, value: Value) {
        self.parent.insert(self.key.clone(), value);
    }

    fn remove(&mut self) -> bool {
        self.parent.remove(&self.key).is_some()
    }
}

fn resolve_path_mut<'a>(doc: &'a mut Document, path: &str) -> StoreResult<PathSlot<'a>> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let leaf = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidUpdate(format!("empty path `{path}`")))?;

    let mut current = doc;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            StoreError::InvalidUpdate(format!("path `{path}` crosses a non-document value"))
        })?;
    }
    Ok(PathSlot {
        parent: current,
        key: leaf.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Sort and projection
// ---------------------------------------------------------------------------

/// Ordering of two documents under a sort spec (`{field: 1 | -1}`, fields in
/// spec order).
#[must_use]
pub fn sort_ordering(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let ord = compare_values(
            get_path(a, path).unwrap_or(&Value::Null),
            get_path(b, path).unwrap_or(&Value::Null),
        );
        let ord = if direction.as_i64().unwrap_or(1) < 0 {
            ord.reverse()
        } else {
            ord
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Sorts documents in place by a sort spec.
pub fn sort_documents(docs: &mut [Document], sort: &Document) {
    docs.sort_by(|a, b| sort_ordering(a, b, sort));
}

/// Applies an include/exclude projection to a document.
///
/// Include mode (any field mapped to a truthy value) keeps only the listed
/// fields plus `_id` unless `_id` is explicitly excluded; exclude mode drops
/// the listed fields.
#[must_use]
pub fn project(doc: &Document, projection: &Document) -> Document {
    let include_mode = projection
        .iter()
        .any(|(k, v)| k != "_id" && truthy(v));

    if include_mode {
        let mut out = Document::new();
        if projection.get("_id").is_none_or(truthy) {
            if let Some(id) = doc.get("_id") {
                out.insert("_id".to_string(), id.clone());
            }
        }
        for (key, flag) in projection {
            if key != "_id" && truthy(flag) {
                if let Some(value) = doc.get(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    } else {
        let mut out = doc.clone();
        for (key, flag) in projection {
            if !truthy(flag) {
                out.remove(key);
            }
        }
        out
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::doc;

    #[test]
    fn equality_filter_matches() {
        let d = doc! { "x": 1, "name": "ada" };
        assert!(matches(&d, &doc! { "x": 1 }).unwrap());
        assert!(!matches(&d, &doc! { "x": 2 }).unwrap());
        assert!(matches(&d, &doc! { "x": 1, "name": "ada" }).unwrap());
    }

    #[test]
    fn missing_field_equals_null_only() {
        let d = doc! { "x": 1 };
        assert!(matches(&d, &doc! { "y": null }).unwrap());
        assert!(!matches(&d, &doc! { "y": 0 }).unwrap());
    }

    #[test]
    fn comparison_operators() {
        let d = doc! { "age": 36 };
        assert!(matches(&d, &doc! { "age": { "$gt": 30 } }).unwrap());
        assert!(matches(&d, &doc! { "age": { "$gte": 36 } }).unwrap());
        assert!(matches(&d, &doc! { "age": { "$lt": 40, "$ne": 35 } }).unwrap());
        assert!(!matches(&d, &doc! { "age": { "$lte": 35 } }).unwrap());
    }

    #[test]
    fn in_nin_and_exists() {
        let d = doc! { "tag": "b" };
        assert!(matches(&d, &doc! { "tag": { "$in": ["a", "b"] } }).unwrap());
        assert!(matches(&d, &doc! { "tag": { "$nin": ["c"] } }).unwrap());
        assert!(matches(&d, &doc! { "tag": { "$exists": true } }).unwrap());
        assert!(matches(&d, &doc! { "other": { "$exists": false } }).unwrap());
    }

    #[test]
    fn dotted_paths_and_logical_operators() {
        let d = doc! { "a": { "b": 2 } };
        assert!(matches(&d, &doc! { "a.b": 2 }).unwrap());
        assert!(matches(
            &d,
            &doc! { "$or": [{ "a.b": 1 }, { "a.b": 2 }] }
        )
        .unwrap());
        assert!(!matches(
            &d,
            &doc! { "$and": [{ "a.b": 2 }, { "a.b": 3 }] }
        )
        .unwrap());
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let d = doc! { "x": 1 };
        assert!(matches(&d, &doc! { "x": { "$regex": "a" } }).is_err());
    }

    #[test]
    fn replacement_update_preserves_id() {
        let mut d = doc! { "_id": "k1", "x": 1 };
        let changed = apply_update(&mut d, &doc! { "y": 2 }).unwrap();
        assert!(changed);
        assert_eq!(d, doc! { "y": 2, "_id": "k1" });
    }

    #[test]
    fn set_unset_inc_push() {
        let mut d = doc! { "x": 1, "tags": ["a"] };
        apply_update(
            &mut d,
            &doc! { "$set": { "name": "ada" }, "$inc": { "x": 2 }, "$push": { "tags": "b" } },
        )
        .unwrap();
        assert_eq!(d["name"], "ada");
        assert_eq!(d["x"], 3);
        assert_eq!(d["tags"], json!(["a", "b"]));

        let changed = apply_update(&mut d, &doc! { "$unset": { "name": 1 } }).unwrap();
        assert!(changed);
        assert!(!d.contains_key("name"));
    }

    #[test]
    fn set_creates_nested_objects() {
        let mut d = doc! {};
        apply_update(&mut d, &doc! { "$set": { "a.b.c": 5 } }).unwrap();
        assert_eq!(d["a"]["b"]["c"], 5);
    }

    #[test]
    fn inc_keeps_large_integers_exact() {
        // 2^53 + 1 is not representable as f64.
        let mut d = doc! { "n": 9_007_199_254_740_993_i64 };
        apply_update(&mut d, &doc! { "$inc": { "n": 1 } }).unwrap();
        assert_eq!(d["n"], 9_007_199_254_740_994_i64);
    }

    #[test]
    fn inc_mixed_operands_use_float_arithmetic() {
        let mut d = doc! { "n": 1 };
        apply_update(&mut d, &doc! { "$inc": { "n": 0.5 } }).unwrap();
        assert_eq!(d["n"], 1.5);

        let changed = apply_update(&mut d, &doc! { "$inc": { "missing": 2 } }).unwrap();
        assert!(changed);
        assert_eq!(d["missing"], 2);
    }

    #[test]
    fn unchanged_set_reports_no_modification() {
        let mut d = doc! { "x": 1 };
        let changed = apply_update(&mut d, &doc! { "$set": { "x": 1 } }).unwrap();
        assert!(!changed);
    }

    #[test]
    fn mixed_modifier_and_plain_fields_rejected() {
        let mut d = doc! {};
        assert!(apply_update(&mut d, &doc! { "$set": { "x": 1 }, "y": 2 }).is_err());
    }

    #[test]
    fn sort_ascending_and_descending() {
        let mut docs = vec![doc! { "n": 3 }, doc! { "n": 1 }, doc! { "n": 2 }];
        sort_documents(&mut docs, &doc! { "n": 1 });
        assert_eq!(docs[0]["n"], 1);
        sort_documents(&mut docs, &doc! { "n": -1 });
        assert_eq!(docs[0]["n"], 3);
    }

    #[test]
    fn projection_include_and_exclude() {
        let d = doc! { "_id": "k", "a": 1, "b": 2 };
        let included = project(&d, &doc! { "a": 1 });
        assert_eq!(included, doc! { "_id": "k", "a": 1 });
        let no_id = project(&d, &doc! { "a": 1, "_id": 0 });
        assert_eq!(no_id, doc! { "a": 1 });
        let excluded = project(&d, &doc! { "b": 0 });
        assert_eq!(excluded, doc! { "_id": "k", "a": 1 });
    }

    proptest! {
        /// A single-field equality filter built from a document's own field
        /// always matches that document.
        #[test]
        fn own_field_equality_always_matches(n in any::<i64>(), s in "[a-z]{0,8}") {
            let d = doc! { "n": n, "s": s.clone() };
            let by_n = doc! { "n": n };
            let by_s = doc! { "s": s };
            prop_assert!(matches(&d, &by_n).unwrap());
            prop_assert!(matches(&d, &by_s).unwrap());
        }

        /// `$gt` and `$lte` partition the integers around a pivot.
        #[test]
        fn gt_lte_partition(value in any::<i32>(), pivot in any::<i32>()) {
            let d = doc! { "v": value };
            let gt = matches(&d, &doc! { "v": { "$gt": pivot } }).unwrap();
            let lte = matches(&d, &doc! { "v": { "$lte": pivot } }).unwrap();
            prop_assert!(gt != lte);
        }
    }
}
