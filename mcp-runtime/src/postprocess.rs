//! Record post-processing for note collection responses.
//!
//! Notes come back from the upstream API with fields an agent never
//! needs (follower lists, portal URLs, sync bookkeeping) and an HTML
//! body. Before a collection response goes out over the transport each
//! record is pruned, collapsed, and its `content` field sanitized.
//!
//! All transformations take the record by value and hand back a new
//! one; the decoded response is moved through the pipeline, so no
//! caller-visible value is ever mutated in place.

use serde_json::{Map, Value};

use crate::sanitize::sanitize_markup;

/// Field lists applied per record. The lists are fixed per resource
/// kind; only notes are post-processed today.
pub struct PostProcessRules {
    /// Nested field paths, removed if the full path is present.
    pub nested_prune_paths: &'static [&'static [&'static str]],
    /// Top-level field names, removed without descent.
    pub top_level_prune_fields: &'static [&'static str],
    /// String-valued field holding HTML markup, replaced by its
    /// sanitized form.
    pub markup_field: Option<&'static str>,
}

/// Rules for `/notes` collection responses.
pub const NOTE_RULES: PostProcessRules = PostProcessRules {
    nested_prune_paths: &[&["source", "record_id"]],
    top_level_prune_fields: &["followers", "displayUrl", "externalDisplayUrl"],
    markup_field: Some("content"),
};

/// Apply the per-record pipeline to a collection response.
///
/// If the response has no `data` array the response is returned
/// unchanged; unexpected shapes are not an error here. Likewise if any
/// single record cannot be processed the whole original response is
/// returned untouched: post-processing is best-effort enrichment and
/// must never turn a successful upstream fetch into a failure.
pub fn process_collection(mut response: Value, rules: &PostProcessRules) -> Value {
    let Some(records) = response.get("data").and_then(Value::as_array) else {
        return response;
    };

    let cleaned: Option<Vec<Value>> = records
        .iter()
        .map(|record| process_record(record.clone(), rules))
        .collect();
    match cleaned {
        Some(cleaned) => {
            response["data"] = Value::Array(cleaned);
            response
        }
        None => response,
    }
}

fn process_record(record: Value, rules: &PostProcessRules) -> Option<Value> {
    let Value::Object(mut map) = record else {
        return None;
    };

    for path in rules.nested_prune_paths {
        map = prune_field_path(map, path);
    }
    map = prune_top_level_fields(map, rules.top_level_prune_fields);
    map = collapse_empty_fields(map);

    if let Some(field) = rules.markup_field {
        if let Some(Value::String(markup)) = map.get(field) {
            let text = sanitize_markup(markup);
            map.insert(field.to_string(), Value::String(text));
        }
    }

    Some(Value::Object(map))
}

/// Remove the field addressed by `path`, walking key by key. An absent
/// intermediate or final key is a silent no-op, and only objects are
/// descended into. Surviving keys keep their insertion order.
pub fn prune_field_path(mut record: Map<String, Value>, path: &[&str]) -> Map<String, Value> {
    let Some((key, rest)) = path.split_first() else {
        return record;
    };

    if rest.is_empty() {
        record.shift_remove(*key);
        return record;
    }

    if let Some(Value::Object(child)) = record.get_mut(*key) {
        *child = prune_field_path(std::mem::take(child), rest);
    }
    record
}

/// Remove a set of single-key field names from the record's own keys.
pub fn prune_top_level_fields(
    record: Map<String, Value>,
    fields: &[&str],
) -> Map<String, Value> {
    record
        .into_iter()
        .filter(|(key, _)| !fields.contains(&key.as_str()))
        .collect()
}

/// Drop top-level fields that carry no information: nulls, empty
/// arrays, and objects whose every direct sub-field is null. An object
/// with zero sub-fields is kept. One level deep only.
pub fn collapse_empty_fields(record: Map<String, Value>) -> Map<String, Value> {
    record
        .into_iter()
        .filter(|(_, value)| !is_empty_value(value))
        .collect()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => !map.is_empty() && map.values().all(Value::is_null),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn prune_field_path_removes_nested_field_only() {
        let record = as_map(json!({
            "id": "n1",
            "source": { "origin": "email", "record_id": "ext-77" }
        }));
        let pruned = prune_field_path(record, &["source", "record_id"]);
        assert_eq!(
            Value::Object(pruned),
            json!({ "id": "n1", "source": { "origin": "email" } })
        );
    }

    #[test]
    fn prune_field_path_is_noop_when_path_absent() {
        let original = json!({ "id": "n1", "user": { "name": "A" } });
        let pruned = prune_field_path(as_map(original.clone()), &["source", "record_id"]);
        assert_eq!(Value::Object(pruned), original);

        let pruned = prune_field_path(as_map(original.clone()), &["user", "email"]);
        assert_eq!(Value::Object(pruned), original);
    }

    #[test]
    fn prune_field_path_does_not_descend_into_non_objects() {
        let original = json!({ "source": "email" });
        let pruned = prune_field_path(as_map(original.clone()), &["source", "record_id"]);
        assert_eq!(Value::Object(pruned), original);
    }

    #[test]
    fn prune_top_level_keeps_order_of_survivors() {
        let record = as_map(json!({ "a": 1, "followers": [], "b": 2, "c": 3 }));
        let pruned = prune_top_level_fields(record, &["followers", "c"]);
        let keys: Vec<&str> = pruned.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn collapse_drops_null_empty_array_and_all_null_object() {
        let record = as_map(json!({
            "id": "n1",
            "owner": null,
            "tags": [],
            "company": { "id": null, "domain": null },
            "user": { "id": "u1", "email": null },
            "links": {}
        }));
        let collapsed = collapse_empty_fields(record);
        assert_eq!(
            Value::Object(collapsed),
            json!({
                "id": "n1",
                "user": { "id": "u1", "email": null },
                "links": {}
            })
        );
    }

    #[test]
    fn collapse_is_one_level_deep() {
        // Nested empties inside a surviving object stay put.
        let record = as_map(json!({ "meta": { "a": 1, "b": null, "c": [] } }));
        let collapsed = collapse_empty_fields(record);
        assert_eq!(
            Value::Object(collapsed),
            json!({ "meta": { "a": 1, "b": null, "c": [] } })
        );
    }

    #[test]
    fn process_collection_applies_note_rules() {
        let response = json!({
            "data": [{
                "id": "n1",
                "name": "A",
                "followers": [{ "email": "x@example.com" }],
                "displayUrl": "https://pb.example.com/notes/n1",
                "source": { "origin": "email", "record_id": "ext-1" },
                "tags": [],
                "content": "<p>Hello <b>world</b></p>"
            }],
            "links": { "next": null }
        });
        let processed = process_collection(response, &NOTE_RULES);
        assert_eq!(
            processed,
            json!({
                "data": [{
                    "id": "n1",
                    "name": "A",
                    "source": { "origin": "email" },
                    "content": "Hello world"
                }],
                "links": { "next": null }
            })
        );
    }

    #[test]
    fn process_collection_passes_through_unexpected_shapes() {
        let not_an_array = json!({ "data": "not-an-array" });
        assert_eq!(
            process_collection(not_an_array.clone(), &NOTE_RULES),
            not_an_array
        );

        let no_data = json!({});
        assert_eq!(process_collection(no_data.clone(), &NOTE_RULES), no_data);
    }

    #[test]
    fn process_collection_returns_original_when_any_record_fails() {
        let response = json!({
            "data": [
                { "id": "n1", "followers": [] },
                "not-a-record"
            ]
        });
        assert_eq!(process_collection(response.clone(), &NOTE_RULES), response);
    }

    #[test]
    fn non_markup_content_is_left_alone() {
        let response = json!({ "data": [{ "id": "n1", "content": 42 }] });
        let processed = process_collection(response.clone(), &NOTE_RULES);
        assert_eq!(processed, response);
    }
}
