//! GraphSON v2 decoding helpers.
//!
//! GraphSON v2 may wrap any value as `{"@type": "g:Int32", "@value": 42}`.
//! Cosmos DB mostly answers with plain JSON, but vertices, lists and maps can
//! arrive typed depending on the serializer. [`normalize`] strips the wrappers
//! so both shapes decode into the same Rust types.

use serde_json::{Map, Value};

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

/// Recursively replace typed GraphSON wrappers with their plain JSON value.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(mut map) => {
            if map.len() == 2 && map.contains_key(TYPE_KEY) && map.contains_key(VALUE_KEY) {
                let type_name = map
                    .remove(TYPE_KEY)
                    .and_then(|t| t.as_str().map(str::to_owned))
                    .unwrap_or_default();
                let inner = map.remove(VALUE_KEY).unwrap_or(Value::Null);
                return match type_name.as_str() {
                    "g:Map" => map_from_pairs(inner),
                    _ => normalize(inner),
                };
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        other => other,
    }
}

/// `g:Map` stores entries as a flat `[k1, v1, k2, v2, ...]` list.
fn map_from_pairs(inner: Value) -> Value {
    let Value::Array(flat) = inner else {
        return normalize(inner);
    };
    let mut map = Map::new();
    let mut entries = flat.into_iter();
    while let Some(key) = entries.next() {
        let value = entries.next().map(normalize).unwrap_or(Value::Null);
        let key = match normalize(key) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        map.insert(key, value);
    }
    Value::Object(map)
}

/// Flatten a response `data` payload into the list of result items.
pub fn into_items(data: Value) -> Vec<Value> {
    match normalize(data) {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        single => vec![single],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_untouched() {
        let plain = json!({"id": "thomas.1", "properties": {"age": [{"id": "a", "value": 44}]}});
        assert_eq!(normalize(plain.clone()), plain);
    }

    #[test]
    fn test_scalar_wrappers() {
        assert_eq!(normalize(json!({"@type": "g:Int32", "@value": 42})), json!(42));
        assert_eq!(normalize(json!({"@type": "g:Double", "@value": 1.5})), json!(1.5));
        assert_eq!(
            normalize(json!({"@type": "g:UUID", "@value": "41d2e28a-20a4-4ab0-b379-d810dede3786"})),
            json!("41d2e28a-20a4-4ab0-b379-d810dede3786")
        );
    }

    #[test]
    fn test_typed_vertex() {
        let typed = json!({
            "@type": "g:Vertex",
            "@value": {
                "id": "robin.1",
                "label": "person",
                "properties": {
                    "age": [{
                        "@type": "g:VertexProperty",
                        "@value": {
                            "id": {"@type": "g:Int64", "@value": 7},
                            "value": {"@type": "g:Int32", "@value": 42},
                            "label": "age"
                        }
                    }]
                }
            }
        });
        let plain = normalize(typed);
        assert_eq!(plain["id"], json!("robin.1"));
        assert_eq!(plain["properties"]["age"][0]["value"], json!(42));
        assert_eq!(plain["properties"]["age"][0]["id"], json!(7));
    }

    #[test]
    fn test_typed_map_and_list() {
        let typed = json!({
            "@type": "g:List",
            "@value": [{
                "@type": "g:Map",
                "@value": ["name", "Robin", {"@type": "g:Int32", "@value": 1}, "one"]
            }]
        });
        assert_eq!(normalize(typed), json!([{"name": "Robin", "1": "one"}]));
    }

    #[test]
    fn test_into_items() {
        assert!(into_items(Value::Null).is_empty());
        assert_eq!(into_items(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(into_items(json!({"@type": "g:Int64", "@value": 3})), vec![json!(3)]);
        assert_eq!(
            into_items(json!({"@type": "g:List", "@value": [{"@type": "g:Int32", "@value": 1}]})),
            vec![json!(1)]
        );
    }
}
