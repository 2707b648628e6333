// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Conversion between `serde_json` documents and Stellar values

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

use super::value::Value;

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Integer(small),
                        Err(_) => Value::Long(i),
                    }
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(key, value)| (Value::String(key), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Long(l) => JsonValue::from(*l),
            Value::Float(f) => JsonValue::from(f64::from(*f)),
            Value::Double(d) => JsonValue::from(*d),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key_string(key), JsonValue::from(value)))
                    .collect(),
            ),
            Value::Function(func) => JsonValue::String(func.name().to_string()),
            Value::Opaque(opaque) => JsonValue::String(opaque.label().to_string()),
        }
    }
}

/// JSON object keys must be strings
fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i32(*i),
            Value::Long(l) => serializer.serialize_i64(*l),
            Value::Float(f) => serializer.serialize_f32(*f),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(&key_string(key), value)?;
                }
                out.end()
            }
            Value::Function(func) => serializer.serialize_str(func.name()),
            Value::Opaque(opaque) => serializer.serialize_str(opaque.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let event = json!({
            "ip_src_addr": "192.168.0.1",
            "bytes": 42,
            "big": 5_000_000_000_i64,
            "ratio": 0.5,
            "tags": ["a", null],
        });
        let value = Value::from(event);
        let map = value.as_map().unwrap();
        assert_eq!(map[&Value::from("bytes")], Value::Integer(42));
        assert_eq!(map[&Value::from("big")], Value::Long(5_000_000_000));
        assert_eq!(map[&Value::from("ratio")], Value::Double(0.5));
        assert_eq!(
            map[&Value::from("tags")],
            Value::list(vec![Value::from("a"), Value::Null])
        );
        // Insertion order survives
        assert_eq!(
            map.keys().next().and_then(Value::as_str),
            Some("ip_src_addr")
        );
    }

    #[test]
    fn test_serialize_round_trip_shape() {
        let value = Value::map(vec![
            (Value::from("n"), Value::Integer(1)),
            (Value::Integer(2), Value::list(vec![Value::Boolean(true)])),
        ]);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"n":1,"2":[true]}"#);
        assert_eq!(JsonValue::from(&value), json!({"n": 1, "2": [true]}));
    }
}
