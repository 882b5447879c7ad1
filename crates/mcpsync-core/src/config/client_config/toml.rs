//! TOML serializer for client configuration files.
//!
//! Values and table order survive a round trip; comments do not.

use serde_json::{Map, Value};

use super::{ConfigFormat, ConfigSerializer, FormatError, is_blank};

/// TOML configuration file serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlSerializer;

impl ConfigSerializer for TomlSerializer {
    fn parse(&self, bytes: &[u8]) -> Result<Map<String, Value>, FormatError> {
        if is_blank(bytes) {
            return Ok(Map::new());
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|e| FormatError::Shape(format!("TOML is not valid UTF-8: {e}")))?;
        let table: toml::Table = toml::from_str(content)?;
        Ok(toml_table_to_json(table))
    }

    fn render(&self, map: &Map<String, Value>) -> Result<Vec<u8>, FormatError> {
        let table = json_map_to_toml(map)?;
        Ok(toml::to_string_pretty(&table)?.into_bytes())
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }
}

fn toml_table_to_json(table: toml::Table) -> Map<String, Value> {
    table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json_value(value)))
        .collect()
}

/// Convert a single TOML value to a JSON value.
fn toml_to_json_value(toml_value: toml::Value) -> Value {
    match toml_value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => {
            // serde_json::Number doesn't support NaN/Infinity, fall back to string
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string()))
        }
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json_value).collect()),
        toml::Value::Table(table) => Value::Object(toml_table_to_json(table)),
    }
}

fn json_map_to_toml(map: &Map<String, Value>) -> Result<toml::Table, FormatError> {
    let mut table = toml::Table::new();
    for (key, value) in map {
        // TOML has no null; a null field is simply absent.
        if value.is_null() {
            continue;
        }
        table.insert(key.clone(), json_to_toml_value(value)?);
    }
    Ok(table)
}

/// Convert a single JSON value to a TOML value.
fn json_to_toml_value(json_value: &Value) -> Result<toml::Value, FormatError> {
    match json_value {
        Value::Null => Err(FormatError::Shape(
            "null cannot be represented in TOML".to_string(),
        )),
        Value::Bool(b) => Ok(toml::Value::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(toml::Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(toml::Value::Float(f))
            } else {
                Err(FormatError::Shape(format!("unsupported number {n}")))
            }
        }
        Value::String(s) => Ok(toml::Value::String(s.clone())),
        Value::Array(arr) => arr
            .iter()
            .map(json_to_toml_value)
            .collect::<Result<Vec<_>, _>>()
            .map(toml::Value::Array),
        Value::Object(obj) => json_map_to_toml(obj).map(toml::Value::Table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_tables() {
        let map = TomlSerializer
            .parse(
                br#"
model = "o3"

[mcp_servers.fs]
command = "npx"
args = ["-y", "server-filesystem"]

[mcp_servers.fs.env]
ROOT = "/tmp"
"#,
            )
            .expect("parse");

        assert_eq!(map["model"], "o3");
        assert_eq!(map["mcp_servers"]["fs"]["args"], json!(["-y", "server-filesystem"]));
        assert_eq!(map["mcp_servers"]["fs"]["env"]["ROOT"], "/tmp");
    }

    #[test]
    fn render_then_parse_keeps_values() {
        let source = br#"
approval_policy = "never"

[mcp_servers.weather]
command = "weather-mcp"
enabled = false
startup_timeout_ms = 20000
"#;
        let map = TomlSerializer.parse(source).expect("parse");
        let rendered = TomlSerializer.render(&map).expect("render");
        let reparsed = TomlSerializer.parse(&rendered).expect("reparse");
        assert_eq!(map, reparsed);
    }

    #[test]
    fn null_fields_are_dropped() {
        let map = match json!({"a": null, "b": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let rendered = String::from_utf8(TomlSerializer.render(&map).expect("render")).expect("utf8");
        assert!(!rendered.contains('a'));
        assert!(rendered.contains("b = 1"));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = TomlSerializer.parse(b"[mcp_servers.fs\ncommand = 1").unwrap_err();
        assert!(matches!(err, FormatError::TomlParse(_)));
    }
}
