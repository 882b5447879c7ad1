//! JSON serializer for client configuration files.

use serde_json::{Map, Value};

use super::{ConfigFormat, ConfigSerializer, FormatError, is_blank};

/// JSON configuration file serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl ConfigSerializer for JsonSerializer {
    fn parse(&self, bytes: &[u8]) -> Result<Map<String, Value>, FormatError> {
        if is_blank(bytes) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(FormatError::Shape(
                "expected JSON object at root".to_string(),
            )),
        }
    }

    fn render(&self, map: &Map<String, Value>) -> Result<Vec<u8>, FormatError> {
        let mut bytes = serde_json::to_vec_pretty(map)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }
}
