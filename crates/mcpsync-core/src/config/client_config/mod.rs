//! Client configuration document handling.
//!
//! Every supported application stores its MCP servers in either a JSON or a
//! TOML document. Both are normalized to `serde_json::Map<String, Value>` so
//! adapters can read and rewrite the server map without caring about the
//! on-disk format. Key order survives the round trip (`preserve_order`).

mod json;
mod toml;

use serde_json::{Map, Value};

pub use json::JsonSerializer;
pub use toml::TomlSerializer;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
        }
    }
}

/// Why a document could not be parsed or rendered.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    TomlParse(#[from] ::toml::de::Error),

    #[error("cannot encode TOML: {0}")]
    TomlRender(#[from] ::toml::ser::Error),

    #[error("{0}")]
    Shape(String),
}

/// Parses and renders one document format.
pub trait ConfigSerializer: Send + Sync {
    /// Parse a document. Empty or whitespace-only input is an empty document.
    fn parse(&self, bytes: &[u8]) -> Result<Map<String, Value>, FormatError>;

    /// Render a document.
    fn render(&self, map: &Map<String, Value>) -> Result<Vec<u8>, FormatError>;

    fn format(&self) -> ConfigFormat;
}

/// Create a serializer for the given format.
pub fn serializer_for_format(format: ConfigFormat) -> &'static dyn ConfigSerializer {
    match format {
        ConfigFormat::Json => &JsonSerializer,
        ConfigFormat::Toml => &TomlSerializer,
    }
}

pub(crate) fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}

/// Extract a nested map from a root map at the given path.
///
/// A missing segment yields an empty map; a segment holding a non-object is
/// an error.
pub fn extract_map_at_path(
    root: &Map<String, Value>,
    path: &[&str],
) -> Result<Map<String, Value>, FormatError> {
    let mut current = root;
    for (idx, segment) in path.iter().enumerate() {
        let value = match current.get(*segment) {
            Some(value) => value,
            None => return Ok(Map::new()),
        };
        match value {
            Value::Object(map) if idx == path.len() - 1 => return Ok(map.clone()),
            Value::Object(map) => current = map,
            _ => {
                return Err(FormatError::Shape(format!(
                    "expected '{}' to be an object",
                    segment
                )));
            }
        }
    }
    Ok(Map::new())
}

/// Set a map at a nested path within a root map, creating intermediate
/// objects as needed. Existing keys keep their position.
pub fn set_map_at_path(
    root: &mut Map<String, Value>,
    path: &[&str],
    map: Map<String, Value>,
) -> Result<(), FormatError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(FormatError::Shape("empty server map path".to_string()));
    };
    let mut current = root;
    for segment in parents {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match next {
            Value::Object(m) => current = m,
            _ => {
                return Err(FormatError::Shape(format!(
                    "expected '{}' to be an object",
                    segment
                )));
            }
        }
    }
    current.insert(last.to_string(), Value::Object(map));
    Ok(())
}
