//! Reading schemas from JSON or YAML.

use serde_json::Value;
use std::path::Path;

use crate::breakpoints::BreakpointTable;
use crate::error::{GoatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
}

impl SchemaFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(SchemaFormat::Json),
            "yaml" | "yml" => Some(SchemaFormat::Yaml),
            _ => None,
        }
    }
}

pub fn parse_schema(text: &str, format: SchemaFormat) -> Result<Value> {
    Ok(match format {
        SchemaFormat::Json => serde_json::from_str(text)?,
        SchemaFormat::Yaml => serde_yaml::from_str(text)?,
    })
}

/// Read a schema file, picking the format from its extension
pub fn load_schema(path: &Path) -> Result<Value> {
    let format = SchemaFormat::from_path(path).ok_or_else(|| GoatError::UnsupportedFormat(path.to_path_buf()))?;
    let text = std::fs::read_to_string(path).map_err(|source| GoatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_schema(&text, format)
}

/// Breakpoint table from inline JSON such as `{"xs":0,"md":768}`
pub fn parse_breakpoints(text: &str) -> Result<BreakpointTable> {
    let value: Value = serde_json::from_str(text)?;
    BreakpointTable::from_value(&value).ok_or_else(|| GoatError::InvalidBreakpoints(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("view.json");
        fs::write(&json_path, r#"{"name": "a", "content": "Hi"}"#).unwrap();
        let yaml_path = dir.path().join("view.YML");
        fs::write(&yaml_path, "name: a\ncontent: Hi\n").unwrap();

        assert_eq!(load_schema(&json_path).unwrap(), json!({"name": "a", "content": "Hi"}));
        assert_eq!(load_schema(&yaml_path).unwrap(), json!({"name": "a", "content": "Hi"}));
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("view.txt");
        fs::write(&txt, "{}").unwrap();
        assert!(matches!(load_schema(&txt), Err(GoatError::UnsupportedFormat(_))));
        assert!(matches!(load_schema(&dir.path().join("missing.json")), Err(GoatError::Io { .. })));
    }

    #[test]
    fn test_parse_breakpoints() {
        let table = parse_breakpoints(r#"{"s": 0, "l": 1000}"#).unwrap();
        assert_eq!(table.resolve(1200), Some("l"));
        assert!(matches!(parse_breakpoints("[1]"), Err(GoatError::InvalidBreakpoints(_))));
    }
}
