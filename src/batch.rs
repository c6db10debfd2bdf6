//! Batch Loading
//!
//! Discovers batch files in a data directory and parses each into a list of
//! records. A batch file holds a JSON array of objects.

use crate::error::{ImportError, Result};
use crate::value::Record;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const BATCH_EXTENSIONS: &[&str] = &["js", "json"];

#[derive(Debug, Clone)]
pub struct Batch {
    /// File name, used to derive the object type.
    pub label: String,
    pub source: PathBuf,
    pub records: Vec<Record>,
}

/// Load every batch file in `data_dir`, skipping names in `ignored`.
/// Files are returned in name order.
pub fn load_batches(data_dir: &Path, ignored: &[String]) -> Result<Vec<Batch>> {
    let entries = fs::read_dir(data_dir).map_err(|e| {
        ImportError::Configuration(format!(
            "cannot read data directory {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ImportError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !has_batch_extension(&path) {
            continue;
        }

        let name = file_name(&path);
        if ignored.iter().any(|i| i == &name) {
            info!("⏭️  Ignoring {}", name);
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    paths.iter().map(|p| load_batch(p)).collect()
}

/// Parse one batch file.
pub fn load_batch(path: &Path) -> Result<Batch> {
    info!("📂 Opening {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |reason: String| ImportError::RecordParse {
        path: path.to_path_buf(),
        reason,
    };

    let items: Vec<Value> = serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(parse_error(format!(
                "item {} is not an object (found {})",
                i,
                json_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Batch {
        label: file_name(path),
        source: path.to_path_buf(),
        records,
    })
}

fn has_batch_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| BATCH_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).expect("Failed to write fixture");
    }

    #[test]
    fn test_loads_batch_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "upgrades.js", r#"[{"id": 1}]"#);
        write(&dir, "pilots.json", r#"[{"id": 1, "name": "Han"}, {"id": 2}]"#);
        write(&dir, "README.md", "not a batch");

        let batches = load_batches(dir.path(), &[]).unwrap();

        let labels: Vec<_> = batches.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["pilots.json", "upgrades.js"]);
        assert_eq!(batches[0].records.len(), 2);
    }

    #[test]
    fn test_ignored_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ships.js", "[]");
        write(&dir, "reference-cards.js", "[]");

        let batches = load_batches(dir.path(), &["reference-cards.js".to_string()]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].label, "ships.js");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ships.js", "[{\"id\": 1,");

        let err = load_batches(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, ImportError::RecordParse { .. }));
    }

    #[test]
    fn test_non_object_item_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ships.js", r#"[{"id": 1}, 7]"#);

        let err = load_batches(dir.path(), &[]).unwrap_err();
        assert!(err.to_string().contains("item 1 is not an object"));
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let err = load_batches(Path::new("/nonexistent/data"), &[]).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }
}
