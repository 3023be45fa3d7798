use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write text to stdout (newline terminated) or to a file.
pub fn write_output(text: &str, output_path: Option<&Path>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("Failed to write output file '{}': {}", path.display(), e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Serialize and write in one step.
pub fn write_json<T: Serialize>(
    value: &T,
    compact: bool,
    output_path: Option<&Path>,
) -> Result<(), String> {
    write_output(&to_json(value, compact)?, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_compact_and_pretty() {
        let value = serde_json::json!({"found": 7, "rejected": 1});
        let compact = to_json(&value, true).unwrap();
        assert!(!compact.contains('\n'));
        let pretty = to_json(&value, false).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&serde_json::json!({"a": 1}), true, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":1}"#);
    }
}
