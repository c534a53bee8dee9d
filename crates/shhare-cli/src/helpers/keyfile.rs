use std::path::Path;

use serde::Serialize;

use shhare_core::keys::{parse_fragment_input, validate_fragment, KeyFragment};

/// Read the non-blank lines of a key file.
pub fn read_key_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", path.display(), e))?;
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Write one key per line.
pub fn write_key_file(path: &Path, keys: &[String]) -> anyhow::Result<()> {
    let mut contents = keys.join("\n");
    contents.push('\n');
    shhare_core::fs::write_atomic(path, contents.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to write key file {}: {}", path.display(), e))
}

/// Verdict on one line of a key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyLineStatus {
    /// 1-based line number in the file
    pub line: usize,
    /// Masked key, present when the line parsed
    pub preview: Option<String>,
    pub error: Option<String>,
}

impl KeyLineStatus {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Check every non-blank line as key-file import would, including duplicate
/// detection against earlier lines.
pub fn check_key_lines(contents: &str) -> Vec<KeyLineStatus> {
    let mut accepted: Vec<KeyFragment> = Vec::new();
    let mut statuses = Vec::new();

    for (index, raw) in contents.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = index + 1;
        let status = match parse_fragment_input(raw) {
            Ok(hex) => {
                let preview = Some(shhare_core::derived::obfuscate(&hex));
                match validate_fragment(&hex, &accepted) {
                    Ok(fragment) => {
                        accepted.push(fragment);
                        KeyLineStatus {
                            line,
                            preview,
                            error: None,
                        }
                    }
                    Err(err) => KeyLineStatus {
                        line,
                        preview,
                        error: Some(err.to_string()),
                    },
                }
            }
            Err(err) => KeyLineStatus {
                line,
                preview: None,
                error: Some(match err {
                    shhare_core::ShhareError::InvalidInput(message) => message,
                    other => other.to_string(),
                }),
            },
        };
        statuses.push(status);
    }

    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_key_lines() {
        let key = "ab".repeat(32);
        let contents = format!("{}\n\nabc\n{}\n{}\n", key, key, "cd".repeat(32));

        let statuses = check_key_lines(&contents);
        assert_eq!(statuses.len(), 4);

        assert!(statuses[0].is_valid());
        assert_eq!(statuses[0].line, 1);
        assert_eq!(
            statuses[0].preview.as_deref(),
            Some(format!("abababab{}abababab", "•".repeat(16)).as_str())
        );

        assert_eq!(statuses[1].line, 3);
        assert!(statuses[1].error.as_deref().unwrap().contains("Hex keys must be exactly 64"));

        assert_eq!(statuses[2].error.as_deref(), Some("Key already exists"));
        assert!(statuses[3].is_valid());
    }

    #[test]
    fn test_key_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        let keys = vec!["ab".repeat(32), "cd".repeat(32)];

        write_key_file(&path, &keys).unwrap();
        assert_eq!(read_key_lines(&path).unwrap(), keys);
    }
}
