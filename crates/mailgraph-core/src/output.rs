//! Writing results to a file or the console.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Errors writing results.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The output file could not be created or written.
    #[error("cannot write {}: {source}", path.display())]
    File {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Console write failed.
    #[error("cannot write to stdout: {0}")]
    Stdout(io::Error),

    /// Serialization failed.
    #[error("cannot serialize records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes records as a JSON array indented by four spaces.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn to_writer<W: Write, T: Serialize>(writer: W, records: &[T]) -> serde_json::Result<()> {
    let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)
}

/// Writes records to `path` as JSON, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<(), OutputError> {
    let file_error = |source| OutputError::File {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(file_error)?);
    to_writer(&mut writer, records)?;
    writer.write_all(b"\n").map_err(file_error)?;
    writer.flush().map_err(file_error)
}

/// Prints records to stdout as JSON, followed by a `count=N` line.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print<T: Serialize>(records: &[T]) -> Result<(), OutputError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    to_writer(&mut out, records)?;
    writeln!(out).map_err(OutputError::Stdout)?;
    writeln!(out, "count={}", records.len()).map_err(OutputError::Stdout)?;
    out.flush().map_err(OutputError::Stdout)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_four_space_indent() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &[json!({"subject": "hi"})]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "[\n    {\n        \"subject\": \"hi\"\n    }\n]");
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        write_json(&path, &[json!({"id": 1}), json!({"id": 2})]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_write_json_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("messages.json");
        let err = write_json(&path, &[json!({})]).unwrap_err();
        assert!(matches!(err, OutputError::File { .. }));
    }
}
