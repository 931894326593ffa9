//! Output encoders and file dispatch.

mod json;
mod literal;

use std::fs;
use std::path::Path;

pub use json::{from_json, to_json};
pub use literal::{to_expression, to_literal, Literal, LiteralWriter, RECREATED_FILE};

use crate::error::{Result, XlsxMetaError};
use crate::types::Metadata;

/// Encoding chosen from an output path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// `.json`
    Json,
    /// `.rs`, a Rust program rebuilding the workbook.
    Literal,
}

impl OutputKind {
    /// Pick the encoder for `path`. Any other extension is rejected with
    /// the dotted extension in the error, e.g. `unsupported .csv file`; a
    /// path without one reads `unsupported (none) file`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().map(|e| e.to_string_lossy()) {
            Some(ext) if ext == "json" => Ok(Self::Json),
            Some(ext) if ext == "rs" => Ok(Self::Literal),
            Some(ext) => Err(XlsxMetaError::UnsupportedOutput(format!(".{ext}"))),
            None => Err(XlsxMetaError::UnsupportedOutput("(none)".to_string())),
        }
    }
}

/// Encode `metadata` in the given format.
pub fn render(metadata: &Metadata, kind: OutputKind, pretty: bool) -> Result<String> {
    match kind {
        OutputKind::Json => to_json(metadata, pretty),
        OutputKind::Literal => to_literal(metadata),
    }
}

/// Encode and write to `path`, creating missing parent directories.
pub fn write_output(metadata: &Metadata, kind: OutputKind, path: &Path, pretty: bool) -> Result<()> {
    let content = render(metadata, kind, pretty)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    tracing::info!(path = %path.display(), ?kind, "metadata written");
    Ok(())
}

/// Write `metadata` to `path` in the format its extension selects.
pub fn write_to_file(metadata: &Metadata, path: &Path, pretty: bool) -> Result<()> {
    let kind = OutputKind::from_path(path)?;
    write_output(metadata, kind, path, pretty)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("out.json", Some(OutputKind::Json))]
    #[test_case("dir/out.rs", Some(OutputKind::Literal))]
    #[test_case("out.csv", None)]
    #[test_case("out", None)]
    fn test_output_kind(path: &str, expected: Option<OutputKind>) {
        assert_eq!(OutputKind::from_path(Path::new(path)).ok(), expected);
    }

    #[test_case("out.csv", "unsupported .csv file")]
    #[test_case("out", "unsupported (none) file")]
    #[test_case("dir.d/out", "unsupported (none) file")]
    fn test_unsupported_output_message(path: &str, expected: &str) {
        let err = OutputKind::from_path(Path::new(path)).unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_unsupported_extension_message() {
        let err = OutputKind::from_path(Path::new("report.csv")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported .csv file");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let meta = Metadata {
            filename: "a.xlsx".to_string(),
            ..Default::default()
        };

        let json_path = dir.path().join("nested/deeper/meta.json");
        write_to_file(&meta, &json_path, true).unwrap();
        let written = fs::read_to_string(&json_path).unwrap();
        assert_eq!(from_json(&written).unwrap(), meta);

        let rs_path = dir.path().join("gen/meta.rs");
        write_to_file(&meta, &rs_path, false).unwrap();
        let program = fs::read_to_string(&rs_path).unwrap();
        assert_eq!(program, to_literal(&meta).unwrap());
    }

    #[test]
    fn test_unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/meta.txt");
        assert!(write_to_file(&Metadata::default(), &path, false).is_err());
        assert!(!dir.path().join("sub").exists());
    }
}
