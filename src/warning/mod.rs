use serde::Serialize;
use std::path::Path;

pub mod parser;
pub mod source;
pub mod store;

pub use parser::{ParseOutcome, ParseResult, parse, parse_reader};
pub use source::{FsLogSource, LogLoader, LogSource, LoadEvent, load_store};
pub use store::{LoadFinished, WarningStore};

/// A single diagnostic parsed out of a build log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Category tag without brackets (e.g. `-Wunused-variable`), empty if absent
    pub category: String,
    /// Header message plus every folded continuation line
    pub complete_text: String,
    pub filename: String,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    /// Pre-computed lowercase text for case-insensitive matching
    #[serde(skip)]
    text_lowercase: String,
}

impl Warning {
    pub fn new(
        category: impl Into<String>,
        complete_text: impl Into<String>,
        filename: impl Into<String>,
        line_number: u32,
        column_number: Option<u32>,
    ) -> Self {
        let complete_text = complete_text.into();
        let text_lowercase = complete_text.to_lowercase();
        Self {
            category: category.into(),
            complete_text,
            filename: filename.into(),
            line_number,
            column_number,
            text_lowercase,
        }
    }

    /// Get the pre-computed lowercase version of the complete text
    pub fn text_lowercase(&self) -> &str {
        &self.text_lowercase
    }

    /// First line of the text, i.e. the header message
    pub fn message(&self) -> &str {
        self.complete_text.lines().next().unwrap_or("")
    }

    /// `filename:line[:column]` as it appears in a header
    pub fn location(&self) -> String {
        match self.column_number {
            Some(column) => format!("{}:{}:{}", self.filename, self.line_number, column),
            None => format!("{}:{}", self.filename, self.line_number),
        }
    }

    pub fn path_is_absolute(&self) -> bool {
        // Drive-letter paths are absolute even when the log was produced on Windows
        // and read elsewhere.
        Path::new(&self.filename).is_absolute() || is_windows_absolute(&self.filename)
    }
}

fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_with_column() {
        let warn = Warning::new("-Wshadow", "shadows", "/a/b.c", 10, Some(3));
        assert_eq!(warn.location(), "/a/b.c:10:3");
    }

    #[test]
    fn test_location_without_column() {
        let warn = Warning::new("", "text", "b.c", 20, None);
        assert_eq!(warn.location(), "b.c:20");
    }

    #[test]
    fn test_text_lowercase_is_precomputed() {
        let warn = Warning::new("", "Unused Variable 'X'", "b.c", 1, None);
        assert_eq!(warn.text_lowercase(), "unused variable 'x'");
    }

    #[test]
    fn test_message_is_first_line() {
        let warn = Warning::new("", "missing return\nnote: here", "b.c", 1, None);
        assert_eq!(warn.message(), "missing return");
    }

    #[test]
    fn test_path_is_absolute() {
        assert!(Warning::new("", "", "/usr/include/x.h", 1, None).path_is_absolute());
        assert!(Warning::new("", "", "C:\\src\\x.cpp", 1, None).path_is_absolute());
        assert!(!Warning::new("", "", "src/x.cpp", 1, None).path_is_absolute());
        assert!(!Warning::new("", "", "../x.cpp", 1, None).path_is_absolute());
    }

    #[test]
    fn test_serialize_omits_missing_column() {
        let warn = Warning::new("-Wreturn-type", "missing return", "/a/b.c", 20, None);
        let json = serde_json::to_value(&warn).unwrap();
        assert_eq!(json["line_number"], 20);
        assert!(json.get("column_number").is_none());
        assert!(json.get("text_lowercase").is_none());
    }
}
