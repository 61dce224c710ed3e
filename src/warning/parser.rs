use super::Warning;
use regex::Regex;
use std::borrow::Cow;
use std::io::{BufRead, ErrorKind};
use std::sync::LazyLock;

// Matches: <path>:<line>[:<column>]: warning: <message>
// The path is lazy so the location is taken from the colons right before the
// marker, which keeps drive letters like C:\ inside the path.
static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>.+?):(?P<line>\d+)(?::(?P<column>\d+))?: warning: (?P<message>.*)$")
        .unwrap()
});

// Trailing category tag: "... [-Wunused-variable]"
static CATEGORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<text>.*?)\s*\[(?P<category>[^\[\]\s]+)\]\s*$").unwrap()
});

/// Result of a parse pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Success,
    Failure(String),
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success)
    }
}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub warnings: Vec<Warning>,
    pub outcome: ParseOutcome,
}

impl ParseResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            warnings: Vec::new(),
            outcome: ParseOutcome::Failure(reason.into()),
        }
    }
}

/// Location and message of a header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub filename: &'a str,
    pub line_number: u32,
    pub column_number: Option<u32>,
    pub message: &'a str,
    pub category: &'a str,
}

/// Recognize a warning header. Returns None for every other line shape.
pub fn parse_header(line: &str) -> Option<Header<'_>> {
    let caps = HEADER_REGEX.captures(line)?;

    let filename = caps.name("path")?.as_str();
    let line_number: u32 = caps.name("line")?.as_str().parse().ok()?;
    if line_number == 0 {
        return None;
    }

    // Column 0 is treated as "unknown", same as an omitted column
    let column_number = match caps.name("column") {
        Some(m) => Some(m.as_str().parse::<u32>().ok()?).filter(|c| *c > 0),
        None => None,
    };

    let raw_message = caps.name("message")?.as_str();
    let (message, category) = match CATEGORY_REGEX.captures(raw_message) {
        Some(tag) => (
            tag.name("text").map_or("", |m| m.as_str()),
            tag.name("category").map_or("", |m| m.as_str()),
        ),
        None => (raw_message.trim_end(), ""),
    };

    Some(Header {
        filename,
        line_number,
        column_number,
        message,
        category,
    })
}

struct PendingWarning {
    category: String,
    text: String,
    filename: String,
    line_number: u32,
    column_number: Option<u32>,
}

impl PendingWarning {
    fn commit(self) -> Warning {
        Warning::new(
            self.category,
            self.text,
            self.filename,
            self.line_number,
            self.column_number,
        )
    }
}

/// Single forward pass over log lines. Holds no state between passes.
#[derive(Default)]
struct LineFolder {
    current: Option<PendingWarning>,
    warnings: Vec<Warning>,
}

impl LineFolder {
    fn feed(&mut self, raw_line: &str) {
        let line = clean_line(raw_line);

        if let Some(header) = parse_header(&line) {
            if let Some(done) = self.current.take() {
                self.warnings.push(done.commit());
            }
            self.current = Some(PendingWarning {
                category: header.category.to_string(),
                text: header.message.to_string(),
                filename: header.filename.to_string(),
                line_number: header.line_number,
                column_number: header.column_number,
            });
            return;
        }

        // Anything before the first header is build noise
        if let Some(current) = self.current.as_mut() {
            current.text.push('\n');
            current.text.push_str(&line);
        }
    }

    fn finish(mut self) -> Vec<Warning> {
        if let Some(done) = self.current.take() {
            self.warnings.push(done.commit());
        }
        self.warnings
    }
}

/// Drop a trailing '\r' and any ANSI colour codes
fn clean_line(line: &str) -> Cow<'_, str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.contains('\x1b') {
        Cow::Owned(strip_ansi_escapes::strip_str(line))
    } else {
        Cow::Borrowed(line)
    }
}

/// Parse raw log text into warnings. Never fails: unrecognized lines are
/// either folded into the preceding warning or skipped.
pub fn parse(raw_text: &str) -> ParseResult {
    let mut folder = LineFolder::default();
    for line in raw_text.lines() {
        folder.feed(line);
    }
    let warnings = folder.finish();
    tracing::debug!(count = warnings.len(), "parsed warnings");

    ParseResult {
        warnings,
        outcome: ParseOutcome::Success,
    }
}

/// Parse from a reader. Bytes that are not valid UTF-8 become U+FFFD and the
/// line is kept; only an I/O error fails the pass, and then no warnings are
/// returned.
pub fn parse_reader<R: BufRead>(mut reader: R) -> ParseResult {
    let mut folder = LineFolder::default();
    let mut buf = Vec::new();
    let mut lossy_lines = 0usize;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf);
                let line = String::from_utf8_lossy(bytes);
                if matches!(line, Cow::Owned(_)) {
                    lossy_lines += 1;
                }
                folder.feed(&line);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "log read failed mid-parse");
                return ParseResult::failure(e.to_string());
            }
        }
    }
    let warnings = folder.finish();
    tracing::debug!(count = warnings.len(), lossy_lines, "parsed warnings");

    ParseResult {
        warnings,
        outcome: ParseOutcome::Success,
    }
}
