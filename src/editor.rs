use crate::error::{Result, WarnError};
use crate::warning::Warning;

/// Substitute `$filename`, `$line` and `$column` in an editor template.
/// A warning without a column jumps to column 1.
pub fn substitute(template: &str, warn: &Warning) -> String {
    let column = warn.column_number.unwrap_or(1);
    template
        .replace("$filename", &warn.filename)
        .replace("$line", &warn.line_number.to_string())
        .replace("$column", &column.to_string())
}

/// Build the command that opens `warn` in the configured editor. Only
/// absolute paths can be opened, since the log's working directory is unknown.
pub fn editor_command(template: &str, warn: &Warning, index: usize) -> Result<String> {
    if template.trim().is_empty() {
        return Err(WarnError::EditorNotConfigured);
    }
    if !warn.path_is_absolute() {
        return Err(WarnError::RelativePath(index));
    }
    Ok(substitute(template, warn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_all_placeholders() {
        let warn = Warning::new("-Wshadow", "x", "/src/a.cpp", 12, Some(5));
        assert_eq!(
            substitute("code -g $filename:$line:$column", &warn),
            "code -g /src/a.cpp:12:5"
        );
    }

    #[test]
    fn test_missing_column_becomes_one() {
        let warn = Warning::new("", "x", "/src/a.cpp", 12, None);
        assert_eq!(substitute("kate -l $line -c $column $filename", &warn), "kate -l 12 -c 1 /src/a.cpp");
    }

    #[test]
    fn test_editor_required() {
        let warn = Warning::new("", "x", "/src/a.cpp", 1, None);
        assert!(matches!(
            editor_command("  ", &warn, 0),
            Err(WarnError::EditorNotConfigured)
        ));
    }

    #[test]
    fn test_relative_path_rejected() {
        let warn = Warning::new("", "x", "src/a.cpp", 1, None);
        assert!(matches!(
            editor_command("vim $filename", &warn, 3),
            Err(WarnError::RelativePath(3))
        ));
    }
}
