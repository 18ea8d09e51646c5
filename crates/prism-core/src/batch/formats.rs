//! Input format detection for batch files.

use crate::batch::error::BatchError;

/// Supported batch file formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFormat {
    /// Line-delimited format (one generate prompt per line).
    LineDelimited,
    /// JSON array of job entries.
    JsonArray,
    /// JSON object with a `jobs` list plus batch-level settings.
    JsonObject,
}

/// Detects the input format based on file content.
///
/// # Errors
/// Returns an error if the content is empty.
pub fn detect_format(content: &str) -> Result<InputFormat, BatchError> {
    let trimmed = content.trim_start();

    if trimmed.trim_end().is_empty() {
        return Err(BatchError::InvalidConfig("File is empty".to_string()));
    }

    if trimmed.starts_with('[') {
        Ok(InputFormat::JsonArray)
    } else if trimmed.starts_with('{') {
        Ok(InputFormat::JsonObject)
    } else {
        Ok(InputFormat::LineDelimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_line_delimited() {
        let content = "A cat\nA dog\nA bird";
        assert_eq!(detect_format(content).unwrap(), InputFormat::LineDelimited);
    }

    #[test]
    fn test_detect_format_json() {
        assert_eq!(detect_format("  [{\"prompt\": \"x\"}]").unwrap(), InputFormat::JsonArray);
        assert_eq!(detect_format("\n{\"jobs\": []}").unwrap(), InputFormat::JsonObject);
    }

    #[test]
    fn test_detect_format_empty() {
        assert!(detect_format("").is_err());
        assert!(detect_format("  \n\t").is_err());
    }
}
