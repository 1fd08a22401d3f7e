//! Per-part summary record.

use std::fmt;

/// What listing and rendering say about one part.
///
/// `number` is the part's 1-based position in a pre-order walk of its
/// message, the same number extraction selectors refer to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PartSummary {
    /// Sequence number within the message.
    pub number: usize,

    /// Nesting depth, 0 for the top-level body.
    pub depth: usize,

    /// MIME type without parameters (e.g. `"text/plain"`).
    pub mime_type: String,

    /// Decoded body size in bytes.
    pub size: u64,

    /// File name from `Content-Disposition` or `Content-Type`, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
}

/// `N: type size=LEN name="F"`
impl fmt::Display for PartSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} size={}", self.number, self.mime_type, self.size)?;
        if let Some(name) = &self.filename {
            write!(f, " name=\"{name}\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(filename: Option<&str>) -> PartSummary {
        PartSummary {
            number: 3,
            depth: 1,
            mime_type: "application/pdf".to_string(),
            size: 1024,
            filename: filename.map(String::from),
        }
    }

    #[test]
    fn test_display_with_name() {
        assert_eq!(
            summary(Some("report.pdf")).to_string(),
            "3: application/pdf size=1024 name=\"report.pdf\""
        );
    }

    #[test]
    fn test_display_without_name() {
        assert_eq!(summary(None).to_string(), "3: application/pdf size=1024");
    }

    #[test]
    fn test_json_omits_missing_filename() {
        let json = serde_json::to_value(summary(None)).unwrap();
        assert!(json.get("filename").is_none());
        assert_eq!(json["mime_type"], "application/pdf");
    }
}
