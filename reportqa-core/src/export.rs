//! Tabular and JSON renderings of an analysis for the display/export layer.

use crate::rules::AnalysisRun;
use crate::types::Finding;
use anyhow::{Context, Result};

const CSV_HEADER: &str =
    "category,check_id,page,paragraph,offset,span_start,span_end,severity,confidence,message";

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One row per finding, in the order given.
pub fn to_csv(findings: &[Finding]) -> String {
    let mut out = String::with_capacity(64 * (findings.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for f in findings {
        let row = [
            f.category.as_str().to_string(),
            f.check_id.as_str().to_string(),
            f.segment_location.page.to_string(),
            f.segment_location.paragraph_index.to_string(),
            f.segment_location.char_offset.to_string(),
            f.span.start.to_string(),
            f.span.end.to_string(),
            f.severity.as_str().to_string(),
            format!("{:.3}", f.confidence),
            csv_field(&f.message),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

pub fn to_json(run: &AnalysisRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("Failed to serialize analysis run")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{Language, Location, Segment};
    use crate::types::{CheckId, RawFinding, Severity, Span};

    fn finding(message: &str) -> Finding {
        let segment = Segment::new(
            "Budget TBD.",
            Location {
                page: 2,
                paragraph_index: 4,
                char_offset: 120,
            },
            Language::En,
        );
        let raw = RawFinding::new(CheckId::Vagueness, &segment, Span::new(7, 10), message);
        Finding::from_raw(raw, Severity::Info)
    }

    #[test]
    fn test_csv_rows() {
        let csv = to_csv(&[finding("Placeholder \"TBD\" (exact match)")]);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "vagueness,vagueness,2,4,120,7,10,info,1.000,\"Placeholder \"\"TBD\"\" (exact match)\""
        );
    }

    #[test]
    fn test_csv_plain_message_is_unquoted() {
        let csv = to_csv(&[finding("plain")]);
        assert!(csv.trim_end().ends_with(",plain"));
    }

    #[test]
    fn test_empty_csv_has_header_only() {
        assert_eq!(to_csv(&[]), format!("{CSV_HEADER}\r\n"));
    }
}
