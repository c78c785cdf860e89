//! Consolidated run summaries: browsable HTML and machine-readable JSON.
//!
//! The HTML report references every test's three fixed artifact slots by
//! relative path whether or not the files exist; a missing slot simply
//! renders as a broken image. Consumers that care check file presence on
//! disk, the report itself is generated unconditionally once per run.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::SummaryFormat;
use crate::runner::types::{RunSummary, RunnerResult, TestStatus};
use crate::runner::{BASELINE_IMAGE, DIFF_IMAGE, RESULT_IMAGE, artifact_dir_name};

/// Basename of the HTML summary document
pub const HTML_SUMMARY: &str = "fig_comparison.html";

/// Basename of the JSON summary document
pub const JSON_SUMMARY: &str = "fig_comparison.json";

/// Paths of the summary documents a call to [`write_summary`] produced
#[derive(Debug, Default)]
pub struct WrittenSummary {
    /// HTML document path, when requested
    pub html: Option<PathBuf>,
    /// JSON document path, when requested
    pub json: Option<PathBuf>,
}

/// Write the requested summary documents into the results root
pub fn write_summary(
    summary: &RunSummary,
    format: SummaryFormat,
) -> RunnerResult<WrittenSummary> {
    let mut written = WrittenSummary::default();

    if format.json {
        let path = summary.results_dir.join(JSON_SUMMARY);
        let document = serde_json::to_string_pretty(summary)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(&path, document)?;
        written.json = Some(path);
    }

    if format.html {
        let path = summary.results_dir.join(HTML_SUMMARY);
        fs::write(&path, render_html(summary))?;
        written.html = Some(path);
    }

    Ok(written)
}

/// Render the HTML document for a run summary
pub fn render_html(summary: &RunSummary) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<title>Image comparison</title>\n");
    html.push_str(
        "<style>\n\
         body { font-family: sans-serif; margin: 1em 2em; }\n\
         .test { border-top: 1px solid #ccc; padding: 0.5em 0; }\n\
         .test img { max-width: 30%; border: 1px solid #999; margin-right: 0.5em; }\n\
         .passed h4 { color: #2a7d2a; }\n\
         .failed h4, .error h4 { color: #b03030; }\n\
         pre { background: #f4f4f4; padding: 0.5em; overflow-x: auto; }\n\
         </style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str("<h2>Image comparison</h2>\n");
    html.push_str(&format!(
        "<p>Generated {} &mdash; {} passed, {} failed, {} errored.</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        summary.count(TestStatus::Passed),
        summary.count(TestStatus::Failed),
        summary.count(TestStatus::Error),
    ));

    for result in &summary.results {
        let dir = artifact_dir_name(&result.test_id);
        html.push_str(&format!("<div class=\"test {}\">\n", result.status.label()));
        html.push_str(&format!(
            "<h4>{} ({})</h4>\n",
            escape(&result.test_id),
            result.status.label()
        ));
        if let Some(message) = &result.message {
            html.push_str(&format!("<pre>{}</pre>\n", escape(message)));
        }
        for (slot, label) in [
            (BASELINE_IMAGE, "baseline"),
            (RESULT_IMAGE, "result"),
            (DIFF_IMAGE, "diff"),
        ] {
            html.push_str(&format!(
                "<img src=\"{}/{}\" alt=\"{} {}\">\n",
                dir, slot, escape(&result.test_id), label
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Minimal HTML escaping for text content and attribute values
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
