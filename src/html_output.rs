//! HTML output format for hook reports
//!
//! Renders a standalone page with a styled table. A user template may wrap
//! the table: it must contain the `{{rows}}` placeholder, and may use
//! `{{title}}` and `{{summary}}`. A missing template aborts rendering.

use crate::report::ReportRow;
use crate::stats::HookStatsTracker;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder replaced by the table rows in a user template
pub const ROWS_PLACEHOLDER: &str = "{{rows}}";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Failed to read template {}: {source}", .path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {} has no {{{{rows}}}} placeholder", .0.display())]
    MissingPlaceholder(PathBuf),
}

/// HTML output formatter
#[derive(Debug)]
pub struct HtmlOutput {
    rows: Vec<ReportRow>,
    template: Option<(PathBuf, String)>,
}

impl HtmlOutput {
    pub fn new(rows: Vec<ReportRow>) -> Self {
        Self {
            rows,
            template: None,
        }
    }

    /// Load a user template; fails if the file is absent or unusable
    pub fn with_template_file(mut self, path: &Path) -> Result<Self, RenderError> {
        if !path.exists() {
            return Err(RenderError::TemplateNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        if !contents.contains(ROWS_PLACEHOLDER) {
            return Err(RenderError::MissingPlaceholder(path.to_path_buf()));
        }
        self.template = Some((path.to_path_buf(), contents));
        Ok(self)
    }

    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .hook {
            font-family: monospace;
            font-weight: bold;
        }
        .slow-hook td {
            background-color: #fde2e2;
            color: #a40000;
        }
        .caller {
            font-size: 0.85em;
            color: #666;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn format_row(row: &ReportRow) -> String {
        let class = if row.is_slow { "slow-hook" } else { "" };
        format!(
            r#"<tr class="{}"><td class="hook">{}</td><td>{}</td><td>{}</td><td class="caller">{}</td></tr>"#,
            class,
            Self::escape_html(&row.hook),
            Self::escape_html(&row.kind),
            Self::escape_html(&row.formatted_ms()),
            Self::escape_html(&row.caller)
        )
    }

    fn render_rows(&self) -> String {
        let mut html = String::new();
        html.push_str("<table>\n");
        html.push_str("<tr><th>Hook Name</th><th>Type</th><th>Execution Time</th><th>Caller</th></tr>\n");
        for row in &self.rows {
            html.push_str(&Self::format_row(row));
            html.push('\n');
        }
        html.push_str("</table>\n");
        html
    }

    fn summary_line(&self) -> String {
        let slow = self.rows.iter().filter(|r| r.is_slow).count();
        format!("{} hook invocations, {} slow", self.rows.len(), slow)
    }

    /// Generate the HTML document
    pub fn to_html(&self, stats: Option<&HookStatsTracker>) -> String {
        let mut table = self.render_rows();
        if let Some(tracker) = stats {
            table.push_str(&Self::render_statistics(tracker));
        }

        if let Some((_, template)) = &self.template {
            return template
                .replace("{{title}}", "Hooks Log")
                .replace("{{summary}}", &Self::escape_html(&self.summary_line()))
                .replace(ROWS_PLACEHOLDER, &table);
        }

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");
        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str("    <title>Hooks Log</title>\n");
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");
        html.push_str("<body>\n");
        html.push_str("    <h1>Hooks Log</h1>\n");
        html.push_str(&format!("    <p>{}</p>\n", Self::escape_html(&self.summary_line())));
        html.push_str(&table);
        html.push_str("    <div class=\"footer\">Generated by hookmon</div>\n");
        html.push_str("</body>\n");
        html.push_str("</html>\n");
        html
    }

    fn render_statistics(tracker: &HookStatsTracker) -> String {
        let mut html = String::new();
        html.push_str("<h2>Per-Hook Summary</h2>\n");
        html.push_str("<table class=\"stats-table\">\n");
        html.push_str("<tr><th>Hook</th><th>Type</th><th>Calls</th><th>Total ms</th><th>Max ms</th><th>Slow</th></tr>\n");
        for (name, kind, stats) in tracker.sorted() {
            html.push_str(&format!(
                "<tr><td class=\"hook\">{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>\n",
                Self::escape_html(name),
                kind,
                stats.calls,
                stats.total_seconds * 1000.0,
                stats.max_seconds * 1000.0,
                stats.slow_calls
            ));
        }
        html.push_str("</table>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(hook: &str, ms: f64, slow: bool) -> ReportRow {
        ReportRow {
            hook: hook.to_string(),
            kind: "action".to_string(),
            display_ms: ms,
            is_slow: slow,
            caller: "Theme::render in theme.rs (line 3)".to_string(),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(HtmlOutput::escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(HtmlOutput::escape_html("a&b"), "a&amp;b");
        assert_eq!(HtmlOutput::escape_html("'test'"), "&#39;test&#39;");
    }

    #[test]
    fn test_basic_structure() {
        let html = HtmlOutput::new(vec![row("init", 1.5, false)]).to_html(None);
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<td class=\"hook\">init</td>"));
        assert!(html.contains("1.50 ms"));
    }

    #[test]
    fn test_slow_rows_get_class() {
        let html = HtmlOutput::new(vec![row("wp_loaded", 150.0, true)]).to_html(None);
        assert!(html.contains("<tr class=\"slow-hook\">"));
        assert!(html.contains("1 hook invocations, 1 slow"));
    }

    #[test]
    fn test_hook_names_escaped() {
        let html = HtmlOutput::new(vec![row("<script>alert('x')</script>", 0.0, false)]).to_html(None);
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_missing_template_is_reported_with_path() {
        let path = Path::new("/definitely/not/here/admin-page.html");
        let err = HtmlOutput::new(Vec::new()).with_template_file(path).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
        assert!(err.to_string().contains("admin-page.html"));
    }

    #[test]
    fn test_template_substitution() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<main><h1>{{{{title}}}}</h1><p>{{{{summary}}}}</p>{{{{rows}}}}</main>").unwrap();

        let html = HtmlOutput::new(vec![row("init", 2.0, false)])
            .with_template_file(file.path())
            .unwrap()
            .to_html(None);
        assert!(html.starts_with("<main><h1>Hooks Log</h1>"));
        assert!(html.contains("1 hook invocations, 0 slow"));
        assert!(html.contains("<td class=\"hook\">init</td>"));
        assert!(!html.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<main>nothing here</main>").unwrap();
        let err = HtmlOutput::new(Vec::new())
            .with_template_file(file.path())
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingPlaceholder(_)));
    }
}
