//! Conversation report rendering.
//!
//! Turns a chat transcript into a single self-contained HTML document (print-ready A4, inline
//! styles) with one block per user request followed by a session summary. Rendering never
//! fails: missing or malformed fields fall back to empty output for that field.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt::Write;

use crate::session::Message;

pub mod actions;
pub mod blocks;
mod template;

use blocks::{ConversationBlock, SessionSummary, group_transcript};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportBranding {
    pub title: String,
    pub footer: String,
}

impl Default for ReportBranding {
    fn default() -> Self {
        Self {
            title: "Nutaan AI - Conversation Report".into(),
            footer: "Nutaan AI by Tecosys • Powered by RudraX One".into(),
        }
    }
}

/// Renders the transcript as of now. `render_at` pins the generation time.
pub fn render(messages: &[Message], branding: &ReportBranding) -> String {
    render_at(messages, branding, Utc::now())
}

pub fn render_at(messages: &[Message], branding: &ReportBranding, generated_at: DateTime<Utc>) -> String {
    let conv = group_transcript(messages);

    let mut conversation = String::new();
    for (idx, block) in conv.blocks.iter().enumerate() {
        render_block(&mut conversation, idx + 1, block);
    }

    let summary = render_summary(&conv.summary);
    let generated_on = format!(
        "{} at {}",
        generated_at.format("%B %d, %Y"),
        generated_at.format("%I:%M %p UTC")
    );

    template::page(template::Page {
        title: &escape_html(&branding.title),
        generated_on: &generated_on,
        conversation: &conversation,
        summary: &summary,
        footer: &escape_html(&branding.footer),
    })
}

fn render_block(out: &mut String, number: usize, block: &ConversationBlock) {
    let time = block.timestamp.as_deref().map(time_display).unwrap_or_default();
    let _ = write!(
        out,
        r#"<div class="conversation-block">
<div class="request-section">
<div class="request-header"><span class="request-number">Request #{}</span><span class="timestamp">{}</span></div>
<div class="request-content">{}</div>
</div>
"#,
        number,
        time,
        escape_html(&block.user_request)
    );

    if !block.actions.is_empty() {
        out.push_str("<div class=\"actions-section\">\n<div class=\"actions-header\">Agent Actions:</div>\n");
        for action in &block.actions {
            let _ = write!(
                out,
                "<div class=\"action {}\">\n<div class=\"action-name\">{} {}</div>\n",
                action.status.css_class(),
                action.status.glyph(),
                escape_html(&action.label)
            );
            if !action.details.is_empty() {
                let _ = writeln!(out, "<div class=\"action-details\">{}</div>", escape_html(&action.details));
            }
            let _ = write!(out, "<div class=\"action-result\">{}</div>\n</div>\n", escape_html(&action.result));
        }
        out.push_str("</div>\n");
    }

    if !block.ai_response.trim().is_empty() {
        let _ = write!(
            out,
            "<div class=\"ai-response\">\n<div class=\"response-label\">Summary:</div>\n<div class=\"response-text\">{}</div>\n</div>\n",
            escape_html(&block.ai_response)
        );
    }

    out.push_str("</div>\n");
}

fn render_summary(summary: &SessionSummary) -> String {
    if summary.total_actions == 0 {
        return String::new();
    }

    let documents = if summary.documents_created.is_empty() {
        "<div class=\"summary-value\">No documents created</div>".to_string()
    } else {
        let items: String = summary
            .documents_created
            .iter()
            .map(|d| format!("<li>{}</li>", escape_html(d)))
            .collect();
        format!("<ul class=\"summary-list\">{}</ul>", items)
    };

    let doctypes = if summary.doctypes.is_empty() {
        "N/A".to_string()
    } else {
        escape_html(&summary.doctypes.join(", "))
    };

    format!(
        r#"<div class="summary-section">
<div class="summary-title">📊 Session Summary</div>
<div class="summary-item"><div class="summary-label">Total Actions Performed:</div><div class="summary-value">{} actions</div></div>
<div class="summary-item"><div class="summary-label">Documents Created:</div>{}</div>
<div class="summary-item"><div class="summary-label">DocTypes Accessed:</div><div class="summary-value">{}</div></div>
<div class="summary-item"><div class="summary-label">Overall Outcome:</div><div class="summary-value">{}</div></div>
</div>
"#,
        summary.total_actions,
        documents,
        doctypes,
        summary.outcome()
    )
}

/// Escapes markup characters and turns newlines into `<br>`.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

/// Clock time (`03:04 PM`) of an ISO-8601 timestamp, or empty if it does not parse.
pub fn time_display(timestamp: &str) -> String {
    let ts = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.format("%I:%M %p").to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, fmt) {
            return dt.format("%I:%M %p").to_string();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(ts, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.format("%I:%M %p").to_string()).unwrap_or_default();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 0).unwrap()
    }

    fn invoice_transcript() -> Vec<Message> {
        vec![
            Message::user("Create invoice"),
            Message::assistant(
                "",
                vec![ToolCall {
                    name: "create_doc".into(),
                    args: json!({"doctype": "Invoice"}).as_object().cloned().unwrap(),
                    result: "✅ Created".into(),
                }],
            ),
        ]
    }

    #[test]
    fn invoice_example_renders_block_and_summary() {
        let html = render_at(&invoice_transcript(), &ReportBranding::default(), fixed_time());
        assert_eq!(html.matches("class=\"conversation-block\"").count(), 1);
        assert!(html.contains("Request #1"));
        assert!(html.contains("<div class=\"action success\">"));
        assert!(html.contains("✅ Create Document"));
        assert!(html.contains("DocType: Invoice"));
        assert!(html.contains("1 actions"));
        assert!(html.contains("<li>New Invoice</li>"));
        assert!(html.contains("<div class=\"summary-value\">Invoice</div>"));
        assert!(html.contains("✅ All actions completed successfully"));
        assert!(html.contains("Generated on May 01, 2024 at 02:05 PM UTC"));
        assert!(html.contains("Nutaan AI by Tecosys"));
    }

    #[test]
    fn no_actions_means_no_summary() {
        let messages = vec![Message::user("hi"), Message::assistant("hello there", vec![])];
        let html = render_at(&messages, &ReportBranding::default(), fixed_time());
        assert!(!html.contains("summary-section\">"));
        assert!(!html.contains("Session Summary"));
        assert!(html.contains("hello there"));
    }

    #[test]
    fn assistant_only_transcript_has_no_blocks() {
        let messages = vec![Message::assistant("Welcome!", vec![])];
        let html = render(&messages, &ReportBranding::default());
        assert!(!html.contains("class=\"conversation-block\""));
        assert!(!html.contains("Session Summary"));
        assert!(!html.contains("Welcome!"));
    }

    #[test]
    fn escapes_markup_and_newlines() {
        let escaped = escape_html("<script>&\"'\nnext");
        assert!(escaped.starts_with("&lt;script&gt;&amp;&"));
        assert!(!escaped.contains('\''));
        assert!(!escaped.contains('"'));
        assert!(escaped.ends_with("<br>next"));

        let messages = vec![Message::user("<script>alert('x')</script>")];
        let html = render(&messages, &ReportBranding::default());
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert("));
    }

    #[test]
    fn time_display_tolerates_bad_input() {
        assert_eq!(time_display("2024-05-01T15:30:00"), "03:30 PM");
        assert_eq!(time_display("2024-05-01T09:05:00.123Z"), "09:05 AM");
        assert_eq!(time_display("yesterday"), "");
        assert_eq!(time_display(""), "");
    }

    #[test]
    fn render_applies_site_branding() {
        let branding = ReportBranding { title: "Acme & Co Report".into(), footer: "Acme ops".into() };
        let html = render(&[Message::user("hello")], &branding);
        assert!(html.contains("Acme &amp; Co Report"));
        assert!(html.contains("Acme ops"));
        assert!(!html.contains("Nutaan AI by Tecosys"));
    }

    #[test]
    fn malformed_timestamp_still_renders_block() {
        let mut first = Message::user("hello");
        first.timestamp = Some("not-a-time".into());
        let html = render(&[first], &ReportBranding::default());
        assert!(html.contains("<span class=\"timestamp\"></span>"));
    }
}
