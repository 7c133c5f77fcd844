//! Share messages for finished reports: WhatsApp deep links and queued email with the PDF attached.

use chrono::{DateTime, NaiveDateTime, Utc};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::Message;
use thiserror::Error;
use tracing::{error, info};

use crate::report::escape_html;
use crate::session::{SessionExport, short_id};
use crate::storage::ArtifactRepository;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("failed to build email: {0}")]
    Build(String),
}

pub fn whatsapp_share_url(session_id: &str, pdf_url: &str) -> String {
    let text = format!(
        "Hi! Here's my Nutaan AI session report.\n\nSession ID: {}\n\nView Report: {}\n\nPowered by RudraX One - AI Agent for ERPNext",
        session_id, pdf_url
    );
    format!("https://wa.me/?text={}", urlencoding::encode(&text))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailSummary {
    pub session_id: String,
    pub total_actions: u64,
    pub duration_seconds: u64,
    pub initial_message: String,
}

impl EmailSummary {
    pub fn from_export(export: &SessionExport) -> Self {
        Self {
            session_id: export.session_id.clone(),
            total_actions: export.total_actions,
            duration_seconds: session_duration_seconds(export.start_time.as_deref(), export.end_time.as_deref()),
            initial_message: export.initial_message.clone().unwrap_or_else(|| "N/A".into()),
        }
    }
}

fn parse_instant(ts: &str) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

pub fn session_duration_seconds(start: Option<&str>, end: Option<&str>) -> u64 {
    let (Some(start), Some(end)) = (start.and_then(parse_instant), end.and_then(parse_instant)) else {
        return 0;
    };
    (end - start).num_seconds().max(0) as u64
}

pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 { format!("{}m {}s", minutes, secs) } else { format!("{}s", secs) }
}

pub fn email_subject(session_id: &str) -> String {
    format!("Nutaan AI Session Report - {}", short_id(session_id))
}

pub fn attachment_name(session_id: &str) -> String {
    format!("AI_Session_Report_{}.pdf", short_id(session_id))
}

pub fn email_body(summary: &EmailSummary, generated_at: DateTime<Utc>) -> String {
    format!(
        r#"<html>
<head>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
.container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background: linear-gradient(135deg, #8b5cf6 0%, #a78bfa 100%); color: white; padding: 30px; text-align: center; border-radius: 8px 8px 0 0; }}
.header h1 {{ margin: 0; font-size: 24px; }}
.content {{ background: #f8f4ff; padding: 30px; }}
.summary {{ background: white; padding: 20px; border-radius: 8px; margin-bottom: 20px; }}
.summary-item {{ margin: 10px 0; }}
.summary-label {{ font-weight: bold; color: #8b5cf6; }}
.footer {{ text-align: center; padding: 20px; color: #666; font-size: 12px; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h1>🤖 Nutaan AI Session Report</h1><p>Powered by RudraX One</p></div>
<div class="content">
<div class="summary">
<h2 style="color: #8b5cf6; margin-top: 0;">Session Summary</h2>
<div class="summary-item"><span class="summary-label">Session ID:</span> {session_id}</div>
<div class="summary-item"><span class="summary-label">Initial Request:</span> {initial}</div>
<div class="summary-item"><span class="summary-label">Actions Performed:</span> {actions}</div>
<div class="summary-item"><span class="summary-label">Duration:</span> {duration}</div>
</div>
<p>Your AI agent session report is attached to this email. The report contains:</p>
<ul>
<li>Complete action log with timestamps</li>
<li>Documents created and modified</li>
<li>Detailed execution summary</li>
</ul>
<p style="color: #666; text-align: center;">View the attached PDF for the complete report</p>
</div>
<div class="footer">
<p><strong>Nutaan AI</strong> - Intelligent Automation for ERPNext</p>
<p>Generated on {generated}</p>
</div>
</div>
</body>
</html>
"#,
        session_id = escape_html(&summary.session_id),
        initial = escape_html(&summary.initial_message),
        actions = summary.total_actions,
        duration = format_duration(summary.duration_seconds),
        generated = generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

pub fn compose_session_email(
    from: &str,
    to: &str,
    summary: &EmailSummary,
    pdf: Vec<u8>,
    generated_at: DateTime<Utc>,
) -> Result<Message, ShareError> {
    let from: Mailbox = from.parse().map_err(|e| ShareError::InvalidAddress(format!("From '{}': {}", from, e)))?;
    let to: Mailbox = to.parse().map_err(|e| ShareError::InvalidAddress(format!("To '{}': {}", to, e)))?;
    let pdf_type = ContentType::parse("application/pdf").map_err(|e| ShareError::Build(e.to_string()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email_subject(&summary.session_id))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(email_body(summary, generated_at)))
                .singlepart(Attachment::new(attachment_name(&summary.session_id)).body(pdf, pdf_type)),
        )
        .map_err(|e| ShareError::Build(e.to_string()))
}

/// Composes and queues the report email. Failures are logged and reported as `false`.
pub async fn share_via_email(
    repo: &dyn ArtifactRepository,
    from: &str,
    to: &str,
    summary: &EmailSummary,
    pdf: Vec<u8>,
) -> bool {
    let message = match compose_session_email(from, to, summary, pdf, Utc::now()) {
        Ok(m) => m,
        Err(e) => {
            error!(session_id = %summary.session_id, error = %e, "failed to compose report email");
            return false;
        }
    };
    let subject = email_subject(&summary.session_id);
    match repo.queue_mail(&[to.to_string()], &subject, &message.formatted()).await {
        Ok(id) => {
            info!(session_id = %summary.session_id, mail_id = %id, "report email queued");
            true
        }
        Err(e) => {
            error!(session_id = %summary.session_id, error = %e, "failed to queue report email");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary() -> EmailSummary {
        EmailSummary {
            session_id: "abcdef0123456789".into(),
            total_actions: 4,
            duration_seconds: 125,
            initial_message: "Create <b>invoice</b>".into(),
        }
    }

    #[test]
    fn whatsapp_url_encodes_message() {
        let url = whatsapp_share_url("sess-1", "https://erp.example.com/files/a.pdf");
        assert!(url.starts_with("https://wa.me/?text="));
        assert!(!url.contains('\n'));
        assert!(url.contains("Session%20ID%3A%20sess-1"));
        assert!(!url.contains('+'));
        let parsed = url::Url::parse(&url).unwrap();
        let text = parsed.query_pairs().find(|(k, _)| k == "text").unwrap().1.into_owned();
        assert!(text.contains("Session ID: sess-1"));
        assert!(text.contains("View Report: https://erp.example.com/files/a.pdf"));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(session_duration_seconds(Some("2024-05-01T10:00:00"), Some("2024-05-01T10:02:05")), 125);
        assert_eq!(session_duration_seconds(Some("2024-05-01T10:00:00Z"), Some("2024-05-01T10:00:30.500Z")), 30);
        assert_eq!(session_duration_seconds(Some("later"), Some("2024-05-01T10:00:00")), 0);
        assert_eq!(session_duration_seconds(None, Some("2024-05-01T10:00:00")), 0);
        assert_eq!(session_duration_seconds(Some("2024-05-01T10:05:00"), Some("2024-05-01T10:00:00")), 0);
    }

    #[test]
    fn email_has_subject_body_and_attachment() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let msg = compose_session_email("bot@example.com", "user@example.com", &summary(), b"%PDF".to_vec(), at).unwrap();
        let raw = String::from_utf8_lossy(&msg.formatted()).to_string();
        assert!(raw.contains("Subject: Nutaan AI Session Report - abcdef01"));
        assert!(raw.contains("AI_Session_Report_abcdef01.pdf"));
        assert!(raw.contains("application/pdf"));

        let body = email_body(&summary(), at);
        assert!(body.contains("Create &lt;b&gt;invoice&lt;/b&gt;"));
        assert!(body.contains("2m 5s"));
        assert!(body.contains("Generated on 2024-05-01 12:00:00 UTC"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let err = compose_session_email("bot@example.com", "not an address", &summary(), vec![], Utc::now()).unwrap_err();
        assert!(matches!(err, ShareError::InvalidAddress(_)));
    }
}
