pub const STYLE: &str = r#"
@page { size: A4; margin: 20mm 15mm; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif; color: #1a1a1a; line-height: 1.6; font-size: 10pt; }
.header { border-bottom: 2px solid #333; padding-bottom: 15px; margin-bottom: 30px; }
.header h1 { margin: 0; font-size: 18pt; font-weight: 600; color: #1a1a1a; }
.header .subtitle { color: #666; font-size: 9pt; margin-top: 5px; }
.section-title { color: #8b5cf6; font-size: 14pt; font-weight: bold; margin-bottom: 15px; padding-bottom: 8px; border-bottom: 2px solid #e9d5ff; }
.conversation-block { margin-bottom: 30px; page-break-inside: avoid; }
.request-section { background: #f8f9fa; border-left: 4px solid #2563eb; padding: 15px; margin-bottom: 15px; }
.request-header { display: flex; justify-content: space-between; margin-bottom: 10px; }
.request-number { font-weight: 700; color: #2563eb; font-size: 10pt; }
.timestamp { color: #999; font-size: 8pt; }
.request-content { font-size: 10pt; color: #1a1a1a; line-height: 1.6; }
.actions-section { margin-left: 20px; margin-bottom: 15px; }
.actions-header { font-weight: 600; color: #4b5563; font-size: 9pt; margin-bottom: 10px; text-transform: uppercase; letter-spacing: 0.5px; }
.action { background: white; border: 1px solid #e5e7eb; border-left: 3px solid #9ca3af; padding: 10px 12px; margin-bottom: 8px; font-size: 9pt; }
.action.success { border-left-color: #10b981; background: #f0fdf4; }
.action.error { border-left-color: #ef4444; background: #fef2f2; }
.action.info { border-left-color: #f59e0b; background: #fffbeb; }
.action-name { font-weight: 600; color: #1a1a1a; margin-bottom: 4px; }
.action-details { color: #6b7280; font-size: 8.5pt; margin: 4px 0; font-family: 'Courier New', monospace; }
.action-result { color: #374151; font-size: 9pt; margin-top: 4px; }
.ai-response { margin-left: 20px; background: #faf8ff; border-left: 3px solid #8b5cf6; padding: 12px; font-size: 9pt; }
.response-label { font-weight: 600; color: #8b5cf6; font-size: 8.5pt; text-transform: uppercase; letter-spacing: 0.5px; margin-bottom: 6px; }
.response-text { color: #4b5563; line-height: 1.6; }
.summary-section { background: #f0fdf4; border: 2px solid #10b981; border-radius: 8px; padding: 20px; margin: 30px 0; page-break-inside: avoid; }
.summary-title { color: #10b981; font-size: 14pt; font-weight: bold; margin-bottom: 15px; padding-bottom: 10px; border-bottom: 2px solid #d1fae5; }
.summary-item { margin-bottom: 12px; }
.summary-label { font-weight: 600; color: #059669; font-size: 9.5pt; margin-bottom: 4px; }
.summary-value { color: #1f2937; font-size: 9.5pt; line-height: 1.6; }
.summary-list { list-style: none; padding-left: 0; margin: 5px 0; }
.summary-list li { padding: 4px 0; padding-left: 20px; position: relative; }
.summary-list li:before { content: "✓"; position: absolute; left: 0; color: #10b981; font-weight: bold; }
.footer { margin-top: 40px; padding-top: 15px; border-top: 1px solid #e5e7eb; text-align: center; color: #9ca3af; font-size: 8pt; }
"#;

pub struct Page<'a> {
    pub title: &'a str,
    pub generated_on: &'a str,
    pub conversation: &'a str,
    pub summary: &'a str,
    pub footer: &'a str,
}

pub fn page(p: Page<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>{style}</style>
</head>
<body>
<div class="header">
<h1>{title}</h1>
<div class="subtitle">Generated on {generated_on}</div>
</div>
<div class="section-title">💬 Full Conversation</div>
{conversation}
{summary}
<div class="footer">
<p>{footer}</p>
</div>
</body>
</html>
"#,
        style = STYLE,
        title = p.title,
        generated_on = p.generated_on,
        conversation = p.conversation,
        summary = p.summary,
        footer = p.footer,
    )
}
