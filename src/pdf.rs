use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::report::{self, ReportBranding};
use crate::session::SessionExport;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start pdf renderer `{binary}`: {source}")]
    Spawn { binary: String, source: std::io::Error },
    #[error("pdf renderer io: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("pdf renderer produced no output")]
    Empty,
}

/// Converts finished markup into a paginated PDF. Blocking; callers on an async runtime
/// should run it on a blocking thread.
pub trait PdfRenderer: Send + Sync {
    fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone)]
pub struct WkHtmlToPdf {
    pub binary: String,
}

impl Default for WkHtmlToPdf {
    fn default() -> Self {
        Self { binary: "wkhtmltopdf".into() }
    }
}

impl PdfRenderer for WkHtmlToPdf {
    fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let mut child = Command::new(&self.binary)
            .args(["--quiet", "--encoding", "utf-8", "--page-size", "A4", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Spawn { binary: self.binary.clone(), source })?;

        let written = match child.stdin.take() {
            // stdin is dropped at the end of the arm so the renderer sees EOF
            Some(mut stdin) => stdin.write_all(html.as_bytes()),
            None => Ok(()),
        };
        // reap the child even when it stopped reading early
        let output = child.wait_with_output()?;
        if let Err(e) = written {
            if output.status.success() {
                return Err(RenderError::Io(e));
            }
            debug!(error = %e, "pdf renderer closed stdin early");
        }
        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Empty);
        }
        debug!(bytes = output.stdout.len(), "pdf rendered");
        Ok(output.stdout)
    }
}

pub fn generate_session_pdf(
    renderer: &dyn PdfRenderer,
    branding: &ReportBranding,
    export: &SessionExport,
) -> Result<Vec<u8>, RenderError> {
    let html = report::render(&export.messages, branding);
    metrics::counter!("reports_rendered_total").increment(1);
    renderer.render_pdf(&html).inspect_err(|_| {
        metrics::counter!("pdf_render_failures_total").increment(1);
    })
}
