use axum::extract::{FromRequestParts, Path, State};
use axum::http::{header, request::Parts};
use axum::response::{IntoResponse, Response};
use axum::{routing::{get, post}, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info};
use uuid::Uuid;

use crate::agent::{build_agent_context, AgentBackend, AgentRequest, CallerIdentity};
use crate::cleanup;
use crate::error::{AppError, Result};
use crate::pdf::{generate_session_pdf, PdfRenderer};
use crate::session::{short_id, SessionExport};
use crate::settings::{resolve_agent_config, RequestOverrides, SiteConfig};
use crate::sharing::{self, EmailSummary};
use crate::storage::ArtifactRepository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ArtifactRepository>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub agent: Option<Arc<dyn AgentBackend>>,
    pub site: Arc<SiteConfig>,
    pub metrics: Option<PrometheusHandle>,
}

const USER_HEADER: &str = "x-user-id";
const ROLES_HEADER: &str = "x-user-roles";
const FULL_NAME_HEADER: &str = "x-user-full-name";

#[async_trait::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let user = header(USER_HEADER).ok_or(AppError::Unauthorized)?;
        if user.eq_ignore_ascii_case("guest") {
            return Err(AppError::Unauthorized);
        }
        let roles = header(ROLES_HEADER)
            .map(|r| r.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Ok(CallerIdentity { user, roles, full_name: header(FULL_NAME_HEADER) })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "currentPath")]
    pub current_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentStreamBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: RequestContext,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub overrides: RequestOverrides,
}

async fn agent_stream(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Json(body): Json<AgentStreamBody>,
) -> Result<Json<Value>> {
    let agent = state.agent.clone().ok_or_else(|| {
        AppError::Unavailable("AI Agent SDK not configured. Set agent_sdk_url in site_config.json".into())
    })?;
    let Some(config) = resolve_agent_config(&state.site, &body.overrides) else {
        return Ok(Json(json!({
            "error": "Gemini API key not configured in site_config.json",
            "success": false
        })));
    };

    let req = AgentRequest {
        message: body.message,
        context: build_agent_context(&identity, body.context.current_path.as_deref()),
        history: body.history,
        config,
    };
    match agent.execute(req).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            error!(user = %identity.user, error = %e, "AI Agent Error");
            Ok(Json(json!({ "error": e.to_string(), "success": false })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    pub session_data: Value,
}

fn parse_export(raw: Value) -> Result<SessionExport> {
    SessionExport::from_value(raw).map_err(|e| AppError::BadRequest(format!("invalid session_data: {}", e)))
}

async fn render_session_pdf(state: &AppState, export: SessionExport) -> Result<Vec<u8>> {
    let renderer = state.renderer.clone();
    let branding = state.site.branding();
    let session_id = export.session_id.clone();
    let rendered = tokio::task::spawn_blocking(move || generate_session_pdf(renderer.as_ref(), &branding, &export))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("report rendering aborted: {}", e)))?;
    rendered.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Error exporting PDF");
        AppError::from(e)
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub temp_key: String,
    pub session_id: String,
}

async fn export_session_pdf(
    State(state): State<AppState>,
    _identity: CallerIdentity,
    Json(body): Json<SessionBody>,
) -> Result<Json<ExportResponse>> {
    let export = parse_export(body.session_data)?;
    let session_id = export.session_id.clone();
    let pdf = render_session_pdf(&state, export).await?;

    let temp_key = Uuid::new_v4().simple().to_string();
    state.repo.put_cached_pdf(&temp_key, &session_id, &pdf).await?;
    info!(session_id = %session_id, bytes = pdf.len(), "session pdf cached");
    Ok(Json(ExportResponse { success: true, temp_key, session_id }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    #[serde(default)]
    pub session_id: String,
    pub temp_key: Option<String>,
}

async fn download_session_pdf(
    State(state): State<AppState>,
    _identity: CallerIdentity,
    Json(body): Json<DownloadBody>,
) -> Result<Response> {
    if let Some(key) = body.temp_key.as_deref().filter(|k| !k.is_empty()) {
        if let Some(pdf) = state.repo.get_cached_pdf(key).await? {
            let filename = format!("Nutaan_AI_Report_{}.pdf", short_id(&body.session_id));
            return Ok(pdf_response(pdf, &filename, true));
        }
    }
    Err(AppError::NotFound("PDF not found. Please try exporting again.".into()))
}

fn pdf_response(pdf: Vec<u8>, filename: &str, attachment: bool) -> Response {
    let disposition = if attachment { "attachment" } else { "inline" };
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("{}; filename=\"{}\"", disposition, filename)),
        ],
        pdf,
    )
        .into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WhatsAppResponse {
    pub success: bool,
    pub whatsapp_url: String,
    pub pdf_url: String,
}

async fn share_session_whatsapp(
    State(state): State<AppState>,
    _identity: CallerIdentity,
    Json(body): Json<SessionBody>,
) -> Result<Json<WhatsAppResponse>> {
    let export = parse_export(body.session_data)?;
    let session_id = export.session_id.clone();
    let pdf = render_session_pdf(&state, export).await?;

    let file_name = state.repo.save_report_file(&session_id, &pdf).await?;
    let pdf_url = format!("{}/files/{}", state.site.public_base_url(), file_name);
    let whatsapp_url = sharing::whatsapp_share_url(&session_id, &pdf_url);
    metrics::counter!("share_requests_total", "channel" => "whatsapp").increment(1);
    info!(session_id = %session_id, file = %file_name, "whatsapp share link created");
    Ok(Json(WhatsAppResponse { success: true, whatsapp_url, pdf_url }))
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub session_data: Value,
    #[serde(default)]
    pub to_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailResponse {
    pub success: bool,
    pub message: String,
}

async fn share_session_email(
    State(state): State<AppState>,
    _identity: CallerIdentity,
    Json(body): Json<EmailBody>,
) -> Result<Json<EmailResponse>> {
    let to = body.to_email.trim().to_string();
    if to.is_empty() {
        return Err(AppError::BadRequest("to_email is required".into()));
    }
    let export = parse_export(body.session_data)?;
    let summary = EmailSummary::from_export(&export);
    let pdf = render_session_pdf(&state, export).await?;
    state.repo.save_report_file(&summary.session_id, &pdf).await?;

    let from = state.site.mail_from.clone().unwrap_or_else(|| "noreply@localhost".into());
    let success = sharing::share_via_email(state.repo.as_ref(), &from, &to, &summary, pdf).await;
    metrics::counter!("share_requests_total", "channel" => "email").increment(1);
    let message = if success { "Email queued for sending" } else { "Failed to queue email" };
    Ok(Json(EmailResponse { success, message: message.into() }))
}

async fn public_file(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response> {
    match state.repo.get_public_file(&name).await? {
        Some(pdf) => Ok(pdf_response(pdf, &name, false)),
        None => Err(AppError::NotFound("File not found".into())),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|h| h.render())
        .ok_or_else(|| AppError::NotFound("metrics exporter not installed".into()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/agent/stream", post(agent_stream))
        .route("/v1/sessions/export", post(export_session_pdf))
        .route("/v1/sessions/download", post(download_session_pdf))
        .route("/v1/sessions/share/whatsapp", post(share_session_whatsapp))
        .route("/v1/sessions/share/email", post(share_session_email))
        .route("/files/:name", get(public_file))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let ttl = state.site.link_ttl();
    tokio::spawn(cleanup::run_periodic(state.repo.clone(), ttl, std::time::Duration::from_secs(3600)));

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
