use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::AgentConfig;

/// Who is calling. Passed explicitly instead of read from ambient session state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CallerIdentity {
    pub user: String,
    pub roles: Vec<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentContext {
    pub user: String,
    pub current_path: String,
    pub roles: Vec<String>,
    pub user_full_name: String,
}

pub fn build_agent_context(identity: &CallerIdentity, current_path: Option<&str>) -> AgentContext {
    AgentContext {
        user: identity.user.clone(),
        current_path: current_path.filter(|p| !p.is_empty()).unwrap_or("/").to_string(),
        roles: identity.roles.clone(),
        user_full_name: identity.full_name.clone().unwrap_or_else(|| identity.user.clone()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub message: String,
    pub context: AgentContext,
    pub history: Vec<Value>,
    pub config: AgentConfig,
}

/// The agent SDK that does the planning and tool execution.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn execute(&self, req: AgentRequest) -> anyhow::Result<Value>;
}

#[derive(Clone)]
pub struct HttpAgentBackend {
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpAgentBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn execute(&self, req: AgentRequest) -> anyhow::Result<Value> {
        let url = format!("{}/execute", self.base_url.trim_end_matches('/'));
        let resp = self.client.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("agent call failed: {}", resp.status());
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[test]
    fn context_defaults_path_and_name() {
        let id = CallerIdentity { user: "jane@example.com".into(), roles: vec!["Accounts User".into()], full_name: None };
        let ctx = build_agent_context(&id, None);
        assert_eq!(ctx.current_path, "/");
        assert_eq!(ctx.user_full_name, "jane@example.com");

        let ctx = build_agent_context(&id, Some("/app/sales-invoice"));
        assert_eq!(ctx.current_path, "/app/sales-invoice");
        assert_eq!(ctx.roles, vec!["Accounts User".to_string()]);
    }

    #[tokio::test]
    async fn http_backend_posts_request_and_returns_reply() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/execute",
            post(|Json(body): Json<Value>| async move {
                Json(serde_json::json!({"success": true, "echo": body["message"], "model": body["config"]["model_name"]}))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let backend = HttpAgentBackend::new(format!("http://{}/", addr));
        let req = AgentRequest {
            message: "open customers".into(),
            context: build_agent_context(&CallerIdentity { user: "u".into(), ..Default::default() }, None),
            history: vec![],
            config: AgentConfig { api_key: "k".into(), model_name: "m".into(), temperature: 0.1, max_tokens: 10 },
        };
        let reply = backend.execute(req).await.unwrap();
        assert_eq!(reply["echo"], "open customers");
        assert_eq!(reply["model"], "m");
    }
}
