use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolCall {
    #[serde(default = "unknown_tool")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_args")]
    pub args: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
    #[serde(rename = "toolCalls", default, deserialize_with = "lenient_tool_calls")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), ..Default::default() }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_calls, timestamp: None }
    }
}

/// Payload the widget posts when exporting or sharing a session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionExport {
    #[serde(default = "unknown_session")]
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_actions: u64,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub initial_message: Option<String>,
}

impl SessionExport {
    /// Accepts either a JSON object or a JSON string holding one.
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::String(raw) => Ok(serde_json::from_str(&raw)?),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

pub fn short_id(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}

/// Renders a JSON value the way it is shown to people: strings verbatim, null as empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unknown_tool() -> String { "Unknown".into() }

fn unknown_session() -> String { "unknown".into() }

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(value_text(&v))
}

fn lenient_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    let s = value_text(&v);
    Ok(if s.is_empty() { None } else { Some(s) })
}

/// A missing role means `user`; anything present but unrecognised, null included, is ignored.
fn lenient_role<'de, D: Deserializer<'de>>(d: D) -> Result<Role, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => match s.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        },
        _ => Role::Other,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_args<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
    match Value::deserialize(d)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn lenient_tool_calls<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ToolCall>, D::Error> {
    let v = Value::deserialize(d)?;
    match v {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_widget_payload_with_loose_fields() {
        let raw = json!({
            "session_id": "abcdef123456",
            "messages": [
                {"role": "user", "content": "Create invoice", "timestamp": "2024-05-01T10:30:00"},
                {"role": "assistant", "content": null, "toolCalls": [
                    {"name": "create_doc", "args": {"doctype": "Invoice"}, "result": "✅ Created"},
                    {"args": null, "result": 42}
                ]},
                {"role": "system", "content": "ignored"},
                {"content": "no role"}
            ]
        });
        let export = SessionExport::from_value(raw).unwrap();
        assert_eq!(export.session_id, "abcdef123456");
        assert_eq!(export.messages.len(), 4);
        let calls = &export.messages[1].tool_calls;
        assert_eq!(export.messages[1].content, "");
        assert_eq!(calls[0].args.get("doctype").unwrap(), "Invoice");
        assert_eq!(calls[1].name, "Unknown");
        assert!(calls[1].args.is_empty());
        assert_eq!(calls[1].result, "42");
        assert_eq!(export.messages[2].role, Role::Other);
        assert_eq!(export.messages[3].role, Role::User);
    }

    #[test]
    fn null_role_and_null_counts_do_not_reject_the_payload() {
        let raw = json!({
            "session_id": "s-null",
            "total_actions": null,
            "messages": [
                {"role": "user", "content": "Show stock levels"},
                {"role": null, "content": "stray"},
                {"role": 7, "content": "also stray"},
                {"role": "assistant", "content": "Here they are"}
            ]
        });
        let export = SessionExport::from_value(raw).unwrap();
        assert_eq!(export.total_actions, 0);
        let roles: Vec<Role> = export.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Other, Role::Other, Role::Assistant]);

        let counted = SessionExport::from_value(json!({"total_actions": "3"})).unwrap();
        assert_eq!(counted.total_actions, 3);
    }

    #[test]
    fn accepts_stringified_payload() {
        let raw = Value::String(r#"{"messages": []}"#.into());
        let export = SessionExport::from_value(raw).unwrap();
        assert_eq!(export.session_id, "unknown");
        assert!(export.messages.is_empty());
    }

    #[test]
    fn short_id_is_char_safe() {
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("äöü"), "äöü");
    }
}
