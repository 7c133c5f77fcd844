use serde_json::{Map, Value};

use crate::session::{ToolCall, value_text};

pub const SUCCESS_MARK: &str = "✅";
pub const FAILURE_MARK: &str = "❌";
const INFO_MARK: &str = "⚡";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Success,
    Error,
    Info,
}

impl ActionStatus {
    pub fn classify(result: &str) -> Self {
        if result.contains(SUCCESS_MARK) {
            ActionStatus::Success
        } else if result.contains(FAILURE_MARK) {
            ActionStatus::Error
        } else {
            ActionStatus::Info
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
            ActionStatus::Info => "info",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            ActionStatus::Success => SUCCESS_MARK,
            ActionStatus::Error => FAILURE_MARK,
            ActionStatus::Info => INFO_MARK,
        }
    }
}

/// A tool call prepared for display. Strings are raw; escaping happens at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub label: String,
    pub details: String,
    pub result: String,
    pub status: ActionStatus,
}

impl ActionRecord {
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            label: tool_label(&call.name),
            details: action_details(&call.name, &call.args),
            result: call.result.clone(),
            status: ActionStatus::classify(&call.result),
        }
    }
}

pub fn tool_label(name: &str) -> String {
    match name {
        "navigate" => "Navigate".into(),
        "create_doc" => "Create Document".into(),
        "set_field" => "Set Field".into(),
        "set_table_field" => "Set Table Field".into(),
        "click_button" => "Click Button".into(),
        "analyze_screen" => "Analyze Screen".into(),
        other => title_case(&other.replace('_', " ")),
    }
}

pub fn action_details(name: &str, args: &Map<String, Value>) -> String {
    if args.is_empty() {
        return String::new();
    }
    let arg = |key: &str| args.get(key).map(value_text).unwrap_or_default();
    match name {
        "navigate" => {
            let doctype = arg("doctype");
            let doc_name = arg("name");
            if doc_name.is_empty() {
                format!("DocType: {}", doctype)
            } else {
                format!("DocType: {}, Name: {}", doctype, doc_name)
            }
        }
        "create_doc" => format!("DocType: {}", arg("doctype")),
        "set_field" => {
            let value = args.get("value").map(|v| clip_value(v, 40)).unwrap_or_default();
            format!("Field: {}, Value: {}", arg("field"), value)
        }
        "set_table_field" => {
            let value = args.get("value").map(|v| clip_value(v, 30)).unwrap_or_default();
            format!(
                "Table: {}, Row: {}, Field: {}, Value: {}",
                arg("table"),
                arg("row"),
                arg("field"),
                value
            )
        }
        "click_button" => format!("Button: {}", arg("button_text")),
        _ => args
            .iter()
            .take(3)
            .map(|(key, value)| format!("{}: {}", key, clip_value(value, 30)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Only string values are clipped; longer than `max` chars keeps `max - 3` plus "...".
fn clip_value(value: &Value, max: usize) -> String {
    match value {
        Value::String(s) if s.chars().count() > max => {
            let head: String = s.chars().take(max - 3).collect();
            format!("{}...", head)
        }
        other => value_text(other),
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn status_prefers_success_mark() {
        assert_eq!(ActionStatus::classify("✅ Created"), ActionStatus::Success);
        assert_eq!(ActionStatus::classify("❌ Failed"), ActionStatus::Error);
        assert_eq!(ActionStatus::classify("✅ saved, ❌ warning"), ActionStatus::Success);
        assert_eq!(ActionStatus::classify("Screen analyzed"), ActionStatus::Info);
    }

    #[test]
    fn labels_from_table_and_fallback() {
        assert_eq!(tool_label("create_doc"), "Create Document");
        assert_eq!(tool_label("get_list"), "Get List");
        assert_eq!(tool_label("run_REPORT_now"), "Run Report Now");
    }

    #[test]
    fn navigate_details_with_optional_name() {
        assert_eq!(action_details("navigate", &args(json!({"doctype": "Customer"}))), "DocType: Customer");
        assert_eq!(
            action_details("navigate", &args(json!({"doctype": "Customer", "name": "CUST-001"}))),
            "DocType: Customer, Name: CUST-001"
        );
    }

    #[test]
    fn set_field_clips_long_values_at_forty() {
        let long = "a".repeat(45);
        let details = action_details("set_field", &args(json!({"field": "notes", "value": long})));
        assert_eq!(details, format!("Field: notes, Value: {}...", "a".repeat(37)));

        let exact = "b".repeat(40);
        let details = action_details("set_field", &args(json!({"field": "notes", "value": exact.clone()})));
        assert_eq!(details, format!("Field: notes, Value: {}", exact));

        let number = action_details("set_field", &args(json!({"field": "qty", "value": 12})));
        assert_eq!(number, "Field: qty, Value: 12");
    }

    #[test]
    fn set_table_field_clips_at_thirty() {
        let details = action_details(
            "set_table_field",
            &args(json!({"table": "items", "row": 1, "field": "description", "value": "x".repeat(31)})),
        );
        assert_eq!(details, format!("Table: items, Row: 1, Field: description, Value: {}...", "x".repeat(27)));
    }

    #[test]
    fn generic_details_show_first_three_pairs() {
        let details = action_details(
            "search",
            &args(json!({"query": "q".repeat(35), "limit": 5, "order": "desc", "extra": "dropped"})),
        );
        assert_eq!(details, format!("query: {}..., limit: 5, order: desc", "q".repeat(27)));
    }

    #[test]
    fn empty_args_give_no_details() {
        assert_eq!(action_details("navigate", &Map::new()), "");
        assert_eq!(action_details("click_button", &args(json!({"button_text": "Save"}))), "Button: Save");
    }
}
