use std::fmt;

use crate::session::{Message, Role, value_text};

use super::actions::{ActionRecord, ActionStatus, SUCCESS_MARK};

/// One user request and everything the assistant did before the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationBlock {
    pub user_request: String,
    pub timestamp: Option<String>,
    pub actions: Vec<ActionRecord>,
    pub ai_response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllSucceeded,
    Partial { succeeded: usize, total: usize },
    NoneSucceeded,
}

impl Outcome {
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        if succeeded == total {
            Outcome::AllSucceeded
        } else if succeeded > 0 {
            Outcome::Partial { succeeded, total }
        } else {
            Outcome::NoneSucceeded
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AllSucceeded => write!(f, "✅ All actions completed successfully"),
            Outcome::Partial { succeeded, total } => {
                write!(f, "⚠️ {}/{} actions completed successfully", succeeded, total)
            }
            Outcome::NoneSucceeded => write!(f, "❌ No actions completed successfully"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_actions: usize,
    /// "New <doctype>" labels, first-seen order, no repeats.
    pub documents_created: Vec<String>,
    /// Distinct `doctype` argument values in first-seen order.
    pub doctypes: Vec<String>,
    pub succeeded: usize,
}

impl SessionSummary {
    pub fn outcome(&self) -> Outcome {
        Outcome::from_counts(self.succeeded, self.total_actions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub blocks: Vec<ConversationBlock>,
    pub summary: SessionSummary,
}

/// Groups a transcript into request blocks in one pass.
///
/// Assistant messages before the first user message have nowhere to attach and are dropped.
/// When several assistant messages answer one request, the last non-blank text is kept.
pub fn group_transcript(messages: &[Message]) -> Conversation {
    let mut blocks = Vec::new();
    let mut current: Option<ConversationBlock> = None;
    let mut total_actions = 0;
    let mut documents_created: Vec<String> = Vec::new();
    let mut doctypes: Vec<String> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::User => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                current = Some(ConversationBlock {
                    user_request: msg.content.clone(),
                    timestamp: msg.timestamp.clone(),
                    actions: Vec::new(),
                    ai_response: String::new(),
                });
            }
            Role::Assistant => {
                let Some(block) = current.as_mut() else { continue };
                if !msg.content.trim().is_empty() {
                    block.ai_response = msg.content.clone();
                }
                for call in &msg.tool_calls {
                    block.actions.push(ActionRecord::from_call(call));
                    total_actions += 1;

                    let doctype = call
                        .args
                        .get("doctype")
                        .map(value_text)
                        .filter(|dt| !dt.trim().is_empty());
                    if let Some(dt) = &doctype {
                        if !doctypes.contains(dt) {
                            doctypes.push(dt.clone());
                        }
                    }

                    if call.name == "create_doc" && call.result.contains(SUCCESS_MARK) {
                        let detail = format!("New {}", doctype.as_deref().unwrap_or("Document"));
                        if !documents_created.contains(&detail) {
                            documents_created.push(detail);
                        }
                    }
                }
            }
            Role::Other => {}
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }

    let succeeded = blocks
        .iter()
        .flat_map(|b| b.actions.iter())
        .filter(|a| a.status == ActionStatus::Success)
        .count();

    Conversation {
        blocks,
        summary: SessionSummary { total_actions, documents_created, doctypes, succeeded },
    }
}
