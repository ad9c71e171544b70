use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::VarValue;

/// One normalized inbound turn, already adapted by the transport layer
/// (conversation id derived from channel + sender, flow id resolved).
#[derive(Debug, Clone, JsonSchema, Serialize, Deserialize)]
pub struct TurnRequest {
    conversation_id: String,
    flow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_input: Option<String>,
    /// Seed variables merged into the working variables before dispatch
    /// (seed wins on key collision). Typically channel metadata such as the
    /// sender's profile name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    seed_variables: HashMap<String, VarValue>,
}

impl TurnRequest {
    pub fn new(conversation_id: impl Into<String>, flow_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            flow_id: flow_id.into(),
            user_input: None,
            seed_variables: HashMap::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.user_input = Some(input.into());
        self
    }

    pub fn with_seed(mut self, name: impl Into<String>, value: VarValue) -> Self {
        self.seed_variables.insert(name.into(), value);
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn user_input(&self) -> Option<&str> {
        self.user_input.as_deref()
    }

    pub fn seed_variables(&self) -> &HashMap<String, VarValue> {
        &self.seed_variables
    }

    pub fn take_seed_variables(&mut self) -> HashMap<String, VarValue> {
        std::mem::take(&mut self.seed_variables)
    }
}

/// The ordered, fully rendered reply the transport delivers back to the
/// channel, plus the flag signalling the conversation left automated
/// handling.
#[derive(Debug, Clone, JsonSchema, Serialize, Deserialize, PartialEq)]
pub struct TurnReply {
    pub messages: Vec<String>,
    pub handoff: bool,
}

impl TurnReply {
    pub fn new(messages: Vec<String>, handoff: bool) -> Self {
        Self { messages, handoff }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let req = TurnRequest::new("telegram:42", "registro")
            .with_input("  hola  ")
            .with_seed("usuarioNombre", VarValue::String("Ana".into()));

        assert_eq!(req.conversation_id(), "telegram:42");
        assert_eq!(req.flow_id(), "registro");
        assert_eq!(req.user_input(), Some("  hola  "));
        assert_eq!(
            req.seed_variables().get("usuarioNombre"),
            Some(&VarValue::String("Ana".into()))
        );
    }

    #[test]
    fn serde_skips_empty_optionals() {
        let req = TurnRequest::new("c", "f");
        let encoded = serde_json::to_value(&req).unwrap();
        assert!(encoded.get("user_input").is_none());
        assert!(encoded.get("seed_variables").is_none());
    }
}
