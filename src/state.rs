use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A scalar working-variable value.
///
/// Integers and floats are kept apart so form type coercion (try integer,
/// then float, else keep text) survives a round-trip through the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum VarValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Null,
}

impl VarValue {
    pub fn as_str(&self) -> Option<&str> {
        if let VarValue::String(s) = self { Some(s) } else { None }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let VarValue::Boolean(b) = self { Some(*b) } else { None }
    }

    /// Numeric view: integers widen to f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VarValue::Integer(i) => Some(*i as f64),
            VarValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendered form used by the template renderer.
    pub fn render(&self) -> String {
        match self {
            VarValue::String(s) => s.clone(),
            VarValue::Integer(i) => i.to_string(),
            VarValue::Number(n) => n.to_string(),
            VarValue::Boolean(b) => b.to_string(),
            VarValue::Null => String::new(),
        }
    }

    /// Coerces raw user text: integer first, then float, else the text as-is.
    pub fn coerce_numeric(raw: &str) -> VarValue {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return VarValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return VarValue::Number(f);
        }
        VarValue::String(raw.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            VarValue::String(s) => json!(s),
            VarValue::Integer(i) => json!(i),
            VarValue::Number(n) => json!(n),
            VarValue::Boolean(b) => json!(b),
            VarValue::Null => Value::Null,
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::String(s.to_string())
    }
}

impl TryFrom<Value> for VarValue {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(VarValue::String(s)),
            Value::Bool(b) => Ok(VarValue::Boolean(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(VarValue::Integer(i))
                } else {
                    Ok(VarValue::Number(n.as_f64().ok_or(())?))
                }
            }
            Value::Null => Ok(VarValue::Null),
            _ => Err(()),
        }
    }
}

/// Progress through a multi-field form. Present only while a form step is
/// collecting fields; routing checks it before normal dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FormProgress {
    /// Index of the field currently being prompted for.
    pub field_index: usize,
    /// Values collected so far, keyed by field name.
    pub data: HashMap<String, VarValue>,
}

impl FormProgress {
    pub fn start() -> Self {
        Self { field_index: 0, data: HashMap::new() }
    }
}

/// Durable per-conversation progress: the current step pointer plus the
/// working variables templates render from. Owned and mutated exclusively
/// by the engine; the store only persists and retrieves it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConversationState {
    conversation_id: String,
    flow_id: String,
    /// `None` means the conversation has not started (or was handed off).
    pub current_step: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, VarValue>,
    /// Set only while a form step is mid-collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormProgress>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, flow_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            flow_id: flow_id.into(),
            current_step: None,
            variables: HashMap::new(),
            form: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn get_var(&self, name: &str) -> Option<&VarValue> {
        self.variables.get(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: VarValue) {
        self.variables.insert(name.into(), value);
    }

    /// Seed values overwrite existing keys on collision.
    pub fn merge_vars(&mut self, seed: HashMap<String, VarValue>) {
        for (k, v) in seed {
            self.variables.insert(k, v);
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
