use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A message payload that flow authors may write as one string or a list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum Texts {
    One(String),
    Many(Vec<String>),
}

impl Texts {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Texts::One(s) => vec![s.clone()],
            Texts::Many(v) => v.clone(),
        }
    }
}

impl Default for Texts {
    fn default() -> Self {
        Texts::Many(Vec::new())
    }
}

impl From<&str> for Texts {
    fn from(s: &str) -> Self {
        Texts::One(s.to_string())
    }
}

/// One selectable menu entry. `value` is matched case-insensitively against
/// the user's reply; `label` is what gets listed (and substring-matched as a
/// last resort).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    pub next: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Number,
}

/// Optional per-field validation: a regex and/or numeric bounds. Both kinds
/// reject with the configured `error_message`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct FieldValidation {
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub validation: Option<FieldValidation>,
}

/// Where a completed form routes to (and, eventually, which service receives
/// the submission).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct OnSubmit {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// The closed set of step kinds. Aliases absorb the legacy vocabulary of the
/// older flow files (`options`, `dynamicService`, `content`, `ifTrue`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    /// Emits its text and auto-advances.
    Message {
        #[serde(alias = "content", alias = "message")]
        text: Texts,
        #[serde(default)]
        next: Option<String>,
    },
    /// Lists options and blocks until one is picked.
    #[serde(alias = "options")]
    Menu {
        #[serde(default, alias = "content", alias = "message")]
        text: Option<Texts>,
        options: Vec<MenuOption>,
    },
    /// Prompts for a single free-text value and stores it.
    Input {
        #[serde(alias = "content", alias = "message", alias = "text")]
        prompt: Texts,
        save_as: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// Collects a sequence of validated fields (see the form collector).
    Form {
        #[serde(default, alias = "content", alias = "message")]
        intro: Option<String>,
        fields: Vec<FormField>,
        #[serde(default, alias = "onSubmit")]
        on_submit: Option<OnSubmit>,
        #[serde(default)]
        next: Option<String>,
    },
    /// Runs a named validation against the working variables.
    Action {
        action: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// Branches on a restricted boolean expression; never blocks.
    Conditional {
        condition: String,
        #[serde(alias = "ifTrue")]
        if_true: String,
        #[serde(alias = "ifFalse")]
        if_false: String,
    },
    /// Renders an externally fetched dataset inline and advances.
    #[serde(alias = "dynamicService")]
    DynamicData {
        #[serde(default, alias = "content", alias = "message")]
        text: Option<String>,
        service: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// Terminal step: final message plus the handoff signal.
    End {
        #[serde(alias = "content", alias = "message")]
        text: Texts,
    },
}

impl StepConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::Message { .. } => "message",
            StepConfig::Menu { .. } => "menu",
            StepConfig::Input { .. } => "input",
            StepConfig::Form { .. } => "form",
            StepConfig::Action { .. } => "action",
            StepConfig::Conditional { .. } => "conditional",
            StepConfig::DynamicData { .. } => "dynamic_data",
            StepConfig::End { .. } => "end",
        }
    }

    /// Step ids this step can route to (used by flow validation).
    pub fn next_steps(&self) -> Vec<&str> {
        match self {
            StepConfig::Message { next, .. }
            | StepConfig::Input { next, .. }
            | StepConfig::Action { next, .. }
            | StepConfig::DynamicData { next, .. } => next.iter().map(String::as_str).collect(),
            StepConfig::Menu { options, .. } => {
                options.iter().map(|o| o.next.as_str()).collect()
            }
            StepConfig::Form { on_submit, next, .. } => {
                let mut out: Vec<&str> = Vec::new();
                if let Some(submit) = on_submit {
                    out.extend(submit.next.as_deref());
                }
                out.extend(next.as_deref());
                out
            }
            StepConfig::Conditional { if_true, if_false, .. } => {
                vec![if_true.as_str(), if_false.as_str()]
            }
            StepConfig::End { .. } => Vec::new(),
        }
    }
}

/// What a handler decided for one step invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Rendered messages to append to the turn's reply.
    pub messages: Vec<String>,
    /// Declared next step. `None` together with `should_continue = false`
    /// means "wait for input on the same step".
    pub next: Option<String>,
    /// Whether the engine keeps chaining without further user input.
    pub should_continue: bool,
    /// Conversation leaves automated handling.
    pub handoff: bool,
}

impl StepOutcome {
    /// Auto-advance to `next` (possibly ending the chain when `None`).
    pub fn advance(messages: Vec<String>, next: Option<String>) -> Self {
        Self { messages, next, should_continue: true, handoff: false }
    }

    /// Block on the current step and wait for the user's reply.
    pub fn block(messages: Vec<String>) -> Self {
        Self { messages, next: None, should_continue: false, handoff: false }
    }

    /// Terminal outcome: emit final messages and signal handoff.
    pub fn end(messages: Vec<String>) -> Self {
        Self { messages, next: None, should_continue: false, handoff: true }
    }
}
