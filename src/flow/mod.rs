pub mod store;

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FlowError;
use crate::step::StepConfig;

/// A named, immutable conversation script: a graph of typed steps plus the
/// designated entry and error-recovery steps. Built once per flow id and
/// shared read-only across concurrent conversations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Flow {
    id: String,
    #[serde(default)]
    title: Option<String>,
    pub start_step: String,
    pub error_step: String,
    /// Fallback target for form completion when no post-submit step is
    /// configured.
    #[serde(default)]
    pub default_step: Option<String>,
    /// step id → step definition. Duplicate ids are rejected at parse time:
    /// a later definition silently shadowing an earlier one is a load error,
    /// never tolerated.
    #[serde(deserialize_with = "deserialize_steps_rejecting_duplicates")]
    steps: HashMap<String, StepConfig>,
}

fn deserialize_steps_rejecting_duplicates<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, StepConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StepsVisitor;

    impl<'de> Visitor<'de> for StepsVisitor {
        type Value = HashMap<String, StepConfig>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of step id to step definition")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut steps = HashMap::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, step)) = map.next_entry::<String, StepConfig>()? {
                if steps.contains_key(&id) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate step id `{id}`"
                    )));
                }
                steps.insert(id, step);
            }
            Ok(steps)
        }
    }

    deserializer.deserialize_map(StepsVisitor)
}

impl Flow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn step(&self, id: &str) -> Option<&StepConfig> {
        self.steps.get(id)
    }

    pub fn steps(&self) -> &HashMap<String, StepConfig> {
        &self.steps
    }

    /// Parses and validates a flow from JSON text.
    pub fn from_json(contents: &str) -> Result<Flow, FlowError> {
        let flow: Flow = serde_json::from_str(contents)
            .map_err(|e| FlowError::Parse(e.to_string()))?;
        flow.validate()?;
        Ok(flow)
    }

    /// Load-time consistency checks. Dangling `next` references inside steps
    /// are deliberately left to runtime (the engine redirects to the error
    /// step), but the entry points themselves must exist.
    pub fn validate(&self) -> Result<(), FlowError> {
        if !self.steps.contains_key(&self.start_step) {
            return Err(FlowError::Invalid {
                flow: self.id.clone(),
                reason: format!("start step `{}` does not exist", self.start_step),
            });
        }
        if !self.steps.contains_key(&self.error_step) {
            return Err(FlowError::Invalid {
                flow: self.id.clone(),
                reason: format!("error step `{}` does not exist", self.error_step),
            });
        }
        if let Some(default) = &self.default_step {
            if !self.steps.contains_key(default) {
                return Err(FlowError::Invalid {
                    flow: self.id.clone(),
                    reason: format!("default step `{default}` does not exist"),
                });
            }
        }
        Ok(())
    }

    /// Step ids referenced by some step but absent from the graph. Diagnostic
    /// only; the engine recovers from these at runtime.
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for (id, step) in &self.steps {
            for target in step.next_steps() {
                if !self.steps.contains_key(target) {
                    dangling.push((id.clone(), target.to_string()));
                }
            }
        }
        dangling.sort();
        dangling
    }
}
