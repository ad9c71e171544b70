pub mod action;
pub mod conditional;
pub mod form;
pub mod menu;

use tracing::trace;

use crate::dynamic::DynamicDataProvider;
use crate::error::HandlerError;
use crate::renderer::{TemplateMode, render_all};
use crate::state::{ConversationState, VarValue};
use crate::step::{StepConfig, StepOutcome};

/// Collaborators a handler may need beyond the step definition itself.
pub struct HandlerDeps<'a> {
    pub dynamic: &'a dyn DynamicDataProvider,
    pub mode: TemplateMode,
    /// The flow's fallback step for form completion.
    pub default_step: Option<&'a str>,
}

/// Normalizes user input: `None` or whitespace-only text counts as absent.
fn presence(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

/// Routes one step invocation to its kind's handler and renders the outcome's
/// messages against the working variables.
///
/// While a form is mid-collection the inbound message bypasses normal
/// dispatch and goes to the field collector instead.
pub async fn dispatch(
    step: &StepConfig,
    state: &mut ConversationState,
    input: Option<&str>,
    deps: &HandlerDeps<'_>,
) -> Result<StepOutcome, HandlerError> {
    let input = presence(input);

    if state.form.is_some() {
        if let StepConfig::Form { intro: _, fields, on_submit, next } = step {
            let mut outcome =
                form::collect(fields, on_submit.as_ref(), next.as_deref(), state, input, deps)?;
            outcome.messages = render_all(outcome.messages, &state.variables, deps.mode);
            return Ok(outcome);
        }
        // A pending form marker without a form step is stale state from an
        // edited flow; drop it and dispatch normally.
        trace!("clearing stale form progress on `{}` step", step.kind());
        state.form = None;
    }

    let mut outcome = {
        match step {
            StepConfig::Message { text, next } => {
                StepOutcome::advance(text.to_vec(), next.clone())
            }
            StepConfig::Menu { text, options } => menu::execute(text.as_ref(), options, input),
            StepConfig::Input { prompt, save_as, next } => match input {
                Some(value) => {
                    state.set_var(save_as.clone(), VarValue::String(value.to_string()));
                    StepOutcome::advance(Vec::new(), next.clone())
                }
                None => StepOutcome::block(prompt.to_vec()),
            },
            StepConfig::Form { intro, fields, on_submit, next } => {
                form::enter(intro.as_deref(), fields, on_submit.as_ref(), next.as_deref(), state, deps)
            }
            StepConfig::Action { action, next } => {
                action::execute(action, &state.variables, next.clone())
            }
            StepConfig::Conditional { condition, if_true, if_false } => {
                conditional::execute(condition, if_true, if_false, &state.variables)?
            }
            StepConfig::DynamicData { text, service, next } => {
                let rows = deps.dynamic.fetch(service).await.map_err(|reason| {
                    HandlerError::DynamicData { service: service.clone(), reason }
                })?;
                let listing: Vec<String> =
                    rows.iter().map(|r| format!("  • {} - {}", r.label, r.value)).collect();
                let body = match text {
                    Some(t) => format!("{}\n{}", t, listing.join("\n")),
                    None => listing.join("\n"),
                };
                StepOutcome::advance(vec![body], next.clone())
            }
            StepConfig::End { text } => StepOutcome::end(text.to_vec()),
        }
    };

    outcome.messages = render_all(outcome.messages, &state.variables, deps.mode);
    Ok(outcome)
}
