use regex::Regex;
use tracing::debug;

use super::HandlerDeps;
use crate::error::HandlerError;
use crate::state::{ConversationState, FormProgress, VarValue};
use crate::step::{FieldType, FormField, OnSubmit, StepOutcome};

const EMPTY_FIELD: &str = "Por favor, proporciona un valor para este campo.";
const SAVED: &str = "✅ Guardado.";

fn prompt(field: &FormField) -> String {
    let required = if field.required { " (*)" } else { "" };
    format!("📝 {}{}", field.label, required)
}

/// Where the conversation goes once every field is collected: the configured
/// post-submit step, else the form's own `next`, else the flow's default.
fn completion_target(
    on_submit: Option<&OnSubmit>,
    next: Option<&str>,
    deps: &HandlerDeps<'_>,
) -> Option<String> {
    on_submit
        .and_then(|s| s.next.as_deref())
        .or(next)
        .or(deps.default_step)
        .map(str::to_string)
}

/// First entry into a form step: record field index 0, show the intro and
/// the first field's prompt, and block for the first value.
pub fn enter(
    intro: Option<&str>,
    fields: &[FormField],
    on_submit: Option<&OnSubmit>,
    next: Option<&str>,
    state: &mut ConversationState,
    deps: &HandlerDeps<'_>,
) -> StepOutcome {
    let Some(first) = fields.first() else {
        // A form with no fields has nothing to collect.
        return StepOutcome::advance(Vec::new(), completion_target(on_submit, next, deps));
    };

    state.form = Some(FormProgress::start());
    let mut messages = Vec::new();
    if let Some(text) = intro {
        messages.push(text.to_string());
    }
    messages.push(prompt(first));
    StepOutcome::block(messages)
}

/// One collection turn while the form is pending: validate the value for the
/// current field, store it, and either prompt for the next field or complete
/// the form and resume normal dispatch at the post-submit step.
pub fn collect(
    fields: &[FormField],
    on_submit: Option<&OnSubmit>,
    next: Option<&str>,
    state: &mut ConversationState,
    input: Option<&str>,
    deps: &HandlerDeps<'_>,
) -> Result<StepOutcome, HandlerError> {
    let mut progress = state.form.take().unwrap_or_else(FormProgress::start);

    let Some(field) = fields.get(progress.field_index) else {
        // Index past the field list (flow edited mid-conversation): finish.
        debug!("form index {} out of bounds, completing form", progress.field_index);
        return Ok(StepOutcome::advance(Vec::new(), completion_target(on_submit, next, deps)));
    };

    let Some(raw) = input else {
        let messages = vec![EMPTY_FIELD.to_string(), prompt(field)];
        state.form = Some(progress);
        return Ok(StepOutcome::block(messages));
    };

    if let Some(reject) = validate(field, raw)? {
        state.form = Some(progress);
        return Ok(StepOutcome::block(vec![format!("❌ {reject}"), prompt(field)]));
    }

    let value = match field.field_type {
        FieldType::Number => VarValue::coerce_numeric(raw),
        FieldType::Text => VarValue::String(raw.to_string()),
    };
    progress.data.insert(field.name.clone(), value.clone());
    state.set_var(field.name.clone(), value);
    progress.field_index += 1;

    if let Some(upcoming) = fields.get(progress.field_index) {
        let messages = vec![SAVED.to_string(), prompt(upcoming)];
        state.form = Some(progress);
        return Ok(StepOutcome::block(messages));
    }

    // All fields collected: pending state is cleared (form data is already
    // merged into the working variables) and the chain resumes immediately.
    debug!("form completed with {} fields", progress.data.len());
    Ok(StepOutcome::advance(Vec::new(), completion_target(on_submit, next, deps)))
}

/// Returns the rejection message when the value fails the field's rules.
fn validate(field: &FormField, raw: &str) -> Result<Option<String>, HandlerError> {
    let Some(rules) = &field.validation else {
        return Ok(None);
    };

    if let Some(pattern) = &rules.regex {
        let regex = Regex::new(pattern).map_err(|e| {
            HandlerError::BadPayload(format!("invalid regex for field `{}`: {e}", field.name))
        })?;
        if !regex.is_match(raw) {
            return Ok(Some(
                rules.error_message.clone().unwrap_or_else(|| "Valor inválido".to_string()),
            ));
        }
    }

    if rules.min.is_some() || rules.max.is_some() {
        let Ok(value) = raw.trim().parse::<f64>() else {
            return Ok(Some(
                rules.error_message.clone().unwrap_or_else(|| "Debe ser un número".to_string()),
            ));
        };
        let below = rules.min.is_some_and(|min| value < min);
        let above = rules.max.is_some_and(|max| value > max);
        if below || above {
            return Ok(Some(
                rules.error_message.clone().unwrap_or_else(|| "Valor inválido".to_string()),
            ));
        }
    }

    Ok(None)
}
