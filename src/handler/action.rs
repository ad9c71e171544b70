use std::collections::HashMap;

use tracing::trace;

use crate::state::VarValue;
use crate::step::StepOutcome;

/// Named side-effect-free validations runnable from `action` steps.
///
/// Unknown action names are a deliberate no-op that advances unconditionally;
/// flow authors rely on this permissiveness to stub actions before they land.
pub fn execute(
    name: &str,
    variables: &HashMap<String, VarValue>,
    next: Option<String>,
) -> StepOutcome {
    match name {
        "validate_dni" => {
            let dni = variables.get("dni").and_then(|v| v.as_str()).unwrap_or("");
            if is_valid_dni(dni) {
                StepOutcome::advance(vec!["✅ DNI válido".to_string()], next)
            } else {
                // Stay on this step; the next turn re-runs the validation.
                StepOutcome::block(vec![
                    "❌ DNI inválido. Debe tener 8 dígitos.".to_string(),
                ])
            }
        }
        other => {
            trace!("unknown action `{}` treated as pass-through", other);
            StepOutcome::advance(Vec::new(), next)
        }
    }
}

fn is_valid_dni(dni: &str) -> bool {
    dni.len() == 8 && dni.chars().all(|c| c.is_ascii_digit())
}
