use std::collections::HashMap;

use crate::condition;
use crate::error::HandlerError;
use crate::state::VarValue;
use crate::step::StepOutcome;

/// Conditional step: evaluates the expression against the working variables
/// and advances to one of the two configured branches. Never blocks and
/// never emits messages; an evaluation failure bubbles up so the engine can
/// redirect to the flow's error step.
pub fn execute(
    expr: &str,
    if_true: &str,
    if_false: &str,
    variables: &HashMap<String, VarValue>,
) -> Result<StepOutcome, HandlerError> {
    let branch = condition::evaluate(expr, variables).map_err(|reason| {
        HandlerError::Condition { expr: expr.to_string(), reason }
    })?;
    let next = if branch { if_true } else { if_false };
    Ok(StepOutcome::advance(Vec::new(), Some(next.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, VarValue> {
        let mut v = HashMap::new();
        v.insert("edad".to_string(), VarValue::Integer(17));
        v
    }

    #[test]
    fn picks_false_branch() {
        let out = execute("edad >= 18", "adulto", "menor", &vars()).unwrap();
        assert_eq!(out.next.as_deref(), Some("menor"));
        assert!(out.should_continue);
        assert!(out.messages.is_empty());
    }

    #[test]
    fn picks_true_branch() {
        let out = execute("edad < 18", "menor", "adulto", &vars()).unwrap();
        assert_eq!(out.next.as_deref(), Some("menor"));
    }

    #[test]
    fn evaluation_failure_is_a_handler_error() {
        let err = execute("edad >>> 18", "a", "b", &vars()).unwrap_err();
        assert!(matches!(err, HandlerError::Condition { .. }));
    }
}
