use thiserror::Error;

/// Errors surfaced by the engine for one processed turn.
///
/// Only an unknown flow and an unrecoverable error path abort the request;
/// every other step-level fault is recovered inside the chaining loop and
/// reaches the user as a conversational message instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("flow `{0}` not found")]
    FlowNotFound(String),

    #[error("flow `{flow}` has no error step to recover to (after `{step}` failed)")]
    MissingErrorStep { flow: String, step: String },

    #[error("flow `{flow}`: failure at `{step}` while already recovering on the error path")]
    ErrorStepFailed { flow: String, step: String },

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Errors raised while loading or validating a flow definition.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow `{0}` not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("flow `{flow}`: {reason}")]
    Invalid { flow: String, reason: String },
}

/// A step handler failed mid-turn. The engine logs these and redirects the
/// conversation to the flow's error step rather than failing the request.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("condition `{expr}` failed to evaluate: {reason}")]
    Condition { expr: String, reason: String },

    #[error("dynamic data service `{service}` failed: {reason}")]
    DynamicData { service: String, reason: String },

    #[error("malformed step payload: {0}")]
    BadPayload(String),
}

/// State-backend faults. Never propagated to the caller: the store degrades
/// to a fresh in-memory state and logs the loss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}
