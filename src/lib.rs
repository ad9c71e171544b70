//! A multi-turn conversational flow engine.
//!
//! Flows are typed step graphs (messages, menus, inputs, forms, branches,
//! dynamic data listings, terminal steps) authored in JSON. The [`engine`]
//! walks a conversation through its flow one inbound message at a time,
//! persisting progress in a pluggable [`store`] (Redis with an in-memory
//! fallback) so any stateless transport can drive it.

pub mod condition;
pub mod config;
pub mod dynamic;
pub mod engine;
pub mod error;
pub mod flow;
pub mod handler;
pub mod logger;
pub mod message;
pub mod renderer;
pub mod state;
pub mod step;
pub mod store;

pub use config::Settings;
pub use dynamic::{DataRecord, DynamicDataProvider, MockDataProvider};
pub use engine::FlowEngine;
pub use error::{EngineError, FlowError, HandlerError, StoreError};
pub use flow::Flow;
pub use flow::store::{FileFlowStore, FlowStore, InMemoryFlowStore};
pub use message::{TurnReply, TurnRequest};
pub use renderer::TemplateMode;
pub use state::{ConversationState, VarValue};
pub use step::{StepConfig, StepOutcome};
pub use store::{SharedStateStore, StateStore};
