use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::dynamic::{DynamicDataProvider, MockDataProvider};
use crate::error::{EngineError, FlowError};
use crate::flow::Flow;
use crate::flow::store::FlowStore;
use crate::handler::{HandlerDeps, dispatch};
use crate::message::{TurnRequest, TurnReply};
use crate::renderer::TemplateMode;
use crate::state::ConversationState;
use crate::store::SharedStateStore;

/// Upper bound on auto-advancing steps per turn. A flow that chains more
/// than this in one turn almost certainly loops.
pub const DEFAULT_MAX_STEPS_PER_TURN: usize = 32;

/// The flow interpreter: resolves the flow, restores conversation state,
/// and walks the step graph until a step blocks for input, ends the
/// conversation, or the per-turn step cap trips.
///
/// Cheap to share behind an `Arc`; all per-conversation mutability lives in
/// the state store.
#[derive(Debug)]
pub struct FlowEngine {
    flows: Arc<dyn FlowStore>,
    store: SharedStateStore,
    dynamic: Arc<dyn DynamicDataProvider>,
    mode: TemplateMode,
    max_steps_per_turn: usize,
    /// One guard per conversation so concurrent messages from the same user
    /// are processed strictly one turn at a time.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FlowEngine {
    pub fn new(flows: Arc<dyn FlowStore>, store: SharedStateStore) -> Self {
        Self {
            flows,
            store,
            dynamic: Arc::new(MockDataProvider),
            mode: TemplateMode::default(),
            max_steps_per_turn: DEFAULT_MAX_STEPS_PER_TURN,
            turn_locks: DashMap::new(),
        }
    }

    pub fn with_dynamic_provider(mut self, provider: Arc<dyn DynamicDataProvider>) -> Self {
        self.dynamic = provider;
        self
    }

    pub fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_step_cap(mut self, max_steps_per_turn: usize) -> Self {
        self.max_steps_per_turn = max_steps_per_turn.max(1);
        self
    }

    /// Processes one inbound turn and returns the ordered reply.
    ///
    /// Fatal errors are limited to an unknown flow id and an unrecoverable
    /// error-step situation; every step-level fault is converted into a
    /// redirect to the flow's error step instead.
    pub async fn run(&self, mut request: TurnRequest) -> Result<TurnReply, EngineError> {
        let flow = self.flows.load(request.flow_id()).await.map_err(|e| match e {
            FlowError::NotFound(id) => EngineError::FlowNotFound(id),
            other => EngineError::Flow(other),
        })?;

        let lock = self
            .turn_locks
            .entry(request.conversation_id().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _turn = lock.lock().await;
            self.run_turn(&flow, &mut request).await
        };
        // Two handles left (the table's and ours) means no turn is waiting;
        // drop the entry so the table does not grow with every conversation
        // id ever seen. remove_if holds the shard lock, so no new waiter can
        // clone the entry between the count check and the removal.
        self.turn_locks
            .remove_if(request.conversation_id(), |_, l| Arc::strong_count(l) == 2);
        result
    }

    async fn run_turn(
        &self,
        flow: &Flow,
        request: &mut TurnRequest,
    ) -> Result<TurnReply, EngineError> {
        let mut state =
            self.store.get(request.conversation_id(), request.flow_id()).await;
        if state.current_step.is_none() {
            state.current_step = Some(flow.start_step.clone());
        }
        let seed = request.take_seed_variables();
        if !seed.is_empty() {
            state.merge_vars(seed);
        }

        let deps = HandlerDeps {
            dynamic: self.dynamic.as_ref(),
            mode: self.mode,
            default_step: flow.default_step.as_deref(),
        };

        // The inbound text is offered to each step until one that reads
        // input (menu, input, mid-collection form) consumes it; plain
        // messages and branches pass it through untouched.
        let mut input = request.user_input().map(str::to_string);
        let mut messages: Vec<String> = Vec::new();
        let mut handoff = false;
        let mut on_error_path = false;

        for hop in 0.. {
            if hop >= self.max_steps_per_turn {
                warn!(
                    flow = flow.id(),
                    conversation = state.conversation_id(),
                    cap = self.max_steps_per_turn,
                    "step cap reached mid-turn, likely a flow cycle; stopping"
                );
                break;
            }
            let Some(step_id) = state.current_step.clone() else { break };

            let Some(step) = flow.step(&step_id) else {
                warn!(
                    flow = flow.id(),
                    step = %step_id,
                    "current step missing from flow, redirecting to error step"
                );
                redirect_to_error(flow, &mut state, &step_id, &mut on_error_path)?;
                input = None;
                self.persist(&mut state).await;
                continue;
            };

            let consumes_input = reads_input(step, &state);
            let outcome = match dispatch(step, &mut state, input.as_deref(), &deps).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        flow = flow.id(),
                        step = %step_id,
                        error = %e,
                        "step handler failed, redirecting to error step"
                    );
                    redirect_to_error(flow, &mut state, &step_id, &mut on_error_path)?;
                    input = None;
                    self.persist(&mut state).await;
                    continue;
                }
            };
            if consumes_input {
                input = None;
            }
            debug!(
                flow = flow.id(),
                step = %step_id,
                kind = step.kind(),
                next = ?outcome.next,
                blocks = !outcome.should_continue,
                "step processed"
            );

            messages.extend(outcome.messages);

            if outcome.handoff {
                // Terminal: clear the pointer so the next message starts the
                // flow over from the top.
                state.current_step = None;
                state.form = None;
                handoff = true;
                self.persist(&mut state).await;
                break;
            }
            if !outcome.should_continue {
                // Blocked: the pointer stays put and the next turn re-enters
                // this same step with the user's reply.
                self.persist(&mut state).await;
                break;
            }

            state.current_step = outcome.next;
            self.persist(&mut state).await;
            if state.current_step.is_none() {
                break;
            }
        }

        Ok(TurnReply::new(messages, handoff))
    }

    /// Drops a conversation's stored state so its next message starts fresh.
    pub async fn reset(&self, conversation_id: &str) {
        self.store.delete(conversation_id).await;
        self.turn_locks.remove(conversation_id);
    }

    /// Snapshot of every live conversation. Diagnostic only.
    pub async fn active_conversations(&self) -> Vec<ConversationState> {
        self.store.list_active().await
    }

    async fn persist(&self, state: &mut ConversationState) {
        state.touch();
        self.store.save(state).await;
    }
}

/// Whether this step invocation will read the user's text. Steps that emit
/// and auto-advance leave the input for a later step in the same chain.
fn reads_input(step: &crate::step::StepConfig, state: &ConversationState) -> bool {
    use crate::step::StepConfig;
    match step {
        StepConfig::Menu { .. } | StepConfig::Input { .. } => true,
        StepConfig::Form { .. } => state.form.is_some(),
        _ => false,
    }
}

fn redirect_to_error(
    flow: &Flow,
    state: &mut ConversationState,
    failed_step: &str,
    on_error_path: &mut bool,
) -> Result<(), EngineError> {
    if *on_error_path {
        return Err(EngineError::ErrorStepFailed {
            flow: flow.id().to_string(),
            step: failed_step.to_string(),
        });
    }
    if flow.step(&flow.error_step).is_none() {
        return Err(EngineError::MissingErrorStep {
            flow: flow.id().to_string(),
            step: failed_step.to_string(),
        });
    }
    *on_error_path = true;
    state.form = None;
    state.current_step = Some(flow.error_step.clone());
    Ok(())
}
