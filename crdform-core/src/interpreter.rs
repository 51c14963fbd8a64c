//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. References that could not be resolved at plan
//! time (such as another resource's `id`) are resolved here from the states
//! produced by earlier effects.

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Bindings, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete succeeded
    Deleted { state: State },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
    bindings: Bindings,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
            bindings: Bindings::new(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the attributes visible through each binding before the first effect runs
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan) -> ApplyResult {
        let mut bindings = self.bindings.clone();
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::debug!("Executing {}", effect);
            let result = self.execute_effect(effect, &bindings).await;

            match &result {
                Ok(outcome) => {
                    success_count += 1;
                    record_binding(effect, outcome, &mut bindings);
                }
                Err(e) => {
                    failure_count += 1;
                    log::warn!("{} failed: {}", effect, e);
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        bindings: &Bindings,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Create(resource) => {
                let resource = resource.resolved(bindings);
                let state = self.provider.create(&resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to, .. } => {
                let to = to.resolved(bindings);
                let state = self.provider.update(id, from, &to).await?;
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Delete(state) => {
                self.provider.delete(state).await?;
                Ok(EffectOutcome::Deleted {
                    state: state.clone(),
                })
            }
        }
    }
}

fn record_binding(effect: &Effect, outcome: &EffectOutcome, bindings: &mut Bindings) {
    let (resource, state) = match (effect, outcome) {
        (Effect::Create(resource), EffectOutcome::Created { state }) => (resource, state),
        (Effect::Update { to, .. }, EffectOutcome::Updated { state }) => (to, state),
        _ => return,
    };
    if let Some(binding) = resource.binding() {
        bindings.insert(binding.to_string(), state.attributes.clone());
    }
}
