//! Policy manager for dispatching epoch-end events to multiple policies

use tracing::debug;

use super::traits::{CallbackContext, TrainingPolicy};
use crate::error::Result;
use crate::model::ModelAccess;
use crate::policy::PolicyConfig;

/// Runs attached policies in insertion order
#[derive(Default)]
pub struct PolicyManager {
    policies: Vec<Box<dyn TrainingPolicy>>,
}

impl PolicyManager {
    pub fn new() -> Self {
        Self { policies: Vec::new() }
    }

    /// Build a manager from validated configs, in the given order
    pub fn from_configs(configs: Vec<PolicyConfig>) -> Result<Self> {
        let mut manager = Self::new();
        for config in configs {
            manager.add(config.build()?);
        }
        Ok(manager)
    }

    /// Add a policy
    pub fn add<P: TrainingPolicy + 'static>(&mut self, policy: P) {
        self.policies.push(Box::new(policy));
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Names of the attached policies, in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Fire epoch end on every policy; stops at the first error
    pub fn on_epoch_end(
        &mut self,
        ctx: &CallbackContext,
        model: &mut dyn ModelAccess,
    ) -> Result<()> {
        for policy in &mut self.policies {
            debug!(policy = policy.name(), epoch = ctx.epoch, "epoch end");
            policy.on_epoch_end(ctx, model)?;
        }
        Ok(())
    }
}
