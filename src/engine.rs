//! Ordered block evaluation over one request context.

use index_gate_policy_center::{GateSettings, RuleType};
use index_gate_request_context::RequestContext;
use tracing::{debug, info};

use crate::blocks::Block;
use crate::errors::GateError;

/// Verdict of one evaluation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// A block allowed the request; its queued effects are committed.
    Allow { block: String },
    Forbid { block: String },
    /// No block matched.
    DefaultDeny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn block(&self) -> Option<&str> {
        match self {
            Decision::Allow { block } | Decision::Forbid { block } => Some(block),
            Decision::DefaultDeny => None,
        }
    }
}

/// Ordered blocks; the first matching block decides.
pub struct AccessControl {
    blocks: Vec<Block>,
}

impl AccessControl {
    pub fn new(blocks: Vec<Block>) -> Self {
        for block in &blocks {
            info!("ADDING BLOCK: {block}");
        }
        Self { blocks }
    }

    pub fn from_settings(settings: &GateSettings) -> Result<Self, GateError> {
        let blocks = settings
            .access_control_rules
            .iter()
            .map(Block::from_settings)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(blocks))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Each block starts from a clean context. An allow commits the
    /// winning block's effects; anything else leaves the request untouched.
    pub fn evaluate(&self, cx: &mut RequestContext) -> Result<Decision, GateError> {
        for block in &self.blocks {
            cx.reset();
            let exit = block.check(cx)?;
            if !exit.matched {
                continue;
            }
            let decision = match exit.policy {
                RuleType::Allow => {
                    cx.commit()?;
                    Decision::Allow { block: exit.block }
                }
                RuleType::Forbid => {
                    cx.reset();
                    Decision::Forbid { block: exit.block }
                }
            };
            info!(id = %cx.id(), correlation = ?cx.correlation_id(), ?decision, "request evaluated: {cx}");
            return Ok(decision);
        }

        cx.reset();
        debug!(id = %cx.id(), "no block matched: {cx}");
        Ok(Decision::DefaultDeny)
    }
}
