//! Named groups of rules evaluated together.

mod rules;

use std::fmt;

use index_gate_acl::Rule;
use index_gate_policy_center::{RuleSettings, RuleType};
use index_gate_request_context::{RequestContext, RuleExitResult};
use tracing::debug;

use crate::errors::GateError;

pub use rules::{ActionsRule, BlockRule, IndicesRule, PredicateRule, UsersRule};

/// What a matching block does with the request.
pub type BlockPolicy = RuleType;

/// Outcome of checking one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockExitResult {
    pub block: String,
    pub policy: BlockPolicy,
    pub matched: bool,
}

/// Rules that must all hold for the block to match.
pub struct Block {
    name: String,
    policy: BlockPolicy,
    rules: Vec<Box<dyn BlockRule>>,
}

impl Block {
    pub fn new(name: impl Into<String>, policy: BlockPolicy, rules: Vec<Box<dyn BlockRule>>) -> Self {
        Self {
            name: name.into(),
            policy,
            rules,
        }
    }

    /// Transport predicates come first and `indices` last, so index
    /// narrowing only runs once every cheaper rule has matched.
    pub fn from_settings(settings: &RuleSettings) -> Result<Self, GateError> {
        let flat = Rule::from_settings(settings)?;
        let mut rules: Vec<Box<dyn BlockRule>> = flat
            .predicates()
            .cloned()
            .map(|p| Box::new(PredicateRule::new(p)) as Box<dyn BlockRule>)
            .collect();
        if let Some(actions) = &settings.actions {
            rules.push(Box::new(ActionsRule::new(actions)));
        }
        if let Some(users) = &settings.users {
            rules.push(Box::new(UsersRule::new(users)));
        }
        if let Some(indices) = &settings.indices {
            rules.push(Box::new(IndicesRule::new(indices)));
        }
        Ok(Self::new(settings.name.clone(), settings.rule_type, rules))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> BlockPolicy {
        self.policy
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    /// Evaluates rules in order, stopping at the first miss, and records
    /// the evaluated rules in the context history.
    pub fn check(&self, cx: &mut RequestContext) -> Result<BlockExitResult, GateError> {
        let mut results = Vec::with_capacity(self.rules.len());
        let mut matched = true;
        for rule in &self.rules {
            let hit = match rule.check(cx) {
                Ok(hit) => hit,
                Err(err) => {
                    results.push(RuleExitResult::new(rule.name(), false));
                    cx.add_to_history(self.name.clone(), results);
                    return Err(err);
                }
            };
            results.push(RuleExitResult::new(rule.name(), hit));
            if !hit {
                matched = false;
                break;
            }
        }
        debug!(id = %cx.id(), block = %self.name, matched, "block checked");
        cx.add_to_history(self.name.clone(), results);
        Ok(BlockExitResult {
            block: self.name.clone(),
            policy: self.policy,
            matched,
        })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules = self.rule_names().collect::<Vec<_>>().join(",");
        write!(f, "{{ name: '{}', policy: {}, rules: [{}] }}", self.name, self.policy, rules)
    }
}
