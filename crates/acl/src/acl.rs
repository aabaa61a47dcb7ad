use index_gate_policy_center::{GateSettings, RuleType};
use tracing::{debug, info};

use crate::errors::AclError;
use crate::rule::{AclRequest, Rule};

/// Verdict when no rule matches.
pub const DEFAULT_DENY: &str = "request matches no rules, forbidden by default";

#[derive(Clone, Copy, Debug)]
pub enum Verdict<'a> {
    Allow(&'a Rule),
    Forbid(&'a Rule),
    DefaultDeny,
}

impl<'a> Verdict<'a> {
    /// `None` when allowed, otherwise the violated rule's name or [`DEFAULT_DENY`].
    pub fn violation(&self) -> Option<&'a str> {
        match self {
            Verdict::Allow(_) => None,
            Verdict::Forbid(rule) => Some(rule.name()),
            Verdict::DefaultDeny => Some(DEFAULT_DENY),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow(_))
    }
}

/// Ordered rule list, read-only after construction.
#[derive(Clone, Debug, Default)]
pub struct Acl {
    rules: Vec<Rule>,
}

impl Acl {
    pub fn new(rules: Vec<Rule>) -> Self {
        for rule in &rules {
            info!(target: "index-gate", "{rule}");
        }
        Self { rules }
    }

    pub fn from_settings(settings: &GateSettings) -> Result<Self, AclError> {
        let rules = settings
            .access_control_rules
            .iter()
            .map(Rule::from_settings)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule whose predicates all hold decides.
    pub fn evaluate(&self, req: &dyn AclRequest) -> Verdict<'_> {
        for rule in &self.rules {
            if rule.matches(req) {
                debug!(target: "index-gate", rule = rule.name(), "rule matched");
                return match rule.rule_type() {
                    RuleType::Allow => Verdict::Allow(rule),
                    RuleType::Forbid => Verdict::Forbid(rule),
                };
            }
        }
        Verdict::DefaultDeny
    }

    /// `None` if the request may proceed, else the name of the violated rule.
    pub fn check(&self, req: &dyn AclRequest) -> Option<&str> {
        self.evaluate(req).violation()
    }
}
