//! Rules a block is made of.

use index_gate_acl::{MatcherWithWildcards, Predicate};
use index_gate_core_types::IndexSet;
use index_gate_request_context::RequestContext;
use tracing::debug;

use crate::errors::GateError;

const ALL_INDICES: &str = "_all";

/// One condition inside a [`Block`](super::Block).
///
/// `check` may queue side effects on the context; they only land if the
/// enclosing block allows the request.
pub trait BlockRule: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, cx: &mut RequestContext) -> Result<bool, GateError>;
}

/// Transport-level predicate shared with the flat ACL.
pub struct PredicateRule {
    predicate: Predicate,
}

impl PredicateRule {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

impl BlockRule for PredicateRule {
    fn name(&self) -> &str {
        self.predicate.kind()
    }

    fn check(&self, cx: &mut RequestContext) -> Result<bool, GateError> {
        Ok(self.predicate.holds(&*cx))
    }
}

pub struct ActionsRule {
    matcher: MatcherWithWildcards,
}

impl ActionsRule {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            matcher: MatcherWithWildcards::new(patterns),
        }
    }
}

impl BlockRule for ActionsRule {
    fn name(&self) -> &str {
        "actions"
    }

    fn check(&self, cx: &mut RequestContext) -> Result<bool, GateError> {
        Ok(self.matcher.matches(cx.action()))
    }
}

/// Matches the identity the host resolved and records it as the logged-in user.
pub struct UsersRule {
    matcher: MatcherWithWildcards,
}

impl UsersRule {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            matcher: MatcherWithWildcards::new(patterns),
        }
    }
}

impl BlockRule for UsersRule {
    fn name(&self) -> &str {
        "users"
    }

    fn check(&self, cx: &mut RequestContext) -> Result<bool, GateError> {
        let Some(user) = cx.resolved_identity().map(str::to_string) else {
            return Ok(false);
        };
        if !self.matcher.matches(&user) {
            return Ok(false);
        }
        cx.set_logged_in_user(user);
        Ok(true)
    }
}

/// Restricts the indices a request may address.
///
/// Requests whose indices all match pass untouched. Read requests asking for
/// wildcards or for a mix of permitted and forbidden indices are narrowed to
/// the permitted part; writes never are.
pub struct IndicesRule {
    matcher: MatcherWithWildcards,
}

impl IndicesRule {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            matcher: MatcherWithWildcards::new(patterns),
        }
    }
}

impl BlockRule for IndicesRule {
    fn name(&self) -> &str {
        "indices"
    }

    fn check(&self, cx: &mut RequestContext) -> Result<bool, GateError> {
        if !cx.involves_indices() {
            return Ok(true);
        }

        let requested = cx.indices()?;
        let wants_everything = requested.is_empty()
            || requested
                .iter()
                .any(|i| i.contains('*') || i == ALL_INDICES);

        if wants_everything {
            if !cx.is_read_request() {
                return Ok(false);
            }
            let expanded = if requested.is_empty() || requested.contains(ALL_INDICES) {
                cx.available_indices_and_aliases()
            } else {
                cx.expanded_indices()?
            };
            return self.narrow(cx, self.matcher.filter(&expanded));
        }

        if requested.iter().all(|i| self.matcher.matches(i)) {
            return Ok(true);
        }
        if !cx.is_read_request() {
            return Ok(false);
        }
        let permitted = self.matcher.filter(requested.iter());
        self.narrow(cx, permitted)
    }
}

impl IndicesRule {
    fn narrow(&self, cx: &mut RequestContext, permitted: IndexSet) -> Result<bool, GateError> {
        if permitted.is_empty() {
            return Ok(false);
        }
        debug!(id = %cx.id(), "narrowing indices to {:?}", permitted);
        cx.set_indices(permitted)?;
        Ok(true)
    }
}
