//! First-match access control for the index gate.
//!
//! [`Acl`] walks an ordered list of [`Rule`]s and stops at the first rule whose
//! configured predicates all hold. [`MatcherWithWildcards`] is the glob matcher
//! shared by every layer that compares index or action names.

pub mod acl;
pub mod errors;
pub mod matcher;
pub mod rule;

pub use acl::{Acl, Verdict, DEFAULT_DENY};
pub use errors::AclError;
pub use matcher::{read_request_matcher, READ_REQUEST_PATTERNS};
pub use rule::{AclRequest, Predicate, Rule};

pub use index_gate_core_types::{HostPattern, MatcherWithWildcards};
pub use index_gate_policy_center::RuleType;
