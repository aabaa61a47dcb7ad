//! Default read-request action patterns.

use index_gate_core_types::MatcherWithWildcards;
use once_cell::sync::Lazy;

/// Actions that only read data or cluster state.
pub const READ_REQUEST_PATTERNS: &[&str] = &[
    "cluster:monitor/*",
    "cluster:*get*",
    "cluster:*search*",
    "indices:admin/aliases/exists",
    "indices:admin/aliases/get",
    "indices:admin/exists*",
    "indices:admin/get*",
    "indices:admin/mappings/fields/get*",
    "indices:admin/mappings/get*",
    "indices:admin/refresh*",
    "indices:admin/types/exists",
    "indices:admin/validate/*",
    "indices:data/read/*",
];

static READ_REQUEST_MATCHER: Lazy<MatcherWithWildcards> =
    Lazy::new(|| MatcherWithWildcards::new(READ_REQUEST_PATTERNS.iter().copied()));

/// Process-wide matcher for read-only actions.
pub fn read_request_matcher() -> &'static MatcherWithWildcards {
    &READ_REQUEST_MATCHER
}
