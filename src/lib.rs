//! Index Gate
//!
//! Ordered-rule access control for index-based data platforms. Each inbound
//! request is wrapped in a [`RequestContext`], checked block by block, and
//! either forbidden or allowed with its index set possibly narrowed.

pub mod blocks;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod telemetry;

pub use blocks::{
    ActionsRule, Block, BlockExitResult, BlockPolicy, BlockRule, IndicesRule, PredicateRule,
    UsersRule,
};
pub use engine::{AccessControl, Decision};
pub use errors::GateError;
pub use gate::{Gate, GateOutcome, SharedGate, REQUEST_ID_HEADER};
pub use telemetry::init_logging;

pub use index_gate_acl as acl;
pub use index_gate_core_types as core_types;
pub use index_gate_policy_center as policy;
pub use index_gate_request_context as request;

pub use index_gate_request_context::RequestContext;
