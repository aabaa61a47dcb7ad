//! Per-request state for the index gate.
//!
//! A [`RequestContext`] wraps one inbound request for the length of an
//! evaluation pass: it discovers the indices the request addresses, lets
//! rules narrow them, and defers every structural change to
//! [`RequestContext::commit`].

pub mod catalog;
pub mod context;
pub mod errors;
pub mod introspect;
pub mod model;
pub mod mutate;
pub mod side_effects;

pub use catalog::{ClusterCatalog, InMemoryResponseHeaders, ResponseHeaders, StaticCatalog};
pub use context::{BlockHistory, RequestContext, RuleExitResult, USER_HEADER};
pub use errors::{ContextError, MutationError};
pub use introspect::{extract_indices, UNDISCOVERED};
pub use model::{
    ActionRequest, AliasActionType, AliasActions, BulkRequest, ClusterRequest, FieldError,
    FieldValue, IndicesAliasesRequest, IndicesRequest, JsonRequest, MultiGetItem,
    MultiGetRequest, MultiSearchRequest, MultiTermVectorsRequest, ReflectiveRequest, RestRequest,
    SingleIndexRequest, UnknownCompositeRequest,
};
pub use mutate::{replace_indices, Replacement};
pub use side_effects::{RequestSideEffects, SideEffect};
