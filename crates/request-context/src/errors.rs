use thiserror::Error;

use crate::model::FieldError;

/// Why one structural rewrite strategy failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("{type_name} has no settable '{field}' field")]
    MissingField {
        type_name: String,
        field: &'static str,
    },
    #[error("{type_name}.{field}: {source}")]
    Field {
        type_name: String,
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot {op} indices of a request that doesn't involve indices: {type_name} (id {id})")]
    NotIndicesRequest {
        op: &'static str,
        type_name: String,
        id: String,
    },
    #[error(
        "Attempted to set empty indices list, this would allow full access, therefore this is forbidden. If this was intended, set '*' as indices."
    )]
    EmptyIndices,
    #[error("insufficient permissions to access the indices of {type_name}: {reason}")]
    PermissionDenied { type_name: String, reason: String },
    #[error("failed to replace indices of {type_name}: {}", join_causes(.causes))]
    IndicesNotReplaced {
        type_name: String,
        causes: Vec<MutationError>,
    },
}

impl ContextError {
    /// Contract violations and permission denials abort the evaluation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ContextError::IndicesNotReplaced { .. })
    }
}

fn join_causes(causes: &[MutationError]) -> String {
    causes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
