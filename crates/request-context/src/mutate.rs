//! Structural rewrite of the indices a request addresses.
//!
//! Strategies are tried whole, in order, until one succeeds:
//! the `indices` array field, then (for a single index) the scalar `index`
//! field, then each alias action's `indices`.

use index_gate_core_types::{strip_placeholders, IndexSet};
use tracing::{error, info};

use crate::errors::{ContextError, MutationError};
use crate::introspect::extract_indices;
use crate::model::{ActionRequest, FieldError, FieldValue, ReflectiveRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Replacement {
    /// The request already addressed exactly these indices.
    Unchanged,
    /// The request now addresses the contained indices.
    Replaced(IndexSet),
}

const INDICES_FIELD: &str = "indices";
const INDEX_FIELD: &str = "index";
const ALIAS_ACTIONS_FIELD: &str = "actions";

/// Rewrites `request` to address `new_indices`.
///
/// Placeholders are dropped first; an empty remainder is refused because a
/// request without indices reaches every index.
pub fn replace_indices(
    request: &mut ActionRequest,
    new_indices: &IndexSet,
) -> Result<Replacement, ContextError> {
    let mut new_indices = new_indices.clone();
    strip_placeholders(&mut new_indices);
    if new_indices.is_empty() {
        return Err(ContextError::EmptyIndices);
    }

    let current = extract_indices(request)?;
    if new_indices == current {
        info!(
            "Not replacing. Indices are the same. Old:{:?} New:{:?}",
            current, new_indices
        );
        return Ok(Replacement::Unchanged);
    }
    info!("Replacing indices. Old:{:?} New:{:?}", current, new_indices);

    let mut errors = Vec::new();

    match set_indices_field(request, &new_indices) {
        Ok(()) => return Ok(Replacement::Replaced(new_indices)),
        Err(err) => errors.push(fatal_or(err)?),
    }

    if new_indices.len() == 1 {
        if let Some(only) = new_indices.iter().next() {
            match set_index_field(request, only) {
                Ok(()) => return Ok(Replacement::Replaced(new_indices)),
                Err(err) => errors.push(fatal_or(err)?),
            }
        }
    }

    if let ActionRequest::IndicesAliases(aliases) = request {
        if aliases.actions.is_empty() {
            errors.push(MutationError::MissingField {
                type_name: "IndicesAliasesRequest".to_string(),
                field: ALIAS_ACTIONS_FIELD,
            });
        } else {
            let replacement: Vec<String> = new_indices.iter().cloned().collect();
            for action in &mut aliases.actions {
                action.indices = replacement.clone();
            }
            return Ok(Replacement::Replaced(new_indices));
        }
    }

    for err in &errors {
        error!("Failed to set indices {err}");
    }
    Err(ContextError::IndicesNotReplaced {
        type_name: request.type_name().to_string(),
        causes: errors,
    })
}

fn fatal_or(err: MutationError) -> Result<MutationError, ContextError> {
    match err {
        MutationError::Field {
            type_name,
            source: FieldError::Denied { reason, .. },
            ..
        } => Err(ContextError::PermissionDenied { type_name, reason }),
        other => Ok(other),
    }
}

fn missing(request: &ActionRequest, field: &'static str) -> MutationError {
    MutationError::MissingField {
        type_name: request.type_name().to_string(),
        field,
    }
}

fn set_indices_field(request: &mut ActionRequest, new_indices: &IndexSet) -> Result<(), MutationError> {
    match request {
        ActionRequest::Indices(r) => {
            r.indices = new_indices.iter().cloned().collect();
            Ok(())
        }
        ActionRequest::Reflective(r) => set_reflective(
            r.as_mut(),
            INDICES_FIELD,
            FieldValue::StrArray(new_indices.iter().cloned().collect()),
        ),
        other => Err(missing(other, INDICES_FIELD)),
    }
}

fn set_index_field(request: &mut ActionRequest, index: &str) -> Result<(), MutationError> {
    match request {
        ActionRequest::SingleIndex(r) => {
            r.index = index.to_string();
            Ok(())
        }
        ActionRequest::Reflective(r) => {
            set_reflective(r.as_mut(), INDEX_FIELD, FieldValue::Str(index.to_string()))
        }
        other => Err(missing(other, INDEX_FIELD)),
    }
}

fn set_reflective(
    request: &mut dyn ReflectiveRequest,
    field: &'static str,
    value: FieldValue,
) -> Result<(), MutationError> {
    request
        .set_field(field, value)
        .map_err(|source| MutationError::Field {
            type_name: request.type_name().to_string(),
            field,
            source,
        })
}
