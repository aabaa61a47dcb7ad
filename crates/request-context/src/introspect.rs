//! Discovery of the indices a request addresses. Read-only.

use index_gate_core_types::IndexSet;
use tracing::{debug, error, warn};

use crate::errors::ContextError;
use crate::model::{ActionRequest, FieldError, FieldValue, ReflectiveRequest};

/// Stands in for a sub-request whose indices could not be discovered.
///
/// It reads as a wildcard, so index rules never mistake a partially
/// discovered batch for one that addresses only permitted indices.
pub const UNDISCOVERED: &str = "*";

const INDICES_FIELD: &str = "indices";
const INDEX_FIELD: &str = "index";

/// Every index named by `request`, deduplicated.
///
/// Callers must check [`ActionRequest::involves_indices`] first; an empty result
/// means nothing could be discovered, never "all indices".
pub fn extract_indices(request: &ActionRequest) -> Result<IndexSet, ContextError> {
    let mut found = Vec::new();
    collect(request, &mut found)?;
    let indices: IndexSet = found.into_iter().collect();
    debug!(
        request_type = request.type_name(),
        composite = request.is_composite(),
        "Discovered indices: {}",
        indices.iter().cloned().collect::<Vec<_>>().join(",")
    );
    Ok(indices)
}

fn collect(request: &ActionRequest, out: &mut Vec<String>) -> Result<(), ContextError> {
    match request {
        ActionRequest::Indices(r) => out.extend(r.indices.iter().cloned()),
        ActionRequest::SingleIndex(r) => out.push(r.index.clone()),
        ActionRequest::MultiGet(r) => {
            for item in &r.items {
                extend_item(out, &item.indices);
            }
        }
        ActionRequest::MultiSearch(r) => {
            for sub in &r.requests {
                extend_item(out, &sub.indices);
            }
        }
        ActionRequest::MultiTermVectors(r) => {
            for sub in &r.requests {
                out.push(sub.index.clone());
            }
        }
        ActionRequest::Bulk(r) => {
            for item in &r.requests {
                let before = out.len();
                collect(item, out)?;
                if item.involves_indices() && out[before..].iter().all(String::is_empty) {
                    warn!(
                        item_type = item.type_name(),
                        "bulk item without discoverable indices; treating it as addressing every index"
                    );
                    out.push(UNDISCOVERED.to_string());
                }
            }
        }
        ActionRequest::IndicesAliases(r) => {
            for action in &r.actions {
                out.extend(action.indices.iter().cloned());
            }
        }
        ActionRequest::UnknownComposite(r) => {
            error!(
                request_type = %r.type_name,
                "Found a composite request that could not be handled: report this as a bug immediately!"
            );
        }
        ActionRequest::Cluster(r) => {
            debug!(request_type = %r.type_name, "cluster-level item carries no indices");
        }
        ActionRequest::Reflective(r) => out.extend(extract_via_reflection(r.as_ref())?),
    }
    Ok(())
}

fn extend_item(out: &mut Vec<String>, indices: &[String]) {
    if indices.is_empty() {
        out.push(UNDISCOVERED.to_string());
    } else {
        out.extend(indices.iter().cloned());
    }
}

/// Reads the `indices` array of an untyped request, falling back to a scalar
/// `index` field.
fn extract_via_reflection(request: &dyn ReflectiveRequest) -> Result<Vec<String>, ContextError> {
    if let Some(FieldValue::StrArray(indices)) = read_field(request, INDICES_FIELD)? {
        return Ok(indices);
    }
    match read_field(request, INDEX_FIELD)? {
        Some(FieldValue::Str(index)) => Ok(vec![index]),
        other => {
            warn!(
                request_type = request.type_name(),
                field = ?other,
                "Failed to discover indices associated to this request"
            );
            Ok(Vec::new())
        }
    }
}

/// `None` when the field is missing or unreadable; a denial is fatal.
fn read_field(
    request: &dyn ReflectiveRequest,
    field: &str,
) -> Result<Option<FieldValue>, ContextError> {
    match request.get_field(field) {
        Ok(value) => Ok(Some(value)),
        Err(FieldError::Denied { reason, .. }) => {
            error!(request_type = request.type_name(), "Can't get indices for request");
            Err(ContextError::PermissionDenied {
                type_name: request.type_name().to_string(),
                reason,
            })
        }
        Err(FieldError::NoSuchField(_)) => Ok(None),
        Err(err) => {
            debug!(request_type = request.type_name(), error = %err, "unreadable field");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use index_gate_core_types::index_set;
    use serde_json::json;

    #[derive(Debug)]
    struct Sealed;

    impl ReflectiveRequest for Sealed {
        fn type_name(&self) -> &str {
            "Sealed"
        }

        fn involves_indices(&self) -> bool {
            true
        }

        fn get_field(&self, name: &str) -> Result<FieldValue, FieldError> {
            Err(FieldError::Denied {
                field: name.into(),
                reason: "structural access disabled".into(),
            })
        }

        fn set_field(&mut self, name: &str, _value: FieldValue) -> Result<(), FieldError> {
            self.get_field(name).map(|_| ())
        }
    }

    #[test]
    fn simple_shapes() {
        let req = ActionRequest::Indices(IndicesRequest::new(["a", "b", "a"]));
        assert_eq!(extract_indices(&req).unwrap(), index_set(["a", "b"]));

        let req = ActionRequest::SingleIndex(SingleIndexRequest::new("logs"));
        assert_eq!(extract_indices(&req).unwrap(), index_set(["logs"]));
    }

    #[test]
    fn batch_shapes_union_their_items() {
        let mget = ActionRequest::MultiGet(MultiGetRequest {
            items: vec![
                MultiGetItem {
                    indices: vec!["a".into()],
                    id: "1".into(),
                },
                MultiGetItem {
                    indices: vec!["b".into(), "a".into()],
                    id: "2".into(),
                },
            ],
        });
        assert_eq!(extract_indices(&mget).unwrap(), index_set(["a", "b"]));

        let msearch = ActionRequest::MultiSearch(MultiSearchRequest {
            requests: vec![IndicesRequest::new(["x"]), IndicesRequest::new(["y", "z"])],
        });
        assert_eq!(extract_indices(&msearch).unwrap(), index_set(["x", "y", "z"]));

        let mtv = ActionRequest::MultiTermVectors(MultiTermVectorsRequest {
            requests: vec![SingleIndexRequest::new("t1"), SingleIndexRequest::new("t2")],
        });
        assert_eq!(extract_indices(&mtv).unwrap(), index_set(["t1", "t2"]));
    }

    #[test]
    fn bulk_recurses_into_heterogeneous_items() {
        let bulk = ActionRequest::Bulk(BulkRequest {
            requests: vec![
                ActionRequest::SingleIndex(SingleIndexRequest::new("x")),
                ActionRequest::Reflective(Box::new(JsonRequest::from_value(
                    "UpdateRequest",
                    true,
                    json!({"indices": ["y"]}),
                ))),
            ],
        });
        assert_eq!(extract_indices(&bulk).unwrap(), index_set(["x", "y"]));
    }

    #[test]
    fn alias_actions_are_unioned() {
        let req = ActionRequest::IndicesAliases(IndicesAliasesRequest {
            actions: vec![
                AliasActions {
                    action_type: AliasActionType::Add,
                    indices: vec!["logs-1".into()],
                    aliases: vec!["logs".into()],
                },
                AliasActions {
                    action_type: AliasActionType::Remove,
                    indices: vec!["logs-0".into()],
                    aliases: vec!["logs".into()],
                },
            ],
        });
        assert_eq!(extract_indices(&req).unwrap(), index_set(["logs-0", "logs-1"]));
    }

    #[test]
    fn unknown_composite_yields_nothing() {
        let req = ActionRequest::UnknownComposite(UnknownCompositeRequest {
            type_name: "MultiPercolateRequest".into(),
        });
        assert!(extract_indices(&req).unwrap().is_empty());
    }

    #[test]
    fn reflection_falls_back_to_scalar_index() {
        let req = ActionRequest::Reflective(Box::new(JsonRequest::from_value(
            "DeleteRequest",
            true,
            json!({"index": "secrets", "id": "1"}),
        )));
        assert_eq!(extract_indices(&req).unwrap(), index_set(["secrets"]));

        let null_array = ActionRequest::Reflective(Box::new(JsonRequest::from_value(
            "DeleteRequest",
            true,
            json!({"indices": null, "index": "logs"}),
        )));
        assert_eq!(extract_indices(&null_array).unwrap(), index_set(["logs"]));
    }

    #[test]
    fn bulk_items_with_scalar_index_are_discovered() {
        let bulk = ActionRequest::Bulk(BulkRequest {
            requests: vec![
                ActionRequest::SingleIndex(SingleIndexRequest::new("logstash-1")),
                ActionRequest::Reflective(Box::new(JsonRequest::from_value(
                    "DeleteRequest",
                    true,
                    json!({"index": "secrets"}),
                ))),
            ],
        });
        assert_eq!(
            extract_indices(&bulk).unwrap(),
            index_set(["logstash-1", "secrets"])
        );
    }

    #[test]
    fn undiscoverable_batch_items_read_as_everything() {
        let bulk = ActionRequest::Bulk(BulkRequest {
            requests: vec![
                ActionRequest::SingleIndex(SingleIndexRequest::new("logstash-1")),
                ActionRequest::UnknownComposite(UnknownCompositeRequest {
                    type_name: "MultiPercolateRequest".into(),
                }),
                ActionRequest::Reflective(Box::new(JsonRequest::from_value(
                    "Opaque",
                    true,
                    json!({"routing": "r1"}),
                ))),
                ActionRequest::Cluster(ClusterRequest {
                    type_name: "ClusterHealthRequest".into(),
                }),
            ],
        });
        assert_eq!(
            extract_indices(&bulk).unwrap(),
            index_set(["logstash-1", UNDISCOVERED])
        );

        let msearch = ActionRequest::MultiSearch(MultiSearchRequest {
            requests: vec![IndicesRequest::new(["x"]), IndicesRequest::default()],
        });
        assert_eq!(extract_indices(&msearch).unwrap(), index_set(["x", UNDISCOVERED]));
    }

    #[test]
    fn reflection_degrades_to_empty_on_structural_miss() {
        let no_field = ActionRequest::Reflective(Box::new(JsonRequest::from_value(
            "Weird",
            true,
            json!({"routing": "a"}),
        )));
        assert!(extract_indices(&no_field).unwrap().is_empty());

        let null_field = ActionRequest::Reflective(Box::new(JsonRequest::from_value(
            "Weird",
            true,
            json!({"indices": null}),
        )));
        assert!(extract_indices(&null_field).unwrap().is_empty());
    }

    #[test]
    fn reflection_denial_is_fatal() {
        let req = ActionRequest::Reflective(Box::new(Sealed));
        let err = extract_indices(&req).unwrap_err();
        assert!(matches!(err, ContextError::PermissionDenied { .. }));
        assert!(err.is_fatal());
    }
}
