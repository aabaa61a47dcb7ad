//! Request shapes the gate understands.
//!
//! Index-bearing requests come in a closed family of typed shapes. Anything
//! else is carried as [`ActionRequest::Reflective`], reached only through the
//! field-level [`ReflectiveRequest`] contract.

use std::fmt;
use std::net::SocketAddr;

use http::Method;
use serde_json::{Map, Value};
use thiserror::Error;

/// Transport-level view of an inbound request.
#[derive(Clone, Debug)]
pub struct RestRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub remote_address: SocketAddr,
    /// Identity resolved by the host before the gate runs.
    pub identity: Option<String>,
}

impl RestRequest {
    pub fn new(method: Method, uri: impl Into<String>, remote_address: SocketAddr) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Vec::new(),
            remote_address,
            identity: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// The URI without its query string.
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or_default()
    }
}

/// Request addressing its indices through an array field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndicesRequest {
    pub indices: Vec<String>,
}

impl IndicesRequest {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: indices.into_iter().map(Into::into).collect(),
        }
    }
}

/// Request addressing exactly one index through a scalar field (writes, gets).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleIndexRequest {
    pub index: String,
}

impl SingleIndexRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiGetItem {
    pub indices: Vec<String>,
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiGetRequest {
    pub items: Vec<MultiGetItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiSearchRequest {
    pub requests: Vec<IndicesRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiTermVectorsRequest {
    pub requests: Vec<SingleIndexRequest>,
}

#[derive(Debug, Default)]
pub struct BulkRequest {
    pub requests: Vec<ActionRequest>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasActionType {
    Add,
    Remove,
    RemoveIndex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasActions {
    pub action_type: AliasActionType,
    pub indices: Vec<String>,
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndicesAliasesRequest {
    pub actions: Vec<AliasActions>,
}

/// Composite request of a kind the gate has no extraction strategy for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCompositeRequest {
    pub type_name: String,
}

/// Request that addresses no index (cluster health, node info, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRequest {
    pub type_name: String,
}

/// Value read from, or written to, a field of a [`ReflectiveRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Str(String),
    StrArray(Vec<String>),
    /// Any other field type, described by name.
    Other(String),
}

impl FieldValue {
    fn describe(&self) -> String {
        match self {
            FieldValue::Null => "null".into(),
            FieldValue::Str(_) => "string".into(),
            FieldValue::StrArray(_) => "string array".into(),
            FieldValue::Other(kind) => kind.clone(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("no field '{0}'")]
    NoSuchField(String),
    #[error("field '{field}' holds {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
    #[error("access to field '{field}' denied: {reason}")]
    Denied { field: String, reason: String },
}

/// Field-level access to a request shape not known at compile time.
///
/// Implementations return [`FieldError::Denied`] when the host forbids
/// structural access; the gate treats that as fatal.
pub trait ReflectiveRequest: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;
    fn involves_indices(&self) -> bool;
    fn get_field(&self, name: &str) -> Result<FieldValue, FieldError>;
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;
}

/// [`ReflectiveRequest`] over a JSON object, as produced by generic deserialisers.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonRequest {
    type_name: String,
    involves_indices: bool,
    fields: Map<String, Value>,
}

impl JsonRequest {
    pub fn new(type_name: impl Into<String>, involves_indices: bool, fields: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            involves_indices,
            fields,
        }
    }

    /// Builds from a JSON value; non-object values carry no fields.
    pub fn from_value(type_name: impl Into<String>, involves_indices: bool, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(type_name, involves_indices, fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn to_field_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::String(s) => FieldValue::Str(s.clone()),
        Value::Array(items) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect();
            match strings {
                Some(strings) => FieldValue::StrArray(strings),
                None => FieldValue::Other("mixed array".into()),
            }
        }
        Value::Bool(_) => FieldValue::Other("bool".into()),
        Value::Number(_) => FieldValue::Other("number".into()),
        Value::Object(_) => FieldValue::Other("object".into()),
    }
}

impl ReflectiveRequest for JsonRequest {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn involves_indices(&self) -> bool {
        self.involves_indices
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldError> {
        self.fields
            .get(name)
            .map(to_field_value)
            .ok_or_else(|| FieldError::NoSuchField(name.to_string()))
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let slot = self
            .fields
            .get_mut(name)
            .ok_or_else(|| FieldError::NoSuchField(name.to_string()))?;
        let current = to_field_value(slot);
        let compatible = matches!(
            (&current, &value),
            (FieldValue::StrArray(_) | FieldValue::Null, FieldValue::StrArray(_))
                | (FieldValue::Str(_) | FieldValue::Null, FieldValue::Str(_))
        );
        if !compatible {
            return Err(FieldError::TypeMismatch {
                field: name.to_string(),
                expected: value.describe(),
                found: current.describe(),
            });
        }
        *slot = match value {
            FieldValue::Str(s) => Value::String(s),
            FieldValue::StrArray(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            FieldValue::Null | FieldValue::Other(_) => Value::Null,
        };
        Ok(())
    }
}

/// Action-level request wrapped by a context.
#[derive(Debug)]
pub enum ActionRequest {
    Indices(IndicesRequest),
    SingleIndex(SingleIndexRequest),
    MultiGet(MultiGetRequest),
    MultiSearch(MultiSearchRequest),
    MultiTermVectors(MultiTermVectorsRequest),
    Bulk(BulkRequest),
    IndicesAliases(IndicesAliasesRequest),
    UnknownComposite(UnknownCompositeRequest),
    Cluster(ClusterRequest),
    Reflective(Box<dyn ReflectiveRequest>),
}

impl ActionRequest {
    pub fn type_name(&self) -> &str {
        match self {
            ActionRequest::Indices(_) => "IndicesRequest",
            ActionRequest::SingleIndex(_) => "SingleIndexRequest",
            ActionRequest::MultiGet(_) => "MultiGetRequest",
            ActionRequest::MultiSearch(_) => "MultiSearchRequest",
            ActionRequest::MultiTermVectors(_) => "MultiTermVectorsRequest",
            ActionRequest::Bulk(_) => "BulkRequest",
            ActionRequest::IndicesAliases(_) => "IndicesAliasesRequest",
            ActionRequest::UnknownComposite(r) => &r.type_name,
            ActionRequest::Cluster(r) => &r.type_name,
            ActionRequest::Reflective(r) => r.type_name(),
        }
    }

    /// Whether the request targets indices at all.
    pub fn involves_indices(&self) -> bool {
        match self {
            ActionRequest::Cluster(_) => false,
            ActionRequest::Reflective(r) => r.involves_indices(),
            _ => true,
        }
    }

    /// Whether the request bundles independent sub-requests.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ActionRequest::MultiGet(_)
                | ActionRequest::MultiSearch(_)
                | ActionRequest::MultiTermVectors(_)
                | ActionRequest::Bulk(_)
                | ActionRequest::UnknownComposite(_)
        )
    }
}
