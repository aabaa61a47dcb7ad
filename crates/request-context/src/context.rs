use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use index_gate_acl::{read_request_matcher, AclRequest, MatcherWithWildcards};
use index_gate_core_types::{strip_placeholders, IndexSet, RequestId};
use once_cell::unsync::OnceCell;
use tracing::{debug, warn, Level};

use crate::catalog::{ClusterCatalog, ResponseHeaders};
use crate::errors::ContextError;
use crate::introspect::extract_indices;
use crate::model::{ActionRequest, RestRequest};
use crate::mutate::{replace_indices, Replacement};
use crate::side_effects::{RequestSideEffects, SideEffect};

/// Response header carrying the identity a request was allowed as.
pub const USER_HEADER: &str = "X-Gate-User";

const LOCALHOST: &str = "127.0.0.1";

/// Outcome of one rule inside a block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleExitResult {
    pub rule: String,
    pub matched: bool,
}

impl RuleExitResult {
    pub fn new(rule: impl Into<String>, matched: bool) -> Self {
        Self {
            rule: rule.into(),
            matched,
        }
    }
}

impl fmt::Display for RuleExitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.rule, self.matched)
    }
}

/// Audit record of one block evaluated against a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHistory {
    pub name: String,
    pub results: Vec<RuleExitResult>,
}

impl fmt::Display for BlockHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self
            .results
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}->[{}]]", self.name, results)
    }
}

/// State of one in-flight request across an evaluation pass.
///
/// Owned by that evaluation alone; nothing here is shared between threads.
pub struct RequestContext {
    id: RequestId,
    correlation_id: Option<RequestId>,
    request: RestRequest,
    action: String,
    action_request: ActionRequest,
    headers: BTreeMap<String, String>,
    remote_address: String,
    catalog: Arc<dyn ClusterCatalog>,
    response_headers: Arc<dyn ResponseHeaders>,
    content: OnceCell<String>,
    indices: Option<Arc<IndexSet>>,
    original_indices: Option<Arc<IndexSet>>,
    side_effects: RequestSideEffects,
    history: Vec<BlockHistory>,
    logged_in_user: Option<String>,
}

impl RequestContext {
    pub fn new(
        request: RestRequest,
        action: impl Into<String>,
        action_request: ActionRequest,
        catalog: Arc<dyn ClusterCatalog>,
        response_headers: Arc<dyn ResponseHeaders>,
    ) -> Self {
        let headers = request
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        let remote_address = normalize_address(request.remote_address.ip());
        Self {
            id: RequestId::new(),
            correlation_id: None,
            request,
            action: action.into(),
            action_request,
            headers,
            remote_address,
            catalog,
            response_headers,
            content: OnceCell::new(),
            indices: None,
            original_indices: None,
            side_effects: RequestSideEffects::new(),
            history: Vec::new(),
            logged_in_user: None,
        }
    }

    /// Attaches an id forwarded by a fronting proxy, kept for log
    /// correlation only. The minted [`id`](Self::id) stays authoritative.
    pub fn with_correlation_id(mut self, correlation_id: RequestId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn correlation_id(&self) -> Option<&RequestId> {
        self.correlation_id.as_ref()
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn action_request(&self) -> &ActionRequest {
        &self.action_request
    }

    /// Hands the request back for dispatch, rewrites applied.
    pub fn into_action_request(self) -> ActionRequest {
        self.action_request
    }

    pub fn rest_request(&self) -> &RestRequest {
        &self.request
    }

    /// Headers keyed by lower-cased name; the last value received wins.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn method(&self) -> &str {
        self.request.method.as_str()
    }

    pub fn uri(&self) -> &str {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// Peer address; every loopback form reads as `127.0.0.1`.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Identity the host resolved before the gate ran.
    pub fn resolved_identity(&self) -> Option<&str> {
        self.request.identity.as_deref()
    }

    /// Body as UTF-8; empty when it does not decode.
    pub fn content(&self) -> &str {
        self.content
            .get_or_init(|| String::from_utf8(self.request.body.clone()).unwrap_or_default())
    }

    pub fn content_length(&self) -> usize {
        self.request.body.len()
    }

    pub fn involves_indices(&self) -> bool {
        self.action_request.involves_indices()
    }

    pub fn is_read_request(&self) -> bool {
        read_request_matcher().matches(&self.action)
    }

    pub fn available_indices_and_aliases(&self) -> IndexSet {
        self.catalog.indices_and_aliases()
    }

    /// Live index patterns resolved against the catalog.
    pub fn expanded_indices(&mut self) -> Result<IndexSet, ContextError> {
        let indices = self.indices()?;
        let available = self.available_indices_and_aliases();
        Ok(MatcherWithWildcards::new(indices.iter()).filter(&available))
    }

    /// Indices as first discovered; later rewrites and resets leave this alone.
    pub fn original_indices(&mut self) -> Result<Arc<IndexSet>, ContextError> {
        if let Some(original) = &self.original_indices {
            return Ok(Arc::clone(original));
        }
        let original = Arc::new(self.current_indices()?);
        self.original_indices = Some(Arc::clone(&original));
        Ok(original)
    }

    /// Live index set, discovered once and cached until [`reset`](Self::reset)
    /// or [`set_indices`](Self::set_indices).
    pub fn indices(&mut self) -> Result<Arc<IndexSet>, ContextError> {
        self.require_indices("get")?;
        if let Some(indices) = &self.indices {
            return Ok(Arc::clone(indices));
        }
        let indices = Arc::new(self.current_indices()?);
        if self.original_indices.is_none() {
            self.original_indices = Some(Arc::clone(&indices));
        }
        self.indices = Some(Arc::clone(&indices));
        Ok(indices)
    }

    /// Fresh introspection of the wrapped request, bypassing the cache.
    pub fn current_indices(&self) -> Result<IndexSet, ContextError> {
        self.require_indices("get")?;
        debug!(id = %self.id, "Finding indices for: {}", self.describe(true));
        extract_indices(&self.action_request)
    }

    /// Narrows the live set now and queues the structural rewrite for commit.
    pub fn set_indices(&mut self, new_indices: IndexSet) -> Result<(), ContextError> {
        self.require_indices("set")?;
        let mut effective = new_indices;
        strip_placeholders(&mut effective);
        if effective.is_empty() {
            return Err(ContextError::EmptyIndices);
        }
        self.original_indices()?;
        self.indices = Some(Arc::new(effective.clone()));
        self.side_effects
            .append_effect(SideEffect::SetIndices(effective));
        Ok(())
    }

    pub fn set_response_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.side_effects.append_effect(SideEffect::SetResponseHeader {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn logged_in_user(&self) -> Option<&str> {
        self.logged_in_user.as_deref()
    }

    /// Records the identity for this pass; the first identity set sticks.
    pub fn set_logged_in_user(&mut self, user: impl Into<String>) {
        let user = user.into();
        if let Some(existing) = self.logged_in_user.as_deref() {
            if existing != user {
                warn!(id = %self.id, existing = %existing, rejected = %user, "identity already set for this pass");
            }
            return;
        }
        self.logged_in_user = Some(user);
    }

    pub fn add_to_history(&mut self, block: impl Into<String>, results: Vec<RuleExitResult>) {
        self.history.push(BlockHistory {
            name: block.into(),
            results,
        });
    }

    pub fn history(&self) -> &[BlockHistory] {
        &self.history
    }

    pub fn side_effects(&self) -> &RequestSideEffects {
        &self.side_effects
    }

    /// Applies queued effects in order and stamps the identity header.
    pub fn commit(&mut self) -> Result<(), ContextError> {
        let mut ledger = std::mem::take(&mut self.side_effects);
        ledger.commit(|effect| self.apply_effect(effect))?;
        if let Some(user) = self.logged_in_user.as_deref().filter(|u| !u.is_empty()) {
            self.response_headers.add_response_header(USER_HEADER, user);
        }
        Ok(())
    }

    /// Clears identity, the live index cache and queued effects.
    /// History, id and original indices survive.
    pub fn reset(&mut self) {
        self.logged_in_user = None;
        self.indices = None;
        self.side_effects.clear();
    }

    fn apply_effect(&mut self, effect: SideEffect) -> Result<(), ContextError> {
        match effect {
            SideEffect::SetIndices(new_indices) => {
                match replace_indices(&mut self.action_request, &new_indices)? {
                    Replacement::Unchanged => {}
                    Replacement::Replaced(applied) => {
                        debug!(id = %self.id, "success changing indices: {:?}", applied);
                        self.indices = Some(Arc::new(applied));
                    }
                }
            }
            SideEffect::SetResponseHeader { name, value } => {
                self.response_headers.add_response_header(&name, &value);
            }
        }
        Ok(())
    }

    fn require_indices(&self, op: &'static str) -> Result<(), ContextError> {
        if self.involves_indices() {
            return Ok(());
        }
        Err(ContextError::NotIndicesRequest {
            op,
            type_name: self.action_request.type_name().to_string(),
            id: self.id.to_string(),
        })
    }

    fn describe(&self, skip_indices: bool) -> String {
        let indices = match &self.indices {
            Some(indices) if !skip_indices => {
                indices.iter().cloned().collect::<Vec<_>>().join(",")
            }
            _ => "<N/A>".to_string(),
        };
        let debug = tracing::enabled!(Level::DEBUG);
        let content = if debug {
            match self.content() {
                "" => "<N/A>".to_string(),
                c => c.to_string(),
            }
        } else {
            format!("<OMITTED, LENGTH={}>", self.content_length())
        };
        let headers = if debug {
            self.headers
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",")
        } else {
            self.headers.keys().cloned().collect::<Vec<_>>().join(",")
        };
        let history = self
            .history
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{{ ID:{}, TYP:{}, USR:{}, BRS:{}, ACT:{}, OA:{}, IDX:{}, MET:{}, PTH:{}, CNT:{}, HDR:{}, EFF:{}, HIS:{} }}",
            self.id,
            self.action_request.type_name(),
            self.logged_in_user.as_deref().unwrap_or("<N/A>"),
            self.header("User-Agent").map_or(false, |ua| !ua.is_empty()),
            self.action,
            self.remote_address,
            indices,
            self.method(),
            self.path(),
            content,
            headers,
            self.side_effects.size(),
            history,
        )
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(false))
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("correlation_id", &self.correlation_id)
            .field("action", &self.action)
            .field("type", &self.action_request.type_name())
            .field("indices", &self.indices)
            .field("effects", &self.side_effects.size())
            .finish()
    }
}

impl AclRequest for RequestContext {
    fn address(&self) -> &str {
        self.remote_address()
    }

    fn content_length(&self) -> usize {
        RequestContext::content_length(self)
    }

    fn uri(&self) -> &str {
        RequestContext::uri(self)
    }

    fn method(&self) -> &str {
        RequestContext::method(self)
    }
}

fn normalize_address(ip: IpAddr) -> String {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };
    if ip.is_loopback() {
        LOCALHOST.to_string()
    } else {
        ip.to_string()
    }
}
