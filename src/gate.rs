//! Entry point the host calls for every inbound request.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use index_gate_core_types::RequestId;
use index_gate_policy_center::{load_settings, GateSettings};
use index_gate_request_context::{
    ActionRequest, ClusterCatalog, RequestContext, ResponseHeaders, RestRequest,
};
use tracing::{debug, error, info, warn};

use crate::engine::{AccessControl, Decision};
use crate::errors::GateError;

/// Header a fronting proxy may use to forward its own request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Allowed { decision: Option<Decision> },
    Forbidden { message: String, decision: Option<Decision> },
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateOutcome::Allowed { .. })
    }
}

/// Access control built from one settings snapshot.
pub struct Gate {
    enabled: bool,
    forbidden_message: String,
    access_control: AccessControl,
    catalog: Arc<dyn ClusterCatalog>,
}

impl Gate {
    pub fn from_settings(
        settings: &GateSettings,
        catalog: Arc<dyn ClusterCatalog>,
    ) -> Result<Self, GateError> {
        if !settings.enable {
            info!("index gate disabled, every request will be allowed");
        }
        Ok(Self {
            enabled: settings.enable,
            forbidden_message: settings.response_if_req_forbidden.clone(),
            access_control: AccessControl::from_settings(settings)?,
            catalog,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn access_control(&self) -> &AccessControl {
        &self.access_control
    }

    /// Wraps an inbound request. A well-formed forwarded request id is kept
    /// for correlation; a malformed one is ignored.
    pub fn context(
        &self,
        request: RestRequest,
        action: &str,
        action_request: ActionRequest,
        response_headers: Arc<dyn ResponseHeaders>,
    ) -> RequestContext {
        let forwarded = request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(REQUEST_ID_HEADER))
            .and_then(|(_, value)| match RequestId::parse(value) {
                Ok(id) => Some(id),
                Err(err) => {
                    debug!(error = %err, "ignoring forwarded request id");
                    None
                }
            });
        let cx = RequestContext::new(
            request,
            action,
            action_request,
            Arc::clone(&self.catalog),
            response_headers,
        );
        match forwarded {
            Some(id) => cx.with_correlation_id(id),
            None => cx,
        }
    }

    /// Decides `cx`. Recoverable failures deny the request; fatal ones surface.
    pub fn check(&self, cx: &mut RequestContext) -> Result<GateOutcome, GateError> {
        if !self.enabled {
            return Ok(GateOutcome::Allowed { decision: None });
        }
        match self.access_control.evaluate(cx) {
            Ok(decision) if decision.is_allowed() => Ok(GateOutcome::Allowed {
                decision: Some(decision),
            }),
            Ok(decision) => {
                if decision == Decision::DefaultDeny {
                    info!(id = %cx.id(), "request matches no blocks, forbidden by default");
                }
                Ok(self.forbidden(Some(decision)))
            }
            Err(err) if !err.is_fatal() => {
                warn!(id = %cx.id(), severity = err.severity(), "denying request: {err}");
                Ok(self.forbidden(None))
            }
            Err(err) => {
                error!(id = %cx.id(), severity = err.severity(), "evaluation aborted: {err}");
                Err(err)
            }
        }
    }

    fn forbidden(&self, decision: Option<Decision>) -> GateOutcome {
        GateOutcome::Forbidden {
            message: self.forbidden_message.clone(),
            decision,
        }
    }
}

/// Hot-swappable gate. In-flight evaluations keep the snapshot they loaded.
pub struct SharedGate {
    current: ArcSwap<Gate>,
    lkg: ArcSwap<Gate>,
}

impl SharedGate {
    pub fn new(initial: Gate) -> Self {
        let initial = Arc::new(initial);
        Self {
            current: ArcSwap::from(Arc::clone(&initial)),
            lkg: ArcSwap::from(initial),
        }
    }

    pub fn get(&self) -> Arc<Gate> {
        self.current.load_full()
    }

    pub fn swap(&self, next: Gate) {
        let previous = self.current.swap(Arc::new(next));
        self.lkg.store(previous);
    }

    /// Restores the gate that was active before the last swap.
    pub fn rollback(&self) -> Arc<Gate> {
        let gate = self.lkg.load_full();
        self.current.store(Arc::clone(&gate));
        gate
    }

    /// Rebuilds from settings on disk; the running gate stays on failure.
    pub fn reload(&self, path: Option<&Path>) -> Result<(), GateError> {
        let catalog = Arc::clone(&self.get().catalog);
        let settings = load_settings(path)?;
        let gate = Gate::from_settings(&settings, catalog)?;
        self.swap(gate);
        info!(rules = settings.access_control_rules.len(), "gate settings reloaded");
        Ok(())
    }
}
