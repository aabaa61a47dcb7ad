use crate::model::GateSettings;

pub const DEFAULT_FORBIDDEN_RESPONSE: &str = "Forbidden";

/// Enabled, with no rules: every request falls through to the default deny.
pub fn default_settings() -> GateSettings {
    GateSettings {
        enable: true,
        response_if_req_forbidden: DEFAULT_FORBIDDEN_RESPONSE.to_string(),
        access_control_rules: Vec::new(),
        provenance: Default::default(),
    }
}
