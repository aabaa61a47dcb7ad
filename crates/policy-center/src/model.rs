use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

/// Whole settings document for the gate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateSettings {
    pub enable: bool,
    pub response_if_req_forbidden: String,
    pub access_control_rules: Vec<RuleSettings>,
    #[serde(skip)]
    pub provenance: HashMap<String, SettingProvenance>,
}

impl Default for GateSettings {
    fn default() -> Self {
        crate::defaults::default_settings()
    }
}

impl GateSettings {
    pub fn set_provenance(&mut self, path: &str, source: SettingSource) {
        self.provenance.insert(
            path.to_string(),
            SettingProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<SettingSource> {
        self.provenance.get(path).map(|p| p.source)
    }
}

/// One named rule group. Every constraint is optional; an absent one always matches.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSettings {
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(
        default,
        rename = "maxBodyLength",
        alias = "max_body_length",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_body_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_re: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
}

impl RuleSettings {
    /// A rule with no constraints, matching every request.
    pub fn new(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            name: name.into(),
            rule_type,
            hosts: None,
            max_body_length: None,
            uri_re: None,
            methods: None,
            actions: None,
            indices: None,
            users: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum RuleType {
    Allow,
    Forbid,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allow => "ALLOW",
            RuleType::Forbid => "FORBID",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = PolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(RuleType::Allow),
            "forbid" => Ok(RuleType::Forbid),
            other => Err(PolicyError::InvalidValue(format!(
                "rule type must be allow or forbid, got '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for RuleType {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleType> for String {
    fn from(value: RuleType) -> Self {
        value.as_str().to_ascii_lowercase()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettingProvenance {
    pub path: String,
    pub source: SettingSource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettingSource {
    Builtin,
    File,
    Env,
}
