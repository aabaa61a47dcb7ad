use std::collections::HashSet;

use index_gate_core_types::HostPattern;
use regex::Regex;

use crate::errors::PolicyError;
use crate::model::{GateSettings, RuleSettings};

/// Upper bound on configured rule groups.
pub const MAX_RULES: usize = 1024;

pub const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH", "TRACE", "CONNECT",
];

pub fn validate_settings(settings: &GateSettings) -> Result<(), PolicyError> {
    let rules = &settings.access_control_rules;
    if rules.len() > MAX_RULES {
        return Err(PolicyError::TooManyRules {
            max: MAX_RULES,
            attempted: rules.len(),
        });
    }

    let mut seen = HashSet::new();
    for rule in rules {
        if rule.name.trim().is_empty() {
            return Err(PolicyError::Invalid("rule without a name".into()));
        }
        if !seen.insert(rule.name.as_str()) {
            return Err(PolicyError::rule(&rule.name, "duplicate rule name"));
        }
        validate_rule(rule)?;
    }
    Ok(())
}

fn validate_rule(rule: &RuleSettings) -> Result<(), PolicyError> {
    for (field, list) in [
        ("hosts", &rule.hosts),
        ("methods", &rule.methods),
        ("actions", &rule.actions),
        ("indices", &rule.indices),
        ("users", &rule.users),
    ] {
        if let Some(values) = list {
            if values.is_empty() {
                return Err(PolicyError::rule(&rule.name, format!("'{field}' is empty")));
            }
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(PolicyError::rule(
                    &rule.name,
                    format!("'{field}' contains a blank entry"),
                ));
            }
        }
    }

    if let Some(hosts) = &rule.hosts {
        if let Some(bad) = hosts.iter().find(|h| HostPattern::parse(h).is_none()) {
            return Err(PolicyError::rule(
                &rule.name,
                format!("invalid host pattern '{bad}'"),
            ));
        }
    }

    if let Some(methods) = &rule.methods {
        for method in methods {
            let upper = method.trim().to_ascii_uppercase();
            if !KNOWN_METHODS.contains(&upper.as_str()) {
                return Err(PolicyError::rule(
                    &rule.name,
                    format!("unknown HTTP method '{method}'"),
                ));
            }
        }
    }

    if let Some(pattern) = &rule.uri_re {
        Regex::new(pattern)
            .map_err(|err| PolicyError::rule(&rule.name, format!("invalid uri_re: {err}")))?;
    }
    Ok(())
}
