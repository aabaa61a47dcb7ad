use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::defaults::default_settings;
use crate::errors::PolicyError;
use crate::model::{GateSettings, RuleSettings, SettingSource};
use crate::validate::validate_settings;

const ENV_PREFIX: &str = "INDEX_GATE__";
const ENV_RULES_JSON: &str = "INDEX_GATE_RULES_JSON";
const ENV_SETTINGS_PATH: &str = "INDEX_GATE_SETTINGS_PATH";

const PATH_ENABLE: &str = "enable";
const PATH_FORBIDDEN_RESPONSE: &str = "response_if_req_forbidden";
const PATH_RULES: &str = "access_control_rules";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// Loads settings from `path` (or `INDEX_GATE_SETTINGS_PATH`), then the environment.
pub fn load_settings(path: Option<&Path>) -> Result<GateSettings, PolicyError> {
    let mut options = LoadOptions {
        include_env: true,
        ..LoadOptions::default()
    };
    match path {
        Some(p) => options.paths.push(p.to_path_buf()),
        None => {
            if let Ok(p) = env::var(ENV_SETTINGS_PATH) {
                if !p.trim().is_empty() {
                    options.paths.push(PathBuf::from(p));
                }
            }
        }
    }
    load_settings_with_options(&options)
}

pub fn load_settings_with_options(options: &LoadOptions) -> Result<GateSettings, PolicyError> {
    let mut settings = default_settings();
    bootstrap_builtin_provenance(&mut settings);

    for path in &options.paths {
        if path.exists() {
            let overlays = overlays_from_file(path)?;
            apply_overlays(&mut settings, overlays)?;
            info!(path = %path.display(), "loaded access control settings");
        } else {
            debug!(path = %path.display(), "settings file not found; skipping");
        }
    }

    if options.include_env {
        let env_overlays = overlays_from_env()?;
        apply_overlays(&mut settings, env_overlays)?;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

/// Parses a full settings document, JSON first and YAML as fallback.
pub fn parse_settings_str(raw: &str) -> Result<GateSettings, PolicyError> {
    let value = parse_document(raw)?;
    let mut settings = default_settings();
    bootstrap_builtin_provenance(&mut settings);
    apply_overlays(&mut settings, overlays_from_value(value, SettingSource::File)?)?;
    validate_settings(&settings)?;
    Ok(settings)
}

struct SettingOverlay {
    path: String,
    value: Value,
    source: SettingSource,
}

fn apply_overlays(
    settings: &mut GateSettings,
    overlays: Vec<SettingOverlay>,
) -> Result<(), PolicyError> {
    for overlay in overlays {
        apply_overlay(settings, &overlay.path, overlay.value, overlay.source)?;
    }
    Ok(())
}

fn apply_overlay(
    settings: &mut GateSettings,
    path: &str,
    value: Value,
    source: SettingSource,
) -> Result<(), PolicyError> {
    match path {
        PATH_ENABLE => settings.enable = to_bool(&value)?,
        PATH_FORBIDDEN_RESPONSE => settings.response_if_req_forbidden = to_string(&value)?,
        PATH_RULES => {
            settings.access_control_rules = serde_json::from_value::<Vec<RuleSettings>>(value)
                .map_err(|err| PolicyError::Invalid(format!("{PATH_RULES}: {err}")))?;
        }
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    }
    settings.set_provenance(path, source);
    Ok(())
}

fn parse_document(raw: &str) -> Result<Value, PolicyError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            let yaml_value: serde_yaml::Value = serde_yaml::from_str(raw).map_err(|yaml_err| {
                PolicyError::Invalid(format!(
                    "json error: {}; yaml error: {}",
                    json_err, yaml_err
                ))
            })?;
            serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(format!("{}", err)))
        }
    }
}

fn overlays_from_file(path: &Path) -> Result<Vec<SettingOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    let value = parse_document(&content)?;
    overlays_from_value(value, SettingSource::File)
}

fn overlays_from_value(value: Value, source: SettingSource) -> Result<Vec<SettingOverlay>, PolicyError> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| SettingOverlay {
                path: key.trim().to_ascii_lowercase(),
                value,
                source,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(PolicyError::Invalid(format!(
            "settings document must be a mapping, got {other}"
        ))),
    }
}

fn overlays_from_env() -> Result<Vec<SettingOverlay>, PolicyError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overlays.push(SettingOverlay {
                path,
                value: parse_env_value(&raw),
                source: SettingSource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_RULES_JSON) {
        if !raw_json.trim().is_empty() {
            let value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| PolicyError::Invalid(format!("{ENV_RULES_JSON}: {err}")))?;
            overlays.push(SettingOverlay {
                path: PATH_RULES.to_string(),
                value,
                source: SettingSource::Env,
            });
        }
    }

    Ok(overlays)
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    Value::String(raw.to_string())
}

fn bootstrap_builtin_provenance(settings: &mut GateSettings) {
    for path in [PATH_ENABLE, PATH_FORBIDDEN_RESPONSE, PATH_RULES] {
        settings.set_provenance(path, SettingSource::Builtin);
    }
}

fn to_bool(value: &Value) -> Result<bool, PolicyError> {
    value
        .as_bool()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected bool, got {value}")))
}

fn to_string(value: &Value) -> Result<String, PolicyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(PolicyError::InvalidValue(format!(
            "expected string, got {other}"
        ))),
    }
}
