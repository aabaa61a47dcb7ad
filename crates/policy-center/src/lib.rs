pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::default_settings;
pub use errors::PolicyError;
pub use loader::{load_settings, load_settings_with_options, parse_settings_str, LoadOptions};
pub use model::{GateSettings, RuleSettings, RuleType, SettingProvenance, SettingSource};
pub use validate::{validate_settings, KNOWN_METHODS, MAX_RULES};
