use thiserror::Error;

#[derive(Debug, Error)]
pub enum AclError {
    #[error("rule '{rule}': invalid host pattern '{pattern}'")]
    InvalidHost { rule: String, pattern: String },
    #[error("rule '{rule}': invalid uri_re: {source}")]
    InvalidRegex {
        rule: String,
        #[source]
        source: regex::Error,
    },
}
