use std::collections::BTreeSet;
use std::fmt;

use index_gate_core_types::HostPattern;
use index_gate_policy_center::{RuleSettings, RuleType};
use regex::Regex;

use crate::errors::AclError;

/// Request facts the flat rule predicates look at.
pub trait AclRequest {
    /// Origin address, loopback already normalised to `127.0.0.1`.
    fn address(&self) -> &str;
    fn content_length(&self) -> usize;
    fn uri(&self) -> &str;
    fn method(&self) -> &str;
}

/// One independent request check.
#[derive(Clone, Debug)]
pub enum Predicate {
    Hosts(Vec<HostPattern>),
    MaxBodyLength(usize),
    UriRe(Regex),
    /// Upper-cased method names.
    Methods(BTreeSet<String>),
}

impl Predicate {
    pub fn kind(&self) -> &'static str {
        match self {
            Predicate::Hosts(_) => "hosts",
            Predicate::MaxBodyLength(_) => "maxBodyLength",
            Predicate::UriRe(_) => "uri_re",
            Predicate::Methods(_) => "methods",
        }
    }

    pub fn holds(&self, req: &dyn AclRequest) -> bool {
        match self {
            Predicate::Hosts(hosts) => {
                let address = req.address();
                hosts.iter().any(|h| h.matches(address))
            }
            Predicate::MaxBodyLength(max) => req.content_length() <= *max,
            Predicate::UriRe(re) => re.is_match(req.uri()),
            Predicate::Methods(methods) => methods.contains(&req.method().to_ascii_uppercase()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Hosts(hosts) => {
                let hosts = hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>();
                write!(f, "hosts=[{}]", hosts.join(","))
            }
            Predicate::MaxBodyLength(max) => write!(f, "maxBodyLength={max}"),
            Predicate::UriRe(re) => write!(f, "uri_re={}", re.as_str()),
            Predicate::Methods(methods) => {
                write!(f, "methods=[{}]", methods.iter().cloned().collect::<Vec<_>>().join(","))
            }
        }
    }
}

/// Named rule; immutable once built.
#[derive(Clone, Debug)]
pub struct Rule {
    name: String,
    rule_type: RuleType,
    hosts: Option<Predicate>,
    max_body_length: Option<Predicate>,
    uri_re: Option<Predicate>,
    methods: Option<Predicate>,
}

impl Rule {
    /// A rule without constraints.
    pub fn new(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            name: name.into(),
            rule_type,
            hosts: None,
            max_body_length: None,
            uri_re: None,
            methods: None,
        }
    }

    pub fn from_settings(settings: &RuleSettings) -> Result<Self, AclError> {
        let mut rule = Rule::new(settings.name.clone(), settings.rule_type);
        if let Some(hosts) = &settings.hosts {
            rule.hosts = Some(parse_hosts(&settings.name, hosts)?);
        }
        if let Some(max) = settings.max_body_length {
            rule.max_body_length = Some(Predicate::MaxBodyLength(max));
        }
        if let Some(pattern) = &settings.uri_re {
            rule.uri_re = Some(parse_uri_re(&settings.name, pattern)?);
        }
        if let Some(methods) = &settings.methods {
            rule.methods = Some(parse_methods(methods));
        }
        Ok(rule)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn matches_address(&self, req: &dyn AclRequest) -> bool {
        holds(&self.hosts, req)
    }

    pub fn matches_max_body_length(&self, req: &dyn AclRequest) -> bool {
        holds(&self.max_body_length, req)
    }

    pub fn matches_uri_re(&self, req: &dyn AclRequest) -> bool {
        holds(&self.uri_re, req)
    }

    pub fn matches_methods(&self, req: &dyn AclRequest) -> bool {
        holds(&self.methods, req)
    }

    /// All four predicates hold; unset ones hold vacuously.
    pub fn matches(&self, req: &dyn AclRequest) -> bool {
        self.matches_address(req)
            && self.matches_max_body_length(req)
            && self.matches_uri_re(req)
            && self.matches_methods(req)
    }

    /// The configured predicates, in evaluation order.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        [&self.hosts, &self.max_body_length, &self.uri_re, &self.methods]
            .into_iter()
            .flatten()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rule_type)?;
        for predicate in self.predicates() {
            write!(f, " {predicate}")?;
        }
        Ok(())
    }
}

fn holds(predicate: &Option<Predicate>, req: &dyn AclRequest) -> bool {
    predicate.as_ref().map_or(true, |p| p.holds(req))
}

fn parse_hosts(rule: &str, hosts: &[String]) -> Result<Predicate, AclError> {
    let parsed = hosts
        .iter()
        .map(|raw| {
            HostPattern::parse(raw).ok_or_else(|| AclError::InvalidHost {
                rule: rule.to_string(),
                pattern: raw.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Predicate::Hosts(parsed))
}

fn parse_uri_re(rule: &str, pattern: &str) -> Result<Predicate, AclError> {
    Regex::new(pattern)
        .map(Predicate::UriRe)
        .map_err(|source| AclError::InvalidRegex {
            rule: rule.to_string(),
            source,
        })
}

fn parse_methods(methods: &[String]) -> Predicate {
    Predicate::Methods(
        methods
            .iter()
            .map(|m| m.trim().to_ascii_uppercase())
            .collect(),
    )
}
