//! Host collaborators: the index catalog and the response-header sink.

use index_gate_core_types::IndexSet;
use parking_lot::Mutex;

/// Current universe of index and alias names.
pub trait ClusterCatalog: Send + Sync {
    fn indices_and_aliases(&self) -> IndexSet;
}

/// Fixed catalog, for hosts that snapshot cluster metadata per request.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    names: IndexSet,
}

impl StaticCatalog {
    pub fn new<I, A, S>(indices: I, aliases: A) -> Self
    where
        I: IntoIterator<Item = S>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: indices
                .into_iter()
                .chain(aliases)
                .map(Into::into)
                .collect(),
        }
    }
}

impl ClusterCatalog for StaticCatalog {
    fn indices_and_aliases(&self) -> IndexSet {
        self.names.clone()
    }
}

/// Per-request sink for outbound response headers.
pub trait ResponseHeaders: Send + Sync {
    fn add_response_header(&self, name: &str, value: &str);
}

/// Collects headers in memory; the host copies them onto its response.
#[derive(Debug, Default)]
pub struct InMemoryResponseHeaders {
    headers: Mutex<Vec<(String, String)>>,
}

impl InMemoryResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.headers.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

impl ResponseHeaders for InMemoryResponseHeaders {
    fn add_response_header(&self, name: &str, value: &str) {
        self.headers.lock().push((name.to_string(), value.to_string()));
    }
}
