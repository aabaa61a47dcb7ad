use std::net::SocketAddr;
use std::sync::Arc;

use http::Method;
use index_gate::core_types::index_set;
use index_gate::policy::parse_settings_str;
use index_gate::request::{
    ActionRequest, BulkRequest, ClusterRequest, InMemoryResponseHeaders, IndicesRequest,
    JsonRequest, RestRequest, SingleIndexRequest, StaticCatalog, UnknownCompositeRequest,
    USER_HEADER,
};
use index_gate::{Decision, Gate, GateOutcome, RequestContext, REQUEST_ID_HEADER};
use serde_json::json;

const SETTINGS: &str = r#"
response_if_req_forbidden: "Forbidden by index gate"
access_control_rules:
  - name: no-deletes
    type: forbid
    methods: [DELETE]
  - name: local-admin
    type: allow
    hosts: ["127.0.0.1"]
  - name: analysts-read-logs
    type: allow
    actions: ["indices:data/read/*"]
    users: ["analyst-*"]
    indices: ["logstash-*"]
  - name: writers
    type: allow
    hosts: ["10.0.0.0/8"]
    actions: ["indices:data/write/*"]
    indices: ["logstash-*"]
"#;

fn gate() -> Gate {
    let settings = parse_settings_str(SETTINGS).unwrap();
    let catalog = Arc::new(StaticCatalog::new(
        ["logstash-1", "logstash-2", "secrets"],
        ["logs"],
    ));
    Gate::from_settings(&settings, catalog).unwrap()
}

struct Probe {
    cx: RequestContext,
    headers: Arc<InMemoryResponseHeaders>,
}

fn probe(gate: &Gate, rest: RestRequest, action: &str, request: ActionRequest) -> Probe {
    let headers = Arc::new(InMemoryResponseHeaders::new());
    let cx = gate.context(rest, action, request, headers.clone());
    Probe { cx, headers }
}

fn from(address: &str, method: Method, uri: &str) -> RestRequest {
    let address: SocketAddr = address.parse().unwrap();
    RestRequest::new(method, uri, address)
}

fn search(indices: &[&str]) -> ActionRequest {
    ActionRequest::Indices(IndicesRequest::new(indices.iter().copied()))
}

#[test]
fn first_matching_block_decides() {
    let gate = gate();
    let mut p = probe(
        &gate,
        from("127.0.0.1:5000", Method::DELETE, "/secrets"),
        "indices:admin/delete",
        search(&["secrets"]),
    );
    let outcome = gate.check(&mut p.cx).unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Forbidden {
            message: "Forbidden by index gate".into(),
            decision: Some(Decision::Forbid {
                block: "no-deletes".into()
            }),
        }
    );
    assert_eq!(p.cx.history().len(), 1);
}

#[test]
fn later_blocks_run_after_a_miss() {
    let gate = gate();
    let mut p = probe(
        &gate,
        from("127.0.0.1:5000", Method::GET, "/_cluster/health"),
        "cluster:monitor/health",
        ActionRequest::Cluster(ClusterRequest {
            type_name: "ClusterHealthRequest".into(),
        }),
    );
    let outcome = gate.check(&mut p.cx).unwrap();
    assert!(outcome.is_allowed());

    let history = p.cx.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].name, "no-deletes");
    assert!(!history[0].results[0].matched);
    assert_eq!(history[1].name, "local-admin");
    assert!(history[1].results[0].matched);
}

#[test]
fn unmatched_requests_are_denied_by_default() {
    let gate = gate();
    let mut p = probe(
        &gate,
        from("192.168.1.20:5000", Method::GET, "/logstash-1/_search"),
        "indices:data/read/search",
        search(&["logstash-1"]),
    );
    match gate.check(&mut p.cx).unwrap() {
        GateOutcome::Forbidden { message, decision } => {
            assert_eq!(message, "Forbidden by index gate");
            assert_eq!(decision, Some(Decision::DefaultDeny));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(p.cx.history().len(), 4);
    assert!(p.headers.snapshot().is_empty());
}

#[test]
fn read_requests_are_narrowed_to_permitted_indices() {
    let gate = gate();
    let rest = from("192.168.1.20:5000", Method::GET, "/_search").with_identity("analyst-bob");
    let mut p = probe(
        &gate,
        rest,
        "indices:data/read/search",
        search(&["logstash-1", "secrets"]),
    );
    let outcome = gate.check(&mut p.cx).unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Allowed {
            decision: Some(Decision::Allow {
                block: "analysts-read-logs".into()
            })
        }
    );
    assert_eq!(p.cx.current_indices().unwrap(), index_set(["logstash-1"]));
    assert_eq!(*p.cx.original_indices().unwrap(), index_set(["logstash-1", "secrets"]));
    assert_eq!(p.headers.get(USER_HEADER).as_deref(), Some("analyst-bob"));
}

#[test]
fn wildcard_reads_expand_against_the_catalog() {
    let gate = gate();
    let rest = from("192.168.1.20:5000", Method::GET, "/*/_search").with_identity("analyst-eve");
    let mut p = probe(&gate, rest, "indices:data/read/search", search(&["*"]));
    assert!(gate.check(&mut p.cx).unwrap().is_allowed());
    assert_eq!(
        p.cx.current_indices().unwrap(),
        index_set(["logstash-1", "logstash-2"])
    );
}

#[test]
fn unknown_users_do_not_match() {
    let gate = gate();
    let rest = from("192.168.1.20:5000", Method::GET, "/_search").with_identity("intern");
    let mut p = probe(&gate, rest, "indices:data/read/search", search(&["logstash-1"]));
    assert!(!gate.check(&mut p.cx).unwrap().is_allowed());
    assert_eq!(p.cx.logged_in_user(), None);
}

#[test]
fn writes_are_never_narrowed() {
    let gate = gate();
    let mut allowed = probe(
        &gate,
        from("10.1.2.3:5000", Method::PUT, "/logstash-1/_doc/1"),
        "indices:data/write/index",
        ActionRequest::SingleIndex(SingleIndexRequest::new("logstash-1")),
    );
    assert!(gate.check(&mut allowed.cx).unwrap().is_allowed());

    let mut denied = probe(
        &gate,
        from("10.1.2.3:5000", Method::PUT, "/secrets/_doc/1"),
        "indices:data/write/index",
        ActionRequest::SingleIndex(SingleIndexRequest::new("secrets")),
    );
    assert!(!gate.check(&mut denied.cx).unwrap().is_allowed());
    assert_eq!(denied.cx.current_indices().unwrap(), index_set(["secrets"]));
}

#[test]
fn disabled_gate_allows_everything() {
    let mut settings = parse_settings_str(SETTINGS).unwrap();
    settings.enable = false;
    let gate = Gate::from_settings(&settings, Arc::new(StaticCatalog::default())).unwrap();
    let mut p = probe(
        &gate,
        from("192.168.1.20:5000", Method::DELETE, "/secrets"),
        "indices:admin/delete",
        search(&["secrets"]),
    );
    assert_eq!(
        gate.check(&mut p.cx).unwrap(),
        GateOutcome::Allowed { decision: None }
    );
    assert!(p.cx.history().is_empty());
}

#[test]
fn forwarded_request_ids_only_correlate() {
    let gate = gate();
    let forwarded = || {
        from("127.0.0.1:5000", Method::GET, "/").with_header(REQUEST_ID_HEADER, "abc-123")
    };
    let first = probe(&gate, forwarded(), "cluster:monitor/main", search(&["a"]));
    let second = probe(&gate, forwarded(), "cluster:monitor/main", search(&["a"]));
    assert_ne!(first.cx.id(), second.cx.id());
    assert_eq!(first.cx.id().as_str().len(), 32);
    assert_eq!(
        first.cx.correlation_id().map(|c| c.as_str()),
        Some("abc-123")
    );

    let malformed =
        from("127.0.0.1:5000", Method::GET, "/").with_header("x-request-id", "not valid!");
    let mut p = probe(&gate, malformed, "cluster:monitor/main", search(&["a"]));
    assert_eq!(p.cx.correlation_id(), None);
    assert!(gate.check(&mut p.cx).unwrap().is_allowed());
}

#[test]
fn bulk_writes_cannot_hide_forbidden_items() {
    let gate = gate();
    let bulk = |second: ActionRequest| {
        ActionRequest::Bulk(BulkRequest {
            requests: vec![
                ActionRequest::SingleIndex(SingleIndexRequest::new("logstash-1")),
                second,
            ],
        })
    };

    let scalar_index = ActionRequest::Reflective(Box::new(JsonRequest::from_value(
        "DeleteRequest",
        true,
        json!({"index": "secrets"}),
    )));
    let mut p = probe(
        &gate,
        from("10.1.2.3:5000", Method::POST, "/_bulk"),
        "indices:data/write/bulk",
        bulk(scalar_index),
    );
    assert_eq!(
        *p.cx.indices().unwrap(),
        index_set(["logstash-1", "secrets"])
    );
    assert_eq!(
        gate.check(&mut p.cx).unwrap(),
        GateOutcome::Forbidden {
            message: "Forbidden by index gate".into(),
            decision: Some(Decision::DefaultDeny),
        }
    );

    let unknown = ActionRequest::UnknownComposite(UnknownCompositeRequest {
        type_name: "MultiPercolateRequest".into(),
    });
    let mut p = probe(
        &gate,
        from("10.1.2.3:5000", Method::POST, "/_bulk"),
        "indices:data/write/bulk",
        bulk(unknown),
    );
    assert!(!gate.check(&mut p.cx).unwrap().is_allowed());

    let permitted = ActionRequest::SingleIndex(SingleIndexRequest::new("logstash-2"));
    let mut p = probe(
        &gate,
        from("10.1.2.3:5000", Method::POST, "/_bulk"),
        "indices:data/write/bulk",
        bulk(permitted),
    );
    assert!(gate.check(&mut p.cx).unwrap().is_allowed());
}
