//! Session loop tests: snapshot, local manifests, errors and watching

mod common;

use clap::Parser;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{FakeStore, NOW, endpoints, pod, replica_set, service};
use kubestatus::cli::Args;
use kubestatus::config::{Config, RenderOptions};
use kubestatus::kube::manifest::read_manifest;
use kubestatus::kube::{ManifestStore, ObjectStore};
use kubestatus::render::TemplateEngine;
use kubestatus::repository::ObjectRepository;
use kubestatus::session::SessionState;
use kubestatus::{ErrorAggregate, QueryTarget, Session, StatusError};

fn engine() -> TemplateEngine {
    colored::control::set_override(false);
    let mut engine = TemplateEngine::new().unwrap();
    engine.set_now(NOW.parse().unwrap());
    engine
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn owned_pod(name: &str, created: &str, phase: &str) -> Value {
    let mut value = pod(name, created, json!({"app": "web"}));
    value["status"]["phase"] = json!(phase);
    value["metadata"]["ownerReferences"] = json!([{
        "apiVersion": "apps/v1",
        "kind": "ReplicaSet",
        "name": "web-2",
        "uid": "uid-web-2",
        "controller": true
    }]);
    value
}

fn cluster() -> Vec<Value> {
    vec![
        replica_set("web-2", "web", "2", "2024-01-03T00:00:00Z", "web-v2"),
        owned_pod("web-2-a", "2024-01-05T00:00:00Z", "Running"),
        service("web", json!({"app": "web"})),
        endpoints("web", &[("10.1.0.5", "web-2-a")]),
    ]
}

async fn run(
    store: impl ObjectStore + 'static,
    options: RenderOptions,
    target: QueryTarget,
    cancel: CancellationToken,
) -> (String, Result<(), ErrorAggregate>, SessionState) {
    let repo = ObjectRepository::connect(Arc::new(store)).await.unwrap();
    let mut session = Session::new(repo, engine(), options, "default");
    let mut out = Vec::new();
    let result = session.run(&target, &mut out, cancel).await;
    (String::from_utf8(out).unwrap(), result, session.state())
}

#[tokio::test]
async fn test_snapshot_renders_with_correlations() {
    let target = QueryTarget::from_args(&args(&["pods"])).unwrap();
    let (text, result, state) = run(
        FakeStore::new(cluster()),
        RenderOptions::default(),
        target,
        CancellationToken::new(),
    )
    .await;

    result.unwrap();
    assert_eq!(state, SessionState::Terminated);
    assert!(text.starts_with("Pod/web-2-a -n default, created 5d ago\n"));
    assert!(text.contains("  Controlled by:\n    ReplicaSet/web-2 -n default"));
    assert!(text.contains("  Services:\n    Service/web -n default"));
}

#[tokio::test]
async fn test_local_manifests_render_in_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pods.yaml");
    let late = serde_yaml::to_string(&owned_pod("late", "2024-01-09T00:00:00Z", "Pending")).unwrap();
    let early =
        serde_yaml::to_string(&owned_pod("early", "2024-01-02T00:00:00Z", "Running")).unwrap();
    std::fs::write(&path, format!("{}---\n{}", late, early)).unwrap();

    let options = RenderOptions {
        local: true,
        filenames: vec![path.clone()],
        ..Default::default()
    };
    options.validate().unwrap();

    let documents = read_manifest(&path).unwrap();
    let store = ManifestStore::from_objects(documents.clone());
    let target = QueryTarget::build(&args(&["ignored"]), Some(documents), true).unwrap();

    let (text, result, _) = run(store, options, target, CancellationToken::new()).await;

    result.unwrap();
    let early_at = text.find("Pod/early -n default, created 8d ago\n  Running\n").unwrap();
    let late_at = text.find("Pod/late -n default, created 1d ago\n  Pending\n").unwrap();
    assert!(early_at < late_at);
    // nothing to correlate with locally
    assert!(!text.contains("Controlled by"));
}

#[test]
fn test_conflicting_flags_rejected_before_fetching() {
    let parsed = Args::try_parse_from(["kubectl-status", "--shallow", "--deep", "pods"]).unwrap();
    let err = parsed.render_options(Config::default()).validate().unwrap_err();
    assert!(matches!(err, StatusError::ConfigurationConflict(_)));

    let parsed = Args::try_parse_from(["kubectl-status", "--local", "pods"]).unwrap();
    let err = parsed.render_options(Config::default()).validate().unwrap_err();
    assert_eq!(err.to_string(), "when using --local, --filename must be provided");

    let err = QueryTarget::build(&[], None, false).unwrap_err();
    assert!(matches!(err, StatusError::ConfigurationConflict(_)));
}

#[tokio::test]
async fn test_no_resources_found_depends_on_scope() {
    let options = RenderOptions {
        label_selector: Some("app=nothing".to_string()),
        ..Default::default()
    };
    let target = QueryTarget::from_args(&args(&["pods"])).unwrap();
    let (text, result, _) = run(
        FakeStore::new(cluster()),
        options,
        target.clone(),
        CancellationToken::new(),
    )
    .await;
    assert!(text.is_empty());
    assert_eq!(
        result.unwrap_err().to_string(),
        "No resources found in default namespace."
    );

    let options = RenderOptions {
        all_namespaces: true,
        label_selector: Some("app=nothing".to_string()),
        ..Default::default()
    };
    let (_, result, _) = run(
        FakeStore::new(cluster()),
        options,
        target,
        CancellationToken::new(),
    )
    .await;
    assert_eq!(result.unwrap_err().to_string(), "No resources found.");
}

#[tokio::test]
async fn test_named_objects_collect_errors() {
    let target = QueryTarget::from_args(&args(&["po", "web-2-a", "missing"])).unwrap();
    let (text, result, _) = run(
        FakeStore::new(cluster()),
        RenderOptions::default(),
        target,
        CancellationToken::new(),
    )
    .await;

    assert!(text.starts_with("Pod/web-2-a -n default"));
    let errors = result.unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "pods/missing: pods \"missing\" not found"
    );
}

#[tokio::test]
async fn test_unknown_type_does_not_stop_known_ones() {
    let target = QueryTarget::from_args(&args(&["pods,widgets,svc"])).unwrap();
    let (text, result, _) = run(
        FakeStore::new(cluster()),
        RenderOptions::default(),
        target,
        CancellationToken::new(),
    )
    .await;

    // merged snapshot is in creation order: the service is older than the pod
    let service_at = text.find("Service/web -n default").unwrap();
    let pod_at = text.find("Pod/web-2-a -n default").unwrap();
    assert!(service_at < pod_at);
    assert_eq!(
        result.unwrap_err().to_string(),
        "the server doesn't have a resource type \"widgets\""
    );
}

#[tokio::test]
async fn test_live_counterparts_of_manifest_documents() {
    let stale = owned_pod("web-2-a", "2024-01-05T00:00:00Z", "Pending");
    let widget = json!({"apiVersion": "example.com/v1", "kind": "Widget", "metadata": {"name": "w"}});
    let documents = vec![common::object(stale), common::object(widget)];

    let target = QueryTarget::build(&[], Some(documents), false).unwrap();
    let options = RenderOptions {
        shallow: true,
        ..Default::default()
    };
    let (text, result, _) = run(
        FakeStore::new(cluster()),
        options,
        target,
        CancellationToken::new(),
    )
    .await;

    assert!(text.starts_with("Pod/web-2-a -n default, created 5d ago\n  Running\n"));
    assert!(!text.contains("Controlled by"));
    assert!(matches!(
        result.unwrap_err().errors(),
        [StatusError::ReferenceResolution { .. }]
    ));
}

#[tokio::test]
async fn test_watch_renders_changes_shallowly_until_cancelled() {
    let store = FakeStore::new(cluster())
        .with_change(owned_pod("web-2-a", "2024-01-05T00:00:00Z", "Failed"))
        .holding_watches_open();
    let options = RenderOptions {
        watch: true,
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let target = QueryTarget::from_args(&args(&["pods"])).unwrap();
    let (text, result, state) = run(store, options, target, cancel).await;

    result.unwrap();
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(text.matches("Pod/web-2-a -n default").count(), 2);

    let (snapshot, change) = text.split_at(text.rfind("Pod/web-2-a").unwrap());
    assert!(snapshot.contains("  Running\n"));
    assert!(snapshot.contains("Controlled by"));
    assert!(change.contains("  Failed\n"));
    assert!(!change.contains("Controlled by"));
}

#[tokio::test]
async fn test_watch_failure_ends_session() {
    let store = FakeStore::new(cluster()).with_watch_failure("connection reset");
    let options = RenderOptions {
        watch: true,
        ..Default::default()
    };
    let target = QueryTarget::from_args(&args(&["pods"])).unwrap();
    let (text, result, state) = run(store, options, target, CancellationToken::new()).await;

    assert!(text.starts_with("Pod/web-2-a"));
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(
        result.unwrap_err().to_string(),
        "watch terminated: watch stream error: connection reset"
    );
}
