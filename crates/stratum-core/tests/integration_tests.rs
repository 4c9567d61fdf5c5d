use async_trait::async_trait;
use mockall::mock;
use mockall::predicate::*;
use serde_json::{json, Value};
use std::sync::Arc;

use stratum_core::{
    domain::keys, Actor, ClusterService, CoreError, JobQueryService, NodeListService, ValidationError,
};
use stratum_state_store::{InMemoryStateStore, StateStore, StoreError, StoreNode, StoreResult};

mock! {
    pub Store {}

    #[async_trait]
    impl StateStore for Store {
        async fn get(&self, key: &str) -> StoreResult<StoreNode>;
        async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode>;
        async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    }
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore").finish()
    }
}

const DEFINITIONS: &str = r#"
namespace.tendrl:
  flows:
    ImportCluster:
      help: Import existing cluster
      inputs:
        mandatory:
          - "Node[]"
          - DetectedCluster.sds_pkg_name
          - DetectedCluster.detected_cluster_id
      run: tendrl.flows.ImportCluster
      type: Create
    CreateCluster:
      help: Create a cluster
      inputs:
        mandatory:
          - "Node[]"
          - TendrlContext.sds_name
          - Cluster.node_configuration
        optional:
          - TendrlContext.sds_version
      run: tendrl.flows.CreateCluster
      type: Create
"#;

async fn fleet() -> Arc<InMemoryStateStore> {
    let store = InMemoryStateStore::with_entries(vec![
        (keys::DEFINITIONS_KEY, DEFINITIONS),
        ("/nodes/u1/NodeContext/node_id", "u1"),
        ("/nodes/u1/NodeContext/fqdn", "mon-1.lab"),
        ("/nodes/u1/DetectedCluster/detected_cluster_id", "c1"),
        ("/nodes/u2/NodeContext/node_id", "u2"),
        ("/nodes/u2/NodeContext/fqdn", "osd-1.lab"),
        ("/indexes/ip/10.0.0.24", "u1"),
        ("/indexes/ip/10.0.0.29", "u2"),
    ])
    .await;
    Arc::new(store)
}

async fn queued_job(store: &InMemoryStateStore, job_id: &str) -> Value {
    let node = store.get(&keys::job(job_id)).await.expect("job document written");
    serde_json::from_str(node.value().expect("job is a leaf")).expect("job is JSON")
}

#[tokio::test]
async fn test_import_cluster_queues_job() {
    let store = fleet().await;
    let service = ClusterService::new(store.clone());

    let job_id = service
        .import_cluster(
            &Actor("admin".to_string()),
            &json!({"sds_type": "ceph", "node_ids": ["u1", "u2"]}),
        )
        .await
        .unwrap();

    let job = queued_job(&store, job_id.as_str()).await;
    assert_eq!(job["run"], "tendrl.flows.ImportCluster");
    assert_eq!(job["flow"], "ImportCluster");
    assert_eq!(job["created_by"], "admin");
    assert_eq!(job["node_ids"], json!(["u1", "u2"]));
    assert_eq!(
        job["parameters"],
        json!({
            "DetectedCluster.detected_cluster_id": "c1",
            "DetectedCluster.sds_pkg_name": "ceph",
            "Node[]": ["u1", "u2"]
        })
    );

    // The job is visible through the query service
    let jobs = JobQueryService::new(store.clone()).list().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["job_id"], job_id.as_str());
    assert_eq!(jobs[0]["run"], "tendrl.flows.ImportCluster");
}

#[tokio::test]
async fn test_create_cluster_rekeys_node_configuration() {
    let store = fleet().await;
    let service = ClusterService::new(store.clone());

    let node_configuration = json!({
        "10.0.0.24": {"role": "ceph/mon", "monitor_interface": "eth0"},
        "10.0.0.29": {"role": "ceph/osd", "storage_disks": [{"device": "/dev/sda"}]}
    });
    let body = json!({
        "sds_name": "ceph",
        "sds_version": "10.2.5",
        "sds_parameters": {"name": "MyCluster", "public_network": "192.168.128.0/24"},
        "node_identifier": "ip",
        "node_configuration": node_configuration
    });

    let job_id = service.create_cluster(&Actor::default(), &body).await.unwrap();

    let job = queued_job(&store, job_id.as_str()).await;
    let configured = job["parameters"]["Cluster.node_configuration"].as_object().unwrap();
    assert_eq!(configured.len(), 2);
    assert_eq!(configured["u1"], node_configuration["10.0.0.24"]);
    assert_eq!(configured["u2"], node_configuration["10.0.0.29"]);
    assert_eq!(job["parameters"]["TendrlContext.cluster_name"], "MyCluster");
    assert_eq!(job["created_by"], "anonymous");
}

#[tokio::test]
async fn test_unresolved_nodes_submit_nothing() {
    let store = fleet().await;
    let service = ClusterService::new(store.clone());
    let before = store.len().await;

    let body = json!({
        "sds_name": "ceph",
        "node_identifier": "ip",
        "node_configuration": {"10.0.0.24": {}, "10.0.0.50": {}, "10.0.0.51": {}}
    });
    let err = service.create_cluster(&Actor::default(), &body).await.unwrap_err();

    assert_eq!(
        err,
        CoreError::Validation(ValidationError::UnavailableNodes(vec![
            "10.0.0.50".to_string(),
            "10.0.0.51".to_string()
        ]))
    );
    assert_eq!(store.len().await, before);
}

#[tokio::test]
async fn test_invalid_requests_never_touch_the_store() {
    // No expectations: any store call fails the test
    let service = ClusterService::new(Arc::new(MockStore::new()));

    let err = service
        .create_cluster(
            &Actor::default(),
            &json!({"sds_name": "ceph", "node_identifier": "mac", "node_configuration": {"a": {}}}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::Invalid(_))));

    let err = service
        .create_cluster(&Actor::default(), &json!({"node_configuration": {}}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::Validation(ValidationError::Missing(vec![
            "sds_name".to_string(),
            "node_configuration".to_string()
        ]))
    );
}

#[tokio::test]
async fn test_unknown_node_on_import() {
    let store = fleet().await;
    let service = ClusterService::new(store.clone());

    let err = service
        .import_cluster(&Actor::default(), &json!({"sds_type": "ceph", "node_ids": ["u2"]}))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CoreError::Validation(ValidationError::Message("Node u2 not found".to_string()))
    );
}

#[tokio::test]
async fn test_missing_definitions() {
    let service = ClusterService::new(Arc::new(InMemoryStateStore::new()));

    let err = service
        .import_cluster(&Actor::default(), &json!({"sds_type": "ceph", "node_ids": ["u1"]}))
        .await
        .unwrap_err();

    assert_eq!(err, CoreError::NotFound("Flow definitions".to_string()));
}

#[tokio::test]
async fn test_store_outage_on_submit() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .with(eq(keys::DEFINITIONS_KEY))
        .returning(|key| Ok(StoreNode::leaf(key, DEFINITIONS)));
    store
        .expect_get()
        .with(eq("/nodes/u1/DetectedCluster/detected_cluster_id"))
        .returning(|key| Ok(StoreNode::leaf(key, "c1")));
    store
        .expect_set()
        .times(1)
        .returning(|_, _| Err(StoreError::Timeout(5000)));

    let service = ClusterService::new(Arc::new(store));
    let err = service
        .import_cluster(&Actor::default(), &json!({"sds_type": "ceph", "node_ids": ["u1"]}))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_node_list_store_outage() {
    let mut store = MockStore::new();
    store
        .expect_get_recursive()
        .with(eq(keys::NODES_ROOT))
        .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));

    let err = NodeListService::new(Arc::new(store)).list().await.unwrap_err();

    assert!(matches!(err, CoreError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_node_list_reflects_fleet() {
    let store = fleet().await;

    let list = NodeListService::new(store).list().await.unwrap();

    assert_eq!(list.node_ids(), vec!["u1", "u2"]);
    // Unassigned nodes carry an empty cluster record
    assert!(list.nodes.iter().all(|n| n.cluster.is_empty()));
    assert!(list.clusters.is_empty());
}

#[tokio::test]
async fn test_flows_are_listed() {
    let service = ClusterService::new(fleet().await);

    let flows = service.flows().await.unwrap();
    let mut names: Vec<_> = flows.iter().map(|f| f.name.as_str()).collect();
    names.sort();

    assert_eq!(names, vec!["CreateCluster", "ImportCluster"]);
}
