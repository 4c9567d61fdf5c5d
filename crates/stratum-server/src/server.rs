//! Main Stratum Server implementation
//!
//! This module contains the StratumServer implementation.

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stratum_core::{
    Actor, ClusterService, FlowDescriptor, JobId, JobLogs, JobQueryService, NodeList, NodeListService,
};
use stratum_state_store::StateStore;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::monitoring::{MonitoringClient, MonitoringConfig};

/// Main server implementation
pub struct StratumServer {
    /// Configuration
    pub config: ServerConfig,

    /// State store client
    store: Arc<dyn StateStore>,

    clusters: ClusterService,
    nodes: NodeListService,
    jobs: JobQueryService,
    monitoring: MonitoringClient,
}

impl std::fmt::Debug for StratumServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StratumServer")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}

impl StratumServer {
    /// Create a new StratumServer over `store`
    pub fn new(config: ServerConfig, store: Arc<dyn StateStore>) -> ServerResult<Self> {
        let monitoring = MonitoringClient::new(Duration::from_millis(config.monitoring_timeout_ms))?;
        Ok(Self {
            clusters: ClusterService::new(store.clone()),
            nodes: NodeListService::new(store.clone()),
            jobs: JobQueryService::new(store.clone()),
            monitoring,
            store,
            config,
        })
    }

    /// Bind the listener and serve requests until shutdown
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting Stratum Server");

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid bind address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        let app = crate::api::build_router(Arc::new(self));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Stratum Server stopped");
        Ok(())
    }

    /// Registered nodes and known clusters, with monitoring stats when
    /// monitoring is configured
    pub async fn list_nodes(&self) -> ServerResult<NodeList> {
        let mut list = self.nodes.list().await?;

        match MonitoringConfig::load(self.store.as_ref()).await {
            Ok(Some(config)) => match self.monitoring.node_stats(&config, &list.node_ids()).await {
                Ok(stats) => list.attach_stats(stats),
                Err(err) => warn!(error = %err, "Node stats unavailable"),
            },
            Ok(None) => info!("Monitoring not configured, node stats skipped"),
            Err(err) => warn!(error = %err, "Cannot read monitoring configuration"),
        }

        Ok(list)
    }

    /// Every flow in the compiled definitions
    pub async fn list_flows(&self) -> ServerResult<Vec<FlowDescriptor>> {
        Ok(self.clusters.flows().await?)
    }

    /// Queue an ImportCluster job
    pub async fn import_cluster(&self, actor: &Actor, body: &Value) -> ServerResult<JobId> {
        Ok(self.clusters.import_cluster(actor, body).await?)
    }

    /// Queue a CreateCluster job
    pub async fn create_cluster(&self, actor: &Actor, body: &Value) -> ServerResult<JobId> {
        Ok(self.clusters.create_cluster(actor, body).await?)
    }

    /// Documents of the jobs submitted through the API
    pub async fn list_jobs(&self) -> ServerResult<Vec<Value>> {
        Ok(self.jobs.list().await?)
    }

    /// Document of a single job
    pub async fn get_job(&self, job_id: &str) -> ServerResult<Value> {
        Ok(self.jobs.get(job_id).await?)
    }

    /// Logs of a job
    pub async fn job_logs(&self, job_id: &str, log_type: Option<&str>) -> ServerResult<JobLogs> {
        Ok(self.jobs.logs(job_id, log_type).await?)
    }

    /// Check the state store
    pub async fn check_store_health(&self) -> ServerResult<bool> {
        Ok(self.store.health_check().await?)
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
