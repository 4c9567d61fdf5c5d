use serde_json::Value;
use std::sync::Arc;
use stratum_state_store::StateStore;
use tracing::info;

use crate::application::cluster_translator::{
    translate_create, translate_import, CreateClusterRequest, ImportClusterRequest,
};
use crate::application::job_submitter::JobSubmitter;
use crate::application::node_resolver::NodeResolver;
use crate::domain::flow::{FlowCatalog, FlowDescriptor, CREATE_CLUSTER_FLOW, DEFAULT_FLOW_NAMESPACE, IMPORT_CLUSTER_FLOW};
use crate::domain::job::{Actor, JobId};
use crate::error::CoreResult;

/// Entry point for the cluster lifecycle requests
pub struct ClusterService {
    store: Arc<dyn StateStore>,
    resolver: NodeResolver,
    submitter: JobSubmitter,
}

impl ClusterService {
    /// Create a new cluster service
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            resolver: NodeResolver::new(store.clone()),
            submitter: JobSubmitter::new(store.clone()),
            store,
        }
    }

    /// Every flow in the compiled definitions
    pub async fn flows(&self) -> CoreResult<Vec<FlowDescriptor>> {
        let catalog = FlowCatalog::load(self.store.as_ref()).await?;
        Ok(catalog.all().to_vec())
    }

    /// Validate an import request and queue an ImportCluster job
    pub async fn import_cluster(&self, actor: &Actor, body: &Value) -> CoreResult<JobId> {
        let request = ImportClusterRequest::from_body(body)?;
        let flow = self.flow(IMPORT_CLUSTER_FLOW).await?;

        let parameters = translate_import(&request, &self.resolver).await?;
        let job_id = self.submitter.submit(actor, &flow, parameters).await?;

        info!(%job_id, sds_type = %request.sds_type, "Cluster import requested");
        Ok(job_id)
    }

    /// Validate a create request and queue a CreateCluster job.
    ///
    /// No job is queued unless every node resolves.
    pub async fn create_cluster(&self, actor: &Actor, body: &Value) -> CoreResult<JobId> {
        let request = CreateClusterRequest::from_body(body)?;
        let flow = self.flow(CREATE_CLUSTER_FLOW).await?;

        let parameters = translate_create(&request, &self.resolver).await?;
        let job_id = self.submitter.submit(actor, &flow, parameters).await?;

        info!(%job_id, sds_name = %request.sds_name, "Cluster creation requested");
        Ok(job_id)
    }

    async fn flow(&self, name: &str) -> CoreResult<FlowDescriptor> {
        let catalog = FlowCatalog::load(self.store.as_ref()).await?;
        catalog.find(DEFAULT_FLOW_NAMESPACE, name).cloned()
    }
}
