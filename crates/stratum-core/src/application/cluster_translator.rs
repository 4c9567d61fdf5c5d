//! Translation of cluster requests into flow parameters
//!
//! Request bodies are validated up front into typed requests. Validation is
//! exhaustive: every missing field is reported at once. The translators then
//! consult the store (detected clusters, node registrations) and build the
//! canonical [`ParameterSet`] the flow expects.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

use crate::application::node_resolver::NodeResolver;
use crate::domain::node::{NodeIdentifier, Resolution};
use crate::domain::parameters::{is_canonical_key, is_empty_value, ParameterSet, NODE_LIST_KEY};
use crate::error::{CoreResult, ValidationError};

/// Parameter key of the detected cluster id
pub const DETECTED_CLUSTER_ID: &str = "DetectedCluster.detected_cluster_id";
/// Parameter key of the storage package name
pub const DETECTED_CLUSTER_SDS_PKG_NAME: &str = "DetectedCluster.sds_pkg_name";
/// Parameter key of the storage system name
pub const TENDRL_SDS_NAME: &str = "TendrlContext.sds_name";
/// Parameter key of the storage system version
pub const TENDRL_SDS_VERSION: &str = "TendrlContext.sds_version";
/// Parameter key of the cluster name
pub const TENDRL_CLUSTER_NAME: &str = "TendrlContext.cluster_name";
/// Parameter key of the cluster id
pub const TENDRL_CLUSTER_ID: &str = "TendrlContext.cluster_id";
/// Parameter key of the per-node configuration
pub const CLUSTER_NODE_CONFIGURATION: &str = "Cluster.node_configuration";

const CLUSTER_OPTIONAL_PARAMETERS: &[&str] = &["public_network", "cluster_network", "conf_overrides"];

fn body_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::Message("Request body must be a JSON object".to_string()))
}

fn missing_fields(body: &Map<String, Value>, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|field| body.get(**field).map_or(true, is_empty_value))
        .map(|field| field.to_string())
        .collect()
}

/// A validated import cluster request
#[derive(Debug, Clone, PartialEq)]
pub struct ImportClusterRequest {
    /// Storage system package to import
    pub sds_type: String,
    /// Nodes of the cluster; the first one carries the detected cluster id
    pub node_ids: Vec<String>,
    /// Canonical parameters supplied directly by the caller
    pub passthrough: ParameterSet,
}

impl ImportClusterRequest {
    /// Validate an import cluster request body
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        let body = body_object(body)?;

        let missing = missing_fields(body, &["sds_type", "node_ids"]);
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing));
        }

        let sds_type = body
            .get("sds_type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::Message("'sds_type' must be a string".to_string()))?
            .to_string();

        let node_ids: Vec<String> = body
            .get("node_ids")
            .and_then(Value::as_array)
            .and_then(|ids| ids.iter().map(|id| id.as_str().map(str::to_string)).collect::<Option<_>>())
            .filter(|ids: &Vec<String>| !ids.is_empty())
            .ok_or_else(|| ValidationError::Message("'node_ids' must be an array with values".to_string()))?;

        let mut passthrough = ParameterSet::new();
        for (key, value) in body.iter().filter(|(key, _)| key.contains('.') && is_canonical_key(key)) {
            passthrough.insert(key.clone(), value.clone());
        }

        Ok(Self {
            sds_type,
            node_ids,
            passthrough,
        })
    }
}

/// Build the ImportCluster parameters.
///
/// The detected cluster id is read from the first node. Computed keys take
/// precedence over caller-supplied ones.
pub async fn translate_import(request: &ImportClusterRequest, resolver: &NodeResolver) -> CoreResult<ParameterSet> {
    let first = request
        .node_ids
        .first()
        .ok_or_else(|| ValidationError::Message("'node_ids' must be an array with values".to_string()))?;

    let detected_cluster_id = resolver
        .detected_cluster_id(first)
        .await?
        .ok_or_else(|| ValidationError::Message(format!("Node {} not found", first)))?;

    let mut parameters = request.passthrough.clone();
    parameters.insert(DETECTED_CLUSTER_ID, detected_cluster_id);
    parameters.insert(DETECTED_CLUSTER_SDS_PKG_NAME, request.sds_type.clone());
    parameters.insert(NODE_LIST_KEY, request.node_ids.clone());

    debug!(node_count = request.node_ids.len(), "Translated import request");
    Ok(parameters)
}

/// Storage system parameters of a create cluster request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdsParameters {
    /// Cluster name
    pub name: Option<Value>,
    /// Cluster id chosen by the caller
    pub cluster_id: Option<Value>,
    /// Optional cluster settings keyed by field name
    pub cluster: Map<String, Value>,
}

/// A validated create cluster request
#[derive(Debug, Clone, PartialEq)]
pub struct CreateClusterRequest {
    /// Storage system name
    pub sds_name: Value,
    /// Storage system version
    pub sds_version: Option<Value>,
    /// Storage system parameters
    pub sds_parameters: SdsParameters,
    /// How the keys of `node_configuration` are interpreted
    pub node_identifier: NodeIdentifier,
    /// Per-node configuration keyed by external identifier
    pub node_configuration: Map<String, Value>,
}

impl CreateClusterRequest {
    /// Validate a create cluster request body
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        let body = body_object(body)?;

        let missing = missing_fields(body, &["sds_name", "node_configuration"]);
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing));
        }

        let node_identifier = match body.get("node_identifier") {
            None | Some(Value::Null) => NodeIdentifier::default(),
            Some(Value::String(mode)) => mode.parse()?,
            Some(other) => other.to_string().parse()?,
        };

        let node_configuration = body
            .get("node_configuration")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                ValidationError::Message("'node_configuration' must be a mapping of node identifiers".to_string())
            })?;

        let sds_parameters = match body.get("sds_parameters") {
            None | Some(Value::Null) => SdsParameters::default(),
            Some(Value::Object(params)) => SdsParameters {
                name: present(params.get("name")),
                cluster_id: present(params.get("cluster_id")),
                cluster: CLUSTER_OPTIONAL_PARAMETERS
                    .iter()
                    .filter_map(|field| present(params.get(*field)).map(|v| (field.to_string(), v)))
                    .collect(),
            },
            Some(_) => {
                return Err(ValidationError::Message("'sds_parameters' must be a mapping".to_string()));
            }
        };

        Ok(Self {
            sds_name: body.get("sds_name").cloned().unwrap_or_default(),
            sds_version: present(body.get("sds_version")),
            sds_parameters,
            node_identifier,
            node_configuration,
        })
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !is_empty_value(v)).cloned()
}

/// Build the CreateCluster parameters.
///
/// Every node identifier is resolved before anything is built. Unresolved
/// identifiers are reported together; identifiers that resolve to the same
/// node are rejected.
pub async fn translate_create(request: &CreateClusterRequest, resolver: &NodeResolver) -> CoreResult<ParameterSet> {
    let mut unavailable = Vec::new();
    let mut duplicates = Vec::new();
    let mut seen = BTreeSet::new();
    let mut node_ids = Vec::new();
    let mut node_configuration = Map::new();

    for (identifier, config) in &request.node_configuration {
        match resolver.resolve(identifier, request.node_identifier).await? {
            Resolution::Found(node) => {
                if !seen.insert(node.uuid.clone()) {
                    duplicates.push(identifier.clone());
                    continue;
                }
                node_ids.push(node.uuid.clone());
                node_configuration.insert(node.uuid, config.clone());
            }
            Resolution::Absent { identifier } => unavailable.push(identifier),
        }
    }

    if !unavailable.is_empty() {
        return Err(ValidationError::UnavailableNodes(unavailable).into());
    }
    if !duplicates.is_empty() {
        return Err(ValidationError::Invalid(format!(
            "Node identifiers resolve to an already configured node: {}.",
            duplicates.join(", ")
        ))
        .into());
    }

    let mut parameters = ParameterSet::new();
    parameters.insert(TENDRL_SDS_NAME, request.sds_name.clone());
    parameters.insert_if_present(TENDRL_SDS_VERSION, request.sds_version.as_ref());
    parameters.insert_if_present(TENDRL_CLUSTER_NAME, request.sds_parameters.name.as_ref());
    parameters.insert_if_present(TENDRL_CLUSTER_ID, request.sds_parameters.cluster_id.as_ref());
    parameters.insert(NODE_LIST_KEY, node_ids);
    for (field, value) in &request.sds_parameters.cluster {
        parameters.insert_if_present(format!("Cluster.{}", field), Some(value));
    }
    parameters.insert(CLUSTER_NODE_CONFIGURATION, Value::Object(node_configuration));

    debug!(
        node_identifier = %request.node_identifier,
        node_count = request.node_configuration.len(),
        "Translated create request"
    );
    Ok(parameters)
}
