use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratum_state_store::StateStore;
use tracing::{debug, warn};

use crate::domain::keys;
use crate::domain::parameters::ParameterSet;
use crate::error::{CoreError, CoreResult};

/// Namespace holding the cluster lifecycle flows
pub const DEFAULT_FLOW_NAMESPACE: &str = "namespace.tendrl";

/// Flow importing an existing, detected cluster
pub const IMPORT_CLUSTER_FLOW: &str = "ImportCluster";

/// Flow provisioning a new cluster
pub const CREATE_CLUSTER_FLOW: &str = "CreateCluster";

/// A runnable job template from the compiled definitions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDescriptor {
    /// Namespace the flow is declared in
    pub namespace: String,

    /// Flow name, unique within its namespace
    pub name: String,

    /// Run target handed to the agents
    pub run: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Flow kind as declared in the definitions
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub flow_type: Option<String>,

    /// Definition uuid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Definition version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    /// Whether the flow is enabled
    pub enabled: bool,

    /// Parameter keys that must be present and non-empty
    pub mandatory: Vec<String>,

    /// Parameter keys that may be supplied
    pub optional: Vec<String>,
}

impl FlowDescriptor {
    /// Mandatory inputs that are absent or empty in `parameters`
    pub fn missing_inputs(&self, parameters: &ParameterSet) -> Vec<String> {
        self.mandatory
            .iter()
            .filter(|key| !parameters.has_value(key))
            .cloned()
            .collect()
    }

    /// Every declared parameter key, mandatory first
    pub fn declared_inputs(&self) -> impl Iterator<Item = &String> {
        self.mandatory.iter().chain(self.optional.iter())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawInputs {
    #[serde(default)]
    mandatory: Vec<String>,
    #[serde(default)]
    optional: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawFlow {
    run: Option<String>,
    help: Option<String>,
    #[serde(rename = "type")]
    flow_type: Option<String>,
    uuid: Option<String>,
    version: Option<Value>,
    enabled: Option<bool>,
    #[serde(default)]
    inputs: Option<RawInputs>,
}

/// Catalogue of the flows declared in the compiled definitions
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: Vec<FlowDescriptor>,
}

impl FlowCatalog {
    /// Parse the compiled definitions document.
    ///
    /// The document maps namespaces to sections; a section's `flows` entry
    /// maps flow names to their definition. Flows without a run target are
    /// skipped.
    pub fn from_yaml(definitions: &str) -> CoreResult<Self> {
        if definitions.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: serde_yaml::Value = serde_yaml::from_str(definitions)?;
        let namespaces = match document {
            serde_yaml::Value::Mapping(map) => map,
            serde_yaml::Value::Null => return Ok(Self::default()),
            _ => {
                return Err(CoreError::SerializationError(
                    "Flow definitions must be a mapping of namespaces".to_string(),
                ))
            }
        };

        let mut flows = Vec::new();
        for (namespace, section) in namespaces {
            let Some(namespace) = namespace.as_str() else {
                continue;
            };
            let Some(section_flows) = section.get("flows").and_then(|f| f.as_mapping()) else {
                continue;
            };

            for (name, raw) in section_flows {
                let Some(name) = name.as_str() else {
                    continue;
                };
                let raw: RawFlow = match serde_yaml::from_value(raw.clone()) {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!(%namespace, flow = %name, error = %err, "Skipping malformed flow definition");
                        continue;
                    }
                };
                let Some(run) = raw.run else {
                    warn!(%namespace, flow = %name, "Skipping flow definition without run target");
                    continue;
                };
                let inputs = raw.inputs.unwrap_or_default();

                flows.push(FlowDescriptor {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    run,
                    help: raw.help,
                    flow_type: raw.flow_type,
                    uuid: raw.uuid,
                    version: raw.version,
                    enabled: raw.enabled.unwrap_or(true),
                    mandatory: inputs.mandatory,
                    optional: inputs.optional,
                });
            }
        }

        debug!(count = flows.len(), "Parsed flow definitions");
        Ok(Self { flows })
    }

    /// Read and parse the compiled definitions from the store
    pub async fn load(store: &dyn StateStore) -> CoreResult<Self> {
        let node = store.get(keys::DEFINITIONS_KEY).await.map_err(|err| {
            if err.is_not_found() {
                CoreError::NotFound("Flow definitions".to_string())
            } else {
                err.into()
            }
        })?;

        let definitions = node.value().ok_or_else(|| {
            CoreError::Internal("Flow definitions entry is a directory".to_string())
        })?;

        Self::from_yaml(definitions)
    }

    /// Look up a flow by namespace and name
    pub fn find(&self, namespace: &str, name: &str) -> CoreResult<&FlowDescriptor> {
        self.flows
            .iter()
            .find(|f| f.namespace == namespace && f.name == name)
            .ok_or_else(|| CoreError::NotFound(format!("Flow {}.{}", namespace, name)))
    }

    /// Every declared flow
    pub fn all(&self) -> &[FlowDescriptor] {
        &self.flows
    }
}
