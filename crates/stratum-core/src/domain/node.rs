use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// How an external node identifier is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeIdentifier {
    /// The identifier is the node's registered IP address
    Ip,
    /// The identifier is the node UUID itself
    #[default]
    Uuid,
}

impl FromStr for NodeIdentifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(NodeIdentifier::Ip),
            "uuid" => Ok(NodeIdentifier::Uuid),
            other => Err(ValidationError::Invalid(format!(
                "'node_identifier', if specified, must be either 'uuid' or 'ip', provided: '{}'.",
                other
            ))),
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentifier::Ip => write!(f, "ip"),
            NodeIdentifier::Uuid => write!(f, "uuid"),
        }
    }
}

/// A registered node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Node UUID
    pub uuid: String,
}

/// Outcome of resolving an external node identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The identifier maps to a registered node
    Found(Node),
    /// No registered node matches the identifier
    Absent {
        /// The identifier as supplied by the caller
        identifier: String,
    },
}

impl Resolution {
    /// Whether a node was found
    pub fn exists(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// The resolved node, if any
    pub fn node(&self) -> Option<&Node> {
        match self {
            Resolution::Found(node) => Some(node),
            Resolution::Absent { .. } => None,
        }
    }
}
