/// Store key layout shared with the agents
pub mod keys;

/// Aggregation of store subtrees
pub mod tree;

/// Canonical flow parameters
pub mod parameters;

/// Flow descriptors and the definitions catalogue
pub mod flow;

/// Nodes and node identifiers
pub mod node;

/// Job documents
pub mod job;
