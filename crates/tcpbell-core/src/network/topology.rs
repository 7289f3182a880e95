use std::collections::{HashMap, HashSet};

use petgraph::graph::DiGraph;

use crate::network::types::{Link, Node, NodeId};

/// A validated topology graph. Channels are stored unidirectionally, one edge
/// per direction of each link.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pub(crate) graph: DiGraph<Node, Link>,
}

impl Topology {
    /// Creates a network topology from a list of nodes and links. This function returns an error
    /// if the given lists fail to produce a valid topology. The checks are not exhaustive.
    ///
    /// Correctness properties:
    ///
    /// - Every node must have a unique ID.
    /// - Every link must have distinct endpoints in `nodes`.
    /// - Every node must be referenced by some link.
    /// - For any two nodes, there must be at most one link between them.
    /// - Every edge host must have exactly one link.
    pub(crate) fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let mut g = DiGraph::new();
        let mut id2idx = HashMap::new();
        for n @ Node { id, .. } in nodes.iter().cloned() {
            let idx = g.add_node(n);
            if id2idx.insert(id, idx).is_some() {
                // CORRECTNESS: Every node must have a unique ID.
                return Err(TopologyError::DuplicateNodeId(id));
            }
        }
        let idx_of = |id| *id2idx.get(&id).unwrap();
        let mut referenced_nodes = HashSet::new();
        for link @ Link { a, b, .. } in links.iter().cloned() {
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(TopologyError::NodeAdjacentSelf(a));
            }
            if !id2idx.contains_key(&a) {
                return Err(TopologyError::UndeclaredNode(a));
            }
            if !id2idx.contains_key(&b) {
                return Err(TopologyError::UndeclaredNode(b));
            }
            referenced_nodes.insert(a);
            referenced_nodes.insert(b);
            // Channels are unidirectional
            g.add_edge(idx_of(a), idx_of(b), link);
            g.add_edge(idx_of(b), idx_of(a), link);
        }
        // CORRECTNESS: Every node must be referenced by some link.
        for &id in id2idx.keys() {
            if !referenced_nodes.contains(&id) {
                return Err(TopologyError::IsolatedNode(id));
            }
        }
        for eidx in g.edge_indices() {
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            let (a, b) = g.edge_endpoints(eidx).unwrap();
            if g.edges_connecting(a, b).count() > 1 {
                return Err(TopologyError::DuplicateLink {
                    n1: g[a].id,
                    n2: g[b].id,
                });
            }
            // CORRECTNESS: Every edge host must have exactly one link. Routers
            // and the access point fan out.
            let Node { id, kind, .. } = g[a];
            if kind.is_edge_host() {
                let nr_outgoing = g.edges(a).count();
                if nr_outgoing > 1 {
                    return Err(TopologyError::TooManyHostLinks { id, n: nr_outgoing });
                }
            }
        }
        Ok(Self { graph: g })
    }
}

/// Topology validation error.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },

    #[error("Host {id} has too many links (expected 1, got {n})")]
    TooManyHostLinks { id: NodeId, n: usize },

    #[error("Node {0} is not connected to any other node")]
    IsolatedNode(NodeId),
}
