//! The dumbbell topology builder: two edge groups funneled through a shared
//! bottleneck link between two routers. The left wired segment can be swapped
//! for a wireless access segment (stations + one access point).

use crate::network::topology::{Topology, TopologyError};
use crate::network::types::{Link, Node, NodeId, Subnets};
use crate::units::{BitsPerSec, Mbps, Millisecs, Nanosecs};

/// Parameters for one dumbbell: 11 Mbps / 50 ns edge links and a 20 Mbps /
/// 10 ms bottleneck by default.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct DumbbellSpec {
    /// Number of left-edge nodes. Must be 0 when the access segment is
    /// wireless.
    #[builder(default = 1)]
    pub left: usize,
    /// Number of right-edge nodes.
    #[builder(default = 1)]
    pub right: usize,
    /// Edge link (or wireless channel) bandwidth.
    #[builder(default = Mbps::new(11).into())]
    pub edge_bandwidth: BitsPerSec,
    /// Edge link propagation delay.
    #[builder(default = Nanosecs::new(50))]
    pub edge_delay: Nanosecs,
    /// Bottleneck link bandwidth.
    #[builder(default = Mbps::new(20).into())]
    pub bottleneck_bandwidth: BitsPerSec,
    /// Bottleneck link propagation delay.
    #[builder(default = Millisecs::new(10).into())]
    pub bottleneck_delay: Nanosecs,
    /// The left access segment.
    #[builder(default)]
    pub access: Access,
}

/// The kind of left access segment.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Access {
    #[default]
    Wired,
    Wireless(WirelessAccess),
}

/// Wireless access segment parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WirelessAccess {
    /// Number of stations associated with the access point.
    pub stations: usize,
    /// Wifi data/control rate mode, passed to the engine verbatim.
    pub phy_mode: String,
    /// Fixed received signal strength in dBm, for fixed-loss runs.
    pub rss: Option<f64>,
}

impl WirelessAccess {
    pub const DEFAULT_PHY_MODE: &'static str = "DsssRate11Mbps";

    pub fn new(stations: usize) -> Self {
        Self {
            stations,
            phy_mode: Self::DEFAULT_PHY_MODE.to_string(),
            rss: None,
        }
    }
}

impl DumbbellSpec {
    /// Builds and validates the dumbbell.
    ///
    /// The wired variant produces exactly `left + right + 2` nodes and
    /// `left + right + 1` links. The wireless variant replaces the left wired
    /// segment with `stations` wireless channels to the access point, leaving
    /// the right side unchanged.
    pub fn build(&self) -> Result<Dumbbell, DumbbellError> {
        // CORRECTNESS: at least one receiving node is required for any flow
        // to have a destination.
        if self.right == 0 {
            return Err(DumbbellError::NoRightEdge);
        }
        match &self.access {
            Access::Wired => self.build_wired(),
            Access::Wireless(wireless) => self.build_wireless(wireless),
        }
    }

    fn build_wired(&self) -> Result<Dumbbell, DumbbellError> {
        if self.left == 0 {
            return Err(DumbbellError::NoSenders);
        }
        let mut nodes = (0..self.left)
            .map(|i| Node::new_left_edge(NodeId::new(i)))
            .collect::<Vec<_>>();
        let left_router = NodeId::new(self.left);
        let right_router = NodeId::new(self.left + 1);
        nodes.push(Node::new_router(left_router));
        nodes.push(Node::new_router(right_router));
        nodes.extend((0..self.right).map(|i| Node::new_right_edge(NodeId::new(self.left + 2 + i))));

        let senders = (0..self.left).map(NodeId::new).collect::<Vec<_>>();
        let links = self.common_links(&senders, left_router, right_router, |&sender| {
            Link::new_wired(sender, left_router, self.edge_bandwidth, self.edge_delay)
        });
        Dumbbell::assemble(nodes, links, left_router, right_router, senders, self)
    }

    fn build_wireless(&self, wireless: &WirelessAccess) -> Result<Dumbbell, DumbbellError> {
        if self.left != 0 {
            return Err(DumbbellError::LeftNotEmpty(self.left));
        }
        if wireless.stations == 0 {
            return Err(DumbbellError::NoSenders);
        }
        let nr_stations = wireless.stations;
        let mut nodes = (0..nr_stations)
            .map(|i| Node::new_station(NodeId::new(i)))
            .collect::<Vec<_>>();
        let ap = NodeId::new(nr_stations);
        let right_router = NodeId::new(nr_stations + 1);
        nodes.push(Node::new_access_point(ap));
        nodes.push(Node::new_router(right_router));
        nodes.extend(
            (0..self.right).map(|i| Node::new_right_edge(NodeId::new(nr_stations + 2 + i))),
        );

        let senders = (0..nr_stations).map(NodeId::new).collect::<Vec<_>>();
        let links = self.common_links(&senders, ap, right_router, |&sender| {
            Link::new_wireless(sender, ap, self.edge_bandwidth)
        });
        Dumbbell::assemble(nodes, links, ap, right_router, senders, self)
    }

    fn common_links<F>(
        &self,
        senders: &[NodeId],
        left_router: NodeId,
        right_router: NodeId,
        mk_access_link: F,
    ) -> Vec<Link>
    where
        F: Fn(&NodeId) -> Link,
    {
        let mut links = senders.iter().map(mk_access_link).collect::<Vec<_>>();
        links.push(Link::new_wired(
            left_router,
            right_router,
            self.bottleneck_bandwidth,
            self.bottleneck_delay,
        ));
        let first_right = right_router + NodeId::ONE;
        links.extend((0..self.right).map(|i| {
            Link::new_wired(
                right_router,
                first_right + NodeId::new(i),
                self.edge_bandwidth,
                self.edge_delay,
            )
        }));
        links
    }
}

/// A built dumbbell: validated node/link lists, the router pair, and the
/// sender/receiver orderings that define flow indices.
#[derive(Debug, Clone)]
pub struct Dumbbell {
    nodes: Vec<Node>,
    links: Vec<Link>,
    topology: Topology,
    pub subnets: Subnets,
    pub left_router: NodeId,
    pub right_router: NodeId,
    senders: Vec<NodeId>,
    access: Access,
}

impl Dumbbell {
    fn assemble(
        nodes: Vec<Node>,
        links: Vec<Link>,
        left_router: NodeId,
        right_router: NodeId,
        senders: Vec<NodeId>,
        spec: &DumbbellSpec,
    ) -> Result<Self, DumbbellError> {
        let topology = Topology::new(&nodes, &links)?;
        Ok(Self {
            nodes,
            links,
            topology,
            subnets: Subnets::default(),
            left_router,
            right_router,
            senders,
            access: spec.access.clone(),
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The validated topology graph (one edge per direction of each link).
    pub fn graph(&self) -> &petgraph::graph::DiGraph<Node, Link> {
        &self.topology.graph
    }

    /// Sender nodes in flow-index order (left edges, or wireless stations).
    pub fn senders(&self) -> &[NodeId] {
        &self.senders
    }

    /// Receiver nodes in flow-index order.
    pub fn receivers(&self) -> Vec<NodeId> {
        let first = self.right_router + NodeId::ONE;
        self.nodes
            .iter()
            .filter(|n| n.id >= first)
            .map(|n| n.id)
            .collect()
    }

    pub fn wireless(&self) -> Option<&WirelessAccess> {
        match &self.access {
            Access::Wired => None,
            Access::Wireless(w) => Some(w),
        }
    }

    pub fn is_wireless(&self) -> bool {
        self.wireless().is_some()
    }
}

/// Dumbbell configuration error.
#[derive(Debug, thiserror::Error)]
pub enum DumbbellError {
    #[error("a dumbbell needs at least one right-edge node")]
    NoRightEdge,

    #[error("a dumbbell needs at least one sender")]
    NoSenders,

    #[error("wireless access replaces the left wired segment (left must be 0, got {0})")]
    LeftNotEmpty(usize),

    #[error("invalid topology")]
    InvalidTopology(#[from] TopologyError),
}
