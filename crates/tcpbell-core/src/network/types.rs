use std::net::Ipv4Addr;

use crate::units::{BitsPerSec, Nanosecs};

identifier!(NodeId, usize);

/// An addressable simulation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn new_left_edge(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::LeftEdge,
        }
    }

    pub fn new_router(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Router,
        }
    }

    pub fn new_right_edge(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::RightEdge,
        }
    }

    pub fn new_station(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::WirelessStation,
        }
    }

    pub fn new_access_point(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::AccessPoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    LeftEdge,
    Router,
    RightEdge,
    WirelessStation,
    AccessPoint,
}

impl NodeKind {
    /// Edge hosts hang off the dumbbell with exactly one link. Routers and
    /// access points fan out.
    pub fn is_edge_host(&self) -> bool {
        matches!(
            self,
            NodeKind::LeftEdge | NodeKind::RightEdge | NodeKind::WirelessStation
        )
    }
}

/// A bidirectional channel between two nodes. A `WirelessChannel` link
/// associates one station with the access point; its bandwidth is the PHY
/// mode's nominal rate and propagation is left to the engine's loss model.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: LinkKind,
    pub bandwidth: BitsPerSec,
    pub delay: Nanosecs,
}

impl Link {
    pub fn new_wired(
        a: NodeId,
        b: NodeId,
        bandwidth: impl Into<BitsPerSec>,
        delay: impl Into<Nanosecs>,
    ) -> Self {
        Self {
            a,
            b,
            kind: LinkKind::WiredP2p,
            bandwidth: bandwidth.into(),
            delay: delay.into(),
        }
    }

    pub fn new_wireless(station: NodeId, ap: NodeId, bandwidth: impl Into<BitsPerSec>) -> Self {
        Self {
            a: station,
            b: ap,
            kind: LinkKind::WirelessChannel,
            bandwidth: bandwidth.into(),
            delay: Nanosecs::ZERO,
        }
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        self.a == x && self.b == y || self.a == y && self.b == x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LinkKind {
    WiredP2p,
    WirelessChannel,
}

/// An address-assignment range. Assigning concrete per-device addresses is the
/// protocol stack's job; the builder only carves out the ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct Subnet {
    pub base: Ipv4Addr,
    pub prefix: u8,
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// The three disjoint subnets of a dumbbell: left segment, bottleneck, right
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subnets {
    pub left: Subnet,
    pub bottleneck: Subnet,
    pub right: Subnet,
}

impl Default for Subnets {
    fn default() -> Self {
        Self {
            left: Subnet::new(Ipv4Addr::new(10, 1, 1, 0), 24),
            bottleneck: Subnet::new(Ipv4Addr::new(10, 2, 1, 0), 24),
            right: Subnet::new(Ipv4Addr::new(10, 3, 1, 0), 24),
        }
    }
}
