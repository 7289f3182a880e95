//! Node placement: fixed router anchors, uniform-disk scatter for edge nodes,
//! and the random-walk configuration handed to the engine for wireless
//! stations. Also computes the analytic average propagation-delay estimate
//! from the initial geometry.

use rand::Rng;
use rand_distr::{Distribution, UnitDisc};
use rustc_hash::FxHashMap;

use crate::network::{Dumbbell, NodeId};

/// Speed of light in a vacuum, in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Left router (or access point) anchor.
pub const LEFT_ANCHOR: Position = Position::new(50.0, 50.0, 0.0);

/// Right router anchor. Anchors are far enough apart that the scatter disks
/// around them cannot overlap.
pub const RIGHT_ANCHOR: Position = Position::new(150.0, 150.0, 0.0);

/// Scatter disk radius in meters.
pub const SCATTER_RADIUS: f64 = 20.0;

/// A position in meters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A rectangular region bounding a random walk.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Continuous random-walk configuration for wireless stations. The engine
/// drives the actual motion; the harness only sets the bounds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomWalk {
    pub bounds: Rect,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            bounds: Rect {
                x_min: 0.0,
                x_max: 100.0,
                y_min: 0.0,
                y_max: 100.0,
            },
        }
    }
}

/// Assigned positions for every node, plus the walk configuration for mobile
/// ones.
#[derive(Debug, Clone)]
pub struct Layout {
    positions: FxHashMap<NodeId, Position>,
    pub walk: Option<RandomWalk>,
}

impl Layout {
    /// Builds a layout from explicit positions, bypassing the scatter.
    pub fn from_positions(
        positions: impl IntoIterator<Item = (NodeId, Position)>,
        walk: Option<RandomWalk>,
    ) -> Self {
        Self {
            positions: positions.into_iter().collect(),
            walk,
        }
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn nr_positions(&self) -> usize {
        self.positions.len()
    }
}

/// Places routers at their anchors and scatters edge nodes uniformly inside a
/// disk of radius [`SCATTER_RADIUS`] around their group's anchor. Wireless
/// stations additionally get a bounded random walk.
pub fn assign(dumbbell: &Dumbbell, mut rng: impl Rng) -> Layout {
    let mut positions = FxHashMap::default();
    positions.insert(dumbbell.left_router, LEFT_ANCHOR);
    positions.insert(dumbbell.right_router, RIGHT_ANCHOR);
    for &sender in dumbbell.senders() {
        positions.insert(sender, scatter(LEFT_ANCHOR, SCATTER_RADIUS, &mut rng));
    }
    for receiver in dumbbell.receivers() {
        positions.insert(receiver, scatter(RIGHT_ANCHOR, SCATTER_RADIUS, &mut rng));
    }
    let walk = dumbbell.is_wireless().then(RandomWalk::default);
    Layout { positions, walk }
}

fn scatter(anchor: Position, rho: f64, rng: &mut impl Rng) -> Position {
    let [dx, dy]: [f64; 2] = UnitDisc.sample(rng);
    Position::new(anchor.x + dx * rho, anchor.y + dy * rho, anchor.z)
}

/// The mean station-to-AP propagation delay in nanoseconds, from initial
/// positions only. `None` for an empty station set. Diagnostic estimate:
/// computed once before the run and never re-derived from live state.
pub fn average_propagation_delay(
    layout: &Layout,
    stations: &[NodeId],
    ap: NodeId,
) -> Option<f64> {
    if stations.is_empty() {
        return None;
    }
    let ap_pos = layout.position(ap)?;
    let mut total = 0.0;
    for &station in stations {
        let pos = layout.position(station)?;
        total += pos.distance(&ap_pos) * 1e9 / SPEED_OF_LIGHT;
    }
    Some(total / stations.len() as f64)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::network::{Access, DumbbellSpec, WirelessAccess};

    fn wired(left: usize, right: usize) -> Dumbbell {
        DumbbellSpec::builder()
            .left(left)
            .right(right)
            .build()
            .build()
            .unwrap()
    }

    fn wireless(stations: usize, right: usize) -> Dumbbell {
        DumbbellSpec::builder()
            .left(0)
            .right(right)
            .access(Access::Wireless(WirelessAccess::new(stations)))
            .build()
            .build()
            .unwrap()
    }

    #[test]
    fn routers_sit_on_anchors() {
        let dumbbell = wired(2, 2);
        let layout = assign(&dumbbell, StdRng::seed_from_u64(0));
        assert_eq!(layout.position(dumbbell.left_router), Some(LEFT_ANCHOR));
        assert_eq!(layout.position(dumbbell.right_router), Some(RIGHT_ANCHOR));
        assert_eq!(layout.nr_positions(), 6);
        assert!(layout.walk.is_none());
    }

    #[test]
    fn scatter_stays_within_radius() {
        let dumbbell = wired(8, 8);
        let layout = assign(&dumbbell, StdRng::seed_from_u64(7));
        for &sender in dumbbell.senders() {
            let pos = layout.position(sender).unwrap();
            assert!(pos.distance(&LEFT_ANCHOR) <= SCATTER_RADIUS);
        }
        for receiver in dumbbell.receivers() {
            let pos = layout.position(receiver).unwrap();
            assert!(pos.distance(&RIGHT_ANCHOR) <= SCATTER_RADIUS);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let dumbbell = wired(4, 4);
        let a = assign(&dumbbell, StdRng::seed_from_u64(42));
        let b = assign(&dumbbell, StdRng::seed_from_u64(42));
        for node in dumbbell.nodes() {
            assert_eq!(a.position(node.id), b.position(node.id));
        }
    }

    #[test]
    fn stations_get_a_walk() {
        let dumbbell = wireless(3, 1);
        let layout = assign(&dumbbell, StdRng::seed_from_u64(0));
        assert_eq!(layout.walk, Some(RandomWalk::default()));
    }

    #[test]
    fn delay_estimate_matches_formula() {
        // One station 30 m from the AP: 30 * 1e9 / c ≈ 100.07 ns.
        let mut positions = FxHashMap::default();
        let ap = NodeId::new(1);
        let station = NodeId::new(0);
        positions.insert(ap, Position::new(0.0, 0.0, 0.0));
        positions.insert(station, Position::new(30.0, 0.0, 0.0));
        let layout = Layout {
            positions,
            walk: None,
        };
        let delay = average_propagation_delay(&layout, &[station], ap).unwrap();
        assert!((delay - 100.069).abs() < 1e-2, "got {delay}");
    }

    #[test]
    fn delay_estimate_averages_distances() {
        let mut positions = FxHashMap::default();
        let ap = NodeId::new(2);
        let s1 = NodeId::new(0);
        let s2 = NodeId::new(1);
        positions.insert(ap, Position::new(0.0, 0.0, 0.0));
        positions.insert(s1, Position::new(10.0, 0.0, 0.0));
        positions.insert(s2, Position::new(0.0, 30.0, 0.0));
        let layout = Layout {
            positions,
            walk: None,
        };
        let delay = average_propagation_delay(&layout, &[s1, s2], ap).unwrap();
        let expected = 20.0 * 1e9 / SPEED_OF_LIGHT;
        assert!((delay - expected).abs() < 1e-9, "got {delay}");
    }

    #[test]
    fn delay_estimate_undefined_without_stations() {
        let layout = Layout {
            positions: FxHashMap::default(),
            walk: None,
        };
        assert_eq!(average_propagation_delay(&layout, &[], NodeId::ZERO), None);
    }
}
