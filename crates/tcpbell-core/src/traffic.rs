//! Flow planning: one sender application per left node, addressed to the
//! matching receiver on the corresponding right node. Flow index `i` is the
//! join key between planning, instrumentation, and output file naming.

use std::str::FromStr;

use crate::network::NodeId;
use crate::units::{BitsPerSec, Bytes, Nanosecs};

identifier!(FlowId, usize);

/// The well-known sink port.
pub const FLOW_PORT: u16 = 800;

/// How a sender generates payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenMode {
    /// Fixed-size segments at a fixed rate, continuously from start to stop
    /// (on-fraction 1, off-fraction 0).
    ConstantRate { rate: BitsPerSec, payload: Bytes },
    /// As fast as congestion control permits.
    Bulk,
}

/// TCP congestion control variant, passed to the transport layer by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CcKind {
    NewReno,
    #[default]
    Cubic,
    Bbr,
    Vegas,
}

impl CcKind {
    /// The ns-3 type name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            CcKind::NewReno => "TcpNewReno",
            CcKind::Cubic => "TcpCubic",
            CcKind::Bbr => "TcpBbr",
            CcKind::Vegas => "TcpVegas",
        }
    }
}

impl FromStr for CcKind {
    type Err = UnknownCcKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("tcp").unwrap_or(&lower);
        match name {
            "newreno" => Ok(CcKind::NewReno),
            "cubic" => Ok(CcKind::Cubic),
            "bbr" => Ok(CcKind::Bbr),
            "vegas" => Ok(CcKind::Vegas),
            _ => Err(UnknownCcKind(s.to_string())),
        }
    }
}

/// The error returned when a congestion control name is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown congestion control variant: {0}")]
pub struct UnknownCcKind(String);

/// A directed TCP traffic session from a left node to its matching right
/// node.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub src: NodeId,
    pub dst: NodeId,
    pub port: u16,
    pub mode: GenMode,
    pub start: Nanosecs,
    pub stop: Nanosecs,
}

/// Workload parameters shared by every flow. All flows share one global start
/// and stop time; per-flow offsets are not used.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct TrafficSpec {
    pub mode: GenMode,
    #[builder(default)]
    pub cc: CcKind,
    #[builder(default = Nanosecs::ZERO)]
    pub start: Nanosecs,
    pub stop: Nanosecs,
}

/// Pairs sender `i` with receiver `i` for every sender. Sinks for all `i`
/// must exist before any sender starts, so a sender without a matching right
/// node is a configuration error.
pub fn plan(
    senders: &[NodeId],
    receivers: &[NodeId],
    spec: &TrafficSpec,
) -> Result<Vec<Flow>, TrafficError> {
    senders
        .iter()
        .enumerate()
        .map(|(i, &src)| {
            let id = FlowId::new(i);
            let &dst = receivers.get(i).ok_or(TrafficError::MissingSink { flow: id })?;
            Ok(Flow {
                id,
                src,
                dst,
                port: FLOW_PORT,
                mode: spec.mode,
                start: spec.start,
                stop: spec.stop,
            })
        })
        .collect()
}

/// Traffic planning error.
#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("flow {flow} has no right node to sink it")]
    MissingSink { flow: FlowId },
}
