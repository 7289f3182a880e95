//! This module defines experiment specifications ([`ExperimentSpec`]), which
//! the driver turns into a validated, fully-placed [`Scenario`] ready to be
//! handed to an engine.

use crate::mobility::Layout;
use crate::network::{Dumbbell, DumbbellSpec};
use crate::traffic::{CcKind, Flow, GenMode};
use crate::units::{Millisecs, Nanosecs, Secs};

/// An experiment specification: the small fixed parameter set for one run.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct ExperimentSpec {
    /// The dumbbell to build.
    pub dumbbell: DumbbellSpec,
    /// Payload generation mode shared by every flow.
    pub mode: GenMode,
    /// Congestion control variant passed to the transport layer.
    #[builder(default)]
    pub cc: CcKind,
    /// Seconds the flows are active.
    pub runtime: Secs,
    /// Seed for the position scatter. Identical seeds reproduce identical
    /// layouts and summary metrics.
    #[builder(default = 0)]
    pub seed: u64,
    /// Goodput sampling period; `None` disables the sampler.
    #[builder(default)]
    pub goodput_period: Option<Millisecs>,
    /// Offset after simulation start at which congestion-window tracing
    /// attaches. Must lie past the flows' socket-creation point.
    #[builder(default = Millisecs::new(1_001))]
    pub trace_start: Millisecs,
}

/// A composed, validated scenario: the built topology, the node placement,
/// and the planned flows. Produced by the driver's pre-run phases.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub dumbbell: Dumbbell,
    pub layout: Layout,
    pub flows: Vec<Flow>,
    pub cc: CcKind,
    pub runtime: Secs,
    pub trace_start: Nanosecs,
    pub goodput_period: Option<Nanosecs>,
    /// Pre-run analytic estimate for the wireless access segment.
    pub access_delay_ns: Option<f64>,
}

impl Scenario {
    /// The time at which all flows stop.
    pub fn stop_time(&self) -> Nanosecs {
        self.runtime.into()
    }

    pub fn is_wireless(&self) -> bool {
        self.dumbbell.is_wireless()
    }
}
