//! The seam between the harness and the discrete-event simulation engine.
//! The engine owns packet scheduling, TCP state machines, radio propagation,
//! and routing; the harness only hands it a composed scenario and receives
//! observations back through the [`Recorder`].

use crate::record::{RecordError, Recorder};
use crate::spec::Scenario;
use crate::traffic::FlowId;

/// An external simulation engine.
///
/// An implementation runs the scenario to completion and delivers every
/// observation (congestion-window change, sink byte total, PHY receive/drop)
/// to the recorder in non-decreasing time order. The harness never blocks
/// inside an observation.
pub trait Engine {
    fn run(&mut self, scenario: &Scenario, recorder: &mut Recorder) -> Result<(), EngineError>;
}

/// The error type for [`Engine::run`]. Any engine-level fault is fatal; no
/// mid-run recovery is attempted.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine reported an unknown flow {0}")]
    UnknownFlow(FlowId),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
