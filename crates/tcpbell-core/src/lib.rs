#![warn(unreachable_pub, missing_debug_implementations)]

//! The core tcpbell library. This crate composes a dumbbell network
//! experiment (topology, node placement, traffic flows), defines [the
//! routine](run::run) that drives it through an external simulation
//! [`Engine`], and records the resulting per-flow metrics.

#[macro_use]
mod ident;

pub mod engine;
pub mod mobility;
pub mod network;
pub mod record;
pub mod run;
pub mod spec;
pub mod traffic;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{Engine, EngineError};
pub use network::{
    Access, Dumbbell, DumbbellError, DumbbellSpec, Link, LinkKind, Node, NodeId, NodeKind,
    TopologyError, WirelessAccess,
};
pub use record::Recorder;
pub use run::{run, Error, Experiment, Summary};
pub use spec::{ExperimentSpec, Scenario};
pub use traffic::{CcKind, Flow, FlowId, GenMode};
