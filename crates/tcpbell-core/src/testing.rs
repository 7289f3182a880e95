use crate::engine::{Engine, EngineError};
use crate::network::{Access, DumbbellSpec, NodeId, WirelessAccess};
use crate::record::Recorder;
use crate::spec::{ExperimentSpec, Scenario};
use crate::traffic::{Flow, FlowId, GenMode, FLOW_PORT};
use crate::units::{Bytes, Mbps, Nanosecs, Secs};

pub(crate) fn flows(n: usize, stop: Nanosecs) -> Vec<Flow> {
    (0..n)
        .map(|i| Flow {
            id: FlowId::new(i),
            src: NodeId::new(i),
            dst: NodeId::new(n + 2 + i),
            port: FLOW_PORT,
            mode: GenMode::Bulk,
            start: Nanosecs::ZERO,
            stop,
        })
        .collect()
}

pub(crate) fn wired_spec(nr_nodes: usize, runtime: Secs) -> ExperimentSpec {
    ExperimentSpec::builder()
        .dumbbell(DumbbellSpec::builder().left(nr_nodes).right(nr_nodes).build())
        .mode(GenMode::ConstantRate {
            rate: Mbps::new(100).into(),
            payload: Bytes::new(1472),
        })
        .runtime(runtime)
        .build()
}

pub(crate) fn wireless_spec(stations: usize, right: usize, runtime: Secs) -> ExperimentSpec {
    ExperimentSpec::builder()
        .dumbbell(
            DumbbellSpec::builder()
                .left(0)
                .right(right)
                .access(Access::Wireless(WirelessAccess::new(stations)))
                .build(),
        )
        .mode(GenMode::Bulk)
        .runtime(runtime)
        .build()
}

/// A canned engine that replays a fixed observation script.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    pub(crate) events: Vec<Event>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Event {
    Cwnd(FlowId, Nanosecs, u64),
    SinkRx(FlowId, Nanosecs, Bytes),
    PhyRxBegin(Nanosecs),
    PhyRxDrop(Nanosecs),
}

impl Engine for ScriptedEngine {
    fn run(&mut self, _scenario: &Scenario, recorder: &mut Recorder) -> Result<(), EngineError> {
        for &event in &self.events {
            match event {
                Event::Cwnd(flow, t, cwnd) => recorder.on_cwnd_change(flow, t, cwnd)?,
                Event::SinkRx(flow, t, total) => recorder.on_sink_rx(flow, t, total)?,
                Event::PhyRxBegin(t) => recorder.on_phy_rx_begin(t),
                Event::PhyRxDrop(t) => recorder.on_phy_rx_drop(t),
            }
        }
        Ok(())
    }
}
