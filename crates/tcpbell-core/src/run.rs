//! The experiment driver: a strictly sequential, non-reentrant state machine
//! (`Configured → TopologyBuilt → FlowsInstalled → Running → Completed`) that
//! composes the scenario, hands it to an engine, and computes the end-of-run
//! summary.

use std::mem;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::{Engine, EngineError};
use crate::mobility::{self, Layout};
use crate::network::{Dumbbell, DumbbellError};
use crate::record::{PhyCounters, RecordError, Recorder, RunTotals};
use crate::spec::{ExperimentSpec, Scenario};
use crate::traffic::{self, FlowId, TrafficError, TrafficSpec};
use crate::units::{Bytes, Millisecs, Secs};

/// Runs one experiment end to end and returns its summary.
pub fn run<E: Engine>(
    spec: ExperimentSpec,
    engine: &mut E,
    out_dir: impl AsRef<Path>,
) -> Result<Summary, Error> {
    let mut experiment = Experiment::new(spec)?;
    experiment.build_topology()?;
    experiment.install_flows()?;
    experiment.execute(engine, out_dir)?;
    experiment.summary()
}

/// One experiment run. Each transition consumes the previous phase's state;
/// re-running a phase, or skipping one, is an [`Error::Phase`].
#[derive(Debug)]
pub struct Experiment {
    spec: ExperimentSpec,
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    Configured,
    TopologyBuilt {
        dumbbell: Dumbbell,
        layout: Layout,
        access_delay_ns: Option<f64>,
    },
    FlowsInstalled {
        scenario: Scenario,
    },
    Running,
    Completed {
        scenario: Scenario,
        totals: RunTotals,
    },
}

/// The observable phase of an [`Experiment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PhaseKind {
    Configured,
    TopologyBuilt,
    FlowsInstalled,
    Running,
    Completed,
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Configured => PhaseKind::Configured,
            Phase::TopologyBuilt { .. } => PhaseKind::TopologyBuilt,
            Phase::FlowsInstalled { .. } => PhaseKind::FlowsInstalled,
            Phase::Running => PhaseKind::Running,
            Phase::Completed { .. } => PhaseKind::Completed,
        }
    }
}

impl Experiment {
    pub fn new(spec: ExperimentSpec) -> Result<Self, Error> {
        if spec.runtime == Secs::ZERO {
            return Err(Error::ZeroRuntime);
        }
        // A zero period would never advance the sampler's ticker.
        if spec.goodput_period == Some(Millisecs::ZERO) {
            return Err(Error::ZeroGoodputPeriod);
        }
        Ok(Self {
            spec,
            phase: Phase::Configured,
        })
    }

    pub fn phase(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Builds the dumbbell and assigns node positions from the seeded
    /// scatter. The wireless delay estimate is computed here, once, from
    /// initial positions.
    pub fn build_topology(&mut self) -> Result<(), Error> {
        self.expect_phase(PhaseKind::Configured)?;
        let dumbbell = self.spec.dumbbell.build()?;
        let rng = StdRng::seed_from_u64(self.spec.seed);
        let layout = mobility::assign(&dumbbell, rng);
        let access_delay_ns = if dumbbell.is_wireless() {
            mobility::average_propagation_delay(&layout, dumbbell.senders(), dumbbell.left_router)
        } else {
            None
        };
        if let Some(delay) = access_delay_ns {
            log::info!("average access-segment propagation delay: {delay:.2}ns");
        }
        log::debug!(
            "built topology with {} nodes and {} links",
            dumbbell.nodes().len(),
            dumbbell.links().len()
        );
        self.phase = Phase::TopologyBuilt {
            dumbbell,
            layout,
            access_delay_ns,
        };
        Ok(())
    }

    /// Plans one flow per sender, paired with its matching sink.
    pub fn install_flows(&mut self) -> Result<(), Error> {
        self.expect_phase(PhaseKind::TopologyBuilt)?;
        let Phase::TopologyBuilt {
            dumbbell,
            layout,
            access_delay_ns,
        } = mem::replace(&mut self.phase, Phase::Configured)
        else {
            unreachable!("phase checked above");
        };
        let traffic_spec = TrafficSpec::builder()
            .mode(self.spec.mode)
            .cc(self.spec.cc)
            .stop(self.spec.runtime.into())
            .build();
        let flows = traffic::plan(dumbbell.senders(), &dumbbell.receivers(), &traffic_spec)?;
        log::debug!("installed {} flows", flows.len());
        self.phase = Phase::FlowsInstalled {
            scenario: Scenario {
                dumbbell,
                layout,
                flows,
                cc: self.spec.cc,
                runtime: self.spec.runtime,
                trace_start: self.spec.trace_start.into(),
                goodput_period: self.spec.goodput_period.map(Into::into),
                access_delay_ns,
            },
        };
        Ok(())
    }

    /// Runs the scenario on the engine. Trace files are opened before the
    /// engine starts and flushed only after it completes.
    pub fn execute<E: Engine>(
        &mut self,
        engine: &mut E,
        out_dir: impl AsRef<Path>,
    ) -> Result<(), Error> {
        self.expect_phase(PhaseKind::FlowsInstalled)?;
        let Phase::FlowsInstalled { scenario } = mem::replace(&mut self.phase, Phase::Running)
        else {
            unreachable!("phase checked above");
        };
        let mut recorder = Recorder::new(
            &scenario.flows,
            out_dir,
            scenario.stop_time(),
            scenario.goodput_period,
            scenario.is_wireless(),
        )?;
        engine.run(&scenario, &mut recorder)?;
        let totals = recorder.finish()?;
        self.phase = Phase::Completed { scenario, totals };
        Ok(())
    }

    /// Computes the per-flow goodput and (for wireless runs) the drop ratio.
    pub fn summary(&self) -> Result<Summary, Error> {
        let Phase::Completed { scenario, totals } = &self.phase else {
            return Err(Error::Phase {
                expected: PhaseKind::Completed,
                actual: self.phase.kind(),
            });
        };
        let runtime_secs = scenario.runtime.into_f64();
        let flows = scenario
            .flows
            .iter()
            .map(|flow| {
                let rx_bytes = totals.rx_bytes.get(&flow.id).copied().unwrap_or(Bytes::ZERO);
                FlowSummary {
                    id: flow.id,
                    rx_bytes,
                    goodput_mbps: rx_bytes.into_f64() * 8.0 / (runtime_secs * 1_048_576.0),
                }
            })
            .collect();
        Ok(Summary {
            flows,
            phy: totals.phy,
            access_delay_ns: scenario.access_delay_ns,
        })
    }

    fn expect_phase(&self, expected: PhaseKind) -> Result<(), Error> {
        let actual = self.phase.kind();
        if actual != expected {
            return Err(Error::Phase { expected, actual });
        }
        Ok(())
    }
}

/// End-of-run metrics for one flow.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct FlowSummary {
    pub id: FlowId,
    pub rx_bytes: Bytes,
    /// Mbps using binary mega: `bytes * 8 / (runtime * 2^20)`.
    pub goodput_mbps: f64,
}

/// End-of-run summary statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub flows: Vec<FlowSummary>,
    /// PHY counters, present for wireless runs only.
    pub phy: Option<PhyCounters>,
    pub access_delay_ns: Option<f64>,
}

impl Summary {
    pub fn drop_ratio(&self) -> Option<f64> {
        self.phy.and_then(|phy| phy.drop_ratio())
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(delay) = self.access_delay_ns {
            writeln!(f, "Average delay of wifi channel = {delay}ns")?;
        }
        if let Some(phy) = self.phy {
            match phy.drop_ratio() {
                Some(ratio) => writeln!(f, "Ratio of dropped packets on AP: {ratio}")?,
                None => writeln!(f, "Ratio of dropped packets on AP: undefined")?,
            }
        }
        for flow in &self.flows {
            writeln!(
                f,
                "Avg. Goodput (Mbps) for flow {}: {}",
                flow.id, flow.goodput_mbps
            )?;
        }
        Ok(())
    }
}

/// Experiment error. Configuration errors surface before the `Running`
/// phase; engine faults are fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("runtime must be nonzero")]
    ZeroRuntime,

    #[error("goodput sampling period must be nonzero")]
    ZeroGoodputPeriod,

    #[error("invalid dumbbell")]
    Dumbbell(#[from] DumbbellError),

    #[error("invalid traffic plan")]
    Traffic(#[from] TrafficError),

    #[error("expected phase {expected}, but experiment is in phase {actual}")]
    Phase {
        expected: PhaseKind,
        actual: PhaseKind,
    },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("engine failure")]
    Engine(#[from] EngineError),
}
