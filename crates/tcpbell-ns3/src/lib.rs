//! An interface to the backend ns-3 simulation.
//!
//! This crate is tightly coupled to the interface provided by the ns-3
//! scripts: it writes the scenario out in their text formats, invokes the
//! backend, and replays the emitted event log into the recorder in event-time
//! order.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use tcpbell_core::{
    engine::{Engine, EngineError},
    network::{LinkKind, NodeKind},
    record::Recorder,
    spec::Scenario,
    traffic::GenMode,
    units::{Bytes, Nanosecs},
    FlowId,
};

/// An engine backed by an external ns-3 process.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Ns3Engine {
    /// The directory in the ns-3 source tree containing the `run.py`.
    #[builder(setter(into))]
    pub ns3_dir: PathBuf,
    /// The directory in which to write simulation configs and data.
    #[builder(setter(into))]
    pub data_dir: PathBuf,
    /// Enable per-device packet capture in the backend.
    #[builder(default = false)]
    pub pcap: bool,
    /// Enable the backend's animation trace.
    #[builder(default = false)]
    pub anim: bool,
}

impl Engine for Ns3Engine {
    fn run(&mut self, scenario: &Scenario, recorder: &mut Recorder) -> Result<(), EngineError> {
        // Set up directory
        let mk_path = |dir: &std::path::Path, file: &str| dir.join(file);
        fs::create_dir_all(&self.data_dir)?;

        // Set up the topology and node placement
        let topology = translate_topology(scenario);
        fs::write(mk_path(&self.data_dir, "topology.txt"), topology)?;

        // Set up the flows
        let flows = translate_flows(scenario);
        fs::write(mk_path(&self.data_dir, "flows.txt"), flows)?;

        // Run ns-3
        log::info!("invoking ns-3 in {}", self.ns3_dir.display());
        self.invoke_ns3(scenario)?;

        // Replay the emitted events into the recorder
        let s = fs::read_to_string(mk_path(
            &self.data_dir,
            &format!("events_topology_flows_{}.txt", scenario.cc.as_str()),
        ))?;
        replay_events(&s, recorder)
    }
}

impl Ns3Engine {
    fn invoke_ns3(&self, scenario: &Scenario) -> io::Result<()> {
        // We need to canonicalize the directories because we run `cd` below.
        let data_dir = fs::canonicalize(&self.data_dir)?;
        let data_dir = data_dir.display();
        let ns3_dir = fs::canonicalize(&self.ns3_dir)?;
        let ns3_dir = ns3_dir.display();

        // Build the command that runs the Python script.
        let cc = scenario.cc.as_str();
        let runtime = scenario.runtime.into_u64();
        let trace_start = scenario.trace_start.into_secs_f64();
        let mut python_command = format!(
            "python3 run.py --root {data_dir} --topo topology --trace flows \
            --cc {cc} --runtime {runtime} --trace-start {trace_start}"
        );
        if self.pcap {
            python_command.push_str(" --pcap");
        }
        if self.anim {
            python_command.push_str(" --anim");
        }
        python_command.push_str(&format!(" > {data_dir}/output.txt 2>&1"));
        // Execute the command in a child process.
        let _output = Command::new("sh")
            .arg("-c")
            .arg(format!("cd {ns3_dir}; {python_command}"))
            .output()?;
        Ok(())
    }
}

fn translate_topology(scenario: &Scenario) -> String {
    let mut s = String::new();
    let dumbbell = &scenario.dumbbell;
    // First line: node #, link #, wireless flag
    writeln!(
        s,
        "{} {} {}",
        dumbbell.nodes().len(),
        dumbbell.links().len(),
        scenario.is_wireless() as u8
    )
    .unwrap();
    // id kind x y z
    for node in dumbbell.nodes() {
        let pos = scenario
            .layout
            .position(node.id)
            .expect("every node is placed by the mobility assigner");
        writeln!(
            s,
            "{} {} {} {} {}",
            node.id,
            kind_token(node.kind),
            pos.x,
            pos.y,
            pos.z
        )
        .unwrap();
    }
    // Address ranges: left, bottleneck, right
    writeln!(
        s,
        "{} {} {}",
        dumbbell.subnets.left, dumbbell.subnets.bottleneck, dumbbell.subnets.right
    )
    .unwrap();
    // a b kind rate delay
    for link in dumbbell.links() {
        let kind = match link.kind {
            LinkKind::WiredP2p => "p2p",
            LinkKind::WirelessChannel => "wifi",
        };
        writeln!(
            s,
            "{} {} {} {} {}",
            link.a, link.b, kind, link.bandwidth, link.delay
        )
        .unwrap();
    }
    if let Some(wireless) = dumbbell.wireless() {
        let rss = wireless
            .rss
            .map_or_else(|| "none".to_string(), |rss| rss.to_string());
        writeln!(s, "phy {} rss {}", wireless.phy_mode, rss).unwrap();
    }
    if let Some(walk) = &scenario.layout.walk {
        let b = walk.bounds;
        writeln!(s, "walk {} {} {} {}", b.x_min, b.x_max, b.y_min, b.y_max).unwrap();
    }
    s
}

fn kind_token(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::LeftEdge => "left",
        NodeKind::Router => "router",
        NodeKind::RightEdge => "right",
        NodeKind::WirelessStation => "sta",
        NodeKind::AccessPoint => "ap",
    }
}

fn translate_flows(scenario: &Scenario) -> String {
    let nr_flows = scenario.flows.len();
    // First line: # of flows
    // id src dst port mode rate payload start_s stop_s
    let lines = std::iter::once(nr_flows.to_string())
        .chain(scenario.flows.iter().map(|f| {
            let (mode, rate, payload) = match f.mode {
                GenMode::ConstantRate { rate, payload } => {
                    ("rate", rate.into_u64(), payload.into_u64())
                }
                GenMode::Bulk => ("bulk", 0, 0),
            };
            format!(
                "{} {} {} {} {} {} {} {} {}",
                f.id,
                f.src,
                f.dst,
                f.port,
                mode,
                rate,
                payload,
                f.start.into_secs_f64(),
                f.stop.into_secs_f64()
            )
        }))
        .collect::<Vec<_>>();
    lines.join("\n")
}

fn replay_events(s: &str, recorder: &mut Recorder) -> Result<(), EngineError> {
    for line in s.lines() {
        let event = parse_event(line).map_err(anyhow::Error::new)?;
        match event {
            Ns3Event::Cwnd { flow, time, cwnd } => recorder.on_cwnd_change(flow, time, cwnd)?,
            Ns3Event::SinkRx { flow, time, total } => recorder.on_sink_rx(flow, time, total)?,
            Ns3Event::PhyRxBegin { time } => recorder.on_phy_rx_begin(time),
            Ns3Event::PhyRxDrop { time } => recorder.on_phy_rx_drop(time),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns3Event {
    Cwnd {
        flow: FlowId,
        time: Nanosecs,
        cwnd: u64,
    },
    SinkRx {
        flow: FlowId,
        time: Nanosecs,
        total: Bytes,
    },
    PhyRxBegin {
        time: Nanosecs,
    },
    PhyRxDrop {
        time: Nanosecs,
    },
}

fn parse_event(s: &str) -> Result<Ns3Event, ParseNs3Error> {
    // time_ns CWND flow value | time_ns RX flow total | time_ns PHYRX | time_ns PHYDROP
    let fields = s.split_whitespace().collect::<Vec<_>>();
    match fields.as_slice() {
        [time, "CWND", flow, value] => Ok(Ns3Event::Cwnd {
            flow: flow.parse()?,
            time: time.parse()?,
            cwnd: value.parse()?,
        }),
        [time, "RX", flow, total] => Ok(Ns3Event::SinkRx {
            flow: flow.parse()?,
            time: time.parse()?,
            total: total.parse()?,
        }),
        [time, "PHYRX"] => Ok(Ns3Event::PhyRxBegin {
            time: time.parse()?,
        }),
        [time, "PHYDROP"] => Ok(Ns3Event::PhyRxDrop {
            time: time.parse()?,
        }),
        _ => Err(ParseNs3Error::UnknownEvent(s.to_string())),
    }
}

/// Error parsing ns-3 formats.
#[derive(Debug, thiserror::Error)]
pub enum ParseNs3Error {
    /// The line does not match any known event record.
    #[error("Unknown event record: {0}")]
    UnknownEvent(String),

    /// Error parsing field value.
    #[error("Failed to parse field")]
    ParseInt(#[from] std::num::ParseIntError),
}
