use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tcpbell_core::network::{Access, DumbbellSpec, WirelessAccess};
use tcpbell_core::traffic::CcKind;
use tcpbell_core::units::{BitsPerSec, Bytes, Mbps, Millisecs, Secs};
use tcpbell_core::{ExperimentSpec, GenMode};
use tcpbell_ns3::Ns3Engine;

#[derive(Parser, Debug)]
#[command(about = "Run a dumbbell TCP experiment on the ns-3 backend")]
struct Args {
    /// Number of sender/receiver pairs
    #[arg(long, default_value_t = 1)]
    numnodes: usize,

    /// Access segment of the left side
    #[arg(long, value_enum, default_value_t = TopologyKind::Wired)]
    topology: TopologyKind,

    /// Sender application data rate, e.g. 100Mbps
    #[arg(long, default_value = "100Mbps", value_parser = BitsPerSec::parse_suffixed)]
    datarate: BitsPerSec,

    /// Application payload size in bytes
    #[arg(long = "payloadSize", default_value_t = 1472)]
    payload_size: u64,

    /// Payload generation mode
    #[arg(long, value_enum, default_value_t = TrafficKind::Constant)]
    traffic: TrafficKind,

    /// Congestion control variant, e.g. TcpCubic
    #[arg(long, default_value = "TcpCubic")]
    tcpmode: CcKind,

    /// Seconds the flows are active
    #[arg(long, default_value_t = 10)]
    runtime: u64,

    /// Goodput sampling period in milliseconds; omit to disable the sampler
    #[arg(long)]
    goodput: Option<u64>,

    /// Wifi data/control rate mode (wireless only)
    #[arg(long = "phyMode", default_value = WirelessAccess::DEFAULT_PHY_MODE)]
    phy_mode: String,

    /// Fixed received signal strength in dBm (wireless only)
    #[arg(long)]
    rss: Option<f64>,

    /// Seed for the node placement scatter
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Enable debug logging
    #[arg(long)]
    logging: bool,

    /// Enable packet capture in the backend
    #[arg(long)]
    pcap: bool,

    /// Enable the backend's animation trace
    #[arg(long)]
    anim: bool,

    /// The ns-3 directory containing `run.py`
    #[arg(long = "ns3-dir")]
    ns3_dir: PathBuf,

    /// Directory for simulation configs and trace output
    #[arg(long = "out-dir", default_value = "data")]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TopologyKind {
    Wired,
    Wireless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrafficKind {
    Constant,
    Bulk,
}

impl Args {
    fn dumbbell(&self) -> DumbbellSpec {
        match self.topology {
            TopologyKind::Wired => DumbbellSpec::builder()
                .left(self.numnodes)
                .right(self.numnodes)
                .build(),
            // The wireless access segment cannot sustain the wired default,
            // so the bottleneck drops to 1 Mbps.
            TopologyKind::Wireless => DumbbellSpec::builder()
                .left(0)
                .right(self.numnodes)
                .bottleneck_bandwidth(Mbps::new(1).into())
                .access(Access::Wireless(WirelessAccess {
                    stations: self.numnodes,
                    phy_mode: self.phy_mode.clone(),
                    rss: self.rss,
                }))
                .build(),
        }
    }

    fn gen_mode(&self) -> GenMode {
        match self.traffic {
            TrafficKind::Constant => GenMode::ConstantRate {
                rate: self.datarate,
                payload: Bytes::new(self.payload_size),
            },
            TrafficKind::Bulk => GenMode::Bulk,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.logging);

    let spec = ExperimentSpec::builder()
        .dumbbell(args.dumbbell())
        .mode(args.gen_mode())
        .cc(args.tcpmode)
        .runtime(Secs::new(args.runtime))
        .seed(args.seed)
        .goodput_period(args.goodput.map(Millisecs::new))
        .build();
    let mut engine = Ns3Engine::builder()
        .ns3_dir(args.ns3_dir)
        .data_dir(args.out_dir.clone())
        .pcap(args.pcap)
        .anim(args.anim)
        .build();

    let summary = tcpbell_core::run(spec, &mut engine, &args.out_dir)?;
    print!("{summary}");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
