//! The instrumentation recorder. It turns engine observations into per-flow
//! time series and running totals: congestion-window traces written
//! immediately to per-flow CSV files, an optional periodic goodput sampler,
//! and PHY receive/drop counters for the wireless variant.
//!
//! Everything is keyed by [`FlowId`]; there is no structural-path addressing.
//! All counters live on the recorder instance and die with the run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::traffic::{Flow, FlowId};
use crate::units::{Bytes, Nanosecs};

/// An ordered, append-only `(time, value)` series for one metric of one
/// flow.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricSeries {
    samples: Vec<(Nanosecs, u64)>,
}

impl MetricSeries {
    fn push(&mut self, time: Nanosecs, value: u64) {
        debug_assert!(
            self.samples.last().map_or(true, |&(t, _)| t <= time),
            "samples must be appended in time order"
        );
        self.samples.push((time, value));
    }

    pub fn samples(&self) -> &[(Nanosecs, u64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of all sample values.
    pub fn total(&self) -> u64 {
        self.samples.iter().map(|&(_, v)| v).sum()
    }
}

/// A cooperative repeating timer. `pop_due` yields elapsed tick times one at
/// a time; cancellation is implicit once the run's stop time passes.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Nanosecs,
    next: Nanosecs,
}

impl Ticker {
    /// `period` must be nonzero; the driver rejects a zero period before any
    /// ticker is built.
    pub fn new(period: Nanosecs) -> Self {
        debug_assert!(period > Nanosecs::ZERO, "ticker period must be nonzero");
        Self {
            period,
            next: period,
        }
    }

    /// Returns the next tick at or before `now`, advancing the ticker.
    pub fn pop_due(&mut self, now: Nanosecs) -> Option<Nanosecs> {
        (self.next <= now).then(|| {
            let due = self.next;
            self.next += self.period;
            due
        })
    }
}

#[derive(Debug)]
struct CwndTrace {
    series: MetricSeries,
    writer: BufWriter<File>,
}

#[derive(Debug)]
struct SinkMeter {
    total: u64,
    sampler: Option<GoodputSampler>,
}

#[derive(Debug)]
struct GoodputSampler {
    series: MetricSeries,
    writer: BufWriter<File>,
    ticker: Ticker,
    last_sampled_total: u64,
}

impl GoodputSampler {
    /// Emits one sample per elapsed tick. The first elapsed tick carries all
    /// bits received since the previous sample; later ones carry zero. A tick
    /// landing exactly on an observation samples the pre-observation total.
    fn advance(&mut self, now: Nanosecs, total: u64) -> std::io::Result<()> {
        while let Some(due) = self.ticker.pop_due(now) {
            let bits = (total - self.last_sampled_total) * 8;
            self.series.push(due, bits);
            writeln!(self.writer, "{},{}", due.into_secs_f64(), bits)?;
            self.last_sampled_total = total;
        }
        Ok(())
    }
}

/// Running PHY receive/drop totals at the access point, accumulated for the
/// whole run.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PhyCounters {
    pub rx_begin: u64,
    pub rx_drop: u64,
}

impl PhyCounters {
    /// Fraction of receive attempts that were dropped, or `None` before any
    /// packet has been received.
    pub fn drop_ratio(&self) -> Option<f64> {
        (self.rx_begin > 0).then(|| self.rx_drop as f64 / self.rx_begin as f64)
    }
}

/// Byte totals and counters surviving the run, returned by
/// [`Recorder::finish`].
#[derive(Debug, Clone)]
pub struct RunTotals {
    pub rx_bytes: FxHashMap<FlowId, Bytes>,
    pub phy: Option<PhyCounters>,
}

/// The instrumentation recorder for one run.
#[derive(Debug)]
pub struct Recorder {
    out_dir: PathBuf,
    cwnd: FxHashMap<FlowId, CwndTrace>,
    sinks: FxHashMap<FlowId, SinkMeter>,
    phy: Option<PhyCounters>,
    stop: Nanosecs,
}

impl Recorder {
    /// Opens every per-flow trace file up front, so traces exist even for
    /// flows that never transmit a byte.
    pub fn new(
        flows: &[Flow],
        out_dir: impl AsRef<Path>,
        stop: Nanosecs,
        goodput_period: Option<Nanosecs>,
        wireless: bool,
    ) -> Result<Self, RecordError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)?;
        let mut cwnd = FxHashMap::default();
        let mut sinks = FxHashMap::default();
        for flow in flows {
            cwnd.insert(
                flow.id,
                CwndTrace {
                    series: MetricSeries::default(),
                    writer: open_trace(&out_dir, "cwnd", flow.id)?,
                },
            );
            let sampler = goodput_period
                .map(|period| {
                    Ok::<_, RecordError>(GoodputSampler {
                        series: MetricSeries::default(),
                        writer: open_trace(&out_dir, "goodput", flow.id)?,
                        ticker: Ticker::new(period),
                        last_sampled_total: 0,
                    })
                })
                .transpose()?;
            sinks.insert(flow.id, SinkMeter { total: 0, sampler });
        }
        Ok(Self {
            out_dir,
            cwnd,
            sinks,
            phy: wireless.then(PhyCounters::default),
            stop,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Appends one congestion-window sample and writes it through to the
    /// flow's trace file immediately.
    pub fn on_cwnd_change(
        &mut self,
        flow: FlowId,
        time: Nanosecs,
        cwnd: u64,
    ) -> Result<(), RecordError> {
        let trace = self
            .cwnd
            .get_mut(&flow)
            .ok_or(RecordError::UnknownFlow(flow))?;
        trace.series.push(time, cwnd);
        writeln!(trace.writer, "{},{}", time.into_secs_f64(), cwnd)?;
        Ok(())
    }

    /// Records a sink's cumulative received-byte counter. The counter is read
    /// by value; the engine owns it and never resets it.
    pub fn on_sink_rx(
        &mut self,
        flow: FlowId,
        time: Nanosecs,
        total: Bytes,
    ) -> Result<(), RecordError> {
        let meter = self
            .sinks
            .get_mut(&flow)
            .ok_or(RecordError::UnknownFlow(flow))?;
        if let Some(sampler) = &mut meter.sampler {
            sampler.advance(time, meter.total)?;
        }
        meter.total = meter.total.max(total.into_u64());
        Ok(())
    }

    pub fn on_phy_rx_begin(&mut self, _time: Nanosecs) {
        match &mut self.phy {
            Some(phy) => phy.rx_begin += 1,
            None => log::debug!("ignoring PHY rx-begin event without wireless instrumentation"),
        }
    }

    pub fn on_phy_rx_drop(&mut self, _time: Nanosecs) {
        match &mut self.phy {
            Some(phy) => phy.rx_drop += 1,
            None => log::debug!("ignoring PHY rx-drop event without wireless instrumentation"),
        }
    }

    pub fn cwnd_series(&self, flow: FlowId) -> Option<&MetricSeries> {
        self.cwnd.get(&flow).map(|t| &t.series)
    }

    pub fn goodput_series(&self, flow: FlowId) -> Option<&MetricSeries> {
        self.sinks
            .get(&flow)
            .and_then(|m| m.sampler.as_ref())
            .map(|s| &s.series)
    }

    /// Drains the remaining sampler ticks up to the stop time, emits one
    /// final partial sample for any tail bytes, and flushes every trace
    /// file. After this, the goodput series of each flow sums to exactly
    /// `total_bytes * 8`.
    pub fn finish(mut self) -> Result<RunTotals, RecordError> {
        let mut rx_bytes = FxHashMap::default();
        for (&flow, meter) in self.sinks.iter_mut() {
            if let Some(sampler) = &mut meter.sampler {
                sampler.advance(self.stop, meter.total)?;
                if meter.total > sampler.last_sampled_total {
                    let bits = (meter.total - sampler.last_sampled_total) * 8;
                    sampler.series.push(self.stop, bits);
                    writeln!(sampler.writer, "{},{}", self.stop.into_secs_f64(), bits)?;
                    sampler.last_sampled_total = meter.total;
                }
                sampler.writer.flush()?;
            }
            rx_bytes.insert(flow, Bytes::new(meter.total));
        }
        for trace in self.cwnd.values_mut() {
            trace.writer.flush()?;
        }
        Ok(RunTotals {
            rx_bytes,
            phy: self.phy,
        })
    }
}

fn open_trace(dir: &Path, stem: &str, flow: FlowId) -> Result<BufWriter<File>, RecordError> {
    let path = dir.join(format!("{stem}{flow}.csv"));
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "time_seconds,value")?;
    Ok(writer)
}

/// Recording error.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("no trace registered for flow {0}")]
    UnknownFlow(FlowId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::units::Millisecs;

    const STOP: Nanosecs = Nanosecs::new(10_000_000); // 10 ms

    fn recorder(nr_flows: usize, goodput: bool, wireless: bool) -> (Recorder, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let flows = testing::flows(nr_flows, STOP);
        let period = goodput.then(|| Millisecs::ONE.into());
        let recorder = Recorder::new(&flows, dir.path(), STOP, period, wireless).unwrap();
        (recorder, dir)
    }

    #[test]
    fn ticker_advances_on_every_pop() {
        let mut ticker = Ticker::new(Nanosecs::new(2));
        assert_eq!(ticker.pop_due(Nanosecs::new(5)), Some(Nanosecs::new(2)));
        assert_eq!(ticker.pop_due(Nanosecs::new(5)), Some(Nanosecs::new(4)));
        assert_eq!(ticker.pop_due(Nanosecs::new(5)), None);
    }

    #[test]
    fn trace_files_exist_even_without_samples() {
        let (recorder, dir) = recorder(3, true, false);
        let totals = recorder.finish().unwrap();
        for i in 0..3 {
            let cwnd = std::fs::read_to_string(dir.path().join(format!("cwnd{i}.csv"))).unwrap();
            assert_eq!(cwnd, "time_seconds,value\n");
            let goodput =
                std::fs::read_to_string(dir.path().join(format!("goodput{i}.csv"))).unwrap();
            assert_eq!(goodput, "time_seconds,value\n");
            assert_eq!(totals.rx_bytes[&FlowId::new(i)], Bytes::ZERO);
        }
    }

    #[test]
    fn cwnd_trace_written_through() {
        let (mut recorder, dir) = recorder(1, false, false);
        recorder
            .on_cwnd_change(FlowId::ZERO, Nanosecs::new(1_000_000), 14_720)
            .unwrap();
        recorder
            .on_cwnd_change(FlowId::ZERO, Nanosecs::new(2_000_000), 29_440)
            .unwrap();
        let series = recorder.cwnd_series(FlowId::ZERO).unwrap();
        assert_eq!(
            series.samples(),
            &[
                (Nanosecs::new(1_000_000), 14_720),
                (Nanosecs::new(2_000_000), 29_440)
            ]
        );
        recorder.finish().unwrap();
        let contents = std::fs::read_to_string(dir.path().join("cwnd0.csv")).unwrap();
        assert_eq!(contents, "time_seconds,value\n0.001,14720\n0.002,29440\n");
    }

    #[test]
    fn cwnd_timestamps_non_decreasing() {
        let (mut recorder, _dir) = recorder(1, false, false);
        for i in 1..=5u64 {
            recorder
                .on_cwnd_change(FlowId::ZERO, Nanosecs::new(i * 500_000), i)
                .unwrap();
        }
        let series = recorder.cwnd_series(FlowId::ZERO).unwrap();
        let times = series.samples().iter().map(|&(t, _)| t).collect::<Vec<_>>();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn goodput_sums_to_total_bits() {
        let (mut recorder, dir) = recorder(1, true, false);
        // Irregular arrivals, some mid-period, one long gap.
        for (t, total) in [
            (300_000u64, 1_000u64),
            (900_000, 2_500),
            (2_100_000, 4_000),
            (7_400_000, 9_999),
        ] {
            recorder
                .on_sink_rx(FlowId::ZERO, Nanosecs::new(t), Bytes::new(total))
                .unwrap();
        }
        let totals = recorder.finish().unwrap();
        assert_eq!(totals.rx_bytes[&FlowId::ZERO], Bytes::new(9_999));
        let contents = std::fs::read_to_string(dir.path().join("goodput0.csv")).unwrap();
        let samples = contents
            .lines()
            .skip(1) // header
            .map(|l| {
                let (t, v) = l.split_once(',').unwrap();
                (t.parse::<f64>().unwrap(), v.parse::<u64>().unwrap())
            })
            .collect::<Vec<_>>();
        let bits: u64 = samples.iter().map(|&(_, v)| v).sum();
        assert_eq!(bits, 9_999 * 8);
        assert!(samples.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn goodput_tail_sample_closes_the_books() {
        let dir = tempfile::tempdir().unwrap();
        let flows = testing::flows(1, STOP);
        let mut recorder = Recorder::new(
            &flows,
            dir.path(),
            STOP,
            Some(Millisecs::ONE.into()),
            false,
        )
        .unwrap();
        recorder
            .on_sink_rx(FlowId::ZERO, Nanosecs::new(9_700_000), Bytes::new(5_000))
            .unwrap();
        recorder.finish().unwrap();
        let contents = std::fs::read_to_string(dir.path().join("goodput0.csv")).unwrap();
        let bits: u64 = contents
            .lines()
            .skip(1) // header
            .map(|l| l.rsplit(',').next().unwrap().parse::<u64>().unwrap())
            .sum();
        assert_eq!(bits, 5_000 * 8);
    }

    #[test]
    fn tick_on_observation_samples_pre_event_total() {
        let (mut recorder, _dir) = recorder(1, true, false);
        recorder
            .on_sink_rx(FlowId::ZERO, Nanosecs::new(500_000), Bytes::new(100))
            .unwrap();
        // Lands exactly on the 1 ms tick: the tick must see 100 bytes, not
        // 300.
        recorder
            .on_sink_rx(FlowId::ZERO, Nanosecs::new(1_000_000), Bytes::new(300))
            .unwrap();
        let series = recorder.goodput_series(FlowId::ZERO).unwrap();
        assert_eq!(series.samples()[0], (Nanosecs::new(1_000_000), 100 * 8));
    }

    #[test]
    fn drop_ratio_bounds() {
        let (mut recorder, _dir) = recorder(1, false, true);
        for _ in 0..10 {
            recorder.on_phy_rx_begin(Nanosecs::ZERO);
        }
        for _ in 0..3 {
            recorder.on_phy_rx_drop(Nanosecs::ZERO);
        }
        let totals = recorder.finish().unwrap();
        let ratio = totals.phy.unwrap().drop_ratio().unwrap();
        assert!((0.0..=1.0).contains(&ratio));
        assert!((ratio - 0.3).abs() < 1e-12);
    }

    #[test]
    fn drop_ratio_undefined_without_receives() {
        let (recorder, _dir) = recorder(1, false, true);
        let totals = recorder.finish().unwrap();
        assert_eq!(totals.phy.unwrap().drop_ratio(), None);
    }

    #[test]
    fn phy_events_ignored_when_wired() {
        let (mut recorder, _dir) = recorder(1, false, false);
        recorder.on_phy_rx_begin(Nanosecs::ZERO);
        let totals = recorder.finish().unwrap();
        assert!(totals.phy.is_none());
    }

    #[test]
    fn unknown_flow_rejected() {
        let (mut recorder, _dir) = recorder(1, false, false);
        let res = recorder.on_cwnd_change(FlowId::new(9), Nanosecs::ZERO, 1);
        assert!(matches!(res, Err(RecordError::UnknownFlow(..))));
        let res = recorder.on_sink_rx(FlowId::new(9), Nanosecs::ZERO, Bytes::ZERO);
        assert!(matches!(res, Err(RecordError::UnknownFlow(..))));
    }
}
