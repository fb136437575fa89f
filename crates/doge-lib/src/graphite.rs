// ============================
// doge-lib/src/graphite.rs
// ============================
//! Metrics egress to a Graphite-style collector.
//!
//! Feature-detect-once: the collector is probed a single time at startup.
//! When reachable, a recorder backing the `metrics` facade is installed and
//! a periodic reporter pushes plaintext lines on a fixed cadence. When not,
//! nothing is installed and the metrics macros no-op for the process
//! lifetime.
use crate::config::GraphiteSettings;
use dashmap::DashMap;
use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata,
    Recorder, SharedString, Unit,
};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

/// Outcome of the startup feature probe, fixed for the process lifetime.
pub enum MetricsDecision {
    /// Collector reachable: report with these settings
    Enabled(GraphiteSettings),
    /// Collector unreachable: the feature stays off, no re-probing
    Disabled,
}

/// One blocking TCP connect against the collector
pub fn probe_collector(host: &str, port: u16, timeout: Duration) -> bool {
    let Ok(mut addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs.any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

/// Decide once whether metrics egress is on
pub fn detect(settings: &GraphiteSettings) -> MetricsDecision {
    if probe_collector(&settings.host, settings.port, Duration::from_secs(1)) {
        MetricsDecision::Enabled(settings.clone())
    } else {
        MetricsDecision::Disabled
    }
}

#[derive(Default)]
struct CounterHandle(AtomicU64);

impl CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn absolute(&self, value: u64) {
        self.0.fetch_max(value, Ordering::Relaxed);
    }
}

/// Gauge value stored as f64 bits
#[derive(Default)]
struct GaugeHandle(AtomicU64);

impl GaugeHandle {
    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn update(&self, f: impl Fn(f64) -> f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = f(f64::from_bits(current)).to_bits();
            match self.0.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        self.update(|current| current + value);
    }

    fn decrement(&self, value: f64) {
        self.update(|current| current - value);
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Default)]
struct HistogramHandle {
    sum: Mutex<f64>,
    count: AtomicU64,
}

impl HistogramFn for HistogramHandle {
    fn record(&self, value: f64) {
        if let Ok(mut sum) = self.sum.lock() {
            *sum += value;
        }
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Registry {
    counters: DashMap<String, Arc<CounterHandle>>,
    gauges: DashMap<String, Arc<GaugeHandle>>,
    histograms: DashMap<String, Arc<HistogramHandle>>,
}

/// Recorder backing the `metrics` macros with plain atomic handles that the
/// reporter can snapshot.
#[derive(Clone, Default)]
pub struct GraphiteRecorder {
    registry: Arc<Registry>,
}

impl GraphiteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this recorder as the process-global metrics sink
    pub fn install(&self) -> anyhow::Result<()> {
        metrics::set_global_recorder(self.clone())
            .map_err(|_| anyhow::anyhow!("a global metrics recorder is already installed"))
    }

    /// Current values of every registered metric. Histograms surface as
    /// `<name>.count` and `<name>.mean`.
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        for entry in self.registry.counters.iter() {
            #[allow(clippy::cast_precision_loss)]
            out.push((entry.key().clone(), entry.value().0.load(Ordering::Relaxed) as f64));
        }
        for entry in self.registry.gauges.iter() {
            out.push((entry.key().clone(), entry.value().get()));
        }
        for entry in self.registry.histograms.iter() {
            let count = entry.value().count.load(Ordering::Relaxed);
            let sum = entry.value().sum.lock().map(|sum| *sum).unwrap_or_default();
            #[allow(clippy::cast_precision_loss)]
            let count_f = count as f64;
            out.push((format!("{}.count", entry.key()), count_f));
            if count > 0 {
                out.push((format!("{}.mean", entry.key()), sum / count_f));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl Recorder for GraphiteRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let handle = self
            .registry
            .counters
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Counter::from_arc(handle)
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        let handle = self
            .registry
            .gauges
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Gauge::from_arc(handle)
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        let handle = self
            .registry
            .histograms
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Histogram::from_arc(handle)
    }
}

/// Render a snapshot as Graphite plaintext lines:
/// `<prefix>.<key> <value> <unix_ts>`
pub fn render_plaintext(prefix: &str, snapshot: &[(String, f64)], timestamp: u64) -> String {
    let mut out = String::new();
    for (key, value) in snapshot {
        out.push_str(&format!("{prefix}.{key} {value} {timestamp}\n"));
    }
    out
}

/// Periodic task pushing recorder snapshots to the collector.
pub struct GraphiteReporter {
    recorder: GraphiteRecorder,
    settings: GraphiteSettings,
}

impl GraphiteReporter {
    pub fn new(recorder: GraphiteRecorder, settings: GraphiteSettings) -> Self {
        Self { recorder, settings }
    }

    /// Start the reporting loop on its own timer
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(self.settings.period_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.report_once().await {
                    // collector hiccups are not errors, next tick retries
                    tracing::debug!(error = %err, "graphite push failed");
                }
            }
        })
    }

    /// One push of the current snapshot
    pub async fn report_once(&self) -> std::io::Result<()> {
        let snapshot = self.recorder.snapshot();
        if snapshot.is_empty() {
            return Ok(());
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let payload = render_plaintext(&self.settings.prefix, &snapshot, timestamp);

        let mut stream = tokio::net::TcpStream::connect((
            self.settings.host.as_str(),
            self.settings.port,
        ))
        .await?;
        stream.write_all(payload.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }
}
