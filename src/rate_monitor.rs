// Periodic rate monitor: polls cumulative counters, derives throughput.
// Polling happens outside the lock; only the in-memory update takes it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::counters::CounterSource;
use crate::error::MonitorError;
use crate::models::{CounterSample, IoSnapshot};

/// Fixed sampling period for production monitors.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(2);

type State = Arc<RwLock<HashMap<String, IoSnapshot>>>;

/// Tracks byte throughput for a set of devices or interfaces.
///
/// A background task re-polls the counter source every [`SAMPLE_PERIOD`] and
/// rewrites the tracked snapshots in place; readers copy data out under a
/// shared lock at any time. The tracked set is fixed at construction: names
/// the source reports later that were not in the initial poll are ignored,
/// and tracked names missing from a poll keep their previous snapshot.
pub struct RateMonitor {
    state: State,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RateMonitor {
    /// Polls the source once to seed the snapshots (rates zero), then starts
    /// the sampling task. An empty `names` list tracks everything the source
    /// reports. Fails with [`MonitorError::Probe`] if the initial poll fails;
    /// no monitor is returned in that case.
    pub async fn start(
        source: Arc<dyn CounterSource>,
        names: Vec<String>,
    ) -> Result<Self, MonitorError> {
        Self::start_with_period(source, names, SAMPLE_PERIOD).await
    }

    /// Same as [`RateMonitor::start`] with an injectable period (e.g. for
    /// tests). The rate divisor follows the period.
    pub async fn start_with_period(
        source: Arc<dyn CounterSource>,
        names: Vec<String>,
        period: Duration,
    ) -> Result<Self, MonitorError> {
        let initial = poll_source(&source, &names)
            .await
            .map_err(MonitorError::Probe)?;

        let mut snapshots = HashMap::with_capacity(initial.len());
        for (name, sample) in initial {
            snapshots.insert(
                name.clone(),
                IoSnapshot {
                    name,
                    bytes_read: sample.bytes_read,
                    bytes_written: sample.bytes_written,
                    read_rate: 0,
                    write_rate: 0,
                },
            );
        }

        let state: State = Arc::new(RwLock::new(snapshots));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(sample_loop(
            source,
            names,
            Arc::clone(&state),
            period,
            shutdown_rx,
        ));

        Ok(Self {
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Point-in-time copies of every tracked snapshot, sorted by name.
    ///
    /// A monitor whose source has become unreachable keeps returning its
    /// last successful sample with frozen rates; every skipped tick is
    /// logged at WARN, since the data itself carries no staleness marker.
    pub fn get_all(&self) -> Vec<IoSnapshot> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<IoSnapshot> = state.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Copy of the snapshot for `name`, or [`MonitorError::NotFound`].
    pub fn get(&self, name: &str) -> Result<IoSnapshot, MonitorError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.get(name).cloned().ok_or_else(|| MonitorError::NotFound {
            name: name.to_string(),
        })
    }

    /// Stops the sampling task. A tick already in flight may still apply one
    /// final update; snapshots stay readable afterwards. Calling `close` a
    /// second time returns [`MonitorError::AlreadyClosed`]. Dropping the
    /// monitor without closing also stops the task.
    pub fn close(&mut self) -> Result<(), MonitorError> {
        match self.shutdown_tx.take() {
            Some(tx) => {
                let _ = tx.send(());
                Ok(())
            }
            None => Err(MonitorError::AlreadyClosed),
        }
    }
}

async fn poll_source(
    source: &Arc<dyn CounterSource>,
    names: &[String],
) -> anyhow::Result<HashMap<String, CounterSample>> {
    let source = Arc::clone(source);
    let names = names.to_vec();
    tokio::task::spawn_blocking(move || source.poll(&names))
        .await
        .map_err(|e| anyhow::anyhow!("counter poll task join: {}", e))?
}

async fn sample_loop(
    source: Arc<dyn CounterSource>,
    names: Vec<String>,
    state: State,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The interval fires immediately; the constructor already took the
    // first sample, so consume that tick before the loop.
    tick.tick().await;

    let period_secs = period.as_secs().max(1);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match poll_source(&source, &names).await {
                    Ok(counters) => apply_counters(&state, &counters, period_secs),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            operation = "poll_counters",
                            "tick skipped; keeping previous snapshots"
                        );
                    }
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("rate monitor shutting down");
                break;
            }
        }
    }
}

/// Folds one poll result into the tracked snapshots. Counter decreases
/// (device reset/remount) clamp the rate to zero via `saturating_sub`; the
/// new, lower total is still stored so the next delta is computed against it.
fn apply_counters(
    state: &RwLock<HashMap<String, IoSnapshot>>,
    counters: &HashMap<String, CounterSample>,
    period_secs: u64,
) {
    let mut state = state.write().unwrap_or_else(|e| e.into_inner());
    for (name, sample) in counters {
        if let Some(info) = state.get_mut(name) {
            info.read_rate = sample.bytes_read.saturating_sub(info.bytes_read) / period_secs;
            info.write_rate = sample.bytes_written.saturating_sub(info.bytes_written) / period_secs;
            info.bytes_read = sample.bytes_read;
            info.bytes_written = sample.bytes_written;
        }
    }
}
