// NAT state tracking: private/public address plus mapping classification,
// refreshed on a long interval by a background task.

use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use sysinfo::Networks;
use tokio::sync::oneshot;

use crate::error::MonitorError;
use crate::models::NatType;

/// Raw mapping class reported by a discovery probe, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMapping {
    NoNat,
    FullCone,
    RestrictedCone,
    PortRestrictedCone,
    Symmetric,
    Blocked,
    SymmetricUdpFirewall,
    Inconclusive,
}

/// One discovery round-trip result.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub mapping: RawMapping,
    pub public_addr: String,
}

/// Single NAT discovery round-trip against `server`.
///
/// `discover` may block on the network; the tracker calls it through
/// `spawn_blocking`. Timeout discipline belongs to the implementation.
pub trait NatProbe: Send + Sync + 'static {
    fn discover(&self, server: &str) -> anyhow::Result<ProbeReport>;
}

#[derive(Debug, Clone)]
pub struct NatOptions {
    /// How often to re-probe. Defaults to 4 hours.
    pub check_interval: Duration,
}

impl Default for NatOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(4 * 60 * 60),
        }
    }
}

#[derive(Debug, Default)]
struct NatState {
    public_addr: String,
    nat_type: NatType,
}

/// Holds the host's private/public address and NAT classification.
///
/// The private address is resolved once at construction and never changes;
/// the public address and classification are refreshed by a background task
/// every [`NatOptions::check_interval`]. Readers always see the last
/// successfully probed values.
pub struct NatTracker {
    private_addr: String,
    state: Arc<RwLock<NatState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl NatTracker {
    /// Resolves the private address, performs one discovery probe, then
    /// starts the refresh task. Fails with [`MonitorError::NoPrivateAddress`]
    /// when no non-loopback IPv4 exists locally, with
    /// [`MonitorError::Probe`] when the initial probe errors, and with
    /// [`MonitorError::Classification`] when it reports an unmapped class.
    pub async fn start(
        probe: Arc<dyn NatProbe>,
        server: String,
        options: NatOptions,
    ) -> Result<Self, MonitorError> {
        let private_addr = local_private_ipv4()
            .ok_or(MonitorError::NoPrivateAddress)?
            .to_string();

        let report = run_probe(&probe, &server).await.map_err(MonitorError::Probe)?;
        let nat_type = classify(report.mapping)?;

        let state = Arc::new(RwLock::new(NatState {
            public_addr: report.public_addr,
            nat_type,
        }));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(refresh_loop(
            probe,
            server,
            Arc::clone(&state),
            options.check_interval,
            shutdown_rx,
        ));

        Ok(Self {
            private_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Public address from the last successful probe; empty before one.
    pub fn public_addr(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .public_addr
            .clone()
    }

    pub fn private_addr(&self) -> &str {
        &self.private_addr
    }

    /// Classification from the last successful probe.
    pub fn nat_type(&self) -> NatType {
        self.state.read().unwrap_or_else(|e| e.into_inner()).nat_type
    }

    /// Stops the refresh task; state stays readable. Calling `close` a
    /// second time returns [`MonitorError::AlreadyClosed`]. Dropping the
    /// tracker without closing also stops the task.
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

/// Maps a raw probe mapping into the closed classification.
pub fn classify(raw: RawMapping) -> Result<NatType, MonitorError> {
    match raw {
        RawMapping::NoNat => Ok(NatType::None),
        RawMapping::FullCone => Ok(NatType::FullCone),
        RawMapping::RestrictedCone => Ok(NatType::RestrictedCone),
        RawMapping::PortRestrictedCone => Ok(NatType::PortRestrictedCone),
        RawMapping::Symmetric => Ok(NatType::Symmetric),
        other => Err(MonitorError::Classification {
            raw: format!("{other:?}"),
        }),
    }
}

async fn run_probe(probe: &Arc<dyn NatProbe>, server: &str) -> anyhow::Result<ProbeReport> {
    let probe = Arc::clone(probe);
    let server = server.to_string();
    tokio::task::spawn_blocking(move || probe.discover(&server))
        .await
        .map_err(|e| anyhow::anyhow!("probe task join: {}", e))?
}

async fn refresh_loop(
    probe: Arc<dyn NatProbe>,
    server: String,
    state: Arc<RwLock<NatState>>,
    check_interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut tick = tokio::time::interval(check_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The interval fires immediately; the constructor already probed once.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match run_probe(&probe, &server).await {
                    Ok(report) => match classify(report.mapping) {
                        Ok(nat_type) => {
                            let mut state = state.write().unwrap_or_else(|e| e.into_inner());
                            state.public_addr = report.public_addr;
                            state.nat_type = nat_type;
                        }
                        Err(e) => {
                            // The probe answered: take its public address,
                            // retain the previous classification.
                            let mut state = state.write().unwrap_or_else(|e| e.into_inner());
                            state.public_addr = report.public_addr;
                            tracing::warn!(
                                error = %e,
                                operation = "classify_nat",
                                "refresh kept previous NAT type"
                            );
                        }
                    },
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            operation = "nat_probe",
                            "refresh skipped; keeping previous NAT state"
                        );
                    }
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("nat tracker shutting down");
                break;
            }
        }
    }
}

/// First non-loopback IPv4 address on any local interface.
fn local_private_ipv4() -> Option<IpAddr> {
    let networks = Networks::new_with_refreshed_list();
    let addrs: Vec<IpAddr> = networks
        .list()
        .iter()
        .flat_map(|(_, data)| data.ip_networks().iter().map(|n| n.addr))
        .collect();
    first_usable_ipv4(addrs.into_iter())
}

fn first_usable_ipv4(mut addrs: impl Iterator<Item = IpAddr>) -> Option<IpAddr> {
    addrs.find(|addr| addr.is_ipv4() && !addr.is_loopback())
}
