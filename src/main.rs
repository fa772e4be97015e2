use anyhow::Result;
use hostmon::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!("{} {} starting", version::NAME, version::VERSION);
    let app_config = config::AppConfig::load()?;

    let report = lsblk_report().await?;
    let devices = blockdev::parse_report(&report)?;
    let names = blockdev::device_names(
        &devices,
        &app_config.monitoring.fstype,
        &app_config.monitoring.label,
        app_config.monitoring.mounted,
    );
    if names.is_empty() {
        // An empty name list makes the monitor track every device.
        tracing::warn!(
            fstype = %app_config.monitoring.fstype,
            label = %app_config.monitoring.label,
            "device filter matched nothing; tracking all devices"
        );
    } else {
        tracing::info!(devices = ?names, "tracking filtered devices");
    }

    let disk_source: Arc<dyn counters::CounterSource> = Arc::new(counters::DiskCounters::new());
    let mut disk_monitor = rate_monitor::RateMonitor::start(disk_source, names).await?;

    let net_source: Arc<dyn counters::CounterSource> = Arc::new(counters::NetCounters::new());
    let mut net_monitor = rate_monitor::RateMonitor::start(net_source, Vec::new()).await?;

    let mut report_tick = tokio::time::interval(Duration::from_secs(
        app_config.monitoring.report_interval_secs,
    ));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = report_tick.tick() => {
                for s in disk_monitor.get_all() {
                    tracing::info!(
                        device = %s.name,
                        read_rate = s.read_rate,
                        write_rate = s.write_rate,
                        bytes_read = s.bytes_read,
                        bytes_written = s.bytes_written,
                        "disk"
                    );
                }
                for s in net_monitor.get_all() {
                    tracing::info!(
                        interface = %s.name,
                        recv_rate = s.read_rate,
                        send_rate = s.write_rate,
                        "net"
                    );
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    disk_monitor.close()?;
    net_monitor.close()?;
    Ok(())
}

/// Runs the system block-device listing and returns its raw JSON report.
async fn lsblk_report() -> Result<String> {
    let output = tokio::process::Command::new("lsblk")
        .args([
            "--paths",
            "--json",
            "--bytes",
            "--fs",
            "--output",
            "NAME,TYPE,SIZE,ROTA,MOUNTPOINT,FSTYPE,PARTUUID,LABEL,UUID",
        ])
        .output()
        .await?;
    anyhow::ensure!(
        output.status.success(),
        "lsblk exited with {}",
        output.status
    );
    Ok(String::from_utf8(output.stdout)?)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
