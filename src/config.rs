use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Filesystem type the tracked devices must carry (e.g. "ext4").
    pub fstype: String,
    /// Filesystem label the tracked devices must carry. May be empty to
    /// match unlabeled devices.
    #[serde(default)]
    pub label: String,
    /// Track mounted devices (true) or unmounted ones (false).
    #[serde(default = "default_mounted")]
    pub mounted: bool,
    /// How often to log the current snapshots at INFO level.
    pub report_interval_secs: u64,
}

fn default_mounted() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.monitoring.fstype.is_empty(),
            "monitoring.fstype must be non-empty"
        );
        anyhow::ensure!(
            self.monitoring.report_interval_secs > 0,
            "monitoring.report_interval_secs must be > 0, got {}",
            self.monitoring.report_interval_secs
        );
        Ok(())
    }
}
