// Snapshot and state models

use serde::{Deserialize, Serialize};

/// One poll result entry from a counter source: cumulative byte totals for a
/// single device or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSample {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Latest known state of one monitored device or interface. For network
/// sources, read/written mean received/sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoSnapshot {
    pub name: String,
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Read rate in bytes/sec; zero until the second sample of this name.
    #[serde(default)]
    pub read_rate: u64,
    /// Write rate in bytes/sec; zero until the second sample of this name.
    #[serde(default)]
    pub write_rate: u64,
}

/// NAT mapping behavior classification; serializes to camelCase JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NatType {
    #[default]
    Unknown,
    None,
    FullCone,
    RestrictedCone,
    FullOrRestrictedCone,
    PortRestrictedCone,
    Symmetric,
}

impl std::fmt::Display for NatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NatType::Unknown => "Unknown",
            NatType::None => "None",
            NatType::FullCone => "FullCone",
            NatType::RestrictedCone => "RestrictedCone",
            NatType::FullOrRestrictedCone => "FullOrRestrictedCone",
            NatType::PortRestrictedCone => "PortRestrictedCone",
            NatType::Symmetric => "Symmetric",
        };
        write!(f, "{name}")
    }
}
