// Typed errors for monitor operations and report decoding

use thiserror::Error;

/// Errors surfaced by the monitors and the block-device decoder.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// An external counter source or discovery probe call failed. Fatal at
    /// construction time only; steady-state ticks log the failure and keep
    /// the previous state instead.
    #[error("probe failed: {0}")]
    Probe(anyhow::Error),

    /// Lookup of a name the monitor does not track.
    #[error("no snapshot tracked for '{name}'")]
    NotFound { name: String },

    /// No non-loopback IPv4 address found on any local interface.
    #[error("no usable non-loopback IPv4 address on any local interface")]
    NoPrivateAddress,

    /// The probe reported a mapping class outside the closed classification.
    #[error("unsupported NAT mapping reported by probe: {raw}")]
    Classification { raw: String },

    /// The tolerant decoder met a field encoding it does not recognize.
    #[error("malformed field '{field}': unrecognized encoding '{value}'")]
    MalformedField { field: String, value: String },

    /// The block-device report is not decodable JSON.
    #[error("unreadable block-device report: {0}")]
    MalformedReport(#[source] serde_json::Error),

    /// The block-device report lacks the expected top-level key.
    #[error("unexpected block-device report format: missing \"blockdevices\" key")]
    MissingReportKey,

    /// `close()` was called on an already-closed monitor.
    #[error("monitor already closed")]
    AlreadyClosed,
}
