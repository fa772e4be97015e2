// Block-device report decoding: tolerant lsblk JSON in, typed device tree
// out. Encoding quirks (numbers-as-strings, heterogeneous booleans) stop at
// this boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Key under which lsblk nests its device list.
const REPORT_KEY: &str = "blockdevices";

/// One node of the block-device tree. Children are partitions or
/// sub-devices; a node without children is a leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDevice {
    pub name: String,
    /// Device type tag as reported (e.g. "disk", "part", "lvm").
    pub kind: String,
    pub size: u64,
    pub rotational: bool,
    pub mount_point: String,
    pub fstype: String,
    pub part_uuid: String,
    pub label: String,
    pub uuid: String,
    pub children: Vec<BlockDevice>,
}

impl BlockDevice {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Scalar as lsblk emits it: native JSON value or quoted text, depending on
/// the lsblk version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Bool(bool),
    Num(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawDevice {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<RawScalar>,
    #[serde(default)]
    rota: Option<RawScalar>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    fstype: Option<String>,
    #[serde(default)]
    partuuid: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    children: Vec<RawDevice>,
}

impl TryFrom<RawDevice> for BlockDevice {
    type Error = MonitorError;

    fn try_from(raw: RawDevice) -> Result<Self, MonitorError> {
        let children = raw
            .children
            .into_iter()
            .map(BlockDevice::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BlockDevice {
            name: raw.name,
            kind: raw.kind,
            size: size_from_raw(raw.size)?,
            rotational: flag_from_raw(raw.rota)?,
            mount_point: raw.mountpoint.unwrap_or_default(),
            fstype: raw.fstype.unwrap_or_default(),
            part_uuid: raw.partuuid.unwrap_or_default(),
            label: raw.label.unwrap_or_default(),
            uuid: raw.uuid.unwrap_or_default(),
            children,
        })
    }
}

/// Size arrives as `8001563222016` or `"8001563222016"`; absent/null means
/// lsblk had nothing to report and decodes as zero.
fn size_from_raw(raw: Option<RawScalar>) -> Result<u64, MonitorError> {
    match raw {
        Option::None => Ok(0),
        Some(RawScalar::Num(n)) => Ok(n),
        Some(RawScalar::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| malformed("size", &s)),
        Some(RawScalar::Bool(b)) => Err(malformed("size", &b.to_string())),
    }
}

/// The rotational flag arrives as a bool, `1`/`0`, `"1"`/`"0"`,
/// `"true"`/`"false"`, or an empty string meaning false.
fn flag_from_raw(raw: Option<RawScalar>) -> Result<bool, MonitorError> {
    match raw {
        Option::None => Ok(false),
        Some(RawScalar::Bool(b)) => Ok(b),
        Some(RawScalar::Num(1)) => Ok(true),
        Some(RawScalar::Num(0)) => Ok(false),
        Some(RawScalar::Num(n)) => Err(malformed("rota", &n.to_string())),
        Some(RawScalar::Text(s)) => match s.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(malformed("rota", &s)),
        },
    }
}

fn malformed(field: &str, value: &str) -> MonitorError {
    MonitorError::MalformedField {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Decodes a full lsblk JSON report (`{"blockdevices": [...]}`) into the
/// typed device forest.
pub fn parse_report(json: &str) -> Result<Vec<BlockDevice>, MonitorError> {
    let mut report: HashMap<String, Vec<RawDevice>> =
        serde_json::from_str(json).map_err(MonitorError::MalformedReport)?;
    let raw = report
        .remove(REPORT_KEY)
        .ok_or(MonitorError::MissingReportKey)?;
    raw.into_iter().map(BlockDevice::try_from).collect()
}

/// Flattens a device forest into its leaves, depth-first in input order.
/// Container nodes are transparent and never returned.
pub fn leaf_devices(devices: &[BlockDevice]) -> Vec<BlockDevice> {
    let mut out = Vec::new();
    collect_leaves(devices, &mut out);
    out
}

fn collect_leaves(devices: &[BlockDevice], out: &mut Vec<BlockDevice>) {
    for dev in devices {
        if dev.is_leaf() {
            out.push(dev.clone());
        } else {
            collect_leaves(&dev.children, out);
        }
    }
}

/// Exact-match filter over the leaf set. `mounted` true keeps only devices
/// with a non-empty mount point; false keeps only devices without one. An
/// empty result is not an error.
pub fn find_by_fs_and_label(
    devices: &[BlockDevice],
    fstype: &str,
    label: &str,
    mounted: bool,
) -> Vec<BlockDevice> {
    leaf_devices(devices)
        .into_iter()
        .filter(|d| d.fstype == fstype && d.label == label)
        .filter(|d| d.mount_point.is_empty() != mounted)
        .collect()
}

/// Device names matching the filter, ready to seed a rate monitor.
pub fn device_names(
    devices: &[BlockDevice],
    fstype: &str,
    label: &str,
    mounted: bool,
) -> Vec<String> {
    find_by_fs_and_label(devices, fstype, label, mounted)
        .into_iter()
        .map(|d| d.name)
        .collect()
}
